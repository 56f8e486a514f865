//! Collaborative recommender: correlation to liked menus plus raw preference.
//!
//! ## Algorithm
//! 1. Build the group context: found users, liked set, aggregate preference
//! 2. Candidates are matrix menus that were also surveyed, liked ones filtered out
//! 3. Correlation score per candidate: mean of its top-K correlations to the
//!    liked set, divided by `1 + diversity_penalty * σ` where σ is the spread
//!    of the candidate's whole correlation row
//! 4. Normalize correlation scores by their maximum and blend:
//!    `w * corr / max + (1 - w) * preference`
//! 5. Rank descending (ties keep matrix order) and attach reasons
//!
//! The σ term damps menus that correlate strongly with everything, which
//! otherwise crowd the top of every list.

use crate::context::{build_group_context, GroupContext};
use crate::error::{RecommendError, Result};
use crate::filters::{FilterPipeline, LikedMenuFilter, MinimumPreferenceFilter};
use crate::math::{mean, population_std};
use crate::policy::RecommendPolicy;
use crate::types::{Candidate, Reason, Recommendation};
use data_loader::{CorrelationMatrix, PreferenceTable};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct CollaborativeRecommender {
    preferences: Arc<PreferenceTable>,
    matrix: Arc<CorrelationMatrix>,
    policy: RecommendPolicy,
}

impl CollaborativeRecommender {
    pub fn new(preferences: Arc<PreferenceTable>, matrix: Arc<CorrelationMatrix>) -> Self {
        Self {
            preferences,
            matrix,
            policy: RecommendPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RecommendPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RecommendPolicy {
        &self.policy
    }

    /// Ranked recommendations with reasons for the named users
    #[instrument(skip(self, names), fields(group = names.len()))]
    pub fn recommend<S: AsRef<str>>(&self, names: &[S], top_n: usize) -> Result<Vec<Recommendation>> {
        self.policy.validate()?;
        rank_collaborative(&self.preferences, &self.matrix, names, top_n, &self.policy)
    }
}

/// Free-function form with the scoring knobs spelled out; other policy
/// values keep their defaults
pub fn recommend_collaborative<S: AsRef<str>>(
    names: &[S],
    preferences: &PreferenceTable,
    matrix: &CorrelationMatrix,
    top_n: usize,
    top_reasons: usize,
    weight: f64,
    diversity_penalty: f64,
) -> Result<Vec<Recommendation>> {
    let policy = RecommendPolicy {
        top_reasons,
        correlation_weight: weight,
        diversity_penalty,
        ..RecommendPolicy::default()
    };
    policy.validate()?;
    rank_collaborative(preferences, matrix, names, top_n, &policy)
}

fn rank_collaborative<S: AsRef<str>>(
    preferences: &PreferenceTable,
    matrix: &CorrelationMatrix,
    names: &[S],
    top_n: usize,
    policy: &RecommendPolicy,
) -> Result<Vec<Recommendation>> {
    let context = build_group_context(preferences, names, policy)?;
    if context.liked.is_empty() {
        return Err(RecommendError::NoPreference {
            users: context.users.clone(),
            threshold: policy.liked_threshold,
        });
    }
    let liked_rows: Vec<(&str, usize)> = context
        .liked
        .iter()
        .filter_map(|menu| Some((menu.as_str(), matrix.position(menu)?)))
        .collect();
    debug!(
        "Liked set: {} menus ({} in correlation matrix)",
        context.liked.len(),
        liked_rows.len()
    );

    let candidates = generate_candidates(preferences, matrix, &context);
    let mut pipeline = FilterPipeline::new().add_filter(LikedMenuFilter);
    if let Some(min) = policy.min_preference {
        pipeline = pipeline.add_filter(MinimumPreferenceFilter::new(min));
    }
    let mut candidates = pipeline.apply(candidates, &context)?;

    candidates.par_iter_mut().for_each(|candidate| {
        candidate.correlation = correlation_score(matrix, candidate.matrix_index, &liked_rows, policy);
    });

    let max_correlation = candidates
        .iter()
        .filter_map(|c| c.correlation)
        .fold(0.0_f64, f64::max);
    for candidate in &mut candidates {
        let normalized = match candidate.correlation {
            Some(corr) if max_correlation > 0.0 => corr / max_correlation,
            _ => 0.0,
        };
        candidate.score =
            policy.correlation_weight * normalized + policy.preference_weight() * candidate.preference;
    }

    // Candidates arrive in matrix order, so a stable sort keeps that order on ties
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    candidates.truncate(top_n);

    let recommendations: Vec<Recommendation> = candidates
        .into_iter()
        .map(|c| Recommendation {
            reasons: reasons_for(matrix, c.matrix_index, &liked_rows, policy.top_reasons),
            menu: c.menu,
            score: c.score,
            preference: c.preference,
            correlation: c.correlation,
        })
        .collect();

    info!(
        "Recommended {} menus for {:?}",
        recommendations.len(),
        context.users
    );
    Ok(recommendations)
}

/// Menus in both the matrix and the survey, in matrix order
fn generate_candidates(
    preferences: &PreferenceTable,
    matrix: &CorrelationMatrix,
    context: &GroupContext,
) -> Vec<Candidate> {
    matrix
        .menus()
        .iter()
        .enumerate()
        .filter_map(|(row, menu)| {
            let column = preferences.menu_position(menu)?;
            Some(Candidate::new(menu.clone(), row, context.preference(column)))
        })
        .collect()
}

/// Penalized mean of the top-K valid correlations to liked menus
fn correlation_score(
    matrix: &CorrelationMatrix,
    row: usize,
    liked_rows: &[(&str, usize)],
    policy: &RecommendPolicy,
) -> Option<f64> {
    let mut correlations: Vec<f64> = liked_rows
        .iter()
        .filter_map(|&(_, liked)| matrix.get(row, liked))
        .collect();
    correlations.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    correlations.truncate(policy.neighbor_k);
    let top_mean = mean(&correlations)?;

    let valid_row: Vec<f64> = matrix.row(row).iter().copied().filter(|v| !v.is_nan()).collect();
    let sigma = population_std(&valid_row);
    Some(top_mean / (1.0 + policy.diversity_penalty * sigma))
}

/// Liked menus most similar to the candidate, strongest first
fn reasons_for(
    matrix: &CorrelationMatrix,
    row: usize,
    liked_rows: &[(&str, usize)],
    top_reasons: usize,
) -> Vec<Reason> {
    let mut similar: Vec<(&str, f64)> = liked_rows
        .iter()
        .filter_map(|&(menu, liked)| Some((menu, matrix.get(row, liked)?)))
        .collect();
    similar.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    similar
        .into_iter()
        .take(top_reasons)
        .map(|(menu, similarity)| Reason::new(menu, similarity))
        .collect()
}
