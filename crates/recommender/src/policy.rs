//! Tunable policy constants for scoring.
//!
//! Several thresholds were never settled by the survey tooling ("liked"
//! meaning 3+ or exactly 4, missing ratings dropped or counted as 0), so they
//! live here instead of being hard-coded. The defaults are the system of
//! record: liked means 4, and missing ratings count as 0 only in the
//! aggregate preference average.

use crate::error::{RecommendError, Result};
use data_loader::{MAX_SCORE, MIN_SCORE};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_LIKED_THRESHOLD: u8 = 4;
pub const DEFAULT_PROFILE_THRESHOLD: u8 = 3;
pub const DEFAULT_CORRELATION_WEIGHT: f64 = 0.3;
pub const DEFAULT_NEIGHBOR_K: usize = 5;
pub const DEFAULT_DIVERSITY_PENALTY: f64 = 0.5;
pub const DEFAULT_TOP_REASONS: usize = 3;

/// How an unrated menu enters a group's preference average
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingScorePolicy {
    /// Count a missing rating as 0 and divide by every considered user
    #[default]
    ZeroFill,
    /// Average only the users who rated the menu
    Skip,
}

/// Scoring knobs shared by the recommenders.
///
/// Deserializes from JSON with every field optional:
///
/// ```json
/// { "liked_threshold": 3, "diversity_penalty": 0.8 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendPolicy {
    /// Minimum score for a menu to join the liked set
    #[serde(default = "default_liked_threshold")]
    pub liked_threshold: u8,

    #[serde(default)]
    pub missing_scores: MissingScorePolicy,

    /// Minimum score for a menu to count toward a taste profile
    #[serde(default = "default_profile_threshold")]
    pub profile_threshold: u8,

    /// Weight of the normalized correlation score; the preference average
    /// gets `1 - correlation_weight`
    #[serde(default = "default_correlation_weight")]
    pub correlation_weight: f64,

    /// How many liked-menu correlations are averaged per candidate
    #[serde(default = "default_neighbor_k")]
    pub neighbor_k: usize,

    #[serde(default = "default_diversity_penalty")]
    pub diversity_penalty: f64,

    #[serde(default = "default_top_reasons")]
    pub top_reasons: usize,

    /// Drop candidates whose aggregate preference is below this value
    #[serde(default)]
    pub min_preference: Option<f64>,
}

fn default_liked_threshold() -> u8 {
    DEFAULT_LIKED_THRESHOLD
}

fn default_profile_threshold() -> u8 {
    DEFAULT_PROFILE_THRESHOLD
}

fn default_correlation_weight() -> f64 {
    DEFAULT_CORRELATION_WEIGHT
}

fn default_neighbor_k() -> usize {
    DEFAULT_NEIGHBOR_K
}

fn default_diversity_penalty() -> f64 {
    DEFAULT_DIVERSITY_PENALTY
}

fn default_top_reasons() -> usize {
    DEFAULT_TOP_REASONS
}

impl Default for RecommendPolicy {
    fn default() -> Self {
        Self {
            liked_threshold: DEFAULT_LIKED_THRESHOLD,
            missing_scores: MissingScorePolicy::default(),
            profile_threshold: DEFAULT_PROFILE_THRESHOLD,
            correlation_weight: DEFAULT_CORRELATION_WEIGHT,
            neighbor_k: DEFAULT_NEIGHBOR_K,
            diversity_penalty: DEFAULT_DIVERSITY_PENALTY,
            top_reasons: DEFAULT_TOP_REASONS,
            min_preference: None,
        }
    }
}

impl RecommendPolicy {
    pub fn preference_weight(&self) -> f64 {
        1.0 - self.correlation_weight
    }

    /// Parse a policy from JSON, filling absent fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(json)
            .map_err(|e| RecommendError::InvalidPolicy(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(data_loader::DataLoadError::from)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let score_range = MIN_SCORE..=MAX_SCORE;
        if !score_range.contains(&self.liked_threshold) {
            return Err(RecommendError::InvalidPolicy(format!(
                "liked_threshold {} outside {}..={}",
                self.liked_threshold, MIN_SCORE, MAX_SCORE
            )));
        }
        if !score_range.contains(&self.profile_threshold) {
            return Err(RecommendError::InvalidPolicy(format!(
                "profile_threshold {} outside {}..={}",
                self.profile_threshold, MIN_SCORE, MAX_SCORE
            )));
        }
        if !(0.0..=1.0).contains(&self.correlation_weight) {
            return Err(RecommendError::InvalidPolicy(format!(
                "correlation_weight {} outside 0..=1",
                self.correlation_weight
            )));
        }
        if self.neighbor_k == 0 {
            return Err(RecommendError::InvalidPolicy("neighbor_k must be at least 1".to_string()));
        }
        if !(self.diversity_penalty >= 0.0) {
            return Err(RecommendError::InvalidPolicy(format!(
                "diversity_penalty {} must be non-negative",
                self.diversity_penalty
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RecommendPolicy::default();
        assert_eq!(policy.liked_threshold, 4);
        assert_eq!(policy.missing_scores, MissingScorePolicy::ZeroFill);
        assert!((policy.preference_weight() - 0.7).abs() < 1e-12);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let policy =
            RecommendPolicy::from_json_str(r#"{ "liked_threshold": 3, "missing_scores": "skip" }"#)
                .unwrap();
        assert_eq!(policy.liked_threshold, 3);
        assert_eq!(policy.missing_scores, MissingScorePolicy::Skip);
        assert_eq!(policy.neighbor_k, DEFAULT_NEIGHBOR_K);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(RecommendPolicy::from_json_str(r#"{ "liked_threshold": 5 }"#).is_err());
        assert!(RecommendPolicy::from_json_str(r#"{ "correlation_weight": 1.5 }"#).is_err());
        assert!(RecommendPolicy::from_json_str(r#"{ "neighbor_k": 0 }"#).is_err());
        assert!(RecommendPolicy::from_json_str(r#"{ "diversity_penalty": -1.0 }"#).is_err());
        assert!(RecommendPolicy::from_json_str("not json").is_err());
    }
}
