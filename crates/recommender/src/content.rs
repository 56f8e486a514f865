//! Content-based scoring: group taste vector against menu attributes.
//!
//! ## Algorithm
//! 1. Build a taste profile for every found user
//! 2. Average the profiles element-wise into one group vector
//! 3. Restrict the group vector and the menu vectors to their shared columns
//! 4. Score every menu by cosine similarity and keep the top N

use crate::error::{RecommendError, Result};
use crate::math::cosine_similarity;
use crate::policy::RecommendPolicy;
use crate::profile::{taste_profiles, TasteProfile};
use crate::types::ContentRecommendation;
use data_loader::{MenuTable, PreferenceTable};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Element-wise mean of several profiles over the same columns
pub fn group_vector(profiles: &[TasteProfile]) -> Option<TasteProfile> {
    let first = profiles.first()?;
    let mut values = vec![0.0; first.values.len()];
    for profile in profiles {
        for (acc, v) in values.iter_mut().zip(&profile.values) {
            *acc += v;
        }
    }
    values.iter_mut().for_each(|v| *v /= profiles.len() as f64);
    Some(TasteProfile {
        user: profiles
            .iter()
            .map(|p| p.user.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        columns: first.columns.clone(),
        values,
    })
}

/// Cosine score of every menu against `vector`, in menu order.
///
/// Only columns present in both the vector and the menu schema take part.
pub fn score_menus(vector: &TasteProfile, menus: &MenuTable) -> Result<Vec<f64>> {
    let shared: Vec<(usize, usize)> = vector
        .columns
        .iter()
        .enumerate()
        .filter_map(|(i, column)| Some((i, menus.schema().position(column)?)))
        .collect();
    if shared.is_empty() {
        return Err(RecommendError::NoOverlap);
    }
    debug!(
        "Scoring {} menus over {} shared columns",
        menus.len(),
        shared.len()
    );

    let group: Vec<f64> = shared.iter().map(|&(i, _)| vector.values[i]).collect();
    Ok(menus
        .menus()
        .iter()
        .map(|menu| {
            let attributes: Vec<f64> = shared
                .iter()
                .map(|&(_, j)| f64::from(menu.attributes[j]))
                .collect();
            cosine_similarity(&attributes, &group)
        })
        .collect())
}

/// Recommends menus whose attributes match the group's combined taste
pub struct ContentRecommender {
    menus: Arc<MenuTable>,
    preferences: Arc<PreferenceTable>,
    policy: RecommendPolicy,
}

impl ContentRecommender {
    pub fn new(menus: Arc<MenuTable>, preferences: Arc<PreferenceTable>) -> Self {
        Self {
            menus,
            preferences,
            policy: RecommendPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RecommendPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[instrument(skip(self, names), fields(group = names.len()))]
    pub fn recommend<S: AsRef<str>>(
        &self,
        names: &[S],
        top_n: usize,
    ) -> Result<Vec<ContentRecommendation>> {
        self.policy.validate()?;
        rank_content(
            &self.menus,
            &self.preferences,
            names,
            top_n,
            self.policy.profile_threshold,
        )
    }
}

/// Top `top_n` menus for the group by attribute similarity, ties in menu order
pub fn recommend_content_based<S: AsRef<str>>(
    menus: &MenuTable,
    preferences: &PreferenceTable,
    names: &[S],
    top_n: usize,
) -> Result<Vec<ContentRecommendation>> {
    rank_content(
        menus,
        preferences,
        names,
        top_n,
        RecommendPolicy::default().profile_threshold,
    )
}

fn rank_content<S: AsRef<str>>(
    menus: &MenuTable,
    preferences: &PreferenceTable,
    names: &[S],
    top_n: usize,
    profile_threshold: u8,
) -> Result<Vec<ContentRecommendation>> {
    let profiles = taste_profiles(names, preferences, menus, profile_threshold)?;
    let Some(group) = group_vector(&profiles) else {
        return Ok(Vec::new());
    };
    let scores = score_menus(&group, menus)?;

    let mut ranked: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(top_n);

    Ok(ranked
        .into_iter()
        .map(|(i, score)| {
            let menu = &menus.menus()[i];
            ContentRecommendation {
                menu: menu.name.clone(),
                score,
                category: menu.category.clone(),
                simple: menu.simple,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{AttributeSchema, Menu};

    fn create_test_menus() -> MenuTable {
        let schema = AttributeSchema::from_names([
            "주재료_돼지고기",
            "맛 프로파일_매운맛",
            "맛 프로파일_담백한맛",
        ])
        .unwrap();
        let mut table = MenuTable::new(schema);
        for (name, simple, attributes) in [
            ("김치찌개", false, vec![1, 1, 0]),
            ("떡볶이", true, vec![0, 1, 0]),
            ("수육", false, vec![1, 0, 1]),
            ("두부", false, vec![0, 0, 1]),
        ] {
            table
                .insert_menu(Menu {
                    name: name.to_string(),
                    category: "한식".to_string(),
                    simple,
                    attributes,
                })
                .unwrap();
        }
        table
    }

    fn create_test_preferences() -> PreferenceTable {
        let menus = ["김치찌개", "떡볶이", "수육", "두부"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut table = PreferenceTable::new(menus).unwrap();
        table
            .insert_user("연누", vec![Some(4), Some(1), Some(1), Some(1)])
            .unwrap();
        table
            .insert_user("민수", vec![Some(1), Some(1), Some(1), Some(4)])
            .unwrap();
        table
    }

    #[test]
    fn test_identical_vector_scores_one() {
        let menus = create_test_menus();
        let vector = TasteProfile {
            user: "g".to_string(),
            columns: menus.schema().names().map(str::to_string).collect(),
            values: vec![1.0, 1.0, 0.0],
        };
        let scores = score_menus(&vector, &menus).unwrap();
        assert!((scores[0] - 1.0).abs() < 1e-12);
        assert!(scores[1] < 1.0);
    }

    #[test]
    fn test_no_overlap() {
        let vector = TasteProfile {
            user: "g".to_string(),
            columns: vec!["계절_여름".to_string()],
            values: vec![1.0],
        };
        assert!(matches!(
            score_menus(&vector, &create_test_menus()),
            Err(RecommendError::NoOverlap)
        ));
    }

    #[test]
    fn test_single_user_favorite_ranks_first() {
        let recs =
            recommend_content_based(&create_test_menus(), &create_test_preferences(), &["연누"], 2)
                .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].menu, "김치찌개");
        assert!((recs[0].score - 1.0).abs() < 1e-12);
        assert_eq!(recs[0].category, "한식");
    }

    #[test]
    fn test_group_vector_is_mean() {
        let menus = create_test_menus();
        let prefs = create_test_preferences();
        let profiles = taste_profiles(&["연누", "민수"], &prefs, &menus, 3).unwrap();
        let group = group_vector(&profiles).unwrap();
        assert_eq!(group.values, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_missing_users() {
        let menus = create_test_menus();
        let prefs = create_test_preferences();
        assert!(matches!(
            recommend_content_based(&menus, &prefs, &["x", "y"], 3),
            Err(RecommendError::UserNotFound { .. })
        ));
        // partially missing group still scores
        let recs = recommend_content_based(&menus, &prefs, &["x", "민수"], 1).unwrap();
        assert_eq!(recs[0].menu, "두부");
    }

    #[test]
    fn test_top_n_larger_than_menus() {
        let recommender = ContentRecommender::new(
            Arc::new(create_test_menus()),
            Arc::new(create_test_preferences()),
        );
        let recs = recommender.recommend(&["연누", "민수"], 10).unwrap();
        assert_eq!(recs.len(), 4);
        let mut names: Vec<&str> = recs.iter().map(|r| r.menu.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_ties_keep_menu_order() {
        // group vector [0.5, 0.5, 0.5]: 김치찌개 ties 수육, 떡볶이 ties 두부
        let recs = recommend_content_based(
            &create_test_menus(),
            &create_test_preferences(),
            &["연누", "민수"],
            4,
        )
        .unwrap();
        let names: Vec<&str> = recs.iter().map(|r| r.menu.as_str()).collect();
        assert_eq!(names, vec!["김치찌개", "수육", "떡볶이", "두부"]);
        assert_eq!(recs[0].score, recs[1].score);
        assert_eq!(recs[2].score, recs[3].score);
        assert!(recs[1].score > recs[2].score);
    }

    #[test]
    fn test_recommend_rejects_invalid_policy() {
        let policy = RecommendPolicy {
            profile_threshold: 9,
            ..RecommendPolicy::default()
        };
        let recommender = ContentRecommender::new(
            Arc::new(create_test_menus()),
            Arc::new(create_test_preferences()),
        )
        .with_policy(policy);
        assert!(matches!(
            recommender.recommend(&["연누"], 3),
            Err(RecommendError::InvalidPolicy(_))
        ));
    }
}
