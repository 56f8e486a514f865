//! Group context assembled once before scoring.
//!
//! Gathers everything the collaborative scorer needs about the group up
//! front: which named users exist, the liked set, and the aggregate
//! preference per surveyed menu.

use crate::error::{RecommendError, Result};
use crate::policy::{MissingScorePolicy, RecommendPolicy};
use data_loader::{PreferenceTable, UserPreferences};
use std::collections::HashSet;
use tracing::warn;

/// Look up the named users, skipping unknown ones with a warning.
///
/// Fails with [`RecommendError::UserNotFound`] only when nobody is found.
pub fn resolve_users<'a, S: AsRef<str>>(
    preferences: &'a PreferenceTable,
    names: &[S],
) -> Result<Vec<&'a UserPreferences>> {
    let mut found = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        match preferences.get_user(name) {
            Some(user) if !found.iter().any(|u: &&UserPreferences| u.name == name) => {
                found.push(user)
            }
            Some(_) => {}
            None => warn!("User '{}' not found in preference table, skipping", name),
        }
    }
    if found.is_empty() {
        return Err(RecommendError::UserNotFound {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
        });
    }
    Ok(found)
}

#[derive(Debug, Clone, Default)]
pub struct GroupContext {
    /// Users that were found, in request order
    pub users: Vec<String>,

    /// Menus rated at or above the liked threshold by anyone, first-seen order
    pub liked: Vec<String>,

    liked_lookup: HashSet<String>,

    /// Aggregate preference per preference-table column
    preferences: Vec<f64>,
}

impl GroupContext {
    pub fn is_liked(&self, menu: &str) -> bool {
        self.liked_lookup.contains(menu)
    }

    /// Aggregate preference of the menu at `column` of the preference table
    pub fn preference(&self, column: usize) -> f64 {
        self.preferences.get(column).copied().unwrap_or(0.0)
    }
}

/// Build the group context for the named users
pub fn build_group_context<S: AsRef<str>>(
    preferences: &PreferenceTable,
    names: &[S],
    policy: &RecommendPolicy,
) -> Result<GroupContext> {
    let users = resolve_users(preferences, names)?;

    let mut context = GroupContext {
        users: users.iter().map(|u| u.name.clone()).collect(),
        ..GroupContext::default()
    };

    // Liked set: user by user, column by column
    for user in &users {
        for (menu, score) in preferences.menus().iter().zip(user.scores.iter().copied()) {
            let liked = score.is_some_and(|s| s >= policy.liked_threshold);
            if liked && context.liked_lookup.insert(menu.clone()) {
                context.liked.push(menu.clone());
            }
        }
    }

    context.preferences = (0..preferences.menus().len())
        .map(|column| {
            let scores = users.iter().map(|u| u.scores[column]);
            match policy.missing_scores {
                MissingScorePolicy::ZeroFill => {
                    let total: f64 = scores.map(|s| f64::from(s.unwrap_or(0))).sum();
                    total / users.len() as f64
                }
                MissingScorePolicy::Skip => {
                    let rated: Vec<f64> = scores.flatten().map(f64::from).collect();
                    crate::math::mean(&rated).unwrap_or(0.0)
                }
            }
        })
        .collect();

    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_preferences() -> PreferenceTable {
        let menus = ["김치찌개", "떡볶이", "라멘"].iter().map(|s| s.to_string()).collect();
        let mut table = PreferenceTable::new(menus).unwrap();
        table.insert_user("연누", vec![Some(4), Some(2), None]).unwrap();
        table.insert_user("민수", vec![Some(3), Some(4), Some(4)]).unwrap();
        table
    }

    #[test]
    fn test_resolve_users_skips_missing() {
        let prefs = create_test_preferences();
        let users = resolve_users(&prefs, &["연누", "없는사람"]).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "연누");
    }

    #[test]
    fn test_resolve_users_all_missing() {
        let prefs = create_test_preferences();
        match resolve_users(&prefs, &["a", "b"]) {
            Err(RecommendError::UserNotFound { names }) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("expected UserNotFound, got {:?}", other.map(|u| u.len())),
        }
    }

    #[test]
    fn test_liked_set_first_seen_order() {
        let prefs = create_test_preferences();
        let context =
            build_group_context(&prefs, &["민수", "연누"], &RecommendPolicy::default()).unwrap();
        assert_eq!(context.liked, vec!["떡볶이", "라멘", "김치찌개"]);

        let context =
            build_group_context(&prefs, &["연누", "민수"], &RecommendPolicy::default()).unwrap();
        assert_eq!(context.liked, vec!["김치찌개", "떡볶이", "라멘"]);
        assert!(context.is_liked("라멘"));
    }

    #[test]
    fn test_preference_zero_fill_vs_skip() {
        let prefs = create_test_preferences();
        let names = ["연누", "민수"];

        let zero_fill = build_group_context(&prefs, &names, &RecommendPolicy::default()).unwrap();
        assert_eq!(zero_fill.preference(2), 2.0);
        assert_eq!(zero_fill.preference(0), 3.5);

        let policy = RecommendPolicy {
            missing_scores: MissingScorePolicy::Skip,
            ..RecommendPolicy::default()
        };
        let skip = build_group_context(&prefs, &names, &policy).unwrap();
        assert_eq!(skip.preference(2), 4.0);
    }

    #[test]
    fn test_liked_threshold_policy() {
        let prefs = create_test_preferences();
        let policy = RecommendPolicy {
            liked_threshold: 3,
            ..RecommendPolicy::default()
        };
        let context = build_group_context(&prefs, &["민수"], &policy).unwrap();
        assert_eq!(context.liked.len(), 3);
    }
}
