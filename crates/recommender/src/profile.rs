//! Per-user and per-group taste analysis.
//!
//! ## Components
//! - [`taste_profile`]: attribute-space profile of what a user likes
//! - [`analyze_user`]: favorite and disliked menus with their mean attributes
//! - [`preference_summary`]: averages, top and bottom lists, favorite counts
//! - [`category_preferences`]: mean score per category, flavor and cooking method
//! - [`group_summary`]: menus the whole group rates highly on average

use crate::context::resolve_users;
use crate::error::{RecommendError, Result};
use crate::math::mean;
use data_loader::{
    AttributeCategory, Menu, MenuTable, PreferenceTable, UserPreferences, MAX_SCORE,
};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// How many menus the top and bottom lists of a summary hold
pub const SUMMARY_LIST_LEN: usize = 10;

// =============================================================================
// Taste profile
// =============================================================================

/// A user's taste in attribute space: per column, the share of liked menus
/// carrying that attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TasteProfile {
    pub user: String,
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

impl TasteProfile {
    pub fn get(&self, column: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == column)?;
        Some(self.values[i])
    }

    /// Columns with a non-zero share, strongest first
    pub fn strongest(&self, n: usize) -> Vec<(&str, f64)> {
        let mut pairs: Vec<(&str, f64)> = self
            .columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
            .filter(|(_, v)| *v > 0.0)
            .collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        pairs.truncate(n);
        pairs
    }
}

/// Menus in the menu table that the user rated, with their score, in menu order
fn rated_menus<'a>(
    user: &UserPreferences,
    preferences: &PreferenceTable,
    menus: &'a MenuTable,
) -> Vec<(&'a Menu, u8)> {
    menus
        .menus()
        .iter()
        .filter_map(|menu| {
            let column = preferences.menu_position(&menu.name)?;
            Some((menu, user.scores[column]?))
        })
        .collect()
}

/// Element-wise mean of the attribute vectors; all zero for no menus
fn mean_attributes<'a>(width: usize, selected: impl Iterator<Item = &'a Menu>) -> Vec<f64> {
    let mut sums = vec![0.0; width];
    let mut count = 0usize;
    for menu in selected {
        for (sum, &v) in sums.iter_mut().zip(&menu.attributes) {
            *sum += f64::from(v);
        }
        count += 1;
    }
    if count > 0 {
        sums.iter_mut().for_each(|s| *s /= count as f64);
    }
    sums
}

fn profile_for(
    user: &UserPreferences,
    preferences: &PreferenceTable,
    menus: &MenuTable,
    threshold: u8,
) -> TasteProfile {
    let rated = rated_menus(user, preferences, menus);
    let liked = rated.iter().filter(|(_, s)| *s >= threshold).map(|(m, _)| *m);
    TasteProfile {
        user: user.name.clone(),
        columns: menus.schema().names().map(str::to_string).collect(),
        values: mean_attributes(menus.schema().len(), liked),
    }
}

/// Taste profile of one user from menus they rated at least `threshold`
pub fn taste_profile(
    user: &str,
    preferences: &PreferenceTable,
    menus: &MenuTable,
    threshold: u8,
) -> Result<TasteProfile> {
    let found = preferences
        .get_user(user)
        .ok_or_else(|| RecommendError::UserNotFound {
            names: vec![user.to_string()],
        })?;
    Ok(profile_for(found, preferences, menus, threshold))
}

/// Profiles of every found user, in request order; unknown users are skipped
#[instrument(skip(preferences, menus, names), fields(requested = names.len()))]
pub fn taste_profiles<S: AsRef<str>>(
    names: &[S],
    preferences: &PreferenceTable,
    menus: &MenuTable,
    threshold: u8,
) -> Result<Vec<TasteProfile>> {
    let users = resolve_users(preferences, names)?;
    let profiles: Vec<TasteProfile> = users
        .par_iter()
        .map(|user| profile_for(user, preferences, menus, threshold))
        .collect();
    debug!("Computed {} taste profiles", profiles.len());
    Ok(profiles)
}

// =============================================================================
// User analysis
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAnalysis {
    pub user: String,
    /// First `top_n` menus rated at least the threshold, in menu order
    pub favorite_menus: Vec<String>,
    /// Every menu rated below the threshold, in menu order
    pub disliked_menus: Vec<String>,
    pub favorite_attributes: TasteProfile,
    pub disliked_attributes: TasteProfile,
}

/// Split a user's rated menus at `threshold` and profile both sides
pub fn analyze_user(
    user: &str,
    preferences: &PreferenceTable,
    menus: &MenuTable,
    threshold: u8,
    top_n: usize,
) -> Result<UserAnalysis> {
    let found = preferences
        .get_user(user)
        .ok_or_else(|| RecommendError::UserNotFound {
            names: vec![user.to_string()],
        })?;
    let rated = rated_menus(found, preferences, menus);
    let (liked, disliked): (Vec<_>, Vec<_>) = rated.iter().partition(|(_, s)| *s >= threshold);

    let columns: Vec<String> = menus.schema().names().map(str::to_string).collect();
    let width = columns.len();
    Ok(UserAnalysis {
        user: found.name.clone(),
        favorite_menus: liked.iter().take(top_n).map(|(m, _)| m.name.clone()).collect(),
        disliked_menus: disliked.iter().map(|(m, _)| m.name.clone()).collect(),
        favorite_attributes: TasteProfile {
            user: found.name.clone(),
            columns: columns.clone(),
            values: mean_attributes(width, liked.iter().map(|(m, _)| *m)),
        },
        disliked_attributes: TasteProfile {
            user: found.name.clone(),
            columns,
            values: mean_attributes(width, disliked.iter().map(|(m, _)| *m)),
        },
    })
}

// =============================================================================
// Preference summary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceSummary {
    pub user: String,
    /// Mean over rated menus; 0 when nothing is rated
    pub average: f64,
    pub top: Vec<(String, u8)>,
    /// Lowest scores first
    pub bottom: Vec<(String, u8)>,
    /// Menus given the maximum score
    pub favorites: Vec<String>,
    /// Food category → number of favorites, most frequent first
    pub favorite_categories: Vec<(String, usize)>,
    /// Attribute value counts among favorites, per attribute category
    pub favorite_attributes: BTreeMap<AttributeCategory, Vec<(String, usize)>>,
}

fn owned(items: &[(&str, u8)]) -> Vec<(String, u8)> {
    items.iter().map(|(m, s)| (m.to_string(), *s)).collect()
}

fn sorted_counts(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Summary of one user's answers, in survey order
pub fn preference_summary(
    user: &str,
    preferences: &PreferenceTable,
    menus: &MenuTable,
) -> Result<PreferenceSummary> {
    let found = preferences
        .get_user(user)
        .ok_or_else(|| RecommendError::UserNotFound {
            names: vec![user.to_string()],
        })?;

    let rated: Vec<(&str, u8)> = preferences
        .menus()
        .iter()
        .zip(found.scores.iter().copied())
        .filter_map(|(menu, score)| score.map(|s| (menu.as_str(), s)))
        .collect();

    let scores: Vec<f64> = rated.iter().map(|(_, s)| f64::from(*s)).collect();
    let average = mean(&scores).unwrap_or(0.0);

    let mut ranked = rated.clone();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top = owned(&ranked[..ranked.len().min(SUMMARY_LIST_LEN)]);
    // Lowest first; ties keep survey order
    let mut ascending = rated.clone();
    ascending.sort_by_key(|&(_, score)| score);
    let bottom = owned(&ascending[..ascending.len().min(SUMMARY_LIST_LEN)]);

    let favorites: Vec<String> = rated
        .iter()
        .filter(|(_, s)| *s == MAX_SCORE)
        .map(|(m, _)| m.to_string())
        .collect();

    let mut category_counts: HashMap<String, usize> = HashMap::new();
    let mut attribute_counts: BTreeMap<AttributeCategory, HashMap<String, usize>> = BTreeMap::new();
    for menu in favorites.iter().filter_map(|name| menus.get_menu(name)) {
        *category_counts.entry(menu.category.clone()).or_insert(0) += 1;
        for (i, column) in menus.schema().columns().iter().enumerate() {
            if menu.has_attribute(i) {
                *attribute_counts
                    .entry(column.category)
                    .or_default()
                    .entry(column.value.clone())
                    .or_insert(0) += 1;
            }
        }
    }

    Ok(PreferenceSummary {
        user: found.name.clone(),
        average,
        top,
        bottom,
        favorites,
        favorite_categories: sorted_counts(category_counts),
        favorite_attributes: attribute_counts
            .into_iter()
            .map(|(category, counts)| (category, sorted_counts(counts)))
            .collect(),
    })
}

// =============================================================================
// Category preferences
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPreferences {
    pub user: String,
    /// Mean score per food category, highest first
    pub by_category: Vec<(String, f64)>,
    /// Mean score per flavor, highest first
    pub by_flavor: Vec<(String, f64)>,
    /// Mean score per cooking method, highest first
    pub by_cooking_method: Vec<(String, f64)>,
}

/// Running (sum, count) per key, remembering first-seen order for ties
#[derive(Default)]
struct MeanAccumulator {
    order: Vec<String>,
    totals: HashMap<String, (f64, usize)>,
}

impl MeanAccumulator {
    fn add(&mut self, key: &str, score: u8) {
        let entry = self.totals.entry(key.to_string()).or_insert_with(|| {
            self.order.push(key.to_string());
            (0.0, 0)
        });
        entry.0 += f64::from(score);
        entry.1 += 1;
    }

    fn into_sorted(self) -> Vec<(String, f64)> {
        let totals = self.totals;
        let mut means: Vec<(String, f64)> = self
            .order
            .into_iter()
            .map(|key| {
                let (sum, count) = totals[&key];
                (key, sum / count as f64)
            })
            .collect();
        means.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        means
    }
}

/// Mean score per menu category and per flavor / cooking-method value
pub fn category_preferences(
    user: &str,
    preferences: &PreferenceTable,
    menus: &MenuTable,
) -> Result<CategoryPreferences> {
    let found = preferences
        .get_user(user)
        .ok_or_else(|| RecommendError::UserNotFound {
            names: vec![user.to_string()],
        })?;

    let mut by_category = MeanAccumulator::default();
    let mut by_flavor = MeanAccumulator::default();
    let mut by_cooking = MeanAccumulator::default();

    for (menu, score) in rated_menus(found, preferences, menus) {
        by_category.add(&menu.category, score);
        for (i, column) in menus.schema().columns().iter().enumerate() {
            if !menu.has_attribute(i) {
                continue;
            }
            match column.category {
                AttributeCategory::FlavorProfile => by_flavor.add(&column.value, score),
                AttributeCategory::CookingMethod => by_cooking.add(&column.value, score),
                _ => {}
            }
        }
    }

    Ok(CategoryPreferences {
        user: found.name.clone(),
        by_category: by_category.into_sorted(),
        by_flavor: by_flavor.into_sorted(),
        by_cooking_method: by_cooking.into_sorted(),
    })
}

// =============================================================================
// Group summary
// =============================================================================

/// A menu the group rates highly on average
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPick {
    pub menu: String,
    pub mean_score: f64,
    pub category: String,
    pub simple: bool,
}

/// Menus whose mean score over the found members exceeds `threshold`.
///
/// Missing ratings are left out of each mean. Results are sorted by mean,
/// descending, ties in menu order, and cut to `top_n`.
#[instrument(skip(preferences, menus, names), fields(requested = names.len()))]
pub fn group_summary<S: AsRef<str>>(
    names: &[S],
    preferences: &PreferenceTable,
    menus: &MenuTable,
    threshold: f64,
    top_n: usize,
) -> Result<Vec<GroupPick>> {
    let users = resolve_users(preferences, names)?;

    let mut picks: Vec<GroupPick> = menus
        .menus()
        .iter()
        .filter_map(|menu| {
            let column = preferences.menu_position(&menu.name)?;
            let rated: Vec<f64> = users
                .iter()
                .filter_map(|u| u.scores[column])
                .map(f64::from)
                .collect();
            let mean_score = mean(&rated)?;
            (mean_score > threshold).then(|| GroupPick {
                menu: menu.name.clone(),
                mean_score,
                category: menu.category.clone(),
                simple: menu.simple,
            })
        })
        .collect();

    picks.sort_by(|a, b| {
        b.mean_score
            .partial_cmp(&a.mean_score)
            .unwrap_or(Ordering::Equal)
    });
    picks.truncate(top_n);
    Ok(picks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::AttributeSchema;

    fn create_test_menus() -> MenuTable {
        let schema = AttributeSchema::from_names([
            "주재료_돼지고기",
            "맛 프로파일_매운맛",
            "맛 프로파일_담백한맛",
            "조리 방식_끓이기",
        ])
        .unwrap();
        let mut table = MenuTable::new(schema);
        for (name, category, simple, attributes) in [
            ("김치찌개", "한식", false, vec![1, 1, 0, 1]),
            ("떡볶이", "분식", true, vec![0, 1, 0, 0]),
            ("수육", "한식", false, vec![1, 0, 1, 1]),
            ("라멘", "일식", false, vec![1, 0, 1, 1]),
        ] {
            table
                .insert_menu(Menu {
                    name: name.to_string(),
                    category: category.to_string(),
                    simple,
                    attributes,
                })
                .unwrap();
        }
        table
    }

    fn create_test_preferences() -> PreferenceTable {
        let menus = ["김치찌개", "떡볶이", "수육", "라멘"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut table = PreferenceTable::new(menus).unwrap();
        table
            .insert_user("연누", vec![Some(4), Some(4), Some(1), None])
            .unwrap();
        table
            .insert_user("민수", vec![Some(2), Some(3), Some(4), Some(4)])
            .unwrap();
        table.insert_user("무응답", vec![None, None, None, None]).unwrap();
        table
    }

    #[test]
    fn test_taste_profile_fractions() {
        let profile =
            taste_profile("연누", &create_test_preferences(), &create_test_menus(), 3).unwrap();
        // liked: 김치찌개 and 떡볶이
        assert_eq!(profile.get("맛 프로파일_매운맛"), Some(1.0));
        assert_eq!(profile.get("주재료_돼지고기"), Some(0.5));
        assert_eq!(profile.get("맛 프로파일_담백한맛"), Some(0.0));
        assert_eq!(profile.strongest(1), vec![("맛 프로파일_매운맛", 1.0)]);
    }

    #[test]
    fn test_taste_profile_no_likes_is_zero() {
        let profile =
            taste_profile("무응답", &create_test_preferences(), &create_test_menus(), 3).unwrap();
        assert!(profile.values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_taste_profiles_skip_unknown() {
        let profiles = taste_profiles(
            &["민수", "nobody", "연누"],
            &create_test_preferences(),
            &create_test_menus(),
            3,
        )
        .unwrap();
        let users: Vec<&str> = profiles.iter().map(|p| p.user.as_str()).collect();
        assert_eq!(users, vec!["민수", "연누"]);
    }

    #[test]
    fn test_analyze_user() {
        let analysis =
            analyze_user("민수", &create_test_preferences(), &create_test_menus(), 3, 2).unwrap();
        assert_eq!(analysis.favorite_menus, vec!["떡볶이", "수육"]);
        assert_eq!(analysis.disliked_menus, vec!["김치찌개"]);
        assert_eq!(analysis.disliked_attributes.get("맛 프로파일_매운맛"), Some(1.0));
        assert!(analyze_user("nobody", &create_test_preferences(), &create_test_menus(), 3, 2).is_err());
    }

    #[test]
    fn test_preference_summary() {
        let summary =
            preference_summary("민수", &create_test_preferences(), &create_test_menus()).unwrap();
        assert!((summary.average - 3.25).abs() < 1e-12);
        assert_eq!(summary.top[0], ("수육".to_string(), 4));
        assert_eq!(summary.top[1], ("라멘".to_string(), 4));
        assert_eq!(
            summary.bottom,
            vec![
                ("김치찌개".to_string(), 2),
                ("떡볶이".to_string(), 3),
                ("수육".to_string(), 4),
                ("라멘".to_string(), 4),
            ]
        );
        assert_eq!(summary.favorites, vec!["수육", "라멘"]);
        assert_eq!(
            summary.favorite_categories,
            vec![("일식".to_string(), 1), ("한식".to_string(), 1)]
        );
        let flavors = &summary.favorite_attributes[&AttributeCategory::FlavorProfile];
        assert_eq!(flavors, &vec![("담백한맛".to_string(), 2)]);
    }

    #[test]
    fn test_preference_summary_nothing_rated() {
        let summary =
            preference_summary("무응답", &create_test_preferences(), &create_test_menus()).unwrap();
        assert_eq!(summary.average, 0.0);
        assert!(summary.top.is_empty());
        assert!(summary.bottom.is_empty());
        assert!(summary.favorites.is_empty());
    }

    #[test]
    fn test_category_preferences() {
        let prefs =
            category_preferences("연누", &create_test_preferences(), &create_test_menus()).unwrap();
        assert_eq!(prefs.by_category[0], ("분식".to_string(), 4.0));
        assert_eq!(prefs.by_category[1], ("한식".to_string(), 2.5));
        assert_eq!(prefs.by_flavor[0], ("매운맛".to_string(), 4.0));
        assert_eq!(prefs.by_cooking_method, vec![("끓이기".to_string(), 2.5)]);
    }

    #[test]
    fn test_group_summary() {
        let picks = group_summary(
            &["연누", "민수"],
            &create_test_preferences(),
            &create_test_menus(),
            2.5,
            10,
        )
        .unwrap();
        let names: Vec<&str> = picks.iter().map(|p| p.menu.as_str()).collect();
        // 라멘 4.0 (only 민수), 떡볶이 3.5, 김치찌개 3.0, 수육 2.5 excluded
        assert_eq!(names, vec!["라멘", "떡볶이", "김치찌개"]);
        assert!(picks[1].simple);
        assert_eq!(picks[0].category, "일식");

        assert!(matches!(
            group_summary(&["x"], &create_test_preferences(), &create_test_menus(), 2.5, 10),
            Err(RecommendError::UserNotFound { .. })
        ));
    }
}
