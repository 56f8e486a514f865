//! Menu identifier alignment between the details table and the survey.
//!
//! The two files are maintained by hand and drift apart in spacing, casing
//! and punctuation ("김치 찌개" vs "김치찌개"). Both sides are reduced to a
//! normalized key, intersected, and filtered. Surviving survey columns adopt
//! the menu table's spelling.

use crate::error::{RecommendError, Result};
use data_loader::{MenuTable, PreferenceTable};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Trim, case-fold and keep only alphanumeric characters (Hangul included)
pub fn normalize_menu_key(name: &str) -> String {
    name.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Key → original spelling; fails when two names collapse onto one key
fn key_map<'a>(names: impl Iterator<Item = &'a str>, side: &str) -> Result<HashMap<String, &'a str>> {
    let mut keys: HashMap<String, &'a str> = HashMap::new();
    for name in names {
        let key = normalize_menu_key(name);
        if key.is_empty() {
            debug!("Ignoring {} menu '{}' with an empty normalized key", side, name);
            continue;
        }
        if let Some(previous) = keys.insert(key, name) {
            return Err(RecommendError::MalformedData(format!(
                "{} menus '{}' and '{}' normalize to the same identifier",
                side, previous, name
            )));
        }
    }
    Ok(keys)
}

/// Restrict both tables to the menus they share.
///
/// Row order is preserved on both sides. Menus present on only one side are
/// dropped, never imputed.
#[instrument(skip_all, fields(menus = menus.len(), surveyed = preferences.menus().len()))]
pub fn align(menus: &MenuTable, preferences: &PreferenceTable) -> Result<(MenuTable, PreferenceTable)> {
    let menu_keys = key_map(menus.menu_names(), "detail")?;
    let preference_keys = key_map(preferences.menus().iter().map(String::as_str), "survey")?;

    let shared: HashSet<&String> = menu_keys
        .keys()
        .filter(|key| preference_keys.contains_key(*key))
        .collect();

    if shared.is_empty() {
        return Err(RecommendError::EmptyIntersection {
            menu_names: menus.menu_names().map(str::to_string).collect(),
            preference_names: preferences.menus().to_vec(),
        });
    }

    let aligned_menus = menus.filtered(|menu| shared.contains(&normalize_menu_key(&menu.name)));

    let columns: Vec<(usize, String)> = preferences
        .menus()
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let canonical = menu_keys.get(&normalize_menu_key(name))?;
            Some((i, canonical.to_string()))
        })
        .collect();
    let aligned_preferences = preferences.select_columns(&columns)?;

    info!(
        "Aligned {} menus ({} detail-only, {} survey-only dropped)",
        shared.len(),
        menus.len() - aligned_menus.len(),
        preferences.menus().len() - columns.len()
    );
    Ok((aligned_menus, aligned_preferences))
}
