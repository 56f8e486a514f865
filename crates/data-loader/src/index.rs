//! Dataset assembly: loading both survey files and expanding raw menu details.
//!
//! - [`Dataset::load_from_files`] parses the menu and preference files in
//!   parallel and validates the result
//! - [`expand_menu_details`] turns free-text attribute fields into the
//!   explicit one-hot [`AttributeSchema`] layout

use crate::error::{DataLoadError, Result};
use crate::parser::{self, RawMenuDetail};
use crate::types::*;
use std::path::Path;
use tracing::{info, warn};

/// Where the menu attributes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuSource {
    /// Already expanded `<category>_<value>` 0/1 columns
    Processed,
    /// Multi-valued text fields that need expanding
    Raw,
}

/// Both tables of one run, loaded once and passed around explicitly
#[derive(Debug, Clone)]
pub struct Dataset {
    pub menus: MenuTable,
    pub preferences: PreferenceTable,
}

impl Dataset {
    /// Load the menu details and the preference survey
    ///
    /// Steps:
    /// 1. Parse both files in parallel
    /// 2. Expand raw menu details if needed
    /// 3. Validate
    pub fn load_from_files(menu_path: &Path, user_path: &Path, source: MenuSource) -> Result<Self> {
        info!("Loading menus from {:?} and preferences from {:?}", menu_path, user_path);

        let (menus, preferences) = rayon::join(
            || match source {
                MenuSource::Processed => parser::parse_menu_table(menu_path),
                MenuSource::Raw => {
                    parser::parse_raw_menu_details(menu_path).and_then(|raw| expand_menu_details(&raw))
                }
            },
            || parser::parse_preference_table(user_path),
        );
        let dataset = Dataset {
            menus: menus?,
            preferences: preferences?,
        };

        let (users, columns, ratings) = dataset.preferences.counts();
        info!(
            "Loaded {} menus ({} attributes), {} users, {} menu columns, {} ratings",
            dataset.menus.len(),
            dataset.menus.schema().len(),
            users,
            columns,
            ratings
        );

        dataset.validate()?;
        Ok(dataset)
    }

    /// Check the tables are usable
    ///
    /// Both tables must be non-empty. Survey menus without details are only
    /// reported; the aligner drops them later.
    pub fn validate(&self) -> Result<()> {
        if self.menus.is_empty() {
            return Err(DataLoadError::ValidationError("menu table has no rows".to_string()));
        }
        if self.preferences.users().is_empty() {
            return Err(DataLoadError::ValidationError(
                "preference table has no users".to_string(),
            ));
        }
        let missing: Vec<&str> = self
            .preferences
            .menus()
            .iter()
            .map(String::as_str)
            .filter(|m| self.menus.get_menu(m).is_none())
            .collect();
        if !missing.is_empty() {
            warn!(
                "{} surveyed menus have no details and will be excluded: {:?}",
                missing.len(),
                missing
            );
        }
        Ok(())
    }
}

/// One-hot expand raw menu details
///
/// Every distinct token of a category's field becomes a column
/// `<field>_<token>`; categories keep taxonomy order and tokens are sorted
/// within a category. A menu gets 1 only when the token is one of its own
/// tokens.
pub fn expand_menu_details(raw: &[RawMenuDetail]) -> Result<MenuTable> {
    let tokenized: Vec<Vec<(AttributeCategory, Vec<String>)>> = raw
        .iter()
        .map(|detail| {
            detail
                .fields
                .iter()
                .map(|(&category, text)| (category, parser::split_features(text)))
                .collect()
        })
        .collect();

    let mut names = Vec::new();
    for category in AttributeCategory::ALL {
        let mut values: Vec<&str> = tokenized
            .iter()
            .flatten()
            .filter(|(c, _)| *c == category)
            .flat_map(|(_, tokens)| tokens.iter().map(String::as_str))
            .collect();
        values.sort_unstable();
        values.dedup();
        names.extend(values.into_iter().map(|v| format!("{}_{}", category.raw_field(), v)));
    }
    let schema = AttributeSchema::from_names(&names)?;

    let mut table = MenuTable::new(schema.clone());
    for (detail, tokens) in raw.iter().zip(&tokenized) {
        let attributes = schema
            .columns()
            .iter()
            .map(|column| {
                let present = tokens
                    .iter()
                    .any(|(c, t)| *c == column.category && t.iter().any(|v| *v == column.value));
                present as u8
            })
            .collect();
        table.insert_menu(Menu {
            name: detail.name.clone(),
            category: detail.category.clone(),
            simple: detail.simple,
            attributes,
        })?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_raw_menu_details_from_str;
    use std::fs;

    fn raw_details() -> Vec<RawMenuDetail> {
        let content = "메뉴,간편성,분류,주재료,맛 프로파일\n\
                       김치찌개,0,한식,돼지고기+김치,매운맛\n\
                       돼지김치볶음,0,한식,돼지고기+김치,매운맛/짠맛\n\
                       새우튀김,1,일식,새우,고소한맛\n";
        parse_raw_menu_details_from_str(content).unwrap()
    }

    #[test]
    fn test_expand_menu_details_columns() {
        let table = expand_menu_details(&raw_details()).unwrap();
        let names: Vec<&str> = table.schema().names().collect();
        assert_eq!(
            names,
            vec![
                "주재료_김치",
                "주재료_돼지고기",
                "주재료_새우",
                "맛 프로파일_고소한맛",
                "맛 프로파일_매운맛",
                "맛 프로파일_짠맛",
            ]
        );
    }

    #[test]
    fn test_expand_menu_details_exact_tokens() {
        let table = expand_menu_details(&raw_details()).unwrap();
        assert_eq!(table.get_menu("김치찌개").unwrap().attributes, vec![1, 1, 0, 0, 1, 0]);
        assert_eq!(table.get_menu("돼지김치볶음").unwrap().attributes, vec![1, 1, 0, 0, 1, 1]);
        let shrimp = table.get_menu("새우튀김").unwrap();
        assert_eq!(shrimp.attributes, vec![0, 0, 1, 1, 0, 0]);
        assert!(shrimp.simple);
    }

    #[test]
    fn test_load_from_files() {
        let dir = std::env::temp_dir().join(format!("data-loader-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let menu_path = dir.join("menu_details.csv");
        let user_path = dir.join("user_data.csv");
        fs::write(
            &menu_path,
            "메뉴,간편성,분류,주재료_돼지고기\n김치찌개,0,한식,1\n떡볶이,1,분식,0\n",
        )
        .unwrap();
        fs::write(&user_path, "이름,김치찌개,짜장면\n연누,4,3\n").unwrap();

        let dataset = Dataset::load_from_files(&menu_path, &user_path, MenuSource::Processed).unwrap();
        assert_eq!(dataset.menus.len(), 2);
        assert_eq!(dataset.preferences.counts(), (1, 2, 2));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_validate_rejects_empty_preferences() {
        let mut menus = MenuTable::new(AttributeSchema::default());
        menus
            .insert_menu(Menu {
                name: "김치찌개".to_string(),
                category: "한식".to_string(),
                simple: false,
                attributes: vec![],
            })
            .unwrap();
        let dataset = Dataset {
            menus,
            preferences: PreferenceTable::new(vec!["김치찌개".to_string()]).unwrap(),
        };
        assert!(matches!(dataset.validate(), Err(DataLoadError::ValidationError(_))));
    }
}
