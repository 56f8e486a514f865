//! Core domain types for the menu survey dataset.
//!
//! Two tables come out of the loader:
//! - [`MenuTable`]: one row per menu with its category, simplicity flag and
//!   a binary attribute vector laid out by an [`AttributeSchema`]
//! - [`PreferenceTable`]: one row per user, one column per menu, scores 1..=4
//!   or missing
//!
//! A third structure, [`CorrelationMatrix`], is produced by the recommender
//! (or read back from disk) and lives here so the parser can load it.

use crate::error::{DataLoadError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Lowest score a survey answer maps to ("싫어함")
pub const MIN_SCORE: u8 = 1;

/// Highest score a survey answer maps to ("환장함")
pub const MAX_SCORE: u8 = 4;

// =============================================================================
// Attribute schema
// =============================================================================

/// The fixed taxonomy attribute columns are grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeCategory {
    MainIngredient,
    FlavorProfile,
    MealContext,
    CookingMethod,
    Season,
}

impl AttributeCategory {
    pub const ALL: [AttributeCategory; 5] = [
        AttributeCategory::MainIngredient,
        AttributeCategory::FlavorProfile,
        AttributeCategory::MealContext,
        AttributeCategory::CookingMethod,
        AttributeCategory::Season,
    ];

    /// Column prefixes (Korean survey headers and English aliases) per category
    const PREFIXES: [(&'static str, AttributeCategory); 19] = [
        ("주재료", AttributeCategory::MainIngredient),
        ("재료", AttributeCategory::MainIngredient),
        ("ingredient", AttributeCategory::MainIngredient),
        ("main_ingredient", AttributeCategory::MainIngredient),
        ("맛 프로파일", AttributeCategory::FlavorProfile),
        ("맛", AttributeCategory::FlavorProfile),
        ("flavor", AttributeCategory::FlavorProfile),
        ("flavor_profile", AttributeCategory::FlavorProfile),
        ("식사 타입/상황", AttributeCategory::MealContext),
        ("식사상황", AttributeCategory::MealContext),
        ("meal", AttributeCategory::MealContext),
        ("meal_context", AttributeCategory::MealContext),
        ("조리 방식", AttributeCategory::CookingMethod),
        ("조리방식", AttributeCategory::CookingMethod),
        ("cooking", AttributeCategory::CookingMethod),
        ("cooking_method", AttributeCategory::CookingMethod),
        ("계절/날씨", AttributeCategory::Season),
        ("계절", AttributeCategory::Season),
        ("season", AttributeCategory::Season),
    ];

    /// Map a column prefix (Korean survey header or English alias) to a category
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        let prefix = prefix.trim();
        Self::PREFIXES
            .iter()
            .find(|(alias, _)| *alias == prefix)
            .map(|(_, category)| *category)
    }

    /// Split a `<prefix>_<value>` header on the longest known prefix.
    ///
    /// English aliases contain `_` themselves, so the first underscore is not
    /// a reliable separator.
    pub fn split_header(header: &str) -> Option<(Self, &str)> {
        Self::PREFIXES
            .iter()
            .filter_map(|(alias, category)| {
                let value = header.strip_prefix(alias)?.strip_prefix('_')?;
                Some((alias.len(), *category, value))
            })
            .max_by_key(|(len, _, _)| *len)
            .map(|(_, category, value)| (category, value))
    }

    /// Header of the multi-valued text field in the raw menu details file
    pub fn raw_field(self) -> &'static str {
        match self {
            Self::MainIngredient => "주재료",
            Self::FlavorProfile => "맛 프로파일",
            Self::MealContext => "식사 타입/상황",
            Self::CookingMethod => "조리 방식",
            Self::Season => "계절/날씨",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MainIngredient => "main ingredient",
            Self::FlavorProfile => "flavor profile",
            Self::MealContext => "meal context",
            Self::CookingMethod => "cooking method",
            Self::Season => "season",
        }
    }
}

/// One one-hot attribute column, e.g. `맛 프로파일_매운맛`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeColumn {
    /// Full header text
    pub name: String,
    pub category: AttributeCategory,
    /// The part after the category prefix
    pub value: String,
}

impl AttributeColumn {
    /// Parse a `<prefix>_<value>` header against the known taxonomy
    pub fn parse(name: &str) -> Result<Self> {
        let unknown = || DataLoadError::UnknownAttributeCategory {
            column: name.to_string(),
        };
        let (category, value) = AttributeCategory::split_header(name.trim()).ok_or_else(unknown)?;
        if value.trim().is_empty() {
            return Err(unknown());
        }
        Ok(Self {
            name: name.to_string(),
            category,
            value: value.trim().to_string(),
        })
    }
}

/// Explicit category → columns layout of a menu table's attribute vectors.
///
/// Built and validated once at load time; the position of a column in the
/// schema is its index in every [`Menu::attributes`] vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    columns: Vec<AttributeColumn>,
}

impl AttributeSchema {
    /// Build a schema from header names, rejecting unknown prefixes and duplicates
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns: Vec<AttributeColumn> = Vec::new();
        for name in names {
            let column = AttributeColumn::parse(name.as_ref())?;
            if columns.iter().any(|c| c.name == column.name) {
                return Err(DataLoadError::InvalidValue {
                    field: "attribute column".to_string(),
                    value: format!("duplicate '{}'", column.name),
                });
            }
            columns.push(column);
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[AttributeColumn] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Columns grouped by category, in schema order within each group
    pub fn groups(&self) -> BTreeMap<AttributeCategory, Vec<&str>> {
        let mut groups: BTreeMap<AttributeCategory, Vec<&str>> = BTreeMap::new();
        for column in &self.columns {
            groups
                .entry(column.category)
                .or_default()
                .push(column.name.as_str());
        }
        groups
    }

    /// Indices and columns belonging to one category
    pub fn columns_in(
        &self,
        category: AttributeCategory,
    ) -> impl Iterator<Item = (usize, &AttributeColumn)> {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.category == category)
    }
}

// =============================================================================
// Menus
// =============================================================================

/// A menu with its descriptive metadata and one-hot attribute vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub name: String,
    /// Food category label ("분류"), e.g. 한식
    pub category: String,
    /// Simplicity flag ("간편성")
    pub simple: bool,
    /// 0/1 indicators, indexed like the owning table's schema
    pub attributes: Vec<u8>,
}

impl Menu {
    pub fn has_attribute(&self, index: usize) -> bool {
        self.attributes.get(index).is_some_and(|&v| v == 1)
    }
}

/// All menus of a run, in file order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MenuTable {
    schema: AttributeSchema,
    menus: Vec<Menu>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl MenuTable {
    /// Creates an empty table over the given attribute layout
    pub fn new(schema: AttributeSchema) -> Self {
        Self {
            schema,
            menus: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a menu, checking vector width, binary cells and name uniqueness
    pub fn insert_menu(&mut self, menu: Menu) -> Result<()> {
        if menu.attributes.len() != self.schema.len() {
            return Err(DataLoadError::InvalidValue {
                field: format!("attributes of '{}'", menu.name),
                value: format!(
                    "{} cells for {} columns",
                    menu.attributes.len(),
                    self.schema.len()
                ),
            });
        }
        if let Some(&bad) = menu.attributes.iter().find(|&&v| v > 1) {
            return Err(DataLoadError::InvalidValue {
                field: format!("attributes of '{}'", menu.name),
                value: bad.to_string(),
            });
        }
        if self.index.contains_key(&menu.name) {
            return Err(DataLoadError::DuplicateMenu { menu: menu.name });
        }
        self.index.insert(menu.name.clone(), self.menus.len());
        self.menus.push(menu);
        Ok(())
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    pub fn menus(&self) -> &[Menu] {
        &self.menus
    }

    pub fn get_menu(&self, name: &str) -> Option<&Menu> {
        self.index.get(name).map(|&i| &self.menus[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn menu_names(&self) -> impl Iterator<Item = &str> {
        self.menus.iter().map(|m| m.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    /// Copy of the table keeping only menus accepted by `keep`, order preserved
    pub fn filtered<F>(&self, keep: F) -> MenuTable
    where
        F: Fn(&Menu) -> bool,
    {
        let mut table = MenuTable::new(self.schema.clone());
        for menu in self.menus.iter().filter(|m| keep(m)) {
            table.index.insert(menu.name.clone(), table.menus.len());
            table.menus.push(menu.clone());
        }
        table
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// One survey respondent and their scores, aligned with the table's menu columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub name: String,
    pub scores: Vec<Option<u8>>,
}

impl UserPreferences {
    /// Number of menus this user actually rated
    pub fn rated_count(&self) -> usize {
        self.scores.iter().filter(|s| s.is_some()).count()
    }
}

/// Survey results: user rows × menu columns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreferenceTable {
    menus: Vec<String>,
    users: Vec<UserPreferences>,
    #[serde(skip)]
    menu_index: HashMap<String, usize>,
}

impl PreferenceTable {
    /// Creates a table with the given menu columns and no users
    pub fn new(menus: Vec<String>) -> Result<Self> {
        let mut menu_index = HashMap::with_capacity(menus.len());
        for (i, menu) in menus.iter().enumerate() {
            if menu_index.insert(menu.clone(), i).is_some() {
                return Err(DataLoadError::DuplicateMenu { menu: menu.clone() });
            }
        }
        Ok(Self {
            menus,
            users: Vec::new(),
            menu_index,
        })
    }

    /// Add a user row; scores must line up with the menu columns and lie in 1..=4
    pub fn insert_user(&mut self, name: impl Into<String>, scores: Vec<Option<u8>>) -> Result<()> {
        let name = name.into();
        if scores.len() != self.menus.len() {
            return Err(DataLoadError::InvalidValue {
                field: format!("scores of '{}'", name),
                value: format!("{} cells for {} menus", scores.len(), self.menus.len()),
            });
        }
        for (menu, score) in self.menus.iter().zip(&scores) {
            if let Some(s) = *score {
                if !(MIN_SCORE..=MAX_SCORE).contains(&s) {
                    return Err(DataLoadError::ScoreOutOfRange {
                        user: name,
                        menu: menu.clone(),
                        score: s as i64,
                    });
                }
            }
        }
        if self.users.iter().any(|u| u.name == name) {
            return Err(DataLoadError::DuplicateUser { user: name });
        }
        self.users.push(UserPreferences { name, scores });
        Ok(())
    }

    pub fn menus(&self) -> &[String] {
        &self.menus
    }

    pub fn users(&self) -> &[UserPreferences] {
        &self.users
    }

    pub fn get_user(&self, name: &str) -> Option<&UserPreferences> {
        self.users.iter().find(|u| u.name == name)
    }

    pub fn menu_position(&self, menu: &str) -> Option<usize> {
        self.menu_index.get(menu).copied()
    }

    /// Score a user gave a menu; `None` when either is unknown or unrated
    pub fn score(&self, user: &str, menu: &str) -> Option<u8> {
        let column = self.menu_position(menu)?;
        self.get_user(user)?.scores[column]
    }

    /// Copy of the table keeping the listed `(column, new_name)` pairs in order
    ///
    /// Used by the aligner to drop unmatched menus and adopt canonical names.
    pub fn select_columns(&self, columns: &[(usize, String)]) -> Result<PreferenceTable> {
        let menus = columns.iter().map(|(_, name)| name.clone()).collect();
        let mut table = PreferenceTable::new(menus)?;
        for user in &self.users {
            let scores = columns.iter().map(|&(i, _)| user.scores[i]).collect();
            table.users.push(UserPreferences {
                name: user.name.clone(),
                scores,
            });
        }
        Ok(table)
    }

    /// (users, menus, non-missing ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        let ratings = self.users.iter().map(UserPreferences::rated_count).sum();
        (self.users.len(), self.menus.len(), ratings)
    }
}

// =============================================================================
// Correlation matrix
// =============================================================================

/// Symmetric menu × menu similarity matrix, row-major.
///
/// NaN cells (possible when read from a file) mean "no relation" and are
/// reported as `None` by [`CorrelationMatrix::get`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    menus: Vec<String>,
    values: Vec<f64>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl CorrelationMatrix {
    /// Assemble a matrix from labels and `n * n` row-major values
    pub fn from_parts(menus: Vec<String>, values: Vec<f64>) -> Result<Self> {
        let n = menus.len();
        if values.len() != n * n {
            return Err(DataLoadError::MatrixShape(format!(
                "{} values for {} menus",
                values.len(),
                n
            )));
        }
        let mut index = HashMap::with_capacity(n);
        for (i, menu) in menus.iter().enumerate() {
            if index.insert(menu.clone(), i).is_some() {
                return Err(DataLoadError::DuplicateMenu { menu: menu.clone() });
            }
        }
        Ok(Self {
            menus,
            values,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    pub fn menus(&self) -> &[String] {
        &self.menus
    }

    pub fn position(&self, menu: &str) -> Option<usize> {
        self.index.get(menu).copied()
    }

    /// Similarity of menus `i` and `j`; `None` for NaN cells
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let value = self.values[i * self.menus.len() + j];
        (!value.is_nan()).then_some(value)
    }

    pub fn get_by_name(&self, a: &str, b: &str) -> Option<f64> {
        self.get(self.position(a)?, self.position(b)?)
    }

    /// Raw row, NaN cells included
    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.menus.len();
        &self.values[i * n..(i + 1) * n]
    }
}
