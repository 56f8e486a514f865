//! Errors raised at the recommender's operation boundary.

use data_loader::DataLoadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommendError {
    /// None of the requested users exist in the preference table
    #[error("None of the requested users were found: {names:?}")]
    UserNotFound { names: Vec<String> },

    /// The menu details and the survey share no menu identifier
    #[error(
        "No menu appears in both datasets ({} menus with details, {} surveyed menus)",
        .menu_names.len(),
        .preference_names.len()
    )]
    EmptyIntersection {
        menu_names: Vec<String>,
        preference_names: Vec<String>,
    },

    /// A taste profile and the menu attributes share no column
    #[error("Taste profile and menu attributes have no column in common")]
    NoOverlap,

    /// Nobody in the group rated any menu at or above the liked threshold
    #[error("No menu rated {threshold} or higher by {users:?}")]
    NoPreference { users: Vec<String>, threshold: u8 },

    /// A menu name that is not part of the correlation matrix or menu table
    #[error("Unknown menu: {menu}")]
    MenuNotFound { menu: String },

    /// Policy values outside their valid range
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// Structural problem in otherwise loaded data
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// Loading or validation failed
    #[error(transparent)]
    Data(#[from] DataLoadError),
}

pub type Result<T> = std::result::Result<T, RecommendError>;
