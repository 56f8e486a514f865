//! # Data Loader Crate
//!
//! This crate loads and validates the menu survey dataset.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Menu, MenuTable, PreferenceTable, CorrelationMatrix)
//! - **parser**: Parse the CSV files into Rust structs
//! - **index**: Assemble a [`Dataset`] and expand raw menu details
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{Dataset, MenuSource};
//! use std::path::Path;
//!
//! let dataset = Dataset::load_from_files(
//!     Path::new("data/processed_menu_details.csv"),
//!     Path::new("data/processed_user_data.csv"),
//!     MenuSource::Processed,
//! )?;
//!
//! let score = dataset.preferences.score("연누", "김치찌개");
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod index;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use index::{Dataset, MenuSource, expand_menu_details};
pub use types::{
    AttributeCategory,
    AttributeColumn,
    AttributeSchema,
    CorrelationMatrix,
    Menu,
    MenuTable,
    PreferenceTable,
    UserPreferences,
    MAX_SCORE,
    MIN_SCORE,
};
