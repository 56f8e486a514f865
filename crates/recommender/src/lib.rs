//! # Recommender Crate
//!
//! Taste profiling and menu recommendation over the survey dataset.
//!
//! ## Components
//!
//! ### Aligner
//! Normalizes menu names on both datasets and keeps only the shared menus.
//!
//! ### Correlation Builder
//! Menu × menu cosine similarity of attribute vectors, computed row-parallel.
//!
//! ### Content-based Recommender
//! Averages the group's taste profiles and ranks menus by cosine similarity
//! to that vector.
//!
//! ### Collaborative Recommender
//! Blends correlation to the group's liked menus (damped by a diversity
//! penalty) with the group's raw preference average, and explains each pick
//! with the liked menus it resembles.
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{Dataset, MenuSource};
//! use recommender::{align, build_correlation_matrix, CollaborativeRecommender};
//! use std::sync::Arc;
//!
//! let dataset = Dataset::load_from_files(menu_path, user_path, MenuSource::Processed)?;
//! let (menus, preferences) = align(&dataset.menus, &dataset.preferences)?;
//! let matrix = build_correlation_matrix(&menus)?;
//!
//! let recommender = CollaborativeRecommender::new(Arc::new(preferences), Arc::new(matrix));
//! for rec in recommender.recommend(&["연누", "민수"], 5)? {
//!     println!("{} {:.2} {}", rec.menu, rec.score, rec.reason_text());
//! }
//! ```

pub mod align;
pub mod collaborative;
pub mod content;
pub mod context;
pub mod correlation;
pub mod error;
pub mod explore;
pub mod filters;
pub mod math;
pub mod policy;
pub mod profile;
pub mod types;

pub use align::{align, normalize_menu_key};
pub use collaborative::{recommend_collaborative, CollaborativeRecommender};
pub use content::{recommend_content_based, ContentRecommender};
pub use context::{build_group_context, GroupContext};
pub use correlation::{build_correlation_matrix, matrix_matches_menus, most_similar};
pub use error::{RecommendError, Result};
pub use explore::exploratory_picks;
pub use filters::{Filter, FilterPipeline, LikedMenuFilter, MinimumPreferenceFilter};
pub use policy::{MissingScorePolicy, RecommendPolicy};
pub use profile::{
    analyze_user, category_preferences, group_summary, preference_summary, taste_profile,
    taste_profiles, CategoryPreferences, GroupPick, PreferenceSummary, TasteProfile, UserAnalysis,
};
pub use types::{Candidate, ContentRecommendation, Reason, Recommendation};
