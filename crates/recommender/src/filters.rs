//! Composable candidate filters for the collaborative recommender.
//!
//! Filters take ownership of the candidate list and return what survives,
//! chained through a [`FilterPipeline`]:
//!
//! ```ignore
//! let pipeline = FilterPipeline::new()
//!     .add_filter(LikedMenuFilter)
//!     .add_filter(MinimumPreferenceFilter::new(2.5));
//!
//! let candidates = pipeline.apply(candidates, &context)?;
//! ```

use crate::context::GroupContext;
use crate::error::Result;
use crate::types::Candidate;
use tracing::debug;

/// Core trait for filtering candidates.
///
/// `Send + Sync` so a pipeline can be shared behind an `Arc`.
pub trait Filter: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> &str;

    fn apply(&self, candidates: Vec<Candidate>, context: &GroupContext) -> Result<Vec<Candidate>>;
}

/// Chains filters in insertion order
#[derive(Default)]
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline (builder pattern)
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn apply(&self, candidates: Vec<Candidate>, context: &GroupContext) -> Result<Vec<Candidate>> {
        let mut current = candidates;
        for filter in &self.filters {
            let before = current.len();
            current = filter.apply(current, context)?;
            debug!(
                "Filter {} kept {} of {} candidates",
                filter.name(),
                current.len(),
                before
            );
        }
        Ok(current)
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Removes menus the group already likes
pub struct LikedMenuFilter;

impl Filter for LikedMenuFilter {
    fn name(&self) -> &str {
        "LikedMenuFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, context: &GroupContext) -> Result<Vec<Candidate>> {
        Ok(candidates
            .into_iter()
            .filter(|c| !context.is_liked(&c.menu))
            .collect())
    }
}

/// Removes menus whose aggregate group preference is below a floor
pub struct MinimumPreferenceFilter {
    min_preference: f64,
}

impl MinimumPreferenceFilter {
    pub fn new(min_preference: f64) -> Self {
        Self { min_preference }
    }
}

impl Filter for MinimumPreferenceFilter {
    fn name(&self) -> &str {
        "MinimumPreferenceFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, _context: &GroupContext) -> Result<Vec<Candidate>> {
        Ok(candidates
            .into_iter()
            .filter(|c| c.preference >= self.min_preference)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::build_group_context;
    use crate::policy::RecommendPolicy;
    use data_loader::PreferenceTable;

    fn create_test_context() -> GroupContext {
        let menus = ["김치찌개", "떡볶이", "라멘"].iter().map(|s| s.to_string()).collect();
        let mut table = PreferenceTable::new(menus).unwrap();
        table.insert_user("연누", vec![Some(4), Some(2), Some(3)]).unwrap();
        build_group_context(&table, &["연누"], &RecommendPolicy::default()).unwrap()
    }

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("김치찌개", 0, 4.0),
            Candidate::new("떡볶이", 1, 2.0),
            Candidate::new("라멘", 2, 3.0),
        ]
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = FilterPipeline::new();
        assert!(pipeline.is_empty());
        let filtered = pipeline.apply(candidates(), &create_test_context()).unwrap();
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_liked_menu_filter() {
        let pipeline = FilterPipeline::new().add_filter(LikedMenuFilter);
        let filtered = pipeline.apply(candidates(), &create_test_context()).unwrap();
        let names: Vec<&str> = filtered.iter().map(|c| c.menu.as_str()).collect();
        assert_eq!(names, vec!["떡볶이", "라멘"]);
    }

    #[test]
    fn test_chained_filters() {
        let pipeline = FilterPipeline::new()
            .add_filter(LikedMenuFilter)
            .add_filter(MinimumPreferenceFilter::new(2.5));
        assert_eq!(pipeline.len(), 2);
        let filtered = pipeline.apply(candidates(), &create_test_context()).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].menu, "라멘");
    }
}
