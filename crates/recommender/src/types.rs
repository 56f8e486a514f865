//! Result and intermediate types of the recommenders.

use crate::math::round2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A menu under consideration by the collaborative recommender
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub menu: String,
    /// Row of the menu in the correlation matrix; also the tie-break order
    pub matrix_index: usize,
    /// Aggregate group preference (0..=4)
    pub preference: f64,
    /// Penalized top-K correlation to the liked set, if any valid entry exists
    pub correlation: Option<f64>,
    pub score: f64,
}

impl Candidate {
    pub fn new(menu: impl Into<String>, matrix_index: usize, preference: f64) -> Self {
        Self {
            menu: menu.into(),
            matrix_index,
            preference,
            correlation: None,
            score: 0.0,
        }
    }
}

/// One explanation entry: a liked menu and its similarity to the recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub liked_menu: String,
    /// Rounded to two decimals
    pub similarity: f64,
}

impl Reason {
    pub fn new(liked_menu: impl Into<String>, similarity: f64) -> Self {
        Self {
            liked_menu: liked_menu.into(),
            similarity: round2(similarity),
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2})", self.liked_menu, self.similarity)
    }
}

/// A ranked collaborative recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub menu: String,
    pub score: f64,
    pub preference: f64,
    pub correlation: Option<f64>,
    pub reasons: Vec<Reason>,
}

impl Recommendation {
    /// Human-readable explanation, e.g. `similar to 김치찌개 (0.82), 수육 (0.58)`
    pub fn reason_text(&self) -> String {
        if self.reasons.is_empty() {
            return "popular with the group".to_string();
        }
        let parts: Vec<String> = self.reasons.iter().map(Reason::to_string).collect();
        format!("similar to {}", parts.join(", "))
    }
}

/// A ranked content-based recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecommendation {
    pub menu: String,
    /// Cosine similarity between the menu and the group taste vector
    pub score: f64,
    pub category: String,
    pub simple: bool,
}
