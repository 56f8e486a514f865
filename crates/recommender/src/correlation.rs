//! Menu × menu cosine similarity over attribute vectors.
//!
//! ## Algorithm
//! 1. Convert every menu's 0/1 attribute vector to `f64`
//! 2. Compute each row in parallel: cosine against every other menu
//! 3. Force the diagonal to exactly 1.0
//! 4. Flatten rows in index order into a [`CorrelationMatrix`]
//!
//! The matrix is always rebuilt from the full menu table; there is no
//! incremental update path.

use crate::error::{RecommendError, Result};
use crate::math::cosine_similarity;
use data_loader::{CorrelationMatrix, MenuTable};
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::{info, instrument};

#[instrument(skip_all, fields(menus = menus.len(), attributes = menus.schema().len()))]
pub fn build_correlation_matrix(menus: &MenuTable) -> Result<CorrelationMatrix> {
    let vectors: Vec<Vec<f64>> = menus
        .menus()
        .iter()
        .map(|m| m.attributes.iter().map(|&v| f64::from(v)).collect())
        .collect();

    let rows: Vec<Vec<f64>> = (0..vectors.len())
        .into_par_iter()
        .map(|i| {
            vectors
                .iter()
                .enumerate()
                .map(|(j, other)| {
                    if i == j {
                        1.0
                    } else {
                        cosine_similarity(&vectors[i], other)
                    }
                })
                .collect()
        })
        .collect();

    let names = menus.menu_names().map(str::to_string).collect();
    let matrix = CorrelationMatrix::from_parts(names, rows.into_iter().flatten().collect())?;
    info!("Built {}x{} correlation matrix", matrix.len(), matrix.len());
    Ok(matrix)
}

/// Whether a saved matrix covers exactly the menus of `menus`, in the same order.
///
/// A matrix built for a different menu set must be rebuilt in full.
pub fn matrix_matches_menus(matrix: &CorrelationMatrix, menus: &MenuTable) -> bool {
    matrix.len() == menus.len()
        && matrix
            .menus()
            .iter()
            .map(String::as_str)
            .eq(menus.menu_names())
}

/// The `n` menus most similar to `menu`, by descending similarity.
///
/// The menu itself and NaN cells are skipped; ties keep matrix order.
pub fn most_similar(matrix: &CorrelationMatrix, menu: &str, n: usize) -> Result<Vec<(String, f64)>> {
    let row = matrix.position(menu).ok_or_else(|| RecommendError::MenuNotFound {
        menu: menu.to_string(),
    })?;

    let mut neighbors: Vec<(String, f64)> = (0..matrix.len())
        .filter(|&j| j != row)
        .filter_map(|j| Some((matrix.menus()[j].clone(), matrix.get(row, j)?)))
        .collect();
    neighbors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    neighbors.truncate(n);
    Ok(neighbors)
}
