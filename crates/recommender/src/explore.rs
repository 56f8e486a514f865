//! Seeded exploratory suggestions outside the ranked list.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

/// Pick up to `count` menus from `candidates` that are not in `excluded`.
///
/// The same seed always yields the same picks for the same inputs.
pub fn exploratory_picks(
    candidates: &[String],
    excluded: &[String],
    count: usize,
    seed: u64,
) -> Vec<String> {
    let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut pool: Vec<&String> = candidates
        .iter()
        .filter(|c| !excluded.contains(c.as_str()) && seen.insert(c.as_str()))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    pool.shuffle(&mut rng);
    pool.into_iter().take(count).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menus(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_picks_exclude_ranked() {
        let candidates = menus(&["a", "b", "c", "d", "e"]);
        let picks = exploratory_picks(&candidates, &menus(&["a", "b"]), 2, 7);
        assert_eq!(picks.len(), 2);
        assert!(picks.iter().all(|p| p != "a" && p != "b"));
    }

    #[test]
    fn test_same_seed_same_picks() {
        let candidates = menus(&["a", "b", "c", "d", "e", "f"]);
        let first = exploratory_picks(&candidates, &[], 3, 42);
        let second = exploratory_picks(&candidates, &[], 3, 42);
        assert_eq!(first, second);
    }

    #[test]
    fn test_count_larger_than_pool() {
        let candidates = menus(&["a", "b", "a"]);
        let picks = exploratory_picks(&candidates, &menus(&["b"]), 5, 1);
        assert_eq!(picks, vec!["a"]);
    }
}
