//! Normalized string similarity used by candidate scoring.
//!
//! Character-bigram Dice overlap: cheap, order-tolerant, and it degrades
//! smoothly as strings drift apart, which fits re-rendered text and rotated
//! ids better than strict equality or full edit distance.

use std::collections::HashMap;

/// Inputs shorter than this (after trimming) carry too little signal to
/// compare; similarity reports 0 for them.
pub const MIN_SIMILARITY_LEN: usize = 3;

/// Case-insensitive similarity in `[0, 1]`.
///
/// Returns 0 for empty or too-short inputs, 1 for strings equal after
/// normalization, and bigram overlap otherwise.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.chars().count() < MIN_SIMILARITY_LEN || b.chars().count() < MIN_SIMILARITY_LEN {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let a_bigrams = bigram_counts(&a);
    let b_bigrams = bigram_counts(&b);
    let total: usize = a_bigrams.values().sum::<usize>() + b_bigrams.values().sum::<usize>();
    if total == 0 {
        return 0.0;
    }
    let shared: usize = a_bigrams
        .iter()
        .map(|(bigram, count)| count.min(b_bigrams.get(bigram).unwrap_or(&0)))
        .sum();
    2.0 * shared as f64 / total as f64
}

fn bigram_counts(s: &str) -> HashMap<(char, char), usize> {
    let mut counts = HashMap::new();
    for pair in s.chars().zip(s.chars().skip(1)) {
        *counts.entry(pair).or_insert(0) += 1;
    }
    counts
}
