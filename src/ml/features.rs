//! Feature extraction over an outcome window
//!
//! Derives the statistical summary every predictor works from:
//! - Filtered category and total sequences (Discard rounds dropped)
//! - Per-category frequency counts
//! - Run-length decomposition and longest run
//! - Mean / standard deviation of totals
//! - Shannon entropy (base 2) of the category sequence
//!
//! Extraction is a pure function of its input.

use crate::types::{Category, OutcomeRecord};
use std::collections::HashMap;

/// Per-category counts over the live categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub primary: usize,
    pub secondary: usize,
}

impl CategoryCounts {
    pub fn of(categories: &[Category]) -> Self {
        let mut counts = Self::default();
        for c in categories {
            counts.add(*c);
        }
        counts
    }

    pub fn add(&mut self, category: Category) {
        match category {
            Category::Primary => self.primary += 1,
            Category::Secondary => self.secondary += 1,
            Category::Discard => {}
        }
    }

    pub fn total(&self) -> usize {
        self.primary + self.secondary
    }

    /// |primary - secondary| / total, 0 when empty
    pub fn imbalance(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.primary.abs_diff(self.secondary) as f64 / total as f64
    }

    /// Primary on a strict majority, Secondary otherwise
    pub fn leader(&self) -> Category {
        if self.primary > self.secondary {
            Category::Primary
        } else {
            Category::Secondary
        }
    }
}

/// A maximal stretch of identical categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub category: Category,
    pub len: usize,
}

/// Summary of a history window after dropping Discard rounds
#[derive(Debug, Clone, Default)]
pub struct HistoryFeatures {
    pub categories: Vec<Category>,
    pub totals: Vec<u8>,
    pub frequency: CategoryCounts,
    pub runs: Vec<Run>,
    pub max_run: usize,
    pub mean_total: f64,
    pub std_total: f64,
    pub entropy: f64,
}

impl HistoryFeatures {
    pub fn extract(history: &[OutcomeRecord]) -> Self {
        let live: Vec<&OutcomeRecord> = history.iter().filter(|r| r.category.is_live()).collect();
        let categories: Vec<Category> = live.iter().map(|r| r.category).collect();
        let totals: Vec<u8> = live.iter().map(|r| r.total).collect();

        let runs = run_lengths(&categories);
        let max_run = runs.iter().map(|r| r.len).max().unwrap_or(0);

        let as_f64: Vec<f64> = totals.iter().map(|t| f64::from(*t)).collect();
        let mean_total = mean(&as_f64);
        let variance = mean(
            &as_f64
                .iter()
                .map(|t| (t - mean_total) * (t - mean_total))
                .collect::<Vec<_>>(),
        );

        Self {
            frequency: CategoryCounts::of(&categories),
            entropy: shannon_entropy(&categories),
            categories,
            totals,
            runs,
            max_run,
            mean_total,
            std_total: variance.sqrt(),
        }
    }

    /// Number of usable (non-Discard) rounds
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Trailing `n` categories (fewer if the history is shorter)
    pub fn recent(&self, n: usize) -> &[Category] {
        tail(&self.categories, n)
    }

    /// Trailing `n` totals (fewer if the history is shorter)
    pub fn recent_totals(&self, n: usize) -> &[u8] {
        tail(&self.totals, n)
    }

    /// Trailing `n` categories as a pattern key, e.g. `TTXTT`
    pub fn recent_pattern(&self, n: usize) -> String {
        self.recent(n).iter().map(|c| c.code()).collect()
    }

    pub fn last(&self) -> Option<Category> {
        self.categories.last().copied()
    }
}

pub(crate) fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// Consecutive equal-category runs in order
pub fn run_lengths(categories: &[Category]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for category in categories {
        match runs.last_mut() {
            Some(run) if run.category == *category => run.len += 1,
            _ => runs.push(Run {
                category: *category,
                len: 1,
            }),
        }
    }
    runs
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of a slice of totals
pub fn mean_total(totals: &[u8]) -> f64 {
    if totals.is_empty() {
        return 0.0;
    }
    totals.iter().map(|t| f64::from(*t)).sum::<f64>() / totals.len() as f64
}

/// Shannon entropy in bits
pub fn shannon_entropy(categories: &[Category]) -> f64 {
    if categories.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<Category, usize> = HashMap::new();
    for c in categories {
        *freq.entry(*c).or_insert(0) += 1;
    }

    let n = categories.len() as f64;
    freq.values()
        .map(|count| {
            let p = *count as f64 / n;
            -p * p.log2()
        })
        .sum()
}

/// Fraction of positions at which two equal-length windows agree
pub fn similarity(a: &[Category], b: &[Category]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let matches = a.iter().zip(b).filter(|(x, y)| x == y).count();
    matches as f64 / a.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HistoryGenerator;

    use crate::types::Category::{Primary as T, Secondary as X};

    #[test]
    fn test_empty_history() {
        let features = HistoryFeatures::extract(&[]);
        assert!(features.is_empty());
        assert_eq!(features.entropy, 0.0);
        assert_eq!(features.max_run, 0);
        assert_eq!(features.mean_total, 0.0);
        assert_eq!(features.std_total, 0.0);
        assert!(features.runs.is_empty());
        assert_eq!(features.frequency, CategoryCounts::default());
    }

    #[test]
    fn test_discard_rounds_are_filtered() {
        let history = HistoryGenerator::from_totals(&[12, 18, 5, 3, 11]);
        let features = HistoryFeatures::extract(&history);
        assert_eq!(features.categories, vec![T, X, T]);
        assert_eq!(features.totals, vec![12, 5, 11]);
        assert_eq!(features.frequency.primary, 2);
        assert_eq!(features.frequency.secondary, 1);
    }

    #[test]
    fn test_run_decomposition() {
        let runs = run_lengths(&[T, T, X, T, T, T, X]);
        assert_eq!(
            runs,
            vec![
                Run { category: T, len: 2 },
                Run { category: X, len: 1 },
                Run { category: T, len: 3 },
                Run { category: X, len: 1 },
            ]
        );
    }

    #[test]
    fn test_mean_and_std() {
        let history = HistoryGenerator::from_totals(&[10, 12, 14]);
        let features = HistoryFeatures::extract(&history);
        assert!((features.mean_total - 12.0).abs() < 1e-9);
        let expected_std = (8.0f64 / 3.0).sqrt();
        assert!((features.std_total - expected_std).abs() < 1e-9);
        assert_eq!(features.max_run, 2);
    }

    #[test]
    fn test_entropy_bounds() {
        assert_eq!(shannon_entropy(&[T, T, T]), 0.0);
        assert!((shannon_entropy(&[T, X, T, X]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity(&[T, X, T, X], &[T, X, X, X]), 0.75);
        assert_eq!(similarity(&[T], &[T, X]), 0.0);
    }

    #[test]
    fn test_recent_pattern() {
        let history = HistoryGenerator::from_totals(&[12, 5, 5, 13, 14, 6]);
        let features = HistoryFeatures::extract(&history);
        assert_eq!(features.recent_pattern(5), "XXTTX");
        assert_eq!(features.recent(100).len(), 6);
        assert_eq!(features.recent_totals(2), &[14, 6]);
    }

    #[test]
    fn test_counts_leader_and_imbalance() {
        let counts = CategoryCounts::of(&[T, T, T, X]);
        assert_eq!(counts.leader(), T);
        assert!((counts.imbalance() - 0.5).abs() < 1e-12);
        assert_eq!(CategoryCounts::of(&[T, X]).leader(), X);
    }
}
