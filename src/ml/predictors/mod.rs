//! Heuristic predictor library
//!
//! Ten independent, stateless voters over the Discard-filtered history:
//! - Frequency rebalance (recent vs long-window imbalance)
//! - Markov (orders 2-5) and adaptive-order Markov
//! - N-gram repeat, fuzzy pattern and similarity-weighted window matching
//! - Deep analysis, neural-style and quantum-style composite scorers
//! - Bridge (run reversal / alternation)
//!
//! Every predictor enforces its own minimum sample and abstains (`None`)
//! below it. Abstention is a normal outcome, not an error.

pub mod bridge;
pub mod composite;
pub mod frequency;
pub mod markov;
pub mod pattern;

pub use bridge::{bridge_rule, BridgeRule, BridgePredictor};
pub use composite::{DeepAnalysisPredictor, NeuralPatternPredictor, QuantumPredictor};
pub use frequency::FrequencyRebalancePredictor;
pub use markov::{AdaptiveMarkovPredictor, MarkovPredictor, TransitionTable};
pub use pattern::{FuzzyPatternPredictor, NGramPredictor, SimilarityWeightedPredictor};

use super::features::{CategoryCounts, HistoryFeatures};
use crate::types::{Category, OutcomeRecord};

/// A stateless categorical voter
pub trait Predictor: Send + Sync {
    /// Stable identifier used for weights and logs
    fn id(&self) -> &'static str;

    /// Vote on the next category given precomputed features
    fn vote(&self, features: &HistoryFeatures) -> Option<Category>;

    /// Vote on the next category given a raw history
    fn predict(&self, history: &[OutcomeRecord]) -> Option<Category> {
        self.vote(&HistoryFeatures::extract(history))
    }
}

/// The full library in registration order. Order matters: it breaks ties
/// in the ensemble tally.
pub fn default_predictors() -> Vec<Box<dyn Predictor>> {
    vec![
        Box::new(FrequencyRebalancePredictor),
        Box::new(MarkovPredictor),
        Box::new(NGramPredictor),
        Box::new(FuzzyPatternPredictor),
        Box::new(DeepAnalysisPredictor),
        Box::new(SimilarityWeightedPredictor),
        Box::new(BridgePredictor),
        Box::new(AdaptiveMarkovPredictor),
        Box::new(NeuralPatternPredictor),
        Box::new(QuantumPredictor),
    ]
}

/// What followed every earlier occurrence of the trailing `k`-length window.
/// The trailing window itself has no successor and is not counted.
pub fn trailing_successors(categories: &[Category], k: usize) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    let n = categories.len();
    if k == 0 || n <= k {
        return counts;
    }

    let target = &categories[n - k..];
    for i in 0..n - k {
        if &categories[i..i + k] == target {
            counts.add(categories[i + k]);
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HistoryGenerator;
    use crate::types::Category::{Primary as T, Secondary as X};
    use std::collections::HashSet;

    #[test]
    fn test_registry_has_ten_unique_ids() {
        let predictors = default_predictors();
        assert_eq!(predictors.len(), 10);
        let ids: HashSet<_> = predictors.iter().map(|p| p.id()).collect();
        assert_eq!(ids.len(), 10);
        assert_eq!(predictors[0].id(), "freq_rebalance");
    }

    #[test]
    fn test_trailing_successors() {
        // trailing "TX" occurs at 0 and 2, followed by T and X
        let counts = trailing_successors(&[T, X, T, X, X, T, X], 2);
        assert_eq!(counts.primary, 1);
        assert_eq!(counts.secondary, 1);
        assert_eq!(trailing_successors(&[T, X], 2).total(), 0);
    }

    #[test]
    fn test_every_predictor_abstains_on_short_history() {
        let history = HistoryGenerator::from_totals(&[12, 12, 7, 7, 12]);
        for predictor in default_predictors() {
            assert_eq!(predictor.predict(&history), None, "{}", predictor.id());
        }
    }

    #[test]
    fn test_predictors_are_pure() {
        let history = HistoryGenerator::random(11, 240);
        for predictor in default_predictors() {
            assert_eq!(
                predictor.predict(&history),
                predictor.predict(&history),
                "{}",
                predictor.id()
            );
        }
    }

    #[test]
    fn test_discard_rounds_are_invisible() {
        let plain = HistoryGenerator::from_totals(&[12, 5, 13, 6, 14, 7, 15, 8].repeat(12));
        let mut with_discards = Vec::new();
        for (i, record) in plain.iter().enumerate() {
            with_discards.push(record.total);
            if i % 7 == 0 {
                with_discards.push(18);
            }
        }
        let with_discards = HistoryGenerator::from_totals(&with_discards);

        for predictor in default_predictors() {
            assert_eq!(
                predictor.predict(&plain),
                predictor.predict(&with_discards),
                "{}",
                predictor.id()
            );
        }
    }
}
