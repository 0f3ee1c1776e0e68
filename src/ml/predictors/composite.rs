//! Composite scorers
//!
//! Each predictor here blends several weak signals with fixed coefficients.
//! The coefficients and the pattern tables are literal constants and must
//! not be tuned.

use super::{trailing_successors, Predictor};
use crate::ml::features::{mean_total, shannon_entropy, tail, CategoryCounts, HistoryFeatures};
use crate::types::Category;
use crate::types::Category::{Primary, Secondary};

/// Five-round pattern -> expected next category
pub const DEEP_PATTERNS: &[(&str, Category)] = &[
    ("TTXTT", Secondary),
    ("TXTXT", Secondary),
    ("XXTXX", Primary),
    ("XTXTX", Primary),
    ("TTTTX", Secondary),
    ("XXXXT", Primary),
];

/// Five-round pattern -> (primary, secondary) score contribution before scaling
pub const NEURAL_PATTERNS: &[(&str, f64, f64)] = &[
    ("TTXTT", 0.2, 0.8),
    ("TXTXT", 0.3, 0.7),
    ("XXTXX", 0.8, 0.2),
    ("XTXTX", 0.7, 0.3),
    ("TTTTX", 0.1, 0.9),
    ("XXXXT", 0.9, 0.1),
];

/// Four independent signals, majority with at least two agreeing votes.
///
/// 1. Last-50 lead above 10 backs the leader
/// 2. Last-30 mean total above 13.0 votes X, below 8.5 votes T
/// 3. [`DEEP_PATTERNS`] on the last five rounds
/// 4. Run reversal: a run of 4+, or three trailing singleton runs
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepAnalysisPredictor;

impl DeepAnalysisPredictor {
    fn run_signal(features: &HistoryFeatures) -> Option<Category> {
        let runs = &features.runs;
        if runs.len() < 2 {
            return None;
        }

        let last = runs[runs.len() - 1];
        if last.len >= 4 {
            return Some(last.category.opposite());
        }
        if last.len == 1 {
            let last_three = tail(runs, 3);
            if last_three.len() == 3 && last_three.iter().all(|r| r.len == 1) {
                return Some(last.category.opposite());
            }
        }
        None
    }
}

impl Predictor for DeepAnalysisPredictor {
    fn id(&self) -> &'static str {
        "super_deep_analysis"
    }

    fn vote(&self, features: &HistoryFeatures) -> Option<Category> {
        if features.len() < 80 {
            return None;
        }

        let mut votes = CategoryCounts::default();

        let recent_50 = CategoryCounts::of(features.recent(50));
        if recent_50.primary.abs_diff(recent_50.secondary) > 10 {
            votes.add(recent_50.leader());
        }

        let avg_recent = mean_total(features.recent_totals(30));
        if avg_recent > 13.0 {
            votes.add(Secondary);
        } else if avg_recent < 8.5 {
            votes.add(Primary);
        }

        let pattern = features.recent_pattern(5);
        if let Some((_, next)) = DEEP_PATTERNS.iter().find(|(key, _)| *key == pattern) {
            votes.add(*next);
        }

        if let Some(next) = Self::run_signal(features) {
            votes.add(next);
        }

        if votes.primary > votes.secondary && votes.primary >= 2 {
            Some(Primary)
        } else if votes.secondary > votes.primary && votes.secondary >= 2 {
            Some(Secondary)
        } else {
            None
        }
    }
}

/// Weighted score pair over the last 20 rounds; votes when the gap exceeds 0.25
#[derive(Debug, Clone, Copy, Default)]
pub struct NeuralPatternPredictor;

impl Predictor for NeuralPatternPredictor {
    fn id(&self) -> &'static str {
        "neural_pattern"
    }

    fn vote(&self, features: &HistoryFeatures) -> Option<Category> {
        if features.len() < 50 {
            return None;
        }

        let recent_20 = CategoryCounts::of(features.recent(20));
        let ratio_primary = recent_20.primary as f64 / 20.0;
        let avg_total_20 = mean_total(features.recent_totals(20));

        let totals = &features.totals;
        let n = totals.len();
        let trend = mean_total(&totals[n - 10..]) - mean_total(&totals[n - 20..n - 10]);

        let mut primary_score: f64 = 0.0;
        let mut secondary_score: f64 = 0.0;

        if ratio_primary > 0.7 {
            secondary_score += 0.35;
        } else if ratio_primary < 0.3 {
            primary_score += 0.35;
        }

        if avg_total_20 > 12.5 {
            secondary_score += 0.25;
        } else if avg_total_20 < 8.5 {
            primary_score += 0.25;
        }

        let pattern = features.recent_pattern(5);
        if let Some((_, t, x)) = NEURAL_PATTERNS.iter().find(|(key, _, _)| *key == pattern) {
            primary_score += t * 0.2;
            secondary_score += x * 0.2;
        }

        if trend > 2.5 {
            secondary_score += 0.15;
        } else if trend < -2.5 {
            primary_score += 0.15;
        }

        if (primary_score - secondary_score).abs() > 0.25 {
            Some(if primary_score > secondary_score {
                Primary
            } else {
                Secondary
            })
        } else {
            None
        }
    }
}

/// Three partial states summed into two accumulators:
/// last-30 imbalance (0.3), trailing 8-gram repeats (0.25) and
/// entropy-triggered mean reversion (0.2).
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantumPredictor;

impl Predictor for QuantumPredictor {
    fn id(&self) -> &'static str {
        "quantum"
    }

    fn vote(&self, features: &HistoryFeatures) -> Option<Category> {
        let tx = &features.categories;
        if tx.len() < 40 {
            return None;
        }

        let mut primary_state: f64 = 0.0;
        let mut secondary_state: f64 = 0.0;

        let recent_30 = CategoryCounts::of(features.recent(30));
        if recent_30.primary > recent_30.secondary + 5 {
            secondary_state += 0.3;
        } else if recent_30.secondary > recent_30.primary + 5 {
            primary_state += 0.3;
        }

        let repeats = trailing_successors(tx, 8);
        if repeats.total() >= 3 && repeats.imbalance() > 0.6 {
            if repeats.primary > repeats.secondary {
                primary_state += 0.25;
            } else {
                secondary_state += 0.25;
            }
        }

        if shannon_entropy(features.recent(20)) > 0.9 {
            if features.last() == Some(Primary) {
                secondary_state += 0.2;
            } else {
                primary_state += 0.2;
            }
        }

        let total = primary_state + secondary_state;
        if total <= 0.5 {
            return None;
        }

        let confidence = (primary_state - secondary_state).abs() / total;
        if confidence > 0.6 {
            Some(if primary_state > secondary_state {
                Primary
            } else {
                Secondary
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HistoryGenerator;
    use crate::types::Category::{Primary as T, Secondary as X};

    #[test]
    fn test_pattern_tables_agree() {
        assert_eq!(DEEP_PATTERNS.len(), NEURAL_PATTERNS.len());
        for ((deep_key, next), (neural_key, t, x)) in DEEP_PATTERNS.iter().zip(NEURAL_PATTERNS) {
            assert_eq!(deep_key, neural_key);
            let favored = if t > x { T } else { X };
            assert_eq!(*next, favored, "{}", deep_key);
        }
    }

    #[test]
    fn test_deep_analysis_high_totals() {
        // one X then 79 high T: leader T, mean 15 -> X, run of 79 -> X
        let mut totals = vec![7u8];
        totals.extend([15u8; 79]);
        let history = HistoryGenerator::from_totals(&totals);
        assert_eq!(DeepAnalysisPredictor.predict(&history), Some(X));

        let history = HistoryGenerator::from_totals(&totals[..79]);
        assert_eq!(DeepAnalysisPredictor.predict(&history), None);
    }

    #[test]
    fn test_deep_analysis_alternation() {
        // ends X T X T X T: pattern TXTXT and singleton runs both say X
        let history = HistoryGenerator::alternating(X, 80);
        assert_eq!(DeepAnalysisPredictor.predict(&history), Some(X));
    }

    #[test]
    fn test_deep_analysis_split_vote_abstains() {
        // a single run: leader T against mean 15 -> X, no run signal
        let history = HistoryGenerator::from_totals(&[15; 80]);
        assert_eq!(DeepAnalysisPredictor.predict(&history), None);
    }

    #[test]
    fn test_neural_pattern_skewed_window() {
        let history = HistoryGenerator::from_totals(&[15; 50]);
        assert_eq!(NeuralPatternPredictor.predict(&history), Some(X));

        let history = HistoryGenerator::from_totals(&[15; 49]);
        assert_eq!(NeuralPatternPredictor.predict(&history), None);
    }

    #[test]
    fn test_deep_analysis_low_mean_band() {
        // 50 T then 30 X at total 5: last-50 lead is exactly 10, so only the
        // low-mean band and the run reversal vote, both for T
        let mut totals = vec![12u8; 50];
        totals.extend([5u8; 30]);
        let history = HistoryGenerator::from_totals(&totals);
        assert_eq!(DeepAnalysisPredictor.predict(&history), Some(T));

        // same shape with a last-30 mean of 9 leaves the run signal alone
        totals[50..].fill(9);
        let history = HistoryGenerator::from_totals(&totals);
        assert_eq!(DeepAnalysisPredictor.predict(&history), None);
    }

    #[test]
    fn test_neural_pattern_rising_trend() {
        // last 20: ten X at 7, nine T at 14, a final X at 10. Ratio 0.45 and
        // mean 10.3 stay neutral, TTTTX gives 0.02 vs 0.18 and the +6.6 trend
        // adds 0.15 to X
        let mut totals: Vec<u8> = [12u8, 7].iter().copied().cycle().take(30).collect();
        totals.extend([7u8; 10]);
        totals.extend([14u8; 9]);
        totals.push(10);
        let history = HistoryGenerator::from_totals(&totals);
        assert_eq!(NeuralPatternPredictor.predict(&history), Some(X));

        // flatten the trend to +0.9 and the pattern alone is too weak
        totals[30..40].fill(10);
        totals[40..49].fill(11);
        let history = HistoryGenerator::from_totals(&totals);
        assert_eq!(NeuralPatternPredictor.predict(&history), None);
    }

    #[test]
    fn test_neural_pattern_small_gap_abstains() {
        // balanced ratio, mean 9.5, TXTXT adds only 0.06 vs 0.14
        let history = HistoryGenerator::alternating(X, 50);
        assert_eq!(NeuralPatternPredictor.predict(&history), None);
    }

    #[test]
    fn test_quantum_aligned_states() {
        // XXT cycle, 41 rounds: last 30 is 20 X vs 10 T and every trailing
        // 8-gram repeat continues with T; last-20 entropy stays below 0.9
        let seq: Vec<Category> = [X, X, T].iter().copied().cycle().take(41).collect();
        let history = HistoryGenerator::from_categories(&seq);
        assert_eq!(QuantumPredictor.predict(&history), Some(T));

        let history = HistoryGenerator::from_categories(&seq[..39]);
        assert_eq!(QuantumPredictor.predict(&history), None);
    }

    #[test]
    fn test_quantum_entropy_reversion_can_veto() {
        // TTTXX cycle: any last-30 holds 18 T vs 12 X (X +0.3), every trailing
        // 8-gram repeat continues with X (X +0.25) and the last-20 entropy is
        // 0.97. Ending on X, reversion backs T and drags confidence to 0.47
        let cycle = [T, T, T, X, X];
        let seq: Vec<Category> = cycle.iter().copied().cycle().take(44).collect();
        assert_eq!(seq.last(), Some(&X));
        let history = HistoryGenerator::from_categories(&seq);
        let features = HistoryFeatures::extract(&history);
        assert!(shannon_entropy(features.recent(20)) > 0.9);
        assert_eq!(trailing_successors(&features.categories, 8).secondary, 7);
        assert_eq!(QuantumPredictor.predict(&history), None);

        // ending on T, reversion agrees and the vote goes through
        let history = HistoryGenerator::from_categories(&seq[..43]);
        assert_eq!(QuantumPredictor.predict(&history), Some(X));
    }

    #[test]
    fn test_quantum_conflicting_states_abstain() {
        // last-30 lead backs X (0.3) while the 8-gram repeats back T (0.25)
        let history = HistoryGenerator::constant(T, 40);
        assert_eq!(QuantumPredictor.predict(&history), None);
    }
}
