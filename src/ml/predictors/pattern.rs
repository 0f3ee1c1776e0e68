//! Window-matching predictors: exact n-gram, fuzzy and similarity-weighted

use super::{trailing_successors, Predictor};
use crate::ml::features::{similarity, CategoryCounts, HistoryFeatures};
use crate::types::Category;

/// Exact repeats of the trailing k-gram (k = 3..6). First k with at least
/// 3 matches and a 0.6 imbalance wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct NGramPredictor;

impl Predictor for NGramPredictor {
    fn id(&self) -> &'static str {
        "ngram"
    }

    fn vote(&self, features: &HistoryFeatures) -> Option<Category> {
        let tx = &features.categories;

        for k in 3..=6 {
            if tx.len() < k + 10 {
                continue;
            }

            let counts = trailing_successors(tx, k);
            if counts.total() >= 3 && counts.imbalance() >= 0.6 {
                return Some(counts.leader());
            }
        }

        None
    }
}

/// Windows of length 4-6 at least 80% equal to the trailing window.
/// Needs 5 matches and confidence above 0.6.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyPatternPredictor;

const FUZZY_MIN_RECORDS: usize = 40;
const FUZZY_MIN_SIMILARITY: f64 = 0.8;

impl Predictor for FuzzyPatternPredictor {
    fn id(&self) -> &'static str {
        "neo_pattern"
    }

    fn vote(&self, features: &HistoryFeatures) -> Option<Category> {
        let tx = &features.categories;
        let len = tx.len();
        if len < FUZZY_MIN_RECORDS {
            return None;
        }

        let mut best: Option<Category> = None;
        let mut max_confidence = 0.0;

        for pat_len in [4, 5, 6] {
            if len < pat_len * 2 {
                continue;
            }

            let target = &tx[len - pat_len..];
            let mut counts = CategoryCounts::default();
            for i in 0..len - pat_len {
                if similarity(&tx[i..i + pat_len], target) >= FUZZY_MIN_SIMILARITY {
                    counts.add(tx[i + pat_len]);
                }
            }

            if counts.total() >= 5 {
                let confidence = counts.imbalance();
                if confidence > max_confidence && confidence > 0.6 {
                    max_confidence = confidence;
                    best = Some(counts.leader());
                }
            }
        }

        best
    }
}

/// "Transformer-like" attention over every earlier 10-window: windows above
/// 0.7 similarity vote with weight `similarity / (len - i + 10)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityWeightedPredictor;

const ATTENTION_WINDOW: usize = 10;

impl Predictor for SimilarityWeightedPredictor {
    fn id(&self) -> &'static str {
        "transformer"
    }

    fn vote(&self, features: &HistoryFeatures) -> Option<Category> {
        let tx = &features.categories;
        let len = tx.len();
        if len < 60 {
            return None;
        }

        let target = &tx[len - ATTENTION_WINDOW..];
        let mut primary_weight = 0.0;
        let mut secondary_weight = 0.0;
        let mut total_similarity = 0.0;

        for i in 0..len - ATTENTION_WINDOW {
            let score = similarity(&tx[i..i + ATTENTION_WINDOW], target);
            if score <= 0.7 {
                continue;
            }

            let weight = score * (1.0 / (len - i + 10) as f64);
            if tx[i + ATTENTION_WINDOW] == Category::Primary {
                primary_weight += weight;
            } else {
                secondary_weight += weight;
            }
            total_similarity += score;
        }

        if total_similarity <= 2.0 {
            return None;
        }

        let total_weight = primary_weight + secondary_weight;
        if total_weight <= 0.0 {
            return None;
        }

        let ratio = (primary_weight - secondary_weight).abs() / total_weight;
        if ratio > 0.6 {
            Some(if primary_weight > secondary_weight {
                Category::Primary
            } else {
                Category::Secondary
            })
        } else {
            None
        }
    }
}
