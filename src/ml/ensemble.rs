//! Ensemble weighting engine
//!
//! Combines the predictor library into one categorical forecast:
//! - Bootstrap fit from replayed history (accuracy^1.5 weights)
//! - Online exponential weight updates from realized outcomes
//! - Weighted vote with a no-consensus fallback
//!
//! Weights are floored and renormalized to sum to 1 after every pass.

use super::features::HistoryFeatures;
use super::predictors::{default_predictors, FrequencyRebalancePredictor, Predictor};
use crate::types::{Category, OutcomeRecord, PredictorVote};
use serde::Serialize;
use tracing::{debug, info};

/// Confidence reported when no predictor voted
pub const FALLBACK_CONFIDENCE: f64 = 0.5;
const MIN_CONFIDENCE: f64 = 0.51;
const MAX_CONFIDENCE: f64 = 0.99;

/// Configuration for the weighted ensemble
#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    /// Blend rate of the online update
    pub learning_rate: f64,
    /// Floor applied to every weight before normalization
    pub min_weight: f64,
    /// Filtered records the bootstrap replays at most
    pub history_window: usize,
    /// First replayed position (prefix length) for bootstrap and warm replay
    pub warmup: usize,
    /// Bootstrap is skipped below this many filtered records
    pub min_fit_records: usize,
    /// Bootstrap weight = accuracy ^ exponent
    pub accuracy_exponent: f64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.2,
            min_weight: 0.001,
            history_window: 500,
            warmup: 20,
            min_fit_records: 30,
            accuracy_exponent: 1.5,
        }
    }
}

/// Weight and running tally for one predictor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorWeight {
    pub weight: f64,
    pub correct: u64,
    pub total: u64,
}

impl PredictorWeight {
    fn new(weight: f64) -> Self {
        Self {
            weight,
            correct: 0,
            total: 0,
        }
    }

    fn record(&mut self, hit: bool) {
        self.total += 1;
        if hit {
            self.correct += 1;
        }
    }

    /// Running accuracy, None before the first vote
    pub fn accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct as f64 / self.total as f64)
        }
    }
}

/// Per-predictor statistics snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictorStats {
    pub id: &'static str,
    pub weight: f64,
    pub correct: u64,
    pub total: u64,
    pub accuracy: Option<f64>,
}

/// Combined categorical forecast
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleVote {
    pub category: Category,
    pub confidence: f64,
    /// True when no predictor voted
    pub fallback: bool,
    pub votes: Vec<PredictorVote>,
}

/// Weighted vote over the predictor library
pub struct WeightedEnsemble {
    config: EnsembleConfig,
    predictors: Vec<Box<dyn Predictor>>,
    weights: Vec<PredictorWeight>,
}

impl WeightedEnsemble {
    pub fn new(config: EnsembleConfig) -> Self {
        Self::with_predictors(config, default_predictors())
    }

    pub fn with_defaults() -> Self {
        Self::new(EnsembleConfig::default())
    }

    /// Uniform weights over `predictors`, in the given (tie-breaking) order
    pub fn with_predictors(config: EnsembleConfig, predictors: Vec<Box<dyn Predictor>>) -> Self {
        let uniform = if predictors.is_empty() {
            0.0
        } else {
            1.0 / predictors.len() as f64
        };
        let weights = vec![PredictorWeight::new(uniform); predictors.len()];
        Self {
            config,
            predictors,
            weights,
        }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Bootstrap from the trailing `history_window` filtered records.
    ///
    /// Replays every position from `warmup` on, tallying each predictor's
    /// votes against the realized category, then sets
    /// `weight = max(floor, accuracy^1.5)` (accuracy 0.5 for silent
    /// predictors) and normalizes. Does nothing below `min_fit_records`.
    /// Returns the number of replayed positions.
    pub fn fit_initial(&mut self, history: &[OutcomeRecord]) -> usize {
        let filtered: Vec<OutcomeRecord> =
            history.iter().filter(|r| r.category.is_live()).cloned().collect();
        let start = filtered.len().saturating_sub(self.config.history_window);
        let window = &filtered[start..];

        if window.len() < self.config.min_fit_records {
            debug!(
                "[Ensemble] Bootstrap skipped: {} usable records (< {})",
                window.len(),
                self.config.min_fit_records
            );
            return 0;
        }

        info!("[Ensemble] Bootstrapping on {} records", window.len());

        let mut replayed = 0;
        for i in self.config.warmup..window.len() {
            let features = HistoryFeatures::extract(&window[..i]);
            let actual = window[i].category;
            for (predictor, weight) in self.predictors.iter().zip(self.weights.iter_mut()) {
                if let Some(vote) = predictor.vote(&features) {
                    weight.record(vote == actual);
                }
            }
            replayed += 1;
        }

        for weight in &mut self.weights {
            let accuracy = weight.accuracy().unwrap_or(0.5);
            weight.weight = accuracy
                .powf(self.config.accuracy_exponent)
                .max(self.config.min_weight);
        }
        self.normalize();

        for (predictor, weight) in self.predictors.iter().zip(&self.weights) {
            if let Some(accuracy) = weight.accuracy() {
                debug!(
                    "[Ensemble]   {}: {:.1}% ({}/{})",
                    predictor.id(),
                    accuracy * 100.0,
                    weight.correct,
                    weight.total
                );
            }
        }

        replayed
    }

    /// Score every predictor's vote on `prefix` against `actual` and blend
    /// the running accuracy into its weight. Discard outcomes are ignored.
    pub fn update_with_outcome(&mut self, prefix: &[OutcomeRecord], actual: Category) {
        if !actual.is_live() {
            return;
        }
        let features = HistoryFeatures::extract(prefix);
        self.update_with_features(&features, actual);
    }

    pub(crate) fn update_with_features(&mut self, features: &HistoryFeatures, actual: Category) {
        if !actual.is_live() {
            return;
        }

        let rate = self.config.learning_rate;
        let floor = self.config.min_weight;

        for (predictor, weight) in self.predictors.iter().zip(self.weights.iter_mut()) {
            let Some(vote) = predictor.vote(features) else {
                continue;
            };
            weight.record(vote == actual);

            let target = weight.accuracy().unwrap_or(0.0).clamp(0.01, 1.0);
            let blended = rate * target + (1.0 - rate) * weight.weight;
            weight.weight = blended.max(floor);
        }

        self.normalize();
    }

    /// Weighted vote over `history`.
    ///
    /// Tallies are kept in first-vote order and a later category must beat
    /// the leader strictly, so ties go to the earlier-registered predictor.
    pub fn predict(&self, history: &[OutcomeRecord]) -> EnsembleVote {
        let features = HistoryFeatures::extract(history);
        self.predict_features(&features)
    }

    pub(crate) fn predict_features(&self, features: &HistoryFeatures) -> EnsembleVote {
        let mut tally: Vec<(Category, f64)> = Vec::with_capacity(2);
        let mut votes = Vec::with_capacity(self.predictors.len());

        for (predictor, weight) in self.predictors.iter().zip(&self.weights) {
            let vote = predictor.vote(features);
            if let Some(category) = vote {
                match tally.iter_mut().find(|(c, _)| *c == category) {
                    Some((_, sum)) => *sum += weight.weight,
                    None => tally.push((category, weight.weight)),
                }
            }
            votes.push(PredictorVote {
                predictor: predictor.id(),
                vote,
                weight: weight.weight,
            });
        }

        let mut best: Option<(Category, f64)> = None;
        for (category, sum) in &tally {
            if best.map_or(true, |(_, b)| *sum > b) {
                best = Some((*category, *sum));
            }
        }

        match best {
            None => EnsembleVote {
                category: FrequencyRebalancePredictor
                    .vote(features)
                    .unwrap_or(Category::Primary),
                confidence: FALLBACK_CONFIDENCE,
                fallback: true,
                votes,
            },
            Some((category, winning)) => {
                let total: f64 = tally.iter().map(|(_, w)| w).sum();
                let ratio = if total > 0.0 { winning / total } else { MIN_CONFIDENCE };
                EnsembleVote {
                    category,
                    confidence: ratio.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE),
                    fallback: false,
                    votes,
                }
            }
        }
    }

    /// Current weights in registration order
    pub fn weights(&self) -> Vec<(&'static str, f64)> {
        self.predictors
            .iter()
            .zip(&self.weights)
            .map(|(p, w)| (p.id(), w.weight))
            .collect()
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.iter().map(|w| w.weight).sum()
    }

    pub fn predictor_stats(&self) -> Vec<PredictorStats> {
        self.predictors
            .iter()
            .zip(&self.weights)
            .map(|(p, w)| PredictorStats {
                id: p.id(),
                weight: w.weight,
                correct: w.correct,
                total: w.total,
                accuracy: w.accuracy(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.predictors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty()
    }

    fn normalize(&mut self) {
        let total: f64 = self.weights.iter().map(|w| w.weight).sum();
        let total = if total > 0.0 { total } else { 1.0 };
        for weight in &mut self.weights {
            weight.weight /= total;
        }
    }
}
