//! Session manager
//!
//! Owns the running history, the ensemble, the score predictor and the
//! cached forecast. Each `append` runs one complete update cycle:
//! score the previous forecast → update weights → re-vote → pick totals.

pub mod shared;

#[cfg(test)]
mod tests;

pub use shared::{IngestOutcome, SessionHandle, SessionSnapshot};

use crate::error::{Result, SicboError};
use crate::ml::ensemble::{EnsembleConfig, PredictorStats, WeightedEnsemble};
use crate::ml::features::tail;
use crate::ml::score::{ScoreConfig, ScorePredictor};
use crate::types::{AccuracySnapshot, Category, OutcomeRecord, PredictionResult};
use tracing::{debug, info};

/// Configuration for a prediction session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Usable records that must precede an outcome before it is scored
    pub min_update_prefix: usize,
    /// Log cumulative accuracy every this many scored forecasts
    pub accuracy_log_every: u64,
    /// Records exposed by snapshots and history readers
    pub serve_limit: usize,
    /// Records kept in memory; older rounds are dropped after each append
    pub retention_limit: usize,
    pub ensemble: EnsembleConfig,
    pub score: ScoreConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_update_prefix: 10,
            accuracy_log_every: 50,
            serve_limit: 500,
            retention_limit: 500,
            ensemble: EnsembleConfig::default(),
            score: ScoreConfig::default(),
        }
    }
}

/// Live prediction state for one outcome stream
pub struct Session {
    config: SessionConfig,
    history: Vec<OutcomeRecord>,
    ensemble: WeightedEnsemble,
    scores: ScorePredictor,
    current: PredictionResult,
    accuracy: AccuracySnapshot,
}

impl Session {
    /// Bootstrap from an ordered batch.
    ///
    /// Fits the ensemble, replays the usable history through the online
    /// update so the weights match what live updates would have produced,
    /// then caches the first forecast.
    pub fn initialize(records: Vec<OutcomeRecord>, config: SessionConfig) -> Result<Self> {
        if records.is_empty() {
            return Err(SicboError::NotInitialized);
        }
        for pair in records.windows(2) {
            if pair[1].sequence_id <= pair[0].sequence_id {
                return Err(SicboError::OutOfOrder {
                    sequence_id: pair[1].sequence_id,
                    last: pair[0].sequence_id,
                });
            }
        }

        let mut ensemble = WeightedEnsemble::new(config.ensemble.clone());
        let replayed = ensemble.fit_initial(&records);

        let live: Vec<OutcomeRecord> = records
            .iter()
            .filter(|r| r.category.is_live())
            .cloned()
            .collect();
        let warmup = config.ensemble.warmup;
        for i in warmup..live.len() {
            ensemble.update_with_outcome(&live[..i], live[i].category);
        }

        let loaded = records.len();
        let mut history = records;
        Self::trim(&mut history, config.retention_limit);

        let mut scores = ScorePredictor::new(config.score.clone());
        let current = Self::forecast(&ensemble, &mut scores, &history);

        info!(
            "[Session] Loaded {} records ({} usable, {} bootstrap positions, {} retained)",
            loaded,
            live.len(),
            replayed,
            history.len()
        );
        if let Some(last) = history.last() {
            info!(
                "[Session] Next round {}: {} ({}%) totals [{}]",
                last.sequence_id + 1,
                current.label(),
                current.confidence_pct(),
                current.values_label()
            );
        }

        Ok(Self {
            config,
            history,
            ensemble,
            scores,
            current,
            accuracy: AccuracySnapshot::default(),
        })
    }

    /// Append one settled round and refresh the forecast.
    ///
    /// The round is scored against the cached forecast (Discard rounds never
    /// are) once enough usable history precedes it. A non-increasing id is
    /// rejected and leaves the session untouched.
    pub fn append(&mut self, record: OutcomeRecord) -> Result<&PredictionResult> {
        if let Some(last) = self.history.last() {
            if record.sequence_id <= last.sequence_id {
                return Err(SicboError::OutOfOrder {
                    sequence_id: record.sequence_id,
                    last: last.sequence_id,
                });
            }
        }

        let usable = self.history.iter().filter(|r| r.category.is_live()).count();
        if usable >= self.config.min_update_prefix {
            // features drop Discard rounds, so the raw prefix is equivalent
            self.ensemble.update_with_outcome(&self.history, record.category);

            if record.category.is_live() {
                self.accuracy.record(self.current.category == record.category);
                let every = self.config.accuracy_log_every;
                if every > 0 && self.accuracy.total % every == 0 {
                    info!(
                        "[Session] Accuracy {}% ({}/{})",
                        self.accuracy.rate_pct(),
                        self.accuracy.hits,
                        self.accuracy.total
                    );
                }
            }
        }

        self.history.push(record);
        Self::trim(&mut self.history, self.config.retention_limit);
        self.current = Self::forecast(&self.ensemble, &mut self.scores, &self.history);

        if let Some(last) = self.history.last() {
            info!(
                "[Session] Round {} -> {}. Next round {}: {} totals [{}]",
                last.sequence_id,
                last.label(),
                last.sequence_id + 1,
                self.current.label(),
                self.current.values_label()
            );
        }

        Ok(&self.current)
    }

    /// Drop the oldest records beyond `limit`
    fn trim(history: &mut Vec<OutcomeRecord>, limit: usize) {
        if limit > 0 && history.len() > limit {
            let excess = history.len() - limit;
            history.drain(..excess);
        }
    }

    fn forecast(
        ensemble: &WeightedEnsemble,
        scores: &mut ScorePredictor,
        history: &[OutcomeRecord],
    ) -> PredictionResult {
        let vote = ensemble.predict(history);
        let representative_values = scores.predict(history, vote.category);
        debug!(
            "[Session] Vote {} conf {:.3} fallback={}",
            vote.category, vote.confidence, vote.fallback
        );

        PredictionResult {
            category: vote.category,
            confidence: vote.confidence,
            representative_values,
            fallback: vote.fallback,
            votes: vote.votes,
        }
    }

    /// The cached forecast for the next round
    pub fn current_prediction(&self) -> &PredictionResult {
        &self.current
    }

    pub fn accuracy_snapshot(&self) -> AccuracySnapshot {
        self.accuracy
    }

    pub fn history(&self) -> &[OutcomeRecord] {
        &self.history
    }

    /// The most recent `limit` records, capped at the serve limit
    pub fn recent_history(&self, limit: usize) -> &[OutcomeRecord] {
        tail(&self.history, limit.min(self.config.serve_limit))
    }

    pub fn last_record(&self) -> Option<&OutcomeRecord> {
        self.history.last()
    }

    pub fn next_sequence_id(&self) -> Option<u64> {
        self.history.last().map(|r| r.sequence_id + 1)
    }

    pub fn predictor_stats(&self) -> Vec<PredictorStats> {
        self.ensemble.predictor_stats()
    }

    pub fn weight_sum(&self) -> f64 {
        self.ensemble.weight_sum()
    }

    /// Remembered score selections for a category
    pub fn selection_memory_len(&self, category: Category) -> usize {
        self.scores.memory().len(category)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
