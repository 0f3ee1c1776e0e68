//! Prediction engine
//!
//! - Feature extraction over the Discard-filtered history
//! - Ten heuristic predictors voting on the next category
//! - Weighted ensemble with online weight adaptation
//! - Score predictor narrowing the forecast to three totals

pub mod ensemble;
pub mod features;
pub mod predictors;
pub mod score;

pub use ensemble::{EnsembleConfig, EnsembleVote, PredictorStats, PredictorWeight, WeightedEnsemble};
pub use features::{CategoryCounts, HistoryFeatures, Run};
pub use predictors::{default_predictors, Predictor};
pub use score::{ScoreConfig, ScorePredictor, SelectionMemory};
