//! Sic bo outcome forecaster
//!
//! Ten lightweight heuristic predictors vote on whether the next round is
//! tai (11-17) or xiu (4-10). An online-weighted ensemble combines the votes
//! and a score predictor narrows the forecast to three representative totals.
//! Triples at 3 and 18 (bao) are recorded but never predicted or scored.

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod ingester;
pub mod ml;
pub mod server;
pub mod session;
pub mod testing;
pub mod types;

pub use error::{Result, SicboError};
pub use session::{Session, SessionConfig, SessionHandle};
pub use types::{AccuracySnapshot, Category, OutcomeRecord, PredictionResult};
