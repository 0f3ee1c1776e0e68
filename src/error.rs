//! Error types for the predictor
//!
//! Only the collaborator boundary (ingest, feed, config) and the append-order
//! contract can fail. Predictors and analyses never return errors: they abstain.

use thiserror::Error;

/// Crate-wide error
#[derive(Debug, Error)]
pub enum SicboError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Out-of-order record: {sequence_id} does not follow {last}")]
    OutOfOrder { sequence_id: u64, last: u64 },

    #[error("Session not initialized")]
    NotInitialized,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SicboError>;
