//! Shared session handle
//!
//! Serializes updates behind a write lock and hands readers fully computed
//! clones, so a reader never observes a half-applied update.

use super::{Session, SessionConfig};
use crate::error::Result;
use crate::types::{AccuracySnapshot, Category, OutcomeRecord, PredictionResult};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// What an ingest call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First batch: the session was created from it
    Initialized { records: usize },
    /// New rounds appended in order
    Appended { records: usize },
    /// Nothing newer than the last seen round
    Unchanged,
    /// The batch was empty
    Empty,
}

/// Point-in-time view for serving
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub last_record: Option<OutcomeRecord>,
    pub next_sequence_id: Option<u64>,
    pub prediction: PredictionResult,
    pub accuracy: AccuracySnapshot,
    pub accuracy_pct: Decimal,
    pub history_len: usize,
    pub recent: Vec<OutcomeRecord>,
    pub predictor_count: usize,
    pub primary_memory: usize,
    pub secondary_memory: usize,
}

/// Cloneable handle to a lazily initialized session
#[derive(Clone)]
pub struct SessionHandle {
    config: SessionConfig,
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionHandle {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Feed a batch of records sorted by ascending id.
    ///
    /// The first non-empty batch initializes the session. Later batches
    /// append only rounds newer than the last seen one.
    pub async fn ingest(&self, batch: Vec<OutcomeRecord>) -> Result<IngestOutcome> {
        if batch.is_empty() {
            return Ok(IngestOutcome::Empty);
        }

        let mut guard = self.inner.write().await;
        match guard.as_mut() {
            None => {
                let records = batch.len();
                *guard = Some(Session::initialize(batch, self.config.clone())?);
                info!("[Session] Initialized from {} records", records);
                Ok(IngestOutcome::Initialized { records })
            }
            Some(session) => {
                let last = session.last_record().map_or(0, |r| r.sequence_id);
                let mut appended = 0;
                for record in batch.into_iter().filter(|r| r.sequence_id > last) {
                    session.append(record)?;
                    appended += 1;
                }

                if appended == 0 {
                    debug!("[Session] No new rounds after {}", last);
                    Ok(IngestOutcome::Unchanged)
                } else {
                    Ok(IngestOutcome::Appended { records: appended })
                }
            }
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.read().await.is_some()
    }

    pub async fn prediction(&self) -> Option<PredictionResult> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|s| s.current_prediction().clone())
    }

    pub async fn accuracy(&self) -> Option<AccuracySnapshot> {
        self.inner.read().await.as_ref().map(|s| s.accuracy_snapshot())
    }

    pub async fn last_sequence_id(&self) -> Option<u64> {
        self.inner
            .read()
            .await
            .as_ref()
            .and_then(|s| s.last_record().map(|r| r.sequence_id))
    }

    /// Snapshot with the most recent `limit` records, newest first
    pub async fn snapshot(&self, limit: usize) -> Option<SessionSnapshot> {
        let guard = self.inner.read().await;
        let session = guard.as_ref()?;

        let accuracy = session.accuracy_snapshot();
        let mut recent = session.recent_history(limit).to_vec();
        recent.reverse();

        Some(SessionSnapshot {
            last_record: session.last_record().cloned(),
            next_sequence_id: session.next_sequence_id(),
            prediction: session.current_prediction().clone(),
            accuracy,
            accuracy_pct: accuracy.rate_pct(),
            history_len: session.history().len().min(session.config().serve_limit),
            recent,
            predictor_count: session.predictor_stats().len(),
            primary_memory: session.selection_memory_len(Category::Primary),
            secondary_memory: session.selection_memory_len(Category::Secondary),
        })
    }
}
