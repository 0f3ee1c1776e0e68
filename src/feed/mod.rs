//! Polling feed - Fetch → Ingest → Forecast
//!
//! Polls the history endpoint on a fixed interval and feeds every page into
//! the shared session. A failed poll is logged and counted; the loop keeps
//! going until `stop()` is called.

use crate::client::HistoryClient;
use crate::error::{Result, SicboError};
use crate::session::{IngestOutcome, SessionHandle};
use crate::types::OutcomeRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Feed configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// History endpoint
    pub url: String,
    /// Time between polls
    pub poll_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Something that yields the latest page of settled rounds
pub trait HistorySource {
    fn fetch(&self) -> impl Future<Output = Result<Vec<OutcomeRecord>>> + Send;
}

impl HistorySource for HistoryClient {
    fn fetch(&self) -> impl Future<Output = Result<Vec<OutcomeRecord>>> + Send {
        HistoryClient::fetch(self)
    }
}

/// Statistics for the feed loop
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedStats {
    pub polls: u64,
    pub appended: u64,
    pub errors: u64,
    pub last_poll: Option<DateTime<Utc>>,
    pub last_sequence_id: Option<u64>,
    pub start_time: Option<DateTime<Utc>>,
}

/// Feed loop runner
pub struct FeedLoop<S = HistoryClient> {
    config: FeedConfig,
    source: S,
    session: SessionHandle,
    stats: Arc<RwLock<FeedStats>>,
    running: Arc<RwLock<bool>>,
}

impl FeedLoop<HistoryClient> {
    /// Feed backed by the HTTP history client
    pub fn from_config(config: FeedConfig, session: SessionHandle) -> Result<Self> {
        let client = HistoryClient::new(&config.url)?;
        Ok(Self::new(config, client, session))
    }
}

impl<S: HistorySource> FeedLoop<S> {
    pub fn new(config: FeedConfig, source: S, session: SessionHandle) -> Self {
        Self {
            config,
            source,
            session,
            stats: Arc::new(RwLock::new(FeedStats::default())),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Run until `stop()` is called
    pub async fn start(&self) -> Result<()> {
        {
            let mut running = self.running.write().await;
            if *running {
                return Err(SicboError::Internal("Feed already running".into()));
            }
            *running = true;
        }

        {
            let mut stats = self.stats.write().await;
            stats.start_time = Some(Utc::now());
        }

        info!(
            "[Feed] Starting - url={}, every {}s",
            self.config.url,
            self.config.poll_interval.as_secs_f64()
        );

        let mut ticker = interval(self.config.poll_interval);
        loop {
            ticker.tick().await;
            if !*self.running.read().await {
                break;
            }
            let _ = self.poll_once().await;
        }

        info!("[Feed] Stopped");
        Ok(())
    }

    /// Stop the loop after the current tick
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;

        let stats = self.stats.read().await;
        info!(
            "[Feed] Stopping - polls={}, appended={}, errors={}",
            stats.polls, stats.appended, stats.errors
        );
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// One fetch and ingest. Failures are counted, not propagated past here.
    pub async fn poll_once(&self) -> Result<IngestOutcome> {
        let result = match self.source.fetch().await {
            Ok(records) => self.session.ingest(records).await,
            Err(e) => Err(e),
        };
        let last_sequence_id = self.session.last_sequence_id().await;

        let mut stats = self.stats.write().await;
        stats.polls += 1;
        stats.last_poll = Some(Utc::now());
        stats.last_sequence_id = last_sequence_id;

        match &result {
            Ok(IngestOutcome::Initialized { records }) => {
                info!("[Feed] Session initialized with {} rounds", records);
            }
            Ok(IngestOutcome::Appended { records }) => {
                stats.appended += *records as u64;
                info!(
                    "[Feed] {} new rounds, last {}",
                    records,
                    last_sequence_id.unwrap_or_default()
                );
            }
            Ok(IngestOutcome::Unchanged) | Ok(IngestOutcome::Empty) => {
                debug!("[Feed] No new rounds");
            }
            Err(e) => {
                stats.errors += 1;
                warn!("[Feed] Poll failed: {}", e);
            }
        }

        result
    }

    pub async fn stats(&self) -> FeedStats {
        self.stats.read().await.clone()
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}
