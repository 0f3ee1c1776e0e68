//! HTTP read API
//!
//! Serves the live forecast and history from a [`SessionHandle`] while the
//! feed keeps appending rounds:
//! - GET /api/sicbo/b52: last round and the forecast for the next one
//! - GET /api/sicbo/history: retained rounds, newest first
//! - GET /api/sicbo/stats: accuracy, predictor count and selection memory
//! - GET /: service index

use crate::error::Result;
use crate::ml::default_predictors;
use crate::session::{SessionHandle, SessionSnapshot};
use crate::types::{Category, OutcomeRecord};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub const FORECAST_PATH: &str = "/api/sicbo/b52";
pub const HISTORY_PATH: &str = "/api/sicbo/history";
pub const STATS_PATH: &str = "/api/sicbo/stats";

/// Label reported while the session is still waiting for its first batch
pub const PENDING_LABEL: &str = "pending";

/// Shared server state
pub struct ServerState {
    pub session: SessionHandle,
    pub start_time: Instant,
}

impl ServerState {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            start_time: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub last_sequence_id: Option<u64>,
    pub dice: Option<[u8; 3]>,
    pub total: Option<u8>,
    pub result: String,
    pub next_sequence_id: Option<u64>,
    pub prediction: String,
    pub representative_values: String,
    pub confidence: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub sequence_id: u64,
    pub dice: [u8; 3],
    pub total: u8,
    pub result: &'static str,
}

impl From<&OutcomeRecord> for HistoryEntry {
    fn from(record: &OutcomeRecord) -> Self {
        Self {
            sequence_id: record.sequence_id,
            dice: record.dice,
            total: record.total,
            result: record.label(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MemoryStats {
    pub tai_selections: usize,
    pub xiu_selections: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub history_len: usize,
    pub next_sequence_id: Option<u64>,
    pub accuracy: String,
    pub scored: u64,
    pub hits: u64,
    pub predictor_count: usize,
    pub ranges: BTreeMap<&'static str, Vec<u8>>,
    pub memory: MemoryStats,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub endpoints: BTreeMap<&'static str, &'static str>,
    pub predictor_count: usize,
    pub next_sequence_id: Option<u64>,
    pub history_len: usize,
}

fn ranges() -> BTreeMap<&'static str, Vec<u8>> {
    [Category::Primary, Category::Secondary]
        .into_iter()
        .map(|c| (c.label(), c.candidate_totals().to_vec()))
        .collect()
}

async fn latest(state: &ServerState) -> Option<SessionSnapshot> {
    state.session.snapshot(1).await
}

/// GET /api/sicbo/b52
async fn forecast_handler(State(state): State<Arc<ServerState>>) -> Json<ForecastResponse> {
    let response = match latest(&state).await {
        Some(snapshot) => {
            let last = snapshot.last_record.as_ref();
            ForecastResponse {
                last_sequence_id: last.map(|r| r.sequence_id),
                dice: last.map(|r| r.dice),
                total: last.map(|r| r.total),
                result: last.map_or(PENDING_LABEL, |r| r.label()).to_string(),
                next_sequence_id: snapshot.next_sequence_id,
                prediction: snapshot.prediction.label().to_string(),
                representative_values: snapshot.prediction.values_label(),
                confidence: format!("{}%", snapshot.prediction.confidence_pct()),
            }
        }
        None => ForecastResponse {
            last_sequence_id: None,
            dice: None,
            total: None,
            result: PENDING_LABEL.to_string(),
            next_sequence_id: None,
            prediction: PENDING_LABEL.to_string(),
            representative_values: String::new(),
            confidence: "0%".to_string(),
        },
    };
    Json(response)
}

/// GET /api/sicbo/history
async fn history_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.session.snapshot(usize::MAX).await {
        Some(snapshot) if !snapshot.recent.is_empty() => {
            let entries: Vec<HistoryEntry> = snapshot.recent.iter().map(HistoryEntry::from).collect();
            Json(entries).into_response()
        }
        _ => Json(MessageResponse {
            message: "no history yet",
        })
        .into_response(),
    }
}

/// GET /api/sicbo/stats
async fn stats_handler(State(state): State<Arc<ServerState>>) -> Json<StatsResponse> {
    let snapshot = latest(&state).await;
    let (accuracy, memory) = match &snapshot {
        Some(s) => (
            s.accuracy,
            MemoryStats {
                tai_selections: s.primary_memory,
                xiu_selections: s.secondary_memory,
            },
        ),
        None => (
            Default::default(),
            MemoryStats {
                tai_selections: 0,
                xiu_selections: 0,
            },
        ),
    };

    Json(StatsResponse {
        history_len: snapshot.as_ref().map_or(0, |s| s.history_len),
        next_sequence_id: snapshot.as_ref().and_then(|s| s.next_sequence_id),
        accuracy: format!("{}%", accuracy.rate_pct()),
        scored: accuracy.total,
        hits: accuracy.hits,
        predictor_count: snapshot
            .as_ref()
            .map_or_else(|| default_predictors().len(), |s| s.predictor_count),
        ranges: ranges(),
        memory,
    })
}

/// GET /
async fn index_handler(State(state): State<Arc<ServerState>>) -> Json<IndexResponse> {
    let snapshot = latest(&state).await;
    let endpoints = BTreeMap::from([
        ("forecast", FORECAST_PATH),
        ("history", HISTORY_PATH),
        ("stats", STATS_PATH),
    ]);

    Json(IndexResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        endpoints,
        predictor_count: snapshot
            .as_ref()
            .map_or_else(|| default_predictors().len(), |s| s.predictor_count),
        next_sequence_id: snapshot.as_ref().and_then(|s| s.next_sequence_id),
        history_len: snapshot.as_ref().map_or(0, |s| s.history_len),
    })
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
        }
    }
}

pub fn router(session: SessionHandle) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route(FORECAST_PATH, get(forecast_handler))
        .route(HISTORY_PATH, get(history_handler))
        .route(STATS_PATH, get(stats_handler))
        .with_state(Arc::new(ServerState::new(session)))
}

/// Serve until the listener fails
pub async fn run_server(config: ServerConfig, session: SessionHandle) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    serve(listener, session).await
}

/// Serve on an already bound listener
pub async fn serve(listener: tokio::net::TcpListener, session: SessionHandle) -> Result<()> {
    info!("[Server] Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(session)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use crate::testing::HistoryGenerator;
    use serde_json::Value;

    async fn spawn(session: SessionHandle) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, session));
        format!("http://{}", addr)
    }

    async fn get_json(url: String) -> Value {
        let response = reqwest::get(url).await.unwrap();
        assert!(response.status().is_success());
        response.json().await.unwrap()
    }

    fn seeded() -> SessionHandle {
        let mut config = SessionConfig::default();
        config.score.seed = Some(21);
        SessionHandle::new(config)
    }

    #[test]
    fn test_default_bind() {
        assert_eq!(ServerConfig::default().bind_addr.port(), 8080);
    }

    #[tokio::test]
    async fn test_endpoints_before_first_batch() {
        let base = spawn(seeded()).await;

        let forecast = get_json(format!("{}{}", base, FORECAST_PATH)).await;
        assert_eq!(forecast["prediction"], PENDING_LABEL);
        assert_eq!(forecast["confidence"], "0%");
        assert!(forecast["last_sequence_id"].is_null());

        let history = get_json(format!("{}{}", base, HISTORY_PATH)).await;
        assert!(history["message"].is_string());

        let stats = get_json(format!("{}{}", base, STATS_PATH)).await;
        assert_eq!(stats["history_len"], 0);
        assert_eq!(stats["accuracy"], "0%");
        assert_eq!(stats["predictor_count"], 10);
    }

    #[tokio::test]
    async fn test_endpoints_follow_ingest() {
        let session = seeded();
        let base = spawn(session.clone()).await;
        let records = HistoryGenerator::random(4, 60);
        session.ingest(records[..50].to_vec()).await.unwrap();

        let forecast = get_json(format!("{}{}", base, FORECAST_PATH)).await;
        assert_eq!(forecast["last_sequence_id"], 50);
        assert_eq!(forecast["next_sequence_id"], 51);
        assert_eq!(forecast["result"], records[49].label());
        let prediction = session.prediction().await.unwrap();
        assert_eq!(forecast["prediction"], prediction.label());
        assert_eq!(forecast["representative_values"], prediction.values_label());

        // appended rounds are visible to the next request
        session.ingest(records[50..].to_vec()).await.unwrap();
        let history = get_json(format!("{}{}", base, HISTORY_PATH)).await;
        let entries = history.as_array().unwrap();
        assert_eq!(entries.len(), 60);
        assert_eq!(entries[0]["sequence_id"], 60);
        assert_eq!(entries[59]["sequence_id"], 1);

        let stats = get_json(format!("{}{}", base, STATS_PATH)).await;
        assert_eq!(stats["history_len"], 60);
        assert_eq!(stats["next_sequence_id"], 61);
        assert_eq!(stats["ranges"]["tai"], serde_json::json!([11, 12, 13, 14, 15, 16, 17]));
        assert_eq!(stats["ranges"]["xiu"], serde_json::json!([4, 5, 6, 7, 8, 9, 10]));
        let scored = stats["scored"].as_u64().unwrap();
        assert!(scored <= 10);
        assert!(stats["hits"].as_u64().unwrap() <= scored);

        let index = get_json(base).await;
        assert_eq!(index["status"], "ok");
        assert_eq!(index["endpoints"]["forecast"], FORECAST_PATH);
        assert_eq!(index["history_len"], 60);
    }
}
