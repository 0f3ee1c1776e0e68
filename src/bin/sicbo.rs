//! Sic bo forecaster CLI
//!
//! Commands:
//! - predict: Load a history file and print the next-round forecast
//! - replay: Walk a history file round by round and report accuracy
//! - watch: Poll the history endpoint and serve the live forecast over HTTP

use anyhow::Context;
use clap::{Parser, Subcommand};
use sicbo_predictor::config::AppConfig;
use sicbo_predictor::feed::FeedLoop;
use sicbo_predictor::ingester::{parse_history_json, parse_records_json};
use sicbo_predictor::server::run_server;
use sicbo_predictor::session::{Session, SessionHandle};
use sicbo_predictor::types::OutcomeRecord;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sicbo")]
#[command(about = "Adaptive tai/xiu forecaster for sic bo outcome streams")]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the forecast for the round after a history file
    Predict {
        /// JSON array of records, or a raw history page
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Replay a history file and report live accuracy
    Replay {
        /// JSON array of records, or a raw history page
        #[arg(short, long)]
        file: PathBuf,
        /// Records used to initialize before replaying the rest
        #[arg(short, long, default_value = "100")]
        warmup: usize,
        /// Seed for the score predictor
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Poll the history endpoint and serve forecasts until Ctrl-C
    Watch {
        /// History endpoint, overrides the config
        #[arg(short, long)]
        url: Option<String>,
        /// Poll interval in seconds, overrides the config
        #[arg(short, long)]
        interval: Option<u64>,
        /// HTTP listen address, overrides the config
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Predict { file } => {
            let records = load_records(&file)?;
            let session = Session::initialize(records, config.session_config())?;
            println!("{}", serde_json::to_string_pretty(session.current_prediction())?);
        }
        Commands::Replay { file, warmup, seed } => {
            if seed.is_some() {
                config.score.seed = seed;
            }
            let records = load_records(&file)?;
            replay(records, warmup, &config)?;
        }
        Commands::Watch { url, interval, bind } => {
            if let Some(url) = url {
                config.feed.url = url;
            }
            if let Some(secs) = interval {
                config.feed.poll_secs = secs;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            config.validate()?;
            watch(&config).await?;
        }
    }

    Ok(())
}

/// Accepts either a plain record array or a raw history page
fn load_records(path: &Path) -> anyhow::Result<Vec<OutcomeRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let records = match parse_records_json(&text) {
        Ok(records) => records,
        Err(_) => parse_history_json(&text)
            .with_context(|| format!("{} is neither a record array nor a history page", path.display()))?,
    };
    anyhow::ensure!(!records.is_empty(), "{} holds no usable records", path.display());
    Ok(records)
}

fn replay(records: Vec<OutcomeRecord>, warmup: usize, config: &AppConfig) -> anyhow::Result<()> {
    let split = warmup.clamp(1, records.len());
    let (head, rest) = records.split_at(split);
    let mut session = Session::initialize(head.to_vec(), config.session_config())?;

    for record in rest {
        let forecast = session.current_prediction().clone();
        let outcome = if !record.category.is_live() {
            "skip"
        } else if forecast.category == record.category {
            "HIT"
        } else {
            "MISS"
        };
        println!(
            "{:>10}  {} {:>3}%  [{}]  -> {:>2} {}  {}",
            record.sequence_id,
            forecast.label(),
            forecast.confidence_pct(),
            forecast.values_label(),
            record.total,
            record.label(),
            outcome
        );
        session.append(record.clone())?;
    }

    let accuracy = session.accuracy_snapshot();
    println!(
        "accuracy {}% ({}/{}) over {} replayed rounds",
        accuracy.rate_pct(),
        accuracy.hits,
        accuracy.total,
        rest.len()
    );
    Ok(())
}

async fn watch(config: &AppConfig) -> anyhow::Result<()> {
    let handle = SessionHandle::new(config.session_config());
    let feed = FeedLoop::from_config(config.feed_config()?, handle.clone())?;
    let server = run_server(config.server_config()?, handle.clone());

    tokio::select! {
        result = feed.start() => result?,
        result = server => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received");
            feed.stop().await;
        }
    }

    if let Some(snapshot) = handle.snapshot(10).await {
        info!("Final snapshot: {}", serde_json::to_string(&snapshot)?);
    }
    info!("Feed stats: {:?}", feed.stats().await);
    Ok(())
}
