//! Application configuration
//!
//! Only operational settings are configurable: the feed endpoint and poll
//! interval, the server bind address, the session's serve and retention
//! limits and the score predictor's seed. Model coefficients are fixed and
//! a TOML section naming them is rejected. A few environment variables
//! override the file:
//! - `SICBO_FEED_URL`: history endpoint polled by `watch`
//! - `SICBO_POLL_SECS`: poll interval in seconds
//! - `SICBO_BIND`: address the HTTP server listens on
//! - `SICBO_SEED`: seed for the score predictor's coverage swap

use crate::error::{Result, SicboError};
use crate::feed::FeedConfig;
use crate::ml::ensemble::EnsembleConfig;
use crate::ml::score::ScoreConfig;
use crate::server::ServerConfig;
use crate::session::SessionConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const ENV_FEED_URL: &str = "SICBO_FEED_URL";
pub const ENV_POLL_SECS: &str = "SICBO_POLL_SECS";
pub const ENV_BIND: &str = "SICBO_BIND";
pub const ENV_SEED: &str = "SICBO_SEED";

/// Feed section of the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedSettings {
    /// History endpoint. Empty means unset.
    pub url: String,
    pub poll_secs: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            poll_secs: 5,
        }
    }
}

/// Session section of the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSettings {
    pub serve_limit: usize,
    pub retention_limit: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            serve_limit: session.serve_limit,
            retention_limit: session.retention_limit,
        }
    }
}

/// Score section of the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoreSettings {
    pub seed: Option<u64>,
}

/// Server section of the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: ServerConfig::default().bind_addr.to_string(),
        }
    }
}

/// Everything the binary needs to run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub feed: FeedSettings,
    pub session: SessionSettings,
    pub score: ScoreSettings,
    pub server: ServerSettings,
}

impl AppConfig {
    /// Defaults, then the optional file, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SicboError::Config(e.to_string()))
    }

    /// Apply overrides from `lookup`, normally the process environment
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_FEED_URL) {
            self.feed.url = url;
        }
        if let Some(secs) = lookup(ENV_POLL_SECS) {
            self.feed.poll_secs = secs
                .trim()
                .parse()
                .map_err(|_| SicboError::Config(format!("{}={} is not a number", ENV_POLL_SECS, secs)))?;
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(seed) = lookup(ENV_SEED) {
            let seed = seed
                .trim()
                .parse()
                .map_err(|_| SicboError::Config(format!("{}={} is not a number", ENV_SEED, seed)))?;
            self.score.seed = Some(seed);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed.poll_secs == 0 {
            return Err(SicboError::Config("feed.poll_secs must be positive".into()));
        }
        if self.session.serve_limit == 0 {
            return Err(SicboError::Config("session.serve_limit must be positive".into()));
        }
        let window = EnsembleConfig::default().history_window;
        if self.session.retention_limit < window {
            return Err(SicboError::Config(format!(
                "session.retention_limit must be at least {}",
                window
            )));
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            serve_limit: self.session.serve_limit,
            retention_limit: self.session.retention_limit,
            score: ScoreConfig {
                seed: self.score.seed,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            bind_addr: self.bind_addr()?,
        })
    }

    fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind.trim().parse().map_err(|_| {
            SicboError::Config(format!("server.bind={} is not a socket address", self.server.bind))
        })
    }

    /// Feed settings, failing when no URL was configured
    pub fn feed_config(&self) -> Result<FeedConfig> {
        if self.feed.url.trim().is_empty() {
            return Err(SicboError::Config(format!(
                "no feed url: set feed.url or {}",
                ENV_FEED_URL
            )));
        }
        Ok(FeedConfig {
            url: self.feed.url.clone(),
            poll_interval: Duration::from_secs(self.feed.poll_secs),
        })
    }
}
