use std::time::Duration;

use anyhow::{ensure, Context, Result};

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
/// Everything has a default, so a bare invocation talks to a local service.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub request_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` feeds it the process
    /// environment; tests feed it a fixed table.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        ensure!(timeout_secs > 0, "REQUEST_TIMEOUT_SECS must be at least 1 second");

        Ok(Config {
            api_base: lookup("RECOMMENDER_API_BASE")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Applies command-line overrides on top of the environment. A blank base
    /// or a zero timeout leaves the current value in place.
    pub fn with_overrides(mut self, api_base: Option<String>, timeout_secs: Option<u64>) -> Self {
        if let Some(base) = api_base.filter(|v| !v.trim().is_empty()) {
            self.api_base = base;
        }
        if let Some(secs) = timeout_secs.filter(|secs| *secs > 0) {
            self.request_timeout = Duration::from_secs(secs);
        }
        self
    }
}
