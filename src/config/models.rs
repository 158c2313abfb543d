// src/config/models.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CHECKS: &[&str] = &[
    ".checks.check_storage",
    ".checks.check_database",
    ".checks.check_cache_set",
    ".checks.check_cache_get",
];

pub const DEFAULT_EXTENDED_CHECKS: &[&str] = &[
    ".checks.check_user_exists",
    ".checks.check_async_poll",
];

/// Upper bound on `async_poll.timeout_secs`.
pub const MAX_POLL_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Checks run on every request.
    pub checks: Vec<String>,
    /// Checks appended when the request asks for `extended`.
    pub extended_checks: Vec<String>,
    pub async_poll: AsyncPollConfig,
    pub dispatcher: DispatcherConfig,
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub backends: BackendsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checks: DEFAULT_CHECKS.iter().map(|s| s.to_string()).collect(),
            extended_checks: DEFAULT_EXTENDED_CHECKS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            async_poll: AsyncPollConfig::default(),
            dispatcher: DispatcherConfig::default(),
            server: ServerConfig::default(),
            metrics: MetricsConfig::default(),
            backends: BackendsConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        for id in self.checks.iter().chain(self.extended_checks.iter()) {
            if id.trim().is_empty() {
                bail!("Check identifiers must not be empty");
            }
        }

        self.async_poll.validate()?;

        if !self.server.path.starts_with('/') {
            bail!("server.path must start with '/': {}", self.server.path);
        }
        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            bail!("metrics.path must start with '/': {}", self.metrics.path);
        }
        if self.backends.storage_timeout_secs == 0 {
            bail!("backends.storage_timeout_secs must be greater than zero");
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncPollConfig {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for AsyncPollConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            poll_interval_ms: 250,
        }
    }
}

impl AsyncPollConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("async_poll.timeout_secs must be greater than zero");
        }
        if self.timeout_secs > MAX_POLL_TIMEOUT_SECS {
            bail!(
                "async_poll.timeout_secs ({}) must not exceed {}",
                self.timeout_secs,
                MAX_POLL_TIMEOUT_SECS
            );
        }
        if self.poll_interval_ms == 0 {
            bail!("async_poll.poll_interval_ms must be greater than zero");
        }
        if self.poll_interval() >= self.timeout() {
            bail!(
                "async_poll.poll_interval_ms ({}) must be shorter than the timeout ({}s)",
                self.poll_interval_ms,
                self.timeout_secs
            );
        }
        if self.timeout_secs > 60 {
            tracing::warn!(
                "async_poll.timeout_secs is {}; a heartbeat request may block that long",
                self.timeout_secs
            );
        }
        Ok(())
    }
}

/// What the dispatcher does with a check that errors or panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Report the fault as a failed check and keep going.
    #[default]
    Isolate,
    /// Abort the whole dispatch on the first fault.
    Propagate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub fault_policy: FaultPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            path: "/heartbeat".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
            path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Probe storage over HTTP instead of the in-memory backend.
    pub storage_url: Option<Url>,
    pub storage_timeout_secs: u64,
    /// Usernames seeded into the in-memory user directory.
    pub users: Vec<String>,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            storage_url: None,
            storage_timeout_secs: 5,
            users: Vec::new(),
        }
    }
}

impl BackendsConfig {
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }
}
