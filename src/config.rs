//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::jobs::{Backoff, PollOptions};

// == Environment ==
/// Selects which configuration profile the config source reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Short profile suffix used in config file names.
    pub fn profile(&self) -> &'static str {
        match self {
            Environment::Development => "dev",
            Environment::Production => "prod",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Configuration profile selector
    pub environment: Environment,
    /// Directory holding `config-<profile>.json`
    pub config_dir: PathBuf,
    /// HTTP server port
    pub server_port: u16,
    /// Delay between job status checks in milliseconds
    pub poll_interval_ms: u64,
    /// Overall poll budget in seconds
    pub poll_timeout: u64,
    /// Maximum number of status checks per job
    pub poll_max_attempts: u32,
    /// Growth of the poll delay between retries
    pub poll_backoff: Backoff,
    /// Upper bound on the poll delay in milliseconds
    pub poll_max_interval_ms: u64,
    /// Resolved notifications retained for display
    pub notification_history: usize,
    /// Retention task interval in seconds
    pub retention_interval: u64,
    /// Age in seconds after which resolved notifications are pruned
    pub notification_max_age: u64,
    /// How long simulated backend jobs stay in progress, in milliseconds
    pub simulated_job_ms: u64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `APP_ENV` - `development` or `production` (default: development)
    /// - `CONFIG_DIR` - Directory of config profiles (default: config)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `POLL_INTERVAL_MS` - Job poll interval (default: 1000)
    /// - `POLL_TIMEOUT_SECS` - Job poll budget (default: 300)
    /// - `POLL_MAX_ATTEMPTS` - Job poll attempts (default: 300)
    /// - `POLL_BACKOFF` - none, linear or exponential (default: exponential)
    /// - `POLL_MAX_INTERVAL_MS` - Poll delay cap (default: 10000)
    /// - `NOTIFICATION_HISTORY` - Resolved notifications kept (default: 50)
    /// - `RETENTION_INTERVAL` - Retention task frequency in seconds (default: 60)
    /// - `NOTIFICATION_MAX_AGE` - Resolved notification lifetime in seconds (default: 3600)
    /// - `SIMULATED_JOB_MS` - Simulated backend job duration (default: 1500)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            environment: env_or("APP_ENV", defaults.environment),
            config_dir: env::var("CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_dir),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            poll_interval_ms: env_or("POLL_INTERVAL_MS", defaults.poll_interval_ms),
            poll_timeout: env_or("POLL_TIMEOUT_SECS", defaults.poll_timeout),
            poll_max_attempts: env_or("POLL_MAX_ATTEMPTS", defaults.poll_max_attempts),
            poll_backoff: env_or("POLL_BACKOFF", defaults.poll_backoff),
            poll_max_interval_ms: env_or("POLL_MAX_INTERVAL_MS", defaults.poll_max_interval_ms),
            notification_history: env_or("NOTIFICATION_HISTORY", defaults.notification_history),
            retention_interval: env_or("RETENTION_INTERVAL", defaults.retention_interval),
            notification_max_age: env_or("NOTIFICATION_MAX_AGE", defaults.notification_max_age),
            simulated_job_ms: env_or("SIMULATED_JOB_MS", defaults.simulated_job_ms),
        }
    }

    /// Poll options derived from the poll settings.
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.poll_timeout),
            max_attempts: self.poll_max_attempts,
            backoff: self.poll_backoff,
            max_interval: Duration::from_millis(self.poll_max_interval_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            config_dir: PathBuf::from("config"),
            server_port: 3000,
            poll_interval_ms: 1000,
            poll_timeout: 300,
            poll_max_attempts: 300,
            poll_backoff: Backoff::Exponential,
            poll_max_interval_ms: 10_000,
            notification_history: 50,
            retention_interval: 60,
            notification_max_age: 3600,
            simulated_job_ms: 1500,
        }
    }
}
