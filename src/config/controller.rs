//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use super::{env_var_or_default, env_var_or_default_str};
use crate::constants::*;
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Concurrent reconciles per resource kind
    pub max_concurrent_reconciles: u16,
    /// Requeue interval once a resource is Active (seconds)
    pub resync_interval_secs: u64,
    /// Requeue interval while a resource is Provisioning (seconds)
    pub provisioning_requeue_secs: u64,
    /// Requeue interval after a Failed lifecycle state (seconds)
    pub failed_requeue_secs: u64,
    /// Requeue interval while teardown is still in progress (seconds)
    pub delete_requeue_secs: u64,
    /// Fibonacci backoff floor for reconcile errors (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci backoff ceiling for reconcile errors (minutes)
    pub backoff_max_minutes: u64,
    /// Exponential backoff starting value for watch 429s (milliseconds)
    pub backoff_start_ms: u64,
    /// Exponential backoff maximum value for watch 429s (milliseconds)
    pub backoff_max_ms: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Lowercased kind names to run controllers for; empty means every kind
    pub enabled_kinds: Vec<String>,
    /// Default log directive when `RUST_LOG` is unset
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            provisioning_requeue_secs: DEFAULT_PROVISIONING_REQUEUE_SECS,
            failed_requeue_secs: DEFAULT_FAILED_REQUEUE_SECS,
            delete_requeue_secs: DEFAULT_DELETE_REQUEUE_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            enabled_kinds: Vec::new(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_concurrent_reconciles: env_var_or_default(
                "MAX_CONCURRENT_RECONCILES",
                DEFAULT_MAX_CONCURRENT_RECONCILES,
            )
            .max(1),
            resync_interval_secs: env_var_or_default(
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            provisioning_requeue_secs: env_var_or_default(
                "PROVISIONING_REQUEUE_SECS",
                DEFAULT_PROVISIONING_REQUEUE_SECS,
            ),
            failed_requeue_secs: env_var_or_default(
                "FAILED_REQUEUE_SECS",
                DEFAULT_FAILED_REQUEUE_SECS,
            ),
            delete_requeue_secs: env_var_or_default(
                "DELETE_REQUEUE_SECS",
                DEFAULT_DELETE_REQUEUE_SECS,
            ),
            backoff_min_minutes: env_var_or_default(
                "BACKOFF_MIN_MINUTES",
                DEFAULT_BACKOFF_MIN_MINUTES,
            ),
            backoff_max_minutes: env_var_or_default(
                "BACKOFF_MAX_MINUTES",
                DEFAULT_BACKOFF_MAX_MINUTES,
            ),
            backoff_start_ms: env_var_or_default("BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: env_var_or_default("BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_restart_delay_after_end_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
            enabled_kinds: parse_kind_list(&env_var_or_default_str("ENABLED_KINDS", "all")),
            log_level: env_var_or_default_str("LOG_LEVEL", "info"),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
        }
    }

    /// Whether a controller should run for `kind` (matched case-insensitively)
    #[must_use]
    pub fn is_kind_enabled(&self, kind: &str) -> bool {
        self.enabled_kinds.is_empty()
            || self
                .enabled_kinds
                .iter()
                .any(|k| k.eq_ignore_ascii_case(kind))
    }

    /// Get resync duration for Active resources
    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Get requeue duration for Provisioning resources
    #[must_use]
    pub fn provisioning_requeue(&self) -> Duration {
        Duration::from_secs(self.provisioning_requeue_secs)
    }

    /// Get requeue duration for Failed resources
    #[must_use]
    pub fn failed_requeue(&self) -> Duration {
        Duration::from_secs(self.failed_requeue_secs)
    }

    /// Get requeue duration while teardown is in progress
    #[must_use]
    pub fn delete_requeue(&self) -> Duration {
        Duration::from_secs(self.delete_requeue_secs)
    }

    /// Get watch restart delay after end duration
    #[must_use]
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// How long to wait for the server to bind (seconds)
    pub startup_timeout_secs: u64,
    /// Readiness poll interval while waiting for the server (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            startup_timeout_secs: env_var_or_default(
                "SERVER_STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            ),
            poll_interval_ms: env_var_or_default(
                "SERVER_POLL_INTERVAL_MS",
                DEFAULT_SERVER_POLL_INTERVAL_MS,
            ),
        }
    }
}

/// Parse a comma separated kind list; `all` (or nothing) selects every kind
fn parse_kind_list(raw: &str) -> Vec<String> {
    let kinds: Vec<String> = raw
        .split(',')
        .map(|k| k.trim().to_ascii_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if kinds.iter().any(|k| k == "all") {
        Vec::new()
    } else {
        kinds
    }
}
