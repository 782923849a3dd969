//! # Configuration
//!
//! Process configuration, read once from the environment at startup and
//! handed to every component constructor.
//!
//! - `controller`: reconcile cadence, backoff, watch restart and logging settings
//! - `oci`: tenancy credentials, region and service endpoints

pub mod controller;
pub mod oci;

pub use controller::{ControllerConfig, ServerConfig};
pub use oci::{ConfigError, OciConfig, OciService};

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a non-empty environment variable
pub(crate) fn env_var_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
