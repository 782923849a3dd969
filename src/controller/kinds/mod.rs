//! # Managed Kinds
//!
//! One [`ResourceKind`](crate::controller::convergence::ResourceKind) per CRD:
//! lifecycle mapping, create requests, immutable fields, the drift allow-list,
//! connection secret keys and polling policy.
//!
//! ## Module Structure
//!
//! - `stream.rs` - Streaming service streams
//! - `redis.rs` - OCI Cache clusters
//! - `functions.rs` - Functions applications
//! - `vault.rs` - KMS vaults, with keys as ordered dependents
//! - `autonomous_database.rs` - Autonomous databases

pub mod autonomous_database;
pub mod functions;
pub mod redis;
pub mod stream;
pub mod vault;

use crate::controller::convergence::{ReconcileError, ResourceKind};

pub use autonomous_database::AutonomousDatabaseKind;
pub use functions::FunctionsApplicationKind;
pub use redis::RedisClusterKind;
pub use stream::StreamKind;
pub use vault::VaultKind;

/// Every kind name the operator can manage, in `ENABLED_KINDS` spelling
pub const ALL_KINDS: [&str; 5] = [
    <StreamKind as ResourceKind>::KIND,
    <RedisClusterKind as ResourceKind>::KIND,
    <FunctionsApplicationKind as ResourceKind>::KIND,
    <VaultKind as ResourceKind>::KIND,
    <AutonomousDatabaseKind as ResourceKind>::KIND,
];

/// Empty strings count as unset
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A string field the create request cannot go without
fn required<'a>(kind: &str, field: &str, value: Option<&'a str>) -> Result<&'a str, ReconcileError> {
    non_empty(value).ok_or_else(|| missing(kind, field))
}

/// A scalar field the create request cannot go without
fn required_value<T>(kind: &str, field: &str, value: Option<T>) -> Result<T, ReconcileError> {
    value.ok_or_else(|| missing(kind, field))
}

fn missing(kind: &str, field: &str) -> ReconcileError {
    ReconcileError::InvalidSpec(format!("{kind} requires spec.{field} to create"))
}
