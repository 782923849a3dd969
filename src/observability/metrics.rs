//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `oci_operator_reconciliations_total{kind}` - Reconcile passes started
//! - `oci_operator_reconciliation_errors_total{kind}` - Reconcile passes that returned an error
//! - `oci_operator_reconciliation_duration_seconds{kind}` - Duration of reconcile passes
//! - `oci_operator_remote_operations_total{kind,operation}` - OCI API calls
//! - `oci_operator_remote_operation_errors_total{kind,operation}` - Failed OCI API calls
//! - `oci_operator_drift_updates_total{kind}` - Updates issued to correct drift
//! - `oci_operator_secrets_written_total{kind}` - Connection secrets created or replaced
//! - `oci_operator_lifecycle_poll_attempts_total` - Sleeps while waiting on a lifecycle state
//! - `oci_operator_requeues_total{reason}` - Requeues scheduled, by reason

use anyhow::Result;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("oci_operator_reconciliations_total", "Total number of reconciliations"),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oci_operator_reconciliation_errors_total",
            "Total number of reconciliation errors",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "oci_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        // Create and delete passes poll OCI and can run for minutes
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0, 1800.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REMOTE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("oci_operator_remote_operations_total", "Total number of OCI API operations"),
        &["kind", "operation"],
    )
    .expect("Failed to create REMOTE_OPERATIONS_TOTAL metric - this should never happen")
});

static REMOTE_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oci_operator_remote_operation_errors_total",
            "Total number of failed OCI API operations",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create REMOTE_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static DRIFT_UPDATES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oci_operator_drift_updates_total",
            "Total number of updates issued to correct drift",
        ),
        &["kind"],
    )
    .expect("Failed to create DRIFT_UPDATES_TOTAL metric - this should never happen")
});

static SECRETS_WRITTEN_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oci_operator_secrets_written_total",
            "Total number of connection secrets created or replaced",
        ),
        &["kind"],
    )
    .expect("Failed to create SECRETS_WRITTEN_TOTAL metric - this should never happen")
});

static POLL_ATTEMPTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "oci_operator_lifecycle_poll_attempts_total",
        "Total number of waits on a remote lifecycle state",
    )
    .expect("Failed to create POLL_ATTEMPTS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("oci_operator_requeues_total", "Total number of requeues scheduled"),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register every metric with [`REGISTRY`]
///
/// # Errors
///
/// Fails when called twice, as the registry rejects duplicate collectors.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DRIFT_UPDATES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_WRITTEN_TOTAL.clone()))?;
    REGISTRY.register(Box::new(POLL_ATTEMPTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION.with_label_values(&[kind]).observe(duration);
}

/// Count one OCI API call and, when it failed, one error
pub fn record_remote_operation(kind: &str, operation: &str, succeeded: bool) {
    REMOTE_OPERATIONS_TOTAL.with_label_values(&[kind, operation]).inc();
    if !succeeded {
        REMOTE_OPERATION_ERRORS_TOTAL
            .with_label_values(&[kind, operation])
            .inc();
    }
}

pub fn increment_drift_updates(kind: &str) {
    DRIFT_UPDATES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_secrets_written(kind: &str) {
    SECRETS_WRITTEN_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_poll_attempts() {
    POLL_ATTEMPTS_TOTAL.inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_rejects_duplicates() {
        // Other tests may have registered first; either way a second call fails
        let _ = register_metrics();
        register_metrics().unwrap_err();
    }

    #[test]
    fn test_reconciliations_are_counted_per_kind() {
        let before = RECONCILIATIONS_TOTAL.with_label_values(&["Stream"]).get();
        let other = RECONCILIATIONS_TOTAL.with_label_values(&["Vault"]).get();
        increment_reconciliations("Stream");
        assert_eq!(RECONCILIATIONS_TOTAL.with_label_values(&["Stream"]).get(), before + 1);
        assert_eq!(RECONCILIATIONS_TOTAL.with_label_values(&["Vault"]).get(), other);
    }

    #[test]
    fn test_failed_remote_operation_counts_an_error() {
        let labels = ["RedisCluster", "get"];
        let ops = REMOTE_OPERATIONS_TOTAL.with_label_values(&labels).get();
        let errors = REMOTE_OPERATION_ERRORS_TOTAL.with_label_values(&labels).get();

        record_remote_operation("RedisCluster", "get", true);
        record_remote_operation("RedisCluster", "get", false);

        assert_eq!(REMOTE_OPERATIONS_TOTAL.with_label_values(&labels).get(), ops + 2);
        assert_eq!(REMOTE_OPERATION_ERRORS_TOTAL.with_label_values(&labels).get(), errors + 1);
    }

    #[test]
    fn test_requeues_by_reason() {
        let before = REQUEUES_TOTAL.with_label_values(&["provisioning"]).get();
        increment_requeues_total("provisioning");
        assert_eq!(REQUEUES_TOTAL.with_label_values(&["provisioning"]).get(), before + 1);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        observe_reconciliation_duration("Stream", 1.5);
        let count = RECONCILIATION_DURATION
            .with_label_values(&["Stream"])
            .get_sample_count();
        assert!(count >= 1);
    }
}
