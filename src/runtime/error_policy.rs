//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loops.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::convergence::ResourceKind;
use crate::observability::metrics;
use crate::runtime::reconciler::{backoff_key, BackoffState, Reconciler, ReconcilerError};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

/// Used when the backoff map cannot be locked
const FALLBACK_BACKOFF_SECS: u64 = 60;

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing object never slows
/// down the others.
pub fn handle_reconciliation_error<K: ResourceKind>(
    obj: Arc<K::Resource>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler<K>>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "reconcile.error",
        kind = K::KIND,
        namespace = namespace.as_str(),
        name = name.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    if error.is_input_error() {
        warn!("Resource spec cannot be converged until it is changed: {}", error);
    } else {
        error!("Reconciliation error for {}/{}: {:?}", namespace, name, error);
    }
    metrics::increment_reconciliation_errors(K::KIND);

    let (backoff_seconds, error_count) = next_error_backoff(
        &ctx.backoff_states,
        &backoff_key(&namespace, &name),
        ctx.config.backoff_min_minutes,
        ctx.config.backoff_max_minutes,
    );

    info!(
        backoff_secs = backoff_seconds,
        error_count, "Retrying with Fibonacci backoff"
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Advance the backoff for `key`, returning the delay and the error count so far
pub(crate) fn next_error_backoff(
    states: &Mutex<HashMap<String, BackoffState>>,
    key: &str,
    min_minutes: u64,
    max_minutes: u64,
) -> (u64, u32) {
    match states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(key.to_string())
                .or_insert_with(|| BackoffState::new(min_minutes, max_minutes));
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using default backoff", e);
            (FALLBACK_BACKOFF_SECS, 0)
        }
    }
}

/// Classification of a watch stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorClass {
    NotFound,
    Unauthorized,
    Forbidden,
    Expired,
    Throttled,
    Other,
}

/// Classify from the debug rendering of the controller error
///
/// 404 is checked first: a plain-text 404 body surfaces as a decode error
/// that also mentions the failed watch.
#[must_use]
pub fn classify_watch_error(error_string: &str) -> WatchErrorClass {
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    if is_not_found {
        return WatchErrorClass::NotFound;
    }
    if error_string.contains("401") || error_string.contains("Unauthorized") {
        return WatchErrorClass::Unauthorized;
    }
    if error_string.contains("403") || error_string.contains("Forbidden") {
        return WatchErrorClass::Forbidden;
    }
    if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        return WatchErrorClass::Expired;
    }
    if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        return WatchErrorClass::Throttled;
    }
    WatchErrorClass::Other
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `None` to filter out the error (allow restart) or `Some(())` to continue.
pub async fn handle_watch_stream_error(
    kind: &str,
    error_string: &str,
    backoff: &AtomicU64,
    max_backoff_ms: u64,
    watch_restart_delay_secs: u64,
) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        kind,
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match classify_watch_error(error_string) {
        WatchErrorClass::NotFound => {
            warn!(
                "{} not found (404) - the CRD may be missing; install it with `crdgen --kind {}`. Error: {}",
                kind, kind, error_string
            );
            Some(())
        }
        class @ (WatchErrorClass::Unauthorized | WatchErrorClass::Forbidden) => {
            error!(
                "Watch on {} rejected ({:?}) - RBAC may have been revoked or the token expired",
                kind, class
            );
            log_rbac_diagnostics(kind);
            warn!(
                "Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                watch_restart_delay_secs
            );
            tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
            None
        }
        WatchErrorClass::Expired => {
            warn!(error_type = "410", "Watch resource version expired, watch will restart");
            None
        }
        WatchErrorClass::Throttled => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server throttling or storage reinitializing (429), backing off for {}ms before restart...",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            let new_backoff = current_backoff.saturating_mul(2).min(max_backoff_ms);
            backoff.store(new_backoff, Ordering::Relaxed);
            None
        }
        WatchErrorClass::Other => {
            error!("Controller stream error for {}: {}", kind, error_string);
            tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
            None
        }
    }
}

fn log_rbac_diagnostics(kind: &str) {
    let plural = format!("{}s", kind.to_lowercase());
    error!("RBAC diagnostics:");
    error!("   1. Verify ClusterRole 'oci-service-operator' still exists:");
    error!("      kubectl get clusterrole oci-service-operator");
    error!("   2. Verify the ClusterRoleBinding still binds the ServiceAccount:");
    error!("      kubectl get clusterrolebinding oci-service-operator -o yaml");
    error!("   3. Verify the operator can still watch {}:", plural);
    error!(
        "      kubectl auth can-i watch {}.oci.oracle.com --as=system:serviceaccount:oci-service-operator-system:oci-service-operator --all-namespaces",
        plural
    );
    error!("   4. If RBAC was recently changed, restart the operator pod");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_wins_over_other_codes() {
        assert_eq!(
            classify_watch_error("WatchFailed(Api(ErrorResponse { code: 404, reason: \"Unauthorized\" }))"),
            WatchErrorClass::NotFound
        );
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify_watch_error("code: 401, Unauthorized"), WatchErrorClass::Unauthorized);
        assert_eq!(classify_watch_error("code: 403, reason: Forbidden"), WatchErrorClass::Forbidden);
        assert_eq!(classify_watch_error("too old resource version: 123"), WatchErrorClass::Expired);
        assert_eq!(classify_watch_error("storage is (re)initializing"), WatchErrorClass::Throttled);
        assert_eq!(classify_watch_error("connection reset by peer"), WatchErrorClass::Other);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttling_doubles_backoff_up_to_ceiling() {
        let backoff = AtomicU64::new(2_000);
        assert!(handle_watch_stream_error("Stream", "code: 429", &backoff, 5_000, 5).await.is_none());
        assert_eq!(backoff.load(Ordering::Relaxed), 4_000);
        assert!(handle_watch_stream_error("Stream", "code: 429", &backoff, 5_000, 5).await.is_none());
        assert_eq!(backoff.load(Ordering::Relaxed), 5_000);
    }

    #[tokio::test]
    async fn test_not_found_keeps_the_event() {
        let backoff = AtomicU64::new(1_000);
        assert!(handle_watch_stream_error("Vault", "ObjectNotFound", &backoff, 5_000, 5).await.is_some());
        assert_eq!(backoff.load(Ordering::Relaxed), 1_000);
    }

    #[test]
    fn test_error_backoff_is_per_resource() {
        let states = Mutex::new(HashMap::new());
        assert_eq!(next_error_backoff(&states, "ns/a", 1, 10), (60, 1));
        assert_eq!(next_error_backoff(&states, "ns/a", 1, 10), (60, 2));
        assert_eq!(next_error_backoff(&states, "ns/a", 1, 10), (120, 3));
        assert_eq!(next_error_backoff(&states, "ns/b", 1, 10), (60, 1));
    }
}
