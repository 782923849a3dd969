//! # Reconciler
//!
//! Glue between kube-runtime and the [`ConvergenceEngine`]. One pass:
//!
//! 1. Deleting: tear down, then release the finalizer once nothing is left.
//! 2. Otherwise make sure the finalizer is present.
//! 3. Run the engine against a copy of the object.
//! 4. Merge-patch the status subresource when the computed status changed.
//! 5. Requeue according to the projected phase.

use crate::config::ControllerConfig;
use crate::constants::FINALIZER;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::convergence::{ConvergenceEngine, ReconcileError, ResourceKind};
use crate::crd::{OciResource, ResourcePhase};
use crate::observability::metrics;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Convergence(#[from] ReconcileError),
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("Failed to serialize status: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcilerError {
    /// Errors that will repeat until someone edits the spec
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Convergence(e) if e.is_input_error())
    }
}

/// Backoff state for a specific resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_minutes, max_minutes),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}

/// Shared context for one kind's controller
pub struct Reconciler<K: ResourceKind> {
    pub client: Client,
    pub engine: ConvergenceEngine<K>,
    pub config: ControllerConfig,
    /// Error backoff per `namespace/name`, dropped on the next success
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl<K: ResourceKind> std::fmt::Debug for Reconciler<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("kind", &K::KIND)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl<K: ResourceKind> Reconciler<K> {
    #[must_use]
    pub fn new(client: Client, engine: ConvergenceEngine<K>, config: ControllerConfig) -> Self {
        Self {
            client,
            engine,
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    fn reset_backoff(&self, key: &str) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                if states.remove(key).is_some() {
                    debug!(resource = key, "error backoff reset");
                }
            }
            Err(e) => warn!("Failed to lock backoff_states: {}", e),
        }
    }

    async fn reconcile_once(
        &self,
        api: &Api<K::Resource>,
        obj: &K::Resource,
        name: &str,
    ) -> Result<Action, ReconcilerError> {
        if obj.meta().deletion_timestamp.is_some() {
            return self.finalize(api, obj, name).await;
        }

        if !has_finalizer(obj) {
            add_finalizer(api, obj, name).await?;
            debug!("finalizer added");
        }

        let mut desired = obj.clone();
        let outcome = self.engine.reconcile(&mut desired).await;

        match outcome {
            Ok(succeeded) => {
                if desired.oci_status().is_some() {
                    desired.oci_status_mut().observed_generation = obj.meta().generation;
                }
                write_status(api, obj, &desired, name).await?;
                let phase = desired.oci_status().and_then(|s| s.phase);
                let (delay, reason) = requeue_after(phase, succeeded, &self.config);
                metrics::increment_requeues_total(reason);
                Ok(Action::requeue(delay))
            }
            Err(e) => {
                // A rejected create records Failed before the error surfaces
                if let Err(status_err) = write_status(api, obj, &desired, name).await {
                    warn!(error = %status_err, "Failed to record status after reconcile error");
                }
                Err(e.into())
            }
        }
    }

    async fn finalize(
        &self,
        api: &Api<K::Resource>,
        obj: &K::Resource,
        name: &str,
    ) -> Result<Action, ReconcilerError> {
        if !has_finalizer(obj) {
            return Ok(Action::await_change());
        }

        let mut desired = obj.clone();
        let done = match self.engine.delete(&mut desired).await {
            Ok(done) => done,
            Err(e) => {
                if let Err(status_err) = write_status(api, obj, &desired, name).await {
                    warn!(error = %status_err, "Failed to record status after delete error");
                }
                return Err(e.into());
            }
        };

        if done {
            remove_finalizer(api, obj, name).await?;
            info!("remote object removed, finalizer released");
            return Ok(Action::await_change());
        }

        write_status(api, obj, &desired, name).await?;
        metrics::increment_requeues_total("deleting");
        Ok(Action::requeue(self.config.delete_requeue()))
    }
}

/// Entry point handed to the kube-runtime `Controller`
///
/// # Errors
///
/// Returns engine errors and Kubernetes API errors; the error policy turns
/// them into a backoff requeue.
pub async fn reconcile<K: ResourceKind>(
    obj: Arc<K::Resource>,
    ctx: Arc<Reconciler<K>>,
) -> Result<Action, ReconcilerError> {
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();
    let span = info_span!(
        "reconcile",
        kind = K::KIND,
        namespace = namespace.as_str(),
        name = name.as_str()
    );

    async move {
        metrics::increment_reconciliations(K::KIND);
        let started = Instant::now();

        let api: Api<K::Resource> = Api::namespaced(ctx.client.clone(), &namespace);
        let result = ctx.reconcile_once(&api, &obj, &name).await;

        metrics::observe_reconciliation_duration(K::KIND, started.elapsed().as_secs_f64());
        if result.is_ok() {
            ctx.reset_backoff(&backoff_key(&namespace, &name));
        }
        result
    }
    .instrument(span)
    .await
}

pub(crate) fn backoff_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Delay and metric reason for the next pass after a successful one
#[must_use]
pub fn requeue_after(
    phase: Option<ResourcePhase>,
    succeeded: bool,
    config: &ControllerConfig,
) -> (Duration, &'static str) {
    if !succeeded {
        return (config.failed_requeue(), "failed");
    }
    match phase {
        Some(ResourcePhase::Active) => (config.resync_interval(), "resync"),
        Some(ResourcePhase::Failed) => (config.failed_requeue(), "failed"),
        Some(ResourcePhase::Terminating) => (config.delete_requeue(), "deleting"),
        Some(ResourcePhase::Provisioning) | None => (config.provisioning_requeue(), "provisioning"),
    }
}

#[must_use]
pub fn has_finalizer<R: OciResource>(obj: &R) -> bool {
    obj.finalizers().iter().any(|f| f == FINALIZER)
}

/// Body of the status merge-patch, `None` when the stored status already matches
///
/// # Errors
///
/// Fails only if the status cannot be serialized.
pub fn status_patch<R: OciResource>(
    current: &R,
    desired: &R,
) -> Result<Option<serde_json::Value>, serde_json::Error> {
    let Some(status) = desired.oci_status() else {
        return Ok(None);
    };
    if current.oci_status() == Some(status) {
        return Ok(None);
    }
    Ok(Some(serde_json::json!({ "status": serde_json::to_value(status)? })))
}

async fn write_status<R: OciResource>(
    api: &Api<R>,
    current: &R,
    desired: &R,
    name: &str,
) -> Result<(), ReconcilerError> {
    let Some(patch) = status_patch(current, desired)? else {
        debug!("status unchanged, skipping patch");
        return Ok(());
    };

    if let (Some(before), Some(after)) = (
        current.oci_status().and_then(|s| s.phase),
        desired.oci_status().and_then(|s| s.phase),
    ) {
        if before != after {
            info!(from = %before, to = %after, "phase changed");
        }
    }

    match api
        .patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
        .await
    {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
            debug!("resource deleted during reconciliation, skipping status update");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn add_finalizer<R: OciResource>(api: &Api<R>, obj: &R, name: &str) -> Result<(), kube::Error> {
    let mut finalizers = obj.finalizers().to_vec();
    finalizers.push(FINALIZER.to_string());
    patch_finalizers(api, name, finalizers).await
}

async fn remove_finalizer<R: OciResource>(api: &Api<R>, obj: &R, name: &str) -> Result<(), kube::Error> {
    let finalizers: Vec<String> = obj
        .finalizers()
        .iter()
        .filter(|f| *f != FINALIZER)
        .cloned()
        .collect();
    match patch_finalizers(api, name, finalizers).await {
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(()),
        other => other,
    }
}

async fn patch_finalizers<R: OciResource>(
    api: &Api<R>,
    name: &str,
    finalizers: Vec<String>,
) -> Result<(), kube::Error> {
    let patch = serde_json::json!({
        "metadata": {
            "finalizers": finalizers
        }
    });
    api.patch(name, &PatchParams::default(), &Patch::Merge(patch))
        .await
        .map(|_| ())
}
