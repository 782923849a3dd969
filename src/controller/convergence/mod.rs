//! # Convergence Engine
//!
//! The create-or-bind-or-update state machine shared by every managed kind.
//!
//! ## Module Structure
//!
//! - `retry.rs` - Lifecycle polling policies and the poll loop
//! - `drift.rs` - Mutable-field comparison and immutable-field validation
//! - `status.rs` - Lifecycle normalization and status projection
//! - `secret.rs` - Connection secret payloads and upserts
//! - `error.rs` - [`ReconcileError`]
//!
//! ## Reconcile
//!
//! 1. No id and no display name: fail before any remote call.
//! 2. Spec id set: fetch, validate immutable fields, update on drift.
//! 3. Status OCID set from an earlier pass: fetch it (the join key).
//! 4. Otherwise look up by name within the spec's scope (a missing scope
//!    fails before any remote call; CREATING/UPDATING/ACTIVE count as
//!    existing), binding on a match or creating and polling until creation
//!    settles.
//! 5. Project status. A failed lifecycle returns `Ok(false)`.
//! 6. Once usable, converge dependents and upsert the connection secret.
//!
//! An object found by name is bound without an update even when its fields
//! differ from the spec; drift correction runs only when bound by spec id.
//!
//! ## Delete
//!
//! Idempotent: returns `Ok(true)` once nothing remote is left, including when
//! nothing was ever bound. Dependents are torn down before the owner.

pub mod drift;
pub mod error;
pub mod retry;
pub mod secret;
pub mod status;

use crate::crd::OciResource;
use crate::observability::metrics;
use crate::provider::credential_store::CredentialStore;
use crate::provider::{ListFilter, ProviderResult, RemoteObject, RemoteSummary, ResourceClient};
use async_trait::async_trait;
use chrono::Utc;
use kube::ResourceExt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use drift::{ensure_unchanged, Drift, DriftDetector};
pub use error::ReconcileError;
pub use retry::{exponential_backoff, fixed_interval, poll, Observation, PollOutcome, RetryPolicy, RetryState};
pub use secret::SecretPayload;
pub use status::Lifecycle;

/// Per-kind behavior plugged into the [`ConvergenceEngine`]
#[async_trait]
pub trait ResourceKind: Send + Sync + 'static {
    type Resource: OciResource;
    type Remote: RemoteObject;
    type Create: std::fmt::Debug + Send + Sync;
    type Update: std::fmt::Debug + Send + Sync;

    /// Kubernetes kind name, used in logs, labels and metrics
    const KIND: &'static str;

    /// Whether usable objects get a connection secret
    const PUBLISHES_SECRET: bool = true;

    fn lifecycle(&self, raw_state: &str) -> Lifecycle;

    /// Name and scope for the lookup before create
    ///
    /// Fails when the spec names no scope to search; OCI list calls require one.
    fn list_filter(&self, resource: &Self::Resource) -> Result<ListFilter, ReconcileError>;

    /// Build the create request
    ///
    /// The store is available for inputs held in Secrets (passwords).
    async fn create_details(
        &self,
        resource: &Self::Resource,
        store: &dyn CredentialStore,
    ) -> Result<Self::Create, ReconcileError>;

    /// Reject spec changes to fields that cannot be updated in place
    fn check_immutable(&self, resource: &Self::Resource, remote: &Self::Remote) -> Result<(), ReconcileError>;

    fn drift(&self, resource: &Self::Resource, remote: &Self::Remote) -> Option<Drift<Self::Update>>;

    fn secret_payload(&self, remote: &Self::Remote) -> SecretPayload;

    fn create_policy(&self) -> RetryPolicy<Self::Remote>;

    fn delete_policy(&self) -> RetryPolicy<Self::Remote>;

    /// Bring child objects in line once the owner is usable
    async fn converge_dependents(
        &self,
        _resource: &Self::Resource,
        _remote: &Self::Remote,
    ) -> Result<(), ReconcileError> {
        Ok(())
    }

    /// Start removing child objects; `Ok(true)` once the owner may be deleted
    async fn teardown_dependents(
        &self,
        _resource: &Self::Resource,
        _remote: &Self::Remote,
    ) -> Result<bool, ReconcileError> {
        Ok(true)
    }
}

/// Remote client matching a kind's request and response types
pub type KindClient<K> = Arc<
    dyn ResourceClient<
        Remote = <K as ResourceKind>::Remote,
        Create = <K as ResourceKind>::Create,
        Update = <K as ResourceKind>::Update,
    >,
>;

pub struct ConvergenceEngine<K: ResourceKind> {
    kind: K,
    client: KindClient<K>,
    store: Arc<dyn CredentialStore>,
}

impl<K: ResourceKind> std::fmt::Debug for ConvergenceEngine<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvergenceEngine")
            .field("kind", &K::KIND)
            .finish_non_exhaustive()
    }
}

fn resource_ref<R: OciResource>(resource: &R) -> (String, String) {
    (
        resource.namespace().unwrap_or_else(|| "default".to_string()),
        resource.name_any(),
    )
}

impl<K: ResourceKind> ConvergenceEngine<K> {
    #[must_use]
    pub fn new(kind: K, client: KindClient<K>, store: Arc<dyn CredentialStore>) -> Self {
        Self { kind, client, store }
    }

    #[must_use]
    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// One convergence pass
    ///
    /// Returns `Ok(false)` when the remote object settled in a failed state and
    /// `Ok(true)` otherwise; the projected phase on the resource's status tells
    /// whether the object is usable yet.
    ///
    /// # Errors
    ///
    /// Returns input errors before any remote call, and remote or store errors
    /// as they occur. A rejected create (400) also marks the status failed.
    pub async fn reconcile(&self, resource: &mut K::Resource) -> Result<bool, ReconcileError> {
        let (namespace, name) = resource_ref(resource);
        if resource.spec_ocid().is_none() && resource.display_name().is_empty() {
            return Err(ReconcileError::MissingIdentity {
                kind: K::KIND,
                namespace,
                name,
            });
        }

        let remote = if let Some(id) = resource.spec_ocid().map(str::to_string) {
            self.bind_by_id(resource, &id).await?
        } else if let Some(ocid) = resource.status_ocid().map(str::to_string) {
            self.call("get", self.client.get(&ocid)).await?
        } else {
            let filter = self.kind.list_filter(resource)?;
            match self.find_by_name(&filter).await? {
                Some(found) => {
                    info!(
                        kind = K::KIND,
                        ocid = %found.id,
                        state = %found.lifecycle_state,
                        "bound existing object by name"
                    );
                    self.call("get", self.client.get(&found.id)).await?
                }
                None => self.create(resource).await?,
            }
        };

        let lifecycle = self.kind.lifecycle(remote.lifecycle_state());
        let projected = status::project(
            K::KIND,
            remote.id(),
            lifecycle,
            remote.lifecycle_state(),
            resource.oci_status(),
            Utc::now(),
        );
        *resource.oci_status_mut() = projected;

        if lifecycle.phase() == crate::crd::ResourcePhase::Failed {
            warn!(
                kind = K::KIND,
                ocid = remote.id(),
                state = remote.lifecycle_state(),
                "remote object is in a failed state"
            );
            return Ok(false);
        }
        if !lifecycle.is_usable() {
            debug!(kind = K::KIND, ocid = remote.id(), "remote object not usable yet");
            return Ok(true);
        }

        self.kind.converge_dependents(resource, &remote).await?;

        if K::PUBLISHES_SECRET {
            let payload = self.kind.secret_payload(&remote);
            secret::upsert(
                self.store.as_ref(),
                &name,
                &namespace,
                &secret::secret_labels(K::KIND),
                &payload,
            )
            .await?;
            metrics::increment_secrets_written(K::KIND);
            debug!(kind = K::KIND, secret.keys = payload.data().len(), "connection secret written");
        }

        Ok(true)
    }

    /// Tear down the bound remote object
    ///
    /// Returns `Ok(false)` while deletion is still in progress.
    ///
    /// # Errors
    ///
    /// Returns remote errors other than "not found". Secret cleanup never fails
    /// the call.
    pub async fn delete(&self, resource: &mut K::Resource) -> Result<bool, ReconcileError> {
        let (namespace, name) = resource_ref(resource);
        let Some(ocid) = resource.status_ocid().map(str::to_string) else {
            debug!(kind = K::KIND, "nothing bound, nothing to delete");
            self.remove_secret(&name, &namespace).await;
            return Ok(true);
        };

        let remote = match self.call("get", self.client.get(&ocid)).await {
            Ok(remote) => remote,
            Err(e) if e.is_not_found() => {
                info!(kind = K::KIND, ocid = %ocid, "remote object already gone");
                self.remove_secret(&name, &namespace).await;
                return Ok(true);
            }
            Err(e) => return Err(e.into()),
        };

        let lifecycle = self.kind.lifecycle(remote.lifecycle_state());
        if lifecycle == Lifecycle::Deleted {
            self.remove_secret(&name, &namespace).await;
            return Ok(true);
        }

        let terminating = status::terminating(
            resource.oci_status(),
            &format!("deleting {} {ocid}", K::KIND),
            Utc::now(),
        );
        *resource.oci_status_mut() = terminating;

        if !self.kind.teardown_dependents(resource, &remote).await? {
            info!(kind = K::KIND, ocid = %ocid, "waiting for dependents to be removed");
            return Ok(false);
        }

        if lifecycle != Lifecycle::Deleting {
            match self.call("delete", self.client.delete(&ocid)).await {
                Ok(()) => info!(kind = K::KIND, ocid = %ocid, "delete requested"),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        let policy = self.kind.delete_policy();
        let outcome = poll(&policy, || self.observe(&ocid, true)).await?;
        let done = match &outcome.last {
            Observation::Gone => true,
            Observation::Object(remote) => self.kind.lifecycle(remote.lifecycle_state()) == Lifecycle::Deleted,
            Observation::Unrecognized => false,
        };

        if done {
            info!(kind = K::KIND, ocid = %ocid, "remote object deleted");
            self.remove_secret(&name, &namespace).await;
        } else {
            debug!(kind = K::KIND, ocid = %ocid, attempts = outcome.attempts, "deletion still in progress");
        }
        Ok(done)
    }

    async fn bind_by_id(&self, resource: &K::Resource, id: &str) -> Result<K::Remote, ReconcileError> {
        let remote = self.call("get", self.client.get(id)).await?;
        self.kind.check_immutable(resource, &remote)?;

        // Updates are refused while the object is transitioning
        let lifecycle = self.kind.lifecycle(remote.lifecycle_state());
        if !matches!(lifecycle, Lifecycle::Active | Lifecycle::Other) {
            return Ok(remote);
        }

        match self.kind.drift(resource, &remote) {
            Some(drift) => {
                info!(kind = K::KIND, ocid = id, fields = ?drift.fields, "drift detected, updating");
                let updated = self.call("update", self.client.update(id, &drift.update)).await?;
                metrics::increment_drift_updates(K::KIND);
                Ok(updated)
            }
            None => Ok(remote),
        }
    }

    async fn find_by_name(&self, filter: &ListFilter) -> Result<Option<RemoteSummary>, ReconcileError> {
        let listed = self.call("list", self.client.list(filter)).await?;
        let mut live = listed.into_iter().filter(|s| {
            s.display_name == filter.display_name && self.kind.lifecycle(&s.lifecycle_state).blocks_creation()
        });

        let found = live.next();
        if found.is_some() && live.next().is_some() {
            warn!(
                kind = K::KIND,
                display_name = %filter.display_name,
                "several live objects share this name, binding the first"
            );
        }
        Ok(found)
    }

    async fn create(&self, resource: &mut K::Resource) -> Result<K::Remote, ReconcileError> {
        let details = self.kind.create_details(resource, self.store.as_ref()).await?;
        let created = match self.call("create", self.client.create(&details)).await {
            Ok(created) => created,
            Err(e) if e.is_bad_request() => {
                let rejected = status::failed(resource.oci_status(), &e.to_string(), Utc::now());
                *resource.oci_status_mut() = rejected;
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let id = created.id().to_string();
        info!(kind = K::KIND, ocid = %id, state = created.lifecycle_state(), "created remote object");
        let bound = status::project(
            K::KIND,
            &id,
            self.kind.lifecycle(created.lifecycle_state()),
            created.lifecycle_state(),
            resource.oci_status(),
            Utc::now(),
        );
        *resource.oci_status_mut() = bound;

        let policy = self.kind.create_policy();
        let outcome = poll(&policy, || self.observe(&id, false)).await?;
        if outcome.exhausted {
            warn!(
                kind = K::KIND,
                ocid = %id,
                attempts = outcome.attempts,
                "creation still in progress after the poll budget"
            );
        }

        match outcome.last.into_object() {
            Some(remote) => Ok(remote),
            None => Ok(self.call("get", self.client.get(&id)).await?),
        }
    }

    /// One poll attempt; `gone_on_not_found` turns 404 into [`Observation::Gone`]
    async fn observe(&self, id: &str, gone_on_not_found: bool) -> ProviderResult<Observation<K::Remote>> {
        match self.call("get", self.client.get(id)).await {
            Ok(remote) => Ok(Observation::Object(remote)),
            Err(e) if e.is_decode() => Ok(Observation::Unrecognized),
            Err(e) if gone_on_not_found && e.is_not_found() => Ok(Observation::Gone),
            Err(e) => Err(e),
        }
    }

    async fn remove_secret(&self, name: &str, namespace: &str) {
        if K::PUBLISHES_SECRET {
            secret::remove(self.store.as_ref(), name, namespace, &secret::secret_labels(K::KIND)).await;
        }
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        request: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        let result = request.await;
        metrics::record_remote_operation(K::KIND, operation, result.is_ok());
        if let Err(e) = &result {
            debug!(kind = K::KIND, operation, error = %e, "remote call failed");
        }
        result
    }
}
