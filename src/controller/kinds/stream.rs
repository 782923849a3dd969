//! Streaming service streams.
//!
//! Partitions and retention are fixed at creation. Binding by id never
//! re-checks the stream name.

use super::non_empty;
use crate::constants::EXPONENTIAL_POLL_ATTEMPTS;
use crate::controller::convergence::{
    ensure_unchanged, exponential_backoff, Drift, DriftDetector, Lifecycle, Observation, ReconcileError,
    ResourceKind, RetryPolicy, SecretPayload,
};
use crate::crd::Stream;
use crate::provider::credential_store::CredentialStore;
use crate::provider::oci::streaming::{self, CreateStreamDetails, UpdateStreamDetails};
use crate::provider::ListFilter;
use async_trait::async_trait;

const DEFAULT_PARTITIONS: i32 = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamKind;

fn lifecycle(raw_state: &str) -> Lifecycle {
    match raw_state {
        "CREATING" => Lifecycle::Creating,
        "ACTIVE" => Lifecycle::Active,
        "UPDATING" => Lifecycle::Updating,
        "FAILED" => Lifecycle::Failed,
        "DELETING" => Lifecycle::Deleting,
        "DELETED" => Lifecycle::Deleted,
        _ => Lifecycle::Unknown,
    }
}

fn creating(observation: &Observation<streaming::Stream>) -> bool {
    observation.retry_while(|s| lifecycle(&s.lifecycle_state).is_creating())
}

fn deleting(observation: &Observation<streaming::Stream>) -> bool {
    observation.retry_while(|s| lifecycle(&s.lifecycle_state).is_deleting())
}

fn missing_scope() -> ReconcileError {
    ReconcileError::InvalidSpec(format!(
        "{} requires spec.compartmentId or spec.streamPoolId",
        StreamKind::KIND
    ))
}

#[async_trait]
impl ResourceKind for StreamKind {
    type Resource = Stream;
    type Remote = streaming::Stream;
    type Create = CreateStreamDetails;
    type Update = UpdateStreamDetails;

    const KIND: &'static str = "Stream";

    fn lifecycle(&self, raw_state: &str) -> Lifecycle {
        lifecycle(raw_state)
    }

    fn list_filter(&self, resource: &Stream) -> Result<ListFilter, ReconcileError> {
        let spec = &resource.spec;
        let compartment_id = non_empty(spec.compartment_id.as_deref());
        let stream_pool_id = non_empty(spec.stream_pool_id.as_deref());
        if compartment_id.is_none() && stream_pool_id.is_none() {
            return Err(missing_scope());
        }
        Ok(ListFilter {
            display_name: spec.name.clone(),
            compartment_id: compartment_id.map(str::to_string),
            container_id: stream_pool_id.map(str::to_string),
        })
    }

    async fn create_details(
        &self,
        resource: &Stream,
        _store: &dyn CredentialStore,
    ) -> Result<CreateStreamDetails, ReconcileError> {
        let spec = &resource.spec;
        let compartment_id = non_empty(spec.compartment_id.as_deref());
        let stream_pool_id = non_empty(spec.stream_pool_id.as_deref());
        if compartment_id.is_none() && stream_pool_id.is_none() {
            return Err(missing_scope());
        }

        Ok(CreateStreamDetails {
            name: spec.name.clone(),
            partitions: spec.partitions.unwrap_or(DEFAULT_PARTITIONS),
            // The pool determines the compartment when both are given
            compartment_id: if stream_pool_id.is_some() {
                None
            } else {
                compartment_id.map(str::to_string)
            },
            retention_in_hours: spec.retention_in_hours,
            stream_pool_id: stream_pool_id.map(str::to_string),
            freeform_tags: spec.freeform_tags.clone(),
            defined_tags: spec.defined_tags.clone(),
        })
    }

    fn check_immutable(&self, resource: &Stream, remote: &streaming::Stream) -> Result<(), ReconcileError> {
        let spec = &resource.spec;
        ensure_unchanged(Self::KIND, "partitions", spec.partitions.as_ref(), &remote.partitions)?;
        ensure_unchanged(
            Self::KIND,
            "retentionInHours",
            spec.retention_in_hours.as_ref(),
            &remote.retention_in_hours,
        )
    }

    fn drift(&self, resource: &Stream, remote: &streaming::Stream) -> Option<Drift<UpdateStreamDetails>> {
        let spec = &resource.spec;
        DriftDetector::<UpdateStreamDetails>::new()
            .text(
                "streamPoolId",
                spec.stream_pool_id.as_deref().unwrap_or_default(),
                remote.stream_pool_id.as_deref().unwrap_or_default(),
                |u, v| u.stream_pool_id = Some(v),
            )
            .map("freeformTags", &spec.freeform_tags, &remote.freeform_tags, |u, v| {
                u.freeform_tags = Some(v);
            })
            .map("definedTags", &spec.defined_tags, &remote.defined_tags, |u, v| {
                u.defined_tags = Some(v);
            })
            .finish()
    }

    fn secret_payload(&self, remote: &streaming::Stream) -> SecretPayload {
        SecretPayload::new().with("endpoint", remote.messages_endpoint.as_deref())
    }

    fn create_policy(&self) -> RetryPolicy<streaming::Stream> {
        RetryPolicy::new(EXPONENTIAL_POLL_ATTEMPTS, creating, exponential_backoff)
    }

    fn delete_policy(&self) -> RetryPolicy<streaming::Stream> {
        RetryPolicy::new(EXPONENTIAL_POLL_ATTEMPTS, deleting, exponential_backoff)
    }
}
