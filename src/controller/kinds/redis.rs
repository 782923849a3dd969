//! OCI Cache (Redis) clusters.

use super::{required, required_value};
use crate::constants::FIXED_POLL_ATTEMPTS;
use crate::controller::convergence::{
    ensure_unchanged, fixed_interval, Drift, DriftDetector, Lifecycle, Observation, ReconcileError, ResourceKind,
    RetryPolicy, SecretPayload,
};
use crate::crd::RedisCluster;
use crate::provider::credential_store::CredentialStore;
use crate::provider::oci::redis::{self, CreateRedisClusterDetails, UpdateRedisClusterDetails};
use crate::provider::ListFilter;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct RedisClusterKind;

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

fn creating(observation: &Observation<redis::RedisCluster>) -> bool {
    observation.retry_while(|c| lifecycle(&c.lifecycle_state).is_creating())
}

fn deleting(observation: &Observation<redis::RedisCluster>) -> bool {
    observation.retry_while(|c| lifecycle(&c.lifecycle_state).is_deleting())
}

#[async_trait]
impl ResourceKind for RedisClusterKind {
    type Resource = RedisCluster;
    type Remote = redis::RedisCluster;
    type Create = CreateRedisClusterDetails;
    type Update = UpdateRedisClusterDetails;

    const KIND: &'static str = "RedisCluster";

    fn lifecycle(&self, raw_state: &str) -> Lifecycle {
        lifecycle(raw_state)
    }

    fn list_filter(&self, resource: &RedisCluster) -> Result<ListFilter, ReconcileError> {
        let spec = &resource.spec;
        Ok(ListFilter {
            display_name: spec.display_name.clone(),
            compartment_id: Some(required(Self::KIND, "compartmentId", spec.compartment_id.as_deref())?.to_string()),
            container_id: None,
        })
    }

    async fn create_details(
        &self,
        resource: &RedisCluster,
        _store: &dyn CredentialStore,
    ) -> Result<CreateRedisClusterDetails, ReconcileError> {
        let spec = &resource.spec;
        Ok(CreateRedisClusterDetails {
            display_name: spec.display_name.clone(),
            compartment_id: required(Self::KIND, "compartmentId", spec.compartment_id.as_deref())?.to_string(),
            node_count: required_value(Self::KIND, "nodeCount", spec.node_count)?,
            node_memory_in_gbs: required_value(Self::KIND, "nodeMemoryInGBs", spec.node_memory_in_gbs)?,
            software_version: required(Self::KIND, "softwareVersion", spec.software_version.as_deref())?
                .to_string(),
            subnet_id: required(Self::KIND, "subnetId", spec.subnet_id.as_deref())?.to_string(),
            freeform_tags: spec.freeform_tags.clone(),
            defined_tags: spec.defined_tags.clone(),
        })
    }

    fn check_immutable(&self, resource: &RedisCluster, remote: &redis::RedisCluster) -> Result<(), ReconcileError> {
        let spec = &resource.spec;
        ensure_unchanged(
            Self::KIND,
            "subnetId",
            super::non_empty(spec.subnet_id.as_deref()),
            remote.subnet_id.as_str(),
        )?;
        ensure_unchanged(
            Self::KIND,
            "softwareVersion",
            super::non_empty(spec.software_version.as_deref()),
            remote.software_version.as_str(),
        )
    }

    fn drift(&self, resource: &RedisCluster, remote: &redis::RedisCluster) -> Option<Drift<UpdateRedisClusterDetails>> {
        let spec = &resource.spec;
        DriftDetector::<UpdateRedisClusterDetails>::new()
            .text("displayName", &spec.display_name, &remote.display_name, |u, v| {
                u.display_name = Some(v);
            })
            .value("nodeCount", spec.node_count, remote.node_count, |u, v| u.node_count = Some(v))
            .value(
                "nodeMemoryInGBs",
                spec.node_memory_in_gbs,
                remote.node_memory_in_gbs,
                |u, v| u.node_memory_in_gbs = Some(v),
            )
            .map("freeformTags", &spec.freeform_tags, &remote.freeform_tags, |u, v| {
                u.freeform_tags = Some(v);
            })
            .map("definedTags", &spec.defined_tags, &remote.defined_tags, |u, v| {
                u.defined_tags = Some(v);
            })
            .finish()
    }

    fn secret_payload(&self, remote: &redis::RedisCluster) -> SecretPayload {
        SecretPayload::new()
            .with("primaryFqdn", remote.primary_fqdn.as_deref())
            .with("primaryEndpointIpAddress", remote.primary_endpoint_ip_address.as_deref())
            .with("replicasFqdn", remote.replicas_fqdn.as_deref())
            .with("replicasEndpointIpAddress", remote.replicas_endpoint_ip_address.as_deref())
    }

    fn create_policy(&self) -> RetryPolicy<redis::RedisCluster> {
        RetryPolicy::new(FIXED_POLL_ATTEMPTS, creating, fixed_interval)
    }

    fn delete_policy(&self) -> RetryPolicy<redis::RedisCluster> {
        RetryPolicy::new(FIXED_POLL_ATTEMPTS, deleting, fixed_interval)
    }
}
