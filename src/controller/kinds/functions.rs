//! Functions applications. No connection data is published.

use super::required;
use crate::constants::EXPONENTIAL_POLL_ATTEMPTS;
use crate::controller::convergence::{
    ensure_unchanged, exponential_backoff, Drift, DriftDetector, Lifecycle, Observation, ReconcileError,
    ResourceKind, RetryPolicy, SecretPayload,
};
use crate::crd::FunctionsApplication;
use crate::provider::credential_store::CredentialStore;
use crate::provider::oci::functions::{Application, CreateApplicationDetails, UpdateApplicationDetails};
use crate::provider::ListFilter;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionsApplicationKind;

fn lifecycle(raw_state: &str) -> Lifecycle {
    match raw_state {
        "CREATING" => Lifecycle::Creating,
        "ACTIVE" => Lifecycle::Active,
        "INACTIVE" => Lifecycle::Other,
        "UPDATING" => Lifecycle::Updating,
        "FAILED" => Lifecycle::Failed,
        "DELETING" => Lifecycle::Deleting,
        "DELETED" => Lifecycle::Deleted,
        _ => Lifecycle::Unknown,
    }
}

fn creating(observation: &Observation<Application>) -> bool {
    observation.retry_while(|a| lifecycle(&a.lifecycle_state).is_creating())
}

fn deleting(observation: &Observation<Application>) -> bool {
    observation.retry_while(|a| lifecycle(&a.lifecycle_state).is_deleting())
}

fn sorted(ids: &[String]) -> Vec<String> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids
}

#[async_trait]
impl ResourceKind for FunctionsApplicationKind {
    type Resource = FunctionsApplication;
    type Remote = Application;
    type Create = CreateApplicationDetails;
    type Update = UpdateApplicationDetails;

    const KIND: &'static str = "FunctionsApplication";
    const PUBLISHES_SECRET: bool = false;

    fn lifecycle(&self, raw_state: &str) -> Lifecycle {
        lifecycle(raw_state)
    }

    fn list_filter(&self, resource: &FunctionsApplication) -> Result<ListFilter, ReconcileError> {
        let spec = &resource.spec;
        Ok(ListFilter {
            display_name: spec.display_name.clone(),
            compartment_id: Some(required(Self::KIND, "compartmentId", spec.compartment_id.as_deref())?.to_string()),
            container_id: None,
        })
    }

    async fn create_details(
        &self,
        resource: &FunctionsApplication,
        _store: &dyn CredentialStore,
    ) -> Result<CreateApplicationDetails, ReconcileError> {
        let spec = &resource.spec;
        if spec.subnet_ids.iter().all(String::is_empty) {
            return Err(ReconcileError::InvalidSpec(format!(
                "{} requires at least one entry in spec.subnetIds to create",
                Self::KIND
            )));
        }
        Ok(CreateApplicationDetails {
            compartment_id: required(Self::KIND, "compartmentId", spec.compartment_id.as_deref())?.to_string(),
            display_name: spec.display_name.clone(),
            subnet_ids: spec.subnet_ids.iter().filter(|s| !s.is_empty()).cloned().collect(),
            config: spec.config.clone(),
            freeform_tags: spec.freeform_tags.clone(),
            defined_tags: spec.defined_tags.clone(),
        })
    }

    fn check_immutable(&self, resource: &FunctionsApplication, remote: &Application) -> Result<(), ReconcileError> {
        let desired = (!resource.spec.subnet_ids.is_empty()).then(|| sorted(&resource.spec.subnet_ids));
        ensure_unchanged(Self::KIND, "subnetIds", desired.as_ref(), &sorted(&remote.subnet_ids))
    }

    fn drift(&self, resource: &FunctionsApplication, remote: &Application) -> Option<Drift<UpdateApplicationDetails>> {
        let spec = &resource.spec;
        DriftDetector::<UpdateApplicationDetails>::new()
            .map("config", &spec.config, &remote.config, |u, v| u.config = Some(v))
            .map("freeformTags", &spec.freeform_tags, &remote.freeform_tags, |u, v| {
                u.freeform_tags = Some(v);
            })
            .map("definedTags", &spec.defined_tags, &remote.defined_tags, |u, v| {
                u.defined_tags = Some(v);
            })
            .finish()
    }

    fn secret_payload(&self, _remote: &Application) -> SecretPayload {
        SecretPayload::new()
    }

    fn create_policy(&self) -> RetryPolicy<Application> {
        RetryPolicy::new(EXPONENTIAL_POLL_ATTEMPTS, creating, exponential_backoff)
    }

    fn delete_policy(&self) -> RetryPolicy<Application> {
        RetryPolicy::new(EXPONENTIAL_POLL_ATTEMPTS, deleting, exponential_backoff)
    }
}
