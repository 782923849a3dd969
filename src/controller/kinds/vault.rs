//! KMS vaults and the keys declared inside them.
//!
//! Keys are dependents: they are created through the vault's management
//! endpoint once the vault is usable, and all of them must be pending deletion
//! before the vault itself is scheduled for deletion.

use super::required;
use crate::constants::EXPONENTIAL_POLL_ATTEMPTS;
use crate::controller::convergence::{
    ensure_unchanged, exponential_backoff, Drift, DriftDetector, Lifecycle, Observation, ReconcileError,
    ResourceKind, RetryPolicy, SecretPayload,
};
use crate::crd::{Vault, VaultKeySpec};
use crate::observability::metrics;
use crate::provider::credential_store::CredentialStore;
use crate::provider::oci::kms::{
    self, CreateKeyDetails, CreateVaultDetails, KeyManagementClient, KeyShape, UpdateVaultDetails,
};
use crate::provider::{ListFilter, ProviderResult, RemoteSummary};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_VAULT_TYPE: &str = "DEFAULT";

pub struct VaultKind {
    keys: Arc<dyn KeyManagementClient>,
}

impl std::fmt::Debug for VaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKind").finish_non_exhaustive()
    }
}

impl VaultKind {
    #[must_use]
    pub fn new(keys: Arc<dyn KeyManagementClient>) -> Self {
        Self { keys }
    }

    /// Keys in the vault's compartment whose names are declared in the spec
    async fn declared_keys(
        &self,
        resource: &Vault,
        remote: &kms::Vault,
        management_endpoint: &str,
    ) -> ProviderResult<Vec<RemoteSummary>> {
        let result = self
            .keys
            .list_keys(management_endpoint, &remote.compartment_id)
            .await;
        metrics::record_remote_operation(<Self as ResourceKind>::KIND, "list_keys", result.is_ok());
        Ok(result?
            .into_iter()
            .filter(|k| resource.spec.keys.iter().any(|d| d.display_name == k.display_name))
            .collect())
    }
}

fn lifecycle(raw_state: &str) -> Lifecycle {
    match raw_state {
        "CREATING" => Lifecycle::Creating,
        "ACTIVE" => Lifecycle::Active,
        "UPDATING" | "CANCELLING_DELETION" | "BACKUP_IN_PROGRESS" | "RESTORING" => Lifecycle::Updating,
        "FAILED" => Lifecycle::Failed,
        "SCHEDULING_DELETION" | "DELETING" => Lifecycle::Deleting,
        // A vault pending deletion is gone as far as the operator is concerned
        "PENDING_DELETION" | "DELETED" => Lifecycle::Deleted,
        _ => Lifecycle::Unknown,
    }
}

fn creating(observation: &Observation<kms::Vault>) -> bool {
    observation.retry_while(|v| lifecycle(&v.lifecycle_state).is_creating())
}

fn deleting(observation: &Observation<kms::Vault>) -> bool {
    observation.retry_while(|v| lifecycle(&v.lifecycle_state).is_deleting())
}

fn key_deletion_settled(raw_state: &str) -> bool {
    matches!(raw_state, "PENDING_DELETION" | "DELETED")
}

fn key_deletion_started(raw_state: &str) -> bool {
    matches!(raw_state, "SCHEDULING_DELETION" | "DELETING") || key_deletion_settled(raw_state)
}

fn key_details(remote: &kms::Vault, key: &VaultKeySpec) -> CreateKeyDetails {
    CreateKeyDetails {
        compartment_id: remote.compartment_id.clone(),
        display_name: key.display_name.clone(),
        key_shape: KeyShape {
            algorithm: key.algorithm.as_str().to_string(),
            length: key.length,
            curve_id: key.curve_id.clone(),
        },
        protection_mode: key.protection_mode.clone(),
    }
}

fn management_endpoint(remote: &kms::Vault) -> Option<&str> {
    remote.management_endpoint.as_deref().filter(|e| !e.is_empty())
}

#[async_trait]
impl ResourceKind for VaultKind {
    type Resource = Vault;
    type Remote = kms::Vault;
    type Create = CreateVaultDetails;
    type Update = UpdateVaultDetails;

    const KIND: &'static str = "Vault";

    fn lifecycle(&self, raw_state: &str) -> Lifecycle {
        lifecycle(raw_state)
    }

    fn list_filter(&self, resource: &Vault) -> Result<ListFilter, ReconcileError> {
        let spec = &resource.spec;
        Ok(ListFilter {
            display_name: spec.display_name.clone(),
            compartment_id: Some(required(Self::KIND, "compartmentId", spec.compartment_id.as_deref())?.to_string()),
            container_id: None,
        })
    }

    async fn create_details(
        &self,
        resource: &Vault,
        _store: &dyn CredentialStore,
    ) -> Result<CreateVaultDetails, ReconcileError> {
        let spec = &resource.spec;
        Ok(CreateVaultDetails {
            compartment_id: required(Self::KIND, "compartmentId", spec.compartment_id.as_deref())?.to_string(),
            display_name: spec.display_name.clone(),
            vault_type: super::non_empty(spec.vault_type.as_deref())
                .unwrap_or(DEFAULT_VAULT_TYPE)
                .to_string(),
            freeform_tags: spec.freeform_tags.clone(),
            defined_tags: spec.defined_tags.clone(),
        })
    }

    fn check_immutable(&self, resource: &Vault, remote: &kms::Vault) -> Result<(), ReconcileError> {
        ensure_unchanged(
            Self::KIND,
            "vaultType",
            super::non_empty(resource.spec.vault_type.as_deref()),
            remote.vault_type.as_str(),
        )
    }

    fn drift(&self, resource: &Vault, remote: &kms::Vault) -> Option<Drift<UpdateVaultDetails>> {
        let spec = &resource.spec;
        DriftDetector::<UpdateVaultDetails>::new()
            .text("displayName", &spec.display_name, &remote.display_name, |u, v| {
                u.display_name = Some(v);
            })
            .map("freeformTags", &spec.freeform_tags, &remote.freeform_tags, |u, v| {
                u.freeform_tags = Some(v);
            })
            .map("definedTags", &spec.defined_tags, &remote.defined_tags, |u, v| {
                u.defined_tags = Some(v);
            })
            .finish()
    }

    fn secret_payload(&self, remote: &kms::Vault) -> SecretPayload {
        SecretPayload::new()
            .with("cryptoEndpoint", remote.crypto_endpoint.as_deref())
            .with("managementEndpoint", remote.management_endpoint.as_deref())
    }

    fn create_policy(&self) -> RetryPolicy<kms::Vault> {
        RetryPolicy::new(EXPONENTIAL_POLL_ATTEMPTS, creating, exponential_backoff)
    }

    fn delete_policy(&self) -> RetryPolicy<kms::Vault> {
        RetryPolicy::new(EXPONENTIAL_POLL_ATTEMPTS, deleting, exponential_backoff)
    }

    async fn converge_dependents(&self, resource: &Vault, remote: &kms::Vault) -> Result<(), ReconcileError> {
        if resource.spec.keys.is_empty() {
            return Ok(());
        }
        let Some(endpoint) = management_endpoint(remote) else {
            debug!(vault = %remote.id, "management endpoint not published yet, skipping keys");
            return Ok(());
        };

        let existing = self.declared_keys(resource, remote, endpoint).await?;
        for key in &resource.spec.keys {
            let present = existing
                .iter()
                .any(|k| k.display_name == key.display_name && !key_deletion_started(&k.lifecycle_state));
            if present {
                continue;
            }

            let result = self.keys.create_key(endpoint, &key_details(remote, key)).await;
            metrics::record_remote_operation(Self::KIND, "create_key", result.is_ok());
            let created = result?;
            info!(
                vault = %remote.id,
                key = %created.id,
                display_name = %created.display_name,
                "created vault key"
            );
        }
        Ok(())
    }

    async fn teardown_dependents(&self, resource: &Vault, remote: &kms::Vault) -> Result<bool, ReconcileError> {
        if resource.spec.keys.is_empty() {
            return Ok(true);
        }
        let Some(endpoint) = management_endpoint(remote) else {
            return Ok(true);
        };

        let mut settled = true;
        for key in self.declared_keys(resource, remote, endpoint).await? {
            if key_deletion_settled(&key.lifecycle_state) {
                continue;
            }
            settled = false;
            if key_deletion_started(&key.lifecycle_state) || key.lifecycle_state == "CREATING" {
                continue;
            }

            let result = self.keys.schedule_key_deletion(endpoint, &key.id).await;
            metrics::record_remote_operation(Self::KIND, "schedule_key_deletion", result.is_ok());
            result?;
            info!(vault = %remote.id, key = %key.id, "scheduled vault key deletion");
        }
        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{KeyAlgorithm, VaultSpec};
    use crate::provider::oci::kms::Key;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingKeys {
        listed: Mutex<Vec<RemoteSummary>>,
        created: Mutex<Vec<CreateKeyDetails>>,
        scheduled: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl KeyManagementClient for RecordingKeys {
        async fn list_keys(&self, _endpoint: &str, _compartment_id: &str) -> ProviderResult<Vec<RemoteSummary>> {
            Ok(self.listed.lock().unwrap().clone())
        }

        async fn create_key(&self, _endpoint: &str, details: &CreateKeyDetails) -> ProviderResult<Key> {
            self.created.lock().unwrap().push(details.clone());
            Ok(Key {
                id: format!("ocid1.key.oc1..{}", details.display_name),
                display_name: details.display_name.clone(),
                lifecycle_state: "CREATING".to_string(),
                vault_id: None,
            })
        }

        async fn schedule_key_deletion(&self, _endpoint: &str, key_id: &str) -> ProviderResult<()> {
            self.scheduled.lock().unwrap().push(key_id.to_string());
            Ok(())
        }
    }

    fn summary(name: &str, state: &str) -> RemoteSummary {
        RemoteSummary {
            id: format!("ocid1.key.oc1..{name}"),
            display_name: name.to_string(),
            lifecycle_state: state.to_string(),
        }
    }

    fn vault_with_keys(names: &[&str]) -> Vault {
        Vault::new(
            "secrets",
            VaultSpec {
                display_name: "secrets".to_string(),
                keys: names
                    .iter()
                    .map(|name| VaultKeySpec {
                        display_name: (*name).to_string(),
                        algorithm: KeyAlgorithm::Aes,
                        length: 32,
                        curve_id: None,
                        protection_mode: None,
                    })
                    .collect(),
                ..VaultSpec::default()
            },
        )
    }

    fn remote() -> kms::Vault {
        kms::Vault {
            id: "ocid1.vault.oc1..secrets".to_string(),
            display_name: "secrets".to_string(),
            compartment_id: "ocid1.compartment.oc1..app".to_string(),
            vault_type: "DEFAULT".to_string(),
            lifecycle_state: "ACTIVE".to_string(),
            crypto_endpoint: Some("https://abc-crypto.kms.us-ashburn-1.oraclecloud.com".to_string()),
            management_endpoint: Some("https://abc-management.kms.us-ashburn-1.oraclecloud.com".to_string()),
            ..kms::Vault::default()
        }
    }

    #[test]
    fn test_pending_deletion_counts_as_deleted() {
        assert_eq!(lifecycle("PENDING_DELETION"), Lifecycle::Deleted);
        assert_eq!(lifecycle("SCHEDULING_DELETION"), Lifecycle::Deleting);
        assert_eq!(lifecycle("CANCELLING_DELETION"), Lifecycle::Updating);
        assert!(!deleting(&Observation::Object(kms::Vault {
            lifecycle_state: "PENDING_DELETION".to_string(),
            ..kms::Vault::default()
        })));
    }

    #[tokio::test]
    async fn test_missing_keys_are_created() {
        let keys = Arc::new(RecordingKeys::default());
        keys.listed.lock().unwrap().push(summary("master", "ENABLED"));
        let kind = VaultKind::new(Arc::clone(&keys) as Arc<dyn KeyManagementClient>);

        kind.converge_dependents(&vault_with_keys(&["master", "backup"]), &remote())
            .await
            .unwrap();

        let created = keys.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].display_name, "backup");
        assert_eq!(created[0].key_shape.algorithm, "AES");
        assert_eq!(created[0].compartment_id, "ocid1.compartment.oc1..app");
    }

    #[tokio::test]
    async fn test_teardown_waits_for_keys_to_be_pending_deletion() {
        let keys = Arc::new(RecordingKeys::default());
        keys.listed
            .lock()
            .unwrap()
            .extend([summary("master", "ENABLED"), summary("backup", "PENDING_DELETION")]);
        let kind = VaultKind::new(Arc::clone(&keys) as Arc<dyn KeyManagementClient>);
        let vault = vault_with_keys(&["master", "backup"]);

        assert!(!kind.teardown_dependents(&vault, &remote()).await.unwrap());
        assert_eq!(*keys.scheduled.lock().unwrap(), vec!["ocid1.key.oc1..master".to_string()]);

        *keys.listed.lock().unwrap() = vec![summary("master", "PENDING_DELETION"), summary("backup", "DELETED")];
        assert!(kind.teardown_dependents(&vault, &remote()).await.unwrap());
        assert_eq!(keys.scheduled.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_undeclared_keys_are_left_alone() {
        let keys = Arc::new(RecordingKeys::default());
        keys.listed.lock().unwrap().push(summary("someone-elses", "ENABLED"));
        let kind = VaultKind::new(Arc::clone(&keys) as Arc<dyn KeyManagementClient>);

        assert!(kind
            .teardown_dependents(&vault_with_keys(&["master"]), &remote())
            .await
            .unwrap());
        assert!(keys.scheduled.lock().unwrap().is_empty());
    }

    #[test]
    fn test_secret_and_drift() {
        let payload = VaultKind::new(Arc::new(RecordingKeys::default())).secret_payload(&remote());
        assert_eq!(payload.data().len(), 2);

        let renamed = Vault::new(
            "secrets",
            VaultSpec {
                display_name: "team-secrets".to_string(),
                ..VaultSpec::default()
            },
        );
        let drift = VaultKind::new(Arc::new(RecordingKeys::default()))
            .drift(&renamed, &remote())
            .unwrap();
        assert_eq!(drift.fields, vec!["displayName"]);
    }
}
