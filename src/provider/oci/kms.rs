//! # Key Management
//!
//! KMS REST clients for vaults and the keys inside them.
//!
//! - Vault base URL: `https://kms.{region}.oraclecloud.com/20180608`
//! - Key base URL: the vault's own `managementEndpoint` plus `/20180608`
//!
//! Neither vaults nor keys can be deleted outright; both are scheduled for
//! deletion (`PENDING_DELETION`) and removed by the service after a grace period.

use super::{join, push_query, OciTransport};
use crate::crd::{DefinedTags, FreeformTags};
use crate::provider::{ListFilter, ProviderResult, RemoteObject, RemoteSummary, ResourceClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const KMS_API_VERSION: &str = "20180608";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub compartment_id: String,
    #[serde(default)]
    pub vault_type: String,
    pub lifecycle_state: String,
    #[serde(default)]
    pub crypto_endpoint: Option<String>,
    #[serde(default)]
    pub management_endpoint: Option<String>,
    #[serde(default)]
    pub freeform_tags: FreeformTags,
    #[serde(default)]
    pub defined_tags: DefinedTags,
}

impl RemoteObject for Vault {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn lifecycle_state(&self) -> &str {
        &self.lifecycle_state
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaultSummary {
    id: String,
    display_name: String,
    lifecycle_state: String,
}

/// Request body for `POST /vaults`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVaultDetails {
    pub compartment_id: String,
    pub display_name: String,
    pub vault_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: FreeformTags,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub defined_tags: DefinedTags,
}

/// Request body for `PUT /vaults/{vaultId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVaultDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<FreeformTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<DefinedTags>,
}

/// Body for `scheduleDeletion` actions; omitting the time uses the service default (30 days)
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleDeletionDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    time_of_deletion: Option<String>,
}

#[derive(Debug)]
pub struct VaultClient {
    transport: Arc<OciTransport>,
    endpoint: String,
}

impl VaultClient {
    #[must_use]
    pub fn new(transport: Arc<OciTransport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    fn vault_url(&self, id: &str) -> String {
        join(&self.endpoint, &format!("vaults/{id}"))
    }
}

#[async_trait]
impl ResourceClient for VaultClient {
    type Remote = Vault;
    type Create = CreateVaultDetails;
    type Update = UpdateVaultDetails;

    async fn create(&self, details: &CreateVaultDetails) -> ProviderResult<Vault> {
        self.transport
            .post(&join(&self.endpoint, "vaults"), details, "vault")
            .await
    }

    async fn get(&self, id: &str) -> ProviderResult<Vault> {
        self.transport.get(&self.vault_url(id), "vault").await
    }

    async fn list(&self, filter: &ListFilter) -> ProviderResult<Vec<RemoteSummary>> {
        // ListVaults has no name filter; match on display name client-side
        let mut query = Vec::new();
        push_query(&mut query, "compartmentId", filter.compartment_id.as_deref());

        let summaries: Vec<VaultSummary> = self
            .transport
            .list_all(&join(&self.endpoint, "vaults"), &query, "vault list")
            .await?;
        Ok(summaries
            .into_iter()
            .filter(|s| s.display_name == filter.display_name)
            .map(|s| RemoteSummary {
                id: s.id,
                display_name: s.display_name,
                lifecycle_state: s.lifecycle_state,
            })
            .collect())
    }

    async fn update(&self, id: &str, details: &UpdateVaultDetails) -> ProviderResult<Vault> {
        self.transport.put(&self.vault_url(id), details, "vault").await
    }

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        self.transport
            .post_action(
                &join(&self.vault_url(id), "actions/scheduleDeletion"),
                &ScheduleDeletionDetails::default(),
            )
            .await
    }
}

/// Shape of a key: algorithm, length and (for ECDSA) curve
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyShape {
    pub algorithm: String,
    pub length: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve_id: Option<String>,
}

/// Request body for `POST /keys` on a vault's management endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyDetails {
    pub compartment_id: String,
    pub display_name: String,
    pub key_shape: KeyShape,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    pub id: String,
    pub display_name: String,
    pub lifecycle_state: String,
    #[serde(default)]
    pub vault_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeySummary {
    id: String,
    display_name: String,
    lifecycle_state: String,
}

/// Key operations, addressed through the owning vault's management endpoint
#[async_trait]
pub trait KeyManagementClient: Send + Sync {
    async fn list_keys(
        &self,
        management_endpoint: &str,
        compartment_id: &str,
    ) -> ProviderResult<Vec<RemoteSummary>>;

    async fn create_key(
        &self,
        management_endpoint: &str,
        details: &CreateKeyDetails,
    ) -> ProviderResult<Key>;

    async fn schedule_key_deletion(
        &self,
        management_endpoint: &str,
        key_id: &str,
    ) -> ProviderResult<()>;
}

#[derive(Debug)]
pub struct KeyClient {
    transport: Arc<OciTransport>,
}

impl KeyClient {
    #[must_use]
    pub fn new(transport: Arc<OciTransport>) -> Self {
        Self { transport }
    }
}

fn keys_url(management_endpoint: &str) -> String {
    join(&join(management_endpoint, KMS_API_VERSION), "keys")
}

#[async_trait]
impl KeyManagementClient for KeyClient {
    async fn list_keys(
        &self,
        management_endpoint: &str,
        compartment_id: &str,
    ) -> ProviderResult<Vec<RemoteSummary>> {
        let query = vec![("compartmentId", compartment_id.to_string())];
        let summaries: Vec<KeySummary> = self
            .transport
            .list_all(&keys_url(management_endpoint), &query, "key list")
            .await?;
        Ok(summaries
            .into_iter()
            .map(|s| RemoteSummary {
                id: s.id,
                display_name: s.display_name,
                lifecycle_state: s.lifecycle_state,
            })
            .collect())
    }

    async fn create_key(
        &self,
        management_endpoint: &str,
        details: &CreateKeyDetails,
    ) -> ProviderResult<Key> {
        self.transport
            .post(&keys_url(management_endpoint), details, "key")
            .await
    }

    async fn schedule_key_deletion(
        &self,
        management_endpoint: &str,
        key_id: &str,
    ) -> ProviderResult<()> {
        let url = join(
            &keys_url(management_endpoint),
            &format!("{key_id}/actions/scheduleDeletion"),
        );
        self.transport
            .post_action(&url, &ScheduleDeletionDetails::default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_url_appends_api_version() {
        assert_eq!(
            keys_url("https://abc-management.kms.us-ashburn-1.oraclecloud.com/"),
            "https://abc-management.kms.us-ashburn-1.oraclecloud.com/20180608/keys"
        );
    }

    #[test]
    fn test_schedule_deletion_body_is_empty_object() {
        let body = serde_json::to_string(&ScheduleDeletionDetails::default()).unwrap();
        assert_eq!(body, "{}");
    }
}
