//! # Autonomous Database
//!
//! Database service REST client for autonomous databases.
//!
//! - Base URL: `https://database.{region}.oraclecloud.com/20160918`
//! - API endpoints: `/autonomousDatabases`, `/autonomousDatabases/{autonomousDatabaseId}`

use super::{join, push_query, OciTransport};
use crate::crd::{DefinedTags, FreeformTags};
use crate::provider::{ListFilter, ProviderResult, RemoteObject, RemoteSummary, ResourceClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Connection strings published once the database is `AVAILABLE`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStrings {
    #[serde(default)]
    pub high: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub low: Option<String>,
    #[serde(default)]
    pub dedicated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutonomousDatabase {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub compartment_id: String,
    #[serde(default)]
    pub cpu_core_count: Option<i32>,
    #[serde(default, rename = "dataStorageSizeInTBs")]
    pub data_storage_size_in_tbs: Option<i32>,
    #[serde(default)]
    pub is_auto_scaling_enabled: Option<bool>,
    #[serde(default)]
    pub db_workload: Option<String>,
    #[serde(default)]
    pub is_free_tier: Option<bool>,
    pub lifecycle_state: String,
    #[serde(default)]
    pub lifecycle_details: Option<String>,
    #[serde(default)]
    pub connection_strings: Option<ConnectionStrings>,
    #[serde(default)]
    pub private_endpoint_ip: Option<String>,
    #[serde(default)]
    pub freeform_tags: FreeformTags,
    #[serde(default)]
    pub defined_tags: DefinedTags,
}

impl RemoteObject for AutonomousDatabase {
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
struct AutonomousDatabaseSummary {
    id: String,
    display_name: String,
    lifecycle_state: String,
}

/// ADMIN password, wiped from memory once the create request is dropped
#[derive(Clone, PartialEq, Eq, Serialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct AdminPassword(String);

impl AdminPassword {
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AdminPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminPassword(<redacted>)")
    }
}

/// Request body for `POST /autonomousDatabases`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAutonomousDatabaseDetails {
    pub compartment_id: String,
    pub display_name: String,
    pub db_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_core_count: Option<i32>,
    #[serde(rename = "dataStorageSizeInTBs", skip_serializing_if = "Option::is_none")]
    pub data_storage_size_in_tbs: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_auto_scaling_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_workload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_free_tier: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<AdminPassword>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: FreeformTags,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub defined_tags: DefinedTags,
}

/// Request body for `PUT /autonomousDatabases/{autonomousDatabaseId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAutonomousDatabaseDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_core_count: Option<i32>,
    #[serde(rename = "dataStorageSizeInTBs", skip_serializing_if = "Option::is_none")]
    pub data_storage_size_in_tbs: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_auto_scaling_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<FreeformTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<DefinedTags>,
}

#[derive(Debug)]
pub struct AutonomousDatabaseClient {
    transport: Arc<OciTransport>,
    endpoint: String,
}

impl AutonomousDatabaseClient {
    #[must_use]
    pub fn new(transport: Arc<OciTransport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    fn database_url(&self, id: &str) -> String {
        join(&self.endpoint, &format!("autonomousDatabases/{id}"))
    }
}

#[async_trait]
impl ResourceClient for AutonomousDatabaseClient {
    type Remote = AutonomousDatabase;
    type Create = CreateAutonomousDatabaseDetails;
    type Update = UpdateAutonomousDatabaseDetails;

    async fn create(
        &self,
        details: &CreateAutonomousDatabaseDetails,
    ) -> ProviderResult<AutonomousDatabase> {
        self.transport
            .post(
                &join(&self.endpoint, "autonomousDatabases"),
                details,
                "autonomous database",
            )
            .await
    }

    async fn get(&self, id: &str) -> ProviderResult<AutonomousDatabase> {
        self.transport
            .get(&self.database_url(id), "autonomous database")
            .await
    }

    async fn list(&self, filter: &ListFilter) -> ProviderResult<Vec<RemoteSummary>> {
        let mut query = Vec::new();
        push_query(&mut query, "compartmentId", filter.compartment_id.as_deref());
        push_query(&mut query, "displayName", Some(&filter.display_name));

        let summaries: Vec<AutonomousDatabaseSummary> = self
            .transport
            .list_all(
                &join(&self.endpoint, "autonomousDatabases"),
                &query,
                "autonomous database list",
            )
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

    async fn update(
        &self,
        id: &str,
        details: &UpdateAutonomousDatabaseDetails,
    ) -> ProviderResult<AutonomousDatabase> {
        self.transport
            .put(&self.database_url(id), details, "autonomous database")
            .await
    }

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        self.transport.delete(&self.database_url(id)).await
    }
}
