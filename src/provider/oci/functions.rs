//! # Functions
//!
//! Functions service REST client for applications.
//!
//! - Base URL: `https://functions.{region}.oci.oraclecloud.com/20181201`
//! - API endpoints: `/applications`, `/applications/{applicationId}`

use super::{join, push_query, OciTransport};
use crate::crd::{DefinedTags, FreeformTags};
use crate::provider::{ListFilter, ProviderResult, RemoteObject, RemoteSummary, ResourceClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub compartment_id: String,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    pub lifecycle_state: String,
    #[serde(default)]
    pub freeform_tags: FreeformTags,
    #[serde(default)]
    pub defined_tags: DefinedTags,
}

impl RemoteObject for Application {
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
struct ApplicationSummary {
    id: String,
    display_name: String,
    lifecycle_state: String,
}

/// Request body for `POST /applications`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationDetails {
    pub compartment_id: String,
    pub display_name: String,
    pub subnet_ids: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: FreeformTags,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub defined_tags: DefinedTags,
}

/// Request body for `PUT /applications/{applicationId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<FreeformTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<DefinedTags>,
}

#[derive(Debug)]
pub struct ApplicationClient {
    transport: Arc<OciTransport>,
    endpoint: String,
}

impl ApplicationClient {
    #[must_use]
    pub fn new(transport: Arc<OciTransport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    fn application_url(&self, id: &str) -> String {
        join(&self.endpoint, &format!("applications/{id}"))
    }
}

#[async_trait]
impl ResourceClient for ApplicationClient {
    type Remote = Application;
    type Create = CreateApplicationDetails;
    type Update = UpdateApplicationDetails;

    async fn create(&self, details: &CreateApplicationDetails) -> ProviderResult<Application> {
        self.transport
            .post(&join(&self.endpoint, "applications"), details, "application")
            .await
    }

    async fn get(&self, id: &str) -> ProviderResult<Application> {
        self.transport
            .get(&self.application_url(id), "application")
            .await
    }

    async fn list(&self, filter: &ListFilter) -> ProviderResult<Vec<RemoteSummary>> {
        let mut query = Vec::new();
        push_query(&mut query, "compartmentId", filter.compartment_id.as_deref());
        push_query(&mut query, "displayName", Some(&filter.display_name));

        let summaries: Vec<ApplicationSummary> = self
            .transport
            .list_all(&join(&self.endpoint, "applications"), &query, "application list")
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
        details: &UpdateApplicationDetails,
    ) -> ProviderResult<Application> {
        self.transport
            .put(&self.application_url(id), details, "application")
            .await
    }

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        self.transport.delete(&self.application_url(id)).await
    }
}
