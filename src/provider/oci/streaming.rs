//! # Streaming
//!
//! Streaming service REST client.
//!
//! - Base URL: `https://streaming.{region}.oci.oraclecloud.com/20180418`
//! - API endpoints: `/streams`, `/streams/{streamId}`

use super::{join, push_query, OciTransport};
use crate::crd::{DefinedTags, FreeformTags};
use crate::provider::{ListFilter, ProviderResult, RemoteObject, RemoteSummary, ResourceClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Stream as returned by `GET /streams/{streamId}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub compartment_id: String,
    #[serde(default)]
    pub partitions: i32,
    #[serde(default)]
    pub retention_in_hours: i32,
    #[serde(default)]
    pub stream_pool_id: Option<String>,
    pub lifecycle_state: String,
    #[serde(default)]
    pub lifecycle_state_details: Option<String>,
    /// Endpoint for producing and consuming messages
    #[serde(default)]
    pub messages_endpoint: Option<String>,
    #[serde(default)]
    pub freeform_tags: FreeformTags,
    #[serde(default)]
    pub defined_tags: DefinedTags,
}

impl RemoteObject for Stream {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn lifecycle_state(&self) -> &str {
        &self.lifecycle_state
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamSummary {
    id: String,
    name: String,
    lifecycle_state: String,
}

/// Request body for `POST /streams`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStreamDetails {
    pub name: String,
    pub partitions: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compartment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_in_hours: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_pool_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: FreeformTags,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub defined_tags: DefinedTags,
}

/// Request body for `PUT /streams/{streamId}`; only changed fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStreamDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_pool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<FreeformTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<DefinedTags>,
}

#[derive(Debug)]
pub struct StreamClient {
    transport: Arc<OciTransport>,
    endpoint: String,
}

impl StreamClient {
    #[must_use]
    pub fn new(transport: Arc<OciTransport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    fn stream_url(&self, id: &str) -> String {
        join(&self.endpoint, &format!("streams/{id}"))
    }
}

#[async_trait]
impl ResourceClient for StreamClient {
    type Remote = Stream;
    type Create = CreateStreamDetails;
    type Update = UpdateStreamDetails;

    async fn create(&self, details: &CreateStreamDetails) -> ProviderResult<Stream> {
        self.transport
            .post(&join(&self.endpoint, "streams"), details, "stream")
            .await
    }

    async fn get(&self, id: &str) -> ProviderResult<Stream> {
        self.transport.get(&self.stream_url(id), "stream").await
    }

    async fn list(&self, filter: &ListFilter) -> ProviderResult<Vec<RemoteSummary>> {
        // The API accepts exactly one of streamPoolId or compartmentId
        let mut query = Vec::new();
        if filter.container_id.as_deref().is_some_and(|p| !p.is_empty()) {
            push_query(&mut query, "streamPoolId", filter.container_id.as_deref());
        } else {
            push_query(&mut query, "compartmentId", filter.compartment_id.as_deref());
        }
        push_query(&mut query, "name", Some(&filter.display_name));

        let summaries: Vec<StreamSummary> = self
            .transport
            .list_all(&join(&self.endpoint, "streams"), &query, "stream list")
            .await?;
        Ok(summaries
            .into_iter()
            .map(|s| RemoteSummary {
                id: s.id,
                display_name: s.name,
                lifecycle_state: s.lifecycle_state,
            })
            .collect())
    }

    async fn update(&self, id: &str, details: &UpdateStreamDetails) -> ProviderResult<Stream> {
        self.transport
            .put(&self.stream_url(id), details, "stream")
            .await
    }

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        self.transport.delete(&self.stream_url(id)).await
    }
}
