//! # OCI Cache
//!
//! OCI Cache (Redis) REST client.
//!
//! - Base URL: `https://redis.{region}.oci.oraclecloud.com/20220315`
//! - API endpoints: `/redisClusters`, `/redisClusters/{redisClusterId}`
//!
//! Update and delete are asynchronous and answer `202 Accepted` with a work
//! request id and no body, so update re-reads the cluster afterwards.

use super::{join, push_query, OciTransport};
use crate::crd::{DefinedTags, FreeformTags};
use crate::provider::{ListFilter, ProviderResult, RemoteObject, RemoteSummary, ResourceClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedisCluster {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub compartment_id: String,
    #[serde(default)]
    pub node_count: i32,
    #[serde(default, rename = "nodeMemoryInGBs")]
    pub node_memory_in_gbs: f64,
    #[serde(default)]
    pub software_version: String,
    #[serde(default)]
    pub subnet_id: String,
    pub lifecycle_state: String,
    #[serde(default)]
    pub lifecycle_details: Option<String>,
    #[serde(default)]
    pub primary_fqdn: Option<String>,
    #[serde(default)]
    pub primary_endpoint_ip_address: Option<String>,
    #[serde(default)]
    pub replicas_fqdn: Option<String>,
    #[serde(default)]
    pub replicas_endpoint_ip_address: Option<String>,
    #[serde(default)]
    pub freeform_tags: FreeformTags,
    #[serde(default)]
    pub defined_tags: DefinedTags,
}

impl RemoteObject for RedisCluster {
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
struct RedisClusterSummary {
    id: String,
    display_name: String,
    lifecycle_state: String,
}

/// Request body for `POST /redisClusters`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRedisClusterDetails {
    pub display_name: String,
    pub compartment_id: String,
    pub node_count: i32,
    #[serde(rename = "nodeMemoryInGBs")]
    pub node_memory_in_gbs: f64,
    pub software_version: String,
    pub subnet_id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: FreeformTags,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub defined_tags: DefinedTags,
}

/// Request body for `PUT /redisClusters/{redisClusterId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRedisClusterDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<i32>,
    #[serde(rename = "nodeMemoryInGBs", skip_serializing_if = "Option::is_none")]
    pub node_memory_in_gbs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<FreeformTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<DefinedTags>,
}

#[derive(Debug)]
pub struct RedisClusterClient {
    transport: Arc<OciTransport>,
    endpoint: String,
}

impl RedisClusterClient {
    #[must_use]
    pub fn new(transport: Arc<OciTransport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    fn cluster_url(&self, id: &str) -> String {
        join(&self.endpoint, &format!("redisClusters/{id}"))
    }
}

#[async_trait]
impl ResourceClient for RedisClusterClient {
    type Remote = RedisCluster;
    type Create = CreateRedisClusterDetails;
    type Update = UpdateRedisClusterDetails;

    async fn create(&self, details: &CreateRedisClusterDetails) -> ProviderResult<RedisCluster> {
        self.transport
            .post(&join(&self.endpoint, "redisClusters"), details, "redis cluster")
            .await
    }

    async fn get(&self, id: &str) -> ProviderResult<RedisCluster> {
        self.transport.get(&self.cluster_url(id), "redis cluster").await
    }

    async fn list(&self, filter: &ListFilter) -> ProviderResult<Vec<RemoteSummary>> {
        let mut query = Vec::new();
        push_query(&mut query, "compartmentId", filter.compartment_id.as_deref());
        push_query(&mut query, "displayName", Some(&filter.display_name));

        let summaries: Vec<RedisClusterSummary> = self
            .transport
            .list_all(&join(&self.endpoint, "redisClusters"), &query, "redis cluster list")
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
        details: &UpdateRedisClusterDetails,
    ) -> ProviderResult<RedisCluster> {
        self.transport.put_accepted(&self.cluster_url(id), details).await?;
        self.get(id).await
    }

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        self.transport.delete(&self.cluster_url(id)).await
    }
}
