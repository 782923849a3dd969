//! # Redis Cluster
//!
//! An OCI Cache cluster running Redis.

use super::{DefinedTags, FreeformTags, OciResourceStatus};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "RedisCluster",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "OciResourceStatus",
    shortname = "ociredis",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"OCID", "type":"string", "jsonPath":".status.ocid"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RedisClusterSpec {
    /// OCID of an existing cluster to bind; empty means discover or create by name
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub compartment_id: Option<String>,
    /// Number of nodes in the cluster
    #[serde(default)]
    pub node_count: Option<i32>,
    /// Memory per node in gigabytes
    #[serde(default, rename = "nodeMemoryInGBs")]
    pub node_memory_in_gbs: Option<f64>,
    /// Redis software version, e.g. `V7_0_5` (immutable)
    #[serde(default)]
    pub software_version: Option<String>,
    /// Subnet the cluster nodes attach to (immutable)
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub freeform_tags: FreeformTags,
    #[serde(default)]
    pub defined_tags: DefinedTags,
}

super::oci_resource!(RedisCluster, display_name);
