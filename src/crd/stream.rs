//! # Stream
//!
//! An OCI Streaming service stream. Partitions and retention are fixed at
//! creation time; only the stream pool and tags can change afterwards.

use super::{DefinedTags, FreeformTags, OciResourceStatus};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Stream",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "OciResourceStatus",
    shortname = "ocistream",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"OCID", "type":"string", "jsonPath":".status.ocid"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StreamSpec {
    /// OCID of an existing stream to bind; empty means discover or create by name
    #[serde(default)]
    pub id: Option<String>,
    /// Stream name (immutable)
    #[serde(default)]
    pub name: String,
    /// Compartment the stream lives in (required unless `streamPoolId` is set)
    #[serde(default)]
    pub compartment_id: Option<String>,
    /// Partition count (immutable, defaults to 1)
    #[serde(default)]
    pub partitions: Option<i32>,
    /// Retention period in hours (immutable)
    #[serde(default)]
    pub retention_in_hours: Option<i32>,
    /// Stream pool the stream belongs to
    #[serde(default)]
    pub stream_pool_id: Option<String>,
    #[serde(default)]
    pub freeform_tags: FreeformTags,
    #[serde(default)]
    pub defined_tags: DefinedTags,
}

super::oci_resource!(Stream, name);
