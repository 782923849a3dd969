//! # Autonomous Database
//!
//! An Autonomous Database (shared infrastructure). The admin password is read
//! from a Kubernetes Secret at creation time; connection strings are published
//! back into a Secret named after the resource.

use super::{DefinedTags, FreeformTags, OciResourceStatus, SecretKeyRef};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "AutonomousDatabase",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "OciResourceStatus",
    shortname = "ociadb",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"OCID", "type":"string", "jsonPath":".status.ocid"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AutonomousDatabaseSpec {
    /// OCID of an existing database to bind; empty means discover or create by name
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    /// Database name (immutable)
    #[serde(default)]
    pub db_name: Option<String>,
    #[serde(default)]
    pub compartment_id: Option<String>,
    #[serde(default)]
    pub cpu_core_count: Option<i32>,
    #[serde(default, rename = "dataStorageSizeInTBs")]
    pub data_storage_size_in_tbs: Option<i32>,
    #[serde(default)]
    pub is_auto_scaling_enabled: Option<bool>,
    /// `OLTP`, `DW`, `AJD` or `APEX` (immutable)
    #[serde(default)]
    pub db_workload: Option<String>,
    #[serde(default)]
    pub is_free_tier: Option<bool>,
    /// Secret holding the ADMIN password (required to create)
    #[serde(default)]
    pub admin_password: Option<SecretKeyRef>,
    #[serde(default)]
    pub freeform_tags: FreeformTags,
    #[serde(default)]
    pub defined_tags: DefinedTags,
}

super::oci_resource!(AutonomousDatabase, display_name);
