//! # Functions Application
//!
//! A Functions application: the network and configuration envelope that
//! individual functions are deployed into.

use super::{DefinedTags, FreeformTags, OciResourceStatus};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "FunctionsApplication",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "OciResourceStatus",
    shortname = "ocifnapp",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"OCID", "type":"string", "jsonPath":".status.ocid"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct FunctionsApplicationSpec {
    /// OCID of an existing application to bind; empty means discover or create by name
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub compartment_id: Option<String>,
    /// Subnets the application's functions run in (immutable)
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    /// Configuration passed to every function as environment variables
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    #[serde(default)]
    pub freeform_tags: FreeformTags,
    #[serde(default)]
    pub defined_tags: DefinedTags,
}

super::oci_resource!(FunctionsApplication, display_name);
