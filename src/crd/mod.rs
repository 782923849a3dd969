//! # Custom Resource Definitions
//!
//! CRD types for the OCI resource kinds managed by the operator.
//!
//! ## Module Structure
//!
//! - `status.rs` - Shared status record, phases and conditions
//! - `stream.rs` - Streaming service streams
//! - `redis.rs` - OCI Cache (Redis) clusters
//! - `functions.rs` - Functions applications
//! - `vault.rs` - KMS vaults and their keys
//! - `autonomous_database.rs` - Autonomous databases
//!
//! All kinds live in the `oci.oracle.com/v1beta1` API group, are namespaced and
//! use the status subresource.

mod autonomous_database;
mod functions;
mod redis;
mod status;
mod stream;
mod vault;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::core::NamespaceResourceScope;
use kube::CustomResourceExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

pub use autonomous_database::{AutonomousDatabase, AutonomousDatabaseSpec};
pub use functions::{FunctionsApplication, FunctionsApplicationSpec};
pub use redis::{RedisCluster, RedisClusterSpec};
pub use status::{Condition, OciResourceStatus, ResourcePhase, READY_CONDITION};
pub use stream::{Stream, StreamSpec};
pub use vault::{KeyAlgorithm, Vault, VaultKeySpec, VaultSpec};

/// API group shared by every kind
pub const API_GROUP: &str = "oci.oracle.com";

/// Namespaced defined tags (`namespace -> key -> value`)
pub type DefinedTags = BTreeMap<String, BTreeMap<String, String>>;

/// Free-form tags
pub type FreeformTags = BTreeMap<String, String>;

/// Reference to a key inside a Kubernetes Secret in the resource's namespace
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    /// Secret name
    pub secret_name: String,
    /// Key inside the secret data (defaults to `password`)
    #[serde(default)]
    pub key: Option<String>,
}

/// Accessors the convergence engine needs from every managed custom resource
pub trait OciResource:
    kube::Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + std::fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Caller-supplied remote identifier, `None` when empty
    fn spec_ocid(&self) -> Option<&str>;

    /// Display name used for lookup and creation
    fn display_name(&self) -> &str;

    fn oci_status(&self) -> Option<&OciResourceStatus>;

    /// Status record, created empty on first access
    fn oci_status_mut(&mut self) -> &mut OciResourceStatus;

    /// Identifier recorded by a previous successful bind
    fn status_ocid(&self) -> Option<&str> {
        self.oci_status().and_then(OciResourceStatus::ocid)
    }
}

macro_rules! oci_resource {
    ($kind:ty, $name_field:ident) => {
        impl $crate::crd::OciResource for $kind {
            fn spec_ocid(&self) -> Option<&str> {
                self.spec.id.as_deref().filter(|id| !id.is_empty())
            }

            fn display_name(&self) -> &str {
                &self.spec.$name_field
            }

            fn oci_status(&self) -> Option<&$crate::crd::OciResourceStatus> {
                self.status.as_ref()
            }

            fn oci_status_mut(&mut self) -> &mut $crate::crd::OciResourceStatus {
                self.status.get_or_insert_with(Default::default)
            }
        }
    };
}
pub(crate) use oci_resource;

/// CustomResourceDefinitions for every managed kind, keyed by kind name
#[must_use]
pub fn crds() -> Vec<(&'static str, CustomResourceDefinition)> {
    vec![
        ("Stream", Stream::crd()),
        ("RedisCluster", RedisCluster::crd()),
        ("FunctionsApplication", FunctionsApplication::crd()),
        ("Vault", Vault::crd()),
        ("AutonomousDatabase", AutonomousDatabase::crd()),
    ]
}
