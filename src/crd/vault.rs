//! # Vault
//!
//! A KMS vault together with the master encryption keys declared inside it.
//! Keys are created after the vault is usable and are scheduled for deletion
//! before the vault itself on teardown.

use super::{DefinedTags, FreeformTags, OciResourceStatus};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Vault",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "OciResourceStatus",
    shortname = "ocivault",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"OCID", "type":"string", "jsonPath":".status.ocid"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VaultSpec {
    /// OCID of an existing vault to bind; empty means discover or create by name
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub compartment_id: Option<String>,
    /// `DEFAULT` or `VIRTUAL_PRIVATE` (immutable, defaults to `DEFAULT`)
    #[serde(default)]
    pub vault_type: Option<String>,
    /// Keys managed inside this vault
    #[serde(default)]
    pub keys: Vec<VaultKeySpec>,
    #[serde(default)]
    pub freeform_tags: FreeformTags,
    #[serde(default)]
    pub defined_tags: DefinedTags,
}

/// A master encryption key inside the vault, identified by display name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultKeySpec {
    pub display_name: String,
    pub algorithm: KeyAlgorithm,
    /// Key length in bytes (16, 24, 32 for AES; 256, 384, 512 for RSA; 32, 48, 66 for ECDSA)
    pub length: i32,
    /// Curve for ECDSA keys, e.g. `NIST_P256`
    #[serde(default)]
    pub curve_id: Option<String>,
    /// `HSM` or `SOFTWARE` (defaults to `HSM`)
    #[serde(default)]
    pub protection_mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyAlgorithm {
    Aes,
    Rsa,
    Ecdsa,
}

impl KeyAlgorithm {
    /// Wire name used in `keyShape.algorithm`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aes => "AES",
            Self::Rsa => "RSA",
            Self::Ecdsa => "ECDSA",
        }
    }
}

super::oci_resource!(Vault, display_name);
