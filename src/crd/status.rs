//! # Resource Status
//!
//! Status record shared by every managed kind.

use serde::{Deserialize, Serialize};

/// Type of the single condition maintained on every resource
pub const READY_CONDITION: &str = "Ready";

/// Normalized phase of a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ResourcePhase {
    /// Remote object is being created or is in an unrecognized transitional state
    Provisioning,
    /// Remote object is usable
    Active,
    /// Remote object reached a terminal failure state, or create was rejected
    Failed,
    /// Resource is being torn down
    Terminating,
}

impl ResourcePhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Provisioning => "Provisioning",
            Self::Active => "Active",
            Self::Failed => "Failed",
            Self::Terminating => "Terminating",
        }
    }
}

impl std::fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a managed OCI resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OciResourceStatus {
    /// OCID of the bound remote object; stable once set
    #[serde(default)]
    pub ocid: Option<String>,
    /// Current phase
    #[serde(default)]
    pub phase: Option<ResourcePhase>,
    /// Human-readable description of the current phase
    #[serde(default)]
    pub message: Option<String>,
    /// Raw lifecycle state last observed on the remote object
    #[serde(default)]
    pub lifecycle_state: Option<String>,
    /// First successful bind (RFC3339); never overwritten
    #[serde(default)]
    pub created_at: Option<String>,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Generation of the spec this status was computed from
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl OciResourceStatus {
    /// Bound OCID, `None` when unset or empty
    #[must_use]
    pub fn ocid(&self) -> Option<&str> {
        self.ocid.as_deref().filter(|id| !id.is_empty())
    }

    #[must_use]
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.r#type == READY_CONDITION)
    }

    #[must_use]
    pub fn is_phase(&self, phase: ResourcePhase) -> bool {
        self.phase == Some(phase)
    }
}

/// Condition type
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}
