//! # Status Projection
//!
//! Pure functions deriving the next [`OciResourceStatus`] from what was
//! observed. No I/O; the runtime persists the result.

use crate::crd::{Condition, OciResourceStatus, ResourcePhase, READY_CONDITION};
use chrono::{DateTime, SecondsFormat, Utc};

/// Normalized remote lifecycle, mapped per kind from raw state strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Creating,
    Active,
    Updating,
    Failed,
    Deleting,
    Deleted,
    /// Recognized, settled, but carrying no convergence meaning (STOPPED, INACTIVE)
    Other,
    /// Unrecognized state string; treated as still in progress
    Unknown,
}

impl Lifecycle {
    #[must_use]
    pub fn phase(self) -> ResourcePhase {
        match self {
            Self::Creating | Self::Unknown => ResourcePhase::Provisioning,
            Self::Active | Self::Updating | Self::Other => ResourcePhase::Active,
            Self::Failed | Self::Deleting | Self::Deleted => ResourcePhase::Failed,
        }
    }

    /// The object can be read and its connection data published
    #[must_use]
    pub fn is_usable(self) -> bool {
        self.phase() == ResourcePhase::Active
    }

    /// Create polling continues; unrecognized states keep polling too
    #[must_use]
    pub fn is_creating(self) -> bool {
        matches!(self, Self::Creating | Self::Unknown)
    }

    #[must_use]
    pub fn is_deleting(self) -> bool {
        matches!(self, Self::Deleting | Self::Unknown)
    }

    /// Counts as "exists" when resolving by name
    #[must_use]
    pub fn blocks_creation(self) -> bool {
        matches!(self, Self::Creating | Self::Updating | Self::Active)
    }
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Replace the Ready condition, keeping `lastTransitionTime` while its status holds
fn ready_condition(
    existing: &OciResourceStatus,
    status: &str,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Vec<Condition> {
    let previous = existing.ready_condition();
    let last_transition_time = match previous {
        Some(prev) if prev.status == status => prev
            .last_transition_time
            .clone()
            .or_else(|| Some(timestamp(now))),
        _ => Some(timestamp(now)),
    };

    let mut conditions: Vec<Condition> = existing
        .conditions
        .iter()
        .filter(|c| c.r#type != READY_CONDITION)
        .cloned()
        .collect();
    conditions.push(Condition {
        r#type: READY_CONDITION.to_string(),
        status: status.to_string(),
        last_transition_time,
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
    });
    conditions
}

/// Status after observing the remote object
///
/// The OCID is set unconditionally; `createdAt` is stamped only when unset.
#[must_use]
pub fn project(
    kind: &str,
    ocid: &str,
    lifecycle: Lifecycle,
    raw_state: &str,
    existing: Option<&OciResourceStatus>,
    now: DateTime<Utc>,
) -> OciResourceStatus {
    let existing = existing.cloned().unwrap_or_default();
    let phase = lifecycle.phase();
    let (ready, message) = match phase {
        ResourcePhase::Active => ("True", format!("{kind} {ocid} is {raw_state}")),
        ResourcePhase::Provisioning => ("False", format!("{kind} {ocid} is provisioning ({raw_state})")),
        ResourcePhase::Failed | ResourcePhase::Terminating => {
            ("False", format!("{kind} {ocid} is in terminal state {raw_state}"))
        }
    };

    OciResourceStatus {
        ocid: Some(ocid.to_string()),
        phase: Some(phase),
        lifecycle_state: Some(raw_state.to_string()),
        created_at: existing.created_at.clone().or_else(|| Some(timestamp(now))),
        conditions: ready_condition(&existing, ready, phase.as_str(), &message, now),
        message: Some(message),
        observed_generation: existing.observed_generation,
    }
}

/// Status after a rejected request; the bound OCID and timestamps are kept
#[must_use]
pub fn failed(existing: Option<&OciResourceStatus>, message: &str, now: DateTime<Utc>) -> OciResourceStatus {
    let existing = existing.cloned().unwrap_or_default();
    OciResourceStatus {
        phase: Some(ResourcePhase::Failed),
        message: Some(message.to_string()),
        conditions: ready_condition(&existing, "False", ResourcePhase::Failed.as_str(), message, now),
        ..existing
    }
}

/// Status while teardown is in progress
#[must_use]
pub fn terminating(existing: Option<&OciResourceStatus>, message: &str, now: DateTime<Utc>) -> OciResourceStatus {
    let existing = existing.cloned().unwrap_or_default();
    OciResourceStatus {
        phase: Some(ResourcePhase::Terminating),
        message: Some(message.to_string()),
        conditions: ready_condition(
            &existing,
            "False",
            ResourcePhase::Terminating.as_str(),
            message,
            now,
        ),
        ..existing
    }
}
