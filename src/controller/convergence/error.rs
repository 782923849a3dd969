//! Errors surfaced by a convergence pass.

use crate::provider::credential_store::StoreError;
use crate::provider::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Neither an external id nor a display name: nothing to find, nothing to create
    #[error("{kind} {namespace}/{name} has neither an id nor a display name")]
    MissingIdentity {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    /// The spec asks to change a field the remote API cannot update in place
    #[error("{kind} field `{field}` is immutable: desired {desired}, observed {observed}")]
    ImmutableField {
        kind: &'static str,
        field: &'static str,
        desired: String,
        observed: String,
    },
    #[error("invalid spec: {0}")]
    InvalidSpec(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("credential store: {0}")]
    CredentialStore(#[from] StoreError),
}

impl ReconcileError {
    /// Input errors are not worth retrying until the spec changes
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingIdentity { .. } | Self::ImmutableField { .. } | Self::InvalidSpec(_)
        )
    }
}
