//! # Provider Modules
//!
//! The outbound boundaries of the convergence engine.
//!
//! - [`ResourceClient`]: Create/Get/List/Update/Delete for one remote resource kind
//! - [`credential_store::CredentialStore`]: where derived connection data is written
//! - [`oci`]: the OCI REST implementation of every `ResourceClient`

use async_trait::async_trait;
use thiserror::Error;

pub mod credential_store;
pub mod oci;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors returned by remote resource clients
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The service answered with a non-success status
    #[error("OCI API error {status} {code}: {message} (opc-request-id: {request_id})")]
    Service {
        status: u16,
        code: String,
        message: String,
        request_id: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body did not have the expected shape
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("request signing failed: {0}")]
    Signing(String),
    /// A list endpoint kept handing out page tokens
    #[error("listing {what} did not finish: {reason}")]
    Pagination { what: &'static str, reason: String },
}

impl ProviderError {
    /// HTTP status of a service error
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode { .. } | Self::Signing(_) | Self::Pagination { .. } => None,
        }
    }

    /// Remote rejected the request as malformed or invalid (400)
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        self.status() == Some(400)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Filter applied to List calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Exact display name to match
    pub display_name: String,
    pub compartment_id: Option<String>,
    /// Containing scope below the compartment (stream pool, vault, ...)
    pub container_id: Option<String>,
}

/// Minimal projection of a listed remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSummary {
    pub id: String,
    pub display_name: String,
    pub lifecycle_state: String,
}

/// What the engine needs to read from any remote object
pub trait RemoteObject: Clone + std::fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;
    /// Raw lifecycle state as reported by the service
    fn lifecycle_state(&self) -> &str;
}

/// Remote management API for one resource kind
#[async_trait]
pub trait ResourceClient: Send + Sync {
    type Remote: RemoteObject;
    type Create: std::fmt::Debug + Send + Sync;
    type Update: std::fmt::Debug + Send + Sync;

    async fn create(&self, details: &Self::Create) -> ProviderResult<Self::Remote>;

    async fn get(&self, id: &str) -> ProviderResult<Self::Remote>;

    /// List objects matching the filter; every page is followed
    async fn list(&self, filter: &ListFilter) -> ProviderResult<Vec<RemoteSummary>>;

    async fn update(&self, id: &str, details: &Self::Update) -> ProviderResult<Self::Remote>;

    /// Request deletion; completion is observed by polling `get`
    async fn delete(&self, id: &str) -> ProviderResult<()>;
}
