//! # Credential Store
//!
//! Key-value storage for connection data derived from remote objects, keyed
//! by (name, namespace). [`KubeSecretStore`] backs it with Kubernetes Secrets.

use crate::constants::FIELD_MANAGER;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Secret payload: flat string keys to raw bytes
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Labels attached to a stored secret
pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("secret {namespace}/{name} already exists")]
    AlreadyExists { name: String, namespace: String },
    #[error("secret {namespace}/{name} not found")]
    NotFound { name: String, namespace: String },
    /// A secret with this name exists but carries another owner's labels
    #[error("secret {namespace}/{name} exists and is not managed by this operator")]
    NotOwned { name: String, namespace: String },
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_not_owned(&self) -> bool {
        matches!(self, Self::NotOwned { .. })
    }
}

/// Storage for materialized connection secrets
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a secret; fails with [`StoreError::AlreadyExists`] if one is present
    async fn create_secret(
        &self,
        name: &str,
        namespace: &str,
        labels: &Labels,
        data: &SecretData,
    ) -> Result<bool, StoreError>;

    /// Replace the labels and the whole data of an existing secret
    async fn update_secret(
        &self,
        name: &str,
        namespace: &str,
        labels: &Labels,
        data: &SecretData,
    ) -> Result<bool, StoreError>;

    async fn get_secret(&self, name: &str, namespace: &str) -> Result<SecretData, StoreError>;

    /// Labels of an existing secret, used to tell who owns it
    async fn get_labels(&self, name: &str, namespace: &str) -> Result<Labels, StoreError>;

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<bool, StoreError>;
}

/// [`CredentialStore`] backed by `Opaque` Kubernetes Secrets
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn write_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..PostParams::default()
    }
}

fn build_secret(name: &str, namespace: &str, labels: &Labels, data: &SecretData) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..ObjectMeta::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(encode_data(data)),
        ..Secret::default()
    }
}

fn encode_data(data: &SecretData) -> BTreeMap<String, ByteString> {
    data.iter()
        .map(|(k, v)| (k.clone(), ByteString(v.clone())))
        .collect()
}

fn classify(error: kube::Error, name: &str, namespace: &str) -> StoreError {
    match error {
        kube::Error::Api(e) if e.code == 409 => StoreError::AlreadyExists {
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        kube::Error::Api(e) if e.code == 404 => StoreError::NotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        other => StoreError::Kube(other),
    }
}

/// Swap in new labels and data, keeping the rest of the stored object
///
/// The resourceVersion stays, so a concurrent write fails the replace
/// instead of being lost.
fn replace_contents(mut existing: Secret, labels: &Labels, data: &SecretData) -> Secret {
    let mut merged = existing.metadata.labels.take().unwrap_or_default();
    merged.extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
    existing.metadata.labels = Some(merged);
    existing.metadata.managed_fields = None;
    existing.string_data = None;
    existing.data = Some(encode_data(data));
    existing
}

#[async_trait]
impl CredentialStore for KubeSecretStore {
    async fn create_secret(
        &self,
        name: &str,
        namespace: &str,
        labels: &Labels,
        data: &SecretData,
    ) -> Result<bool, StoreError> {
        let secret = build_secret(name, namespace, labels, data);
        self.api(namespace)
            .create(&write_params(), &secret)
            .await
            .map_err(|e| classify(e, name, namespace))?;
        debug!(secret.name = name, secret.namespace = namespace, "secret created");
        Ok(true)
    }

    async fn update_secret(
        &self,
        name: &str,
        namespace: &str,
        labels: &Labels,
        data: &SecretData,
    ) -> Result<bool, StoreError> {
        // A full replace drops every key not in `data`, whoever wrote it
        let api = self.api(namespace);
        let existing = api.get(name).await.map_err(|e| classify(e, name, namespace))?;
        let secret = replace_contents(existing, labels, data);
        api.replace(name, &write_params(), &secret)
            .await
            .map_err(|e| {
                // 409 here is a stale resourceVersion, not a name clash
                let stale = matches!(&e, kube::Error::Api(err) if err.code == 409);
                if stale {
                    StoreError::Kube(e)
                } else {
                    classify(e, name, namespace)
                }
            })?;
        debug!(secret.name = name, secret.namespace = namespace, "secret updated");
        Ok(true)
    }

    async fn get_secret(&self, name: &str, namespace: &str) -> Result<SecretData, StoreError> {
        let secret = self
            .api(namespace)
            .get(name)
            .await
            .map_err(|e| classify(e, name, namespace))?;
        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect())
    }

    async fn get_labels(&self, name: &str, namespace: &str) -> Result<Labels, StoreError> {
        let secret = self
            .api(namespace)
            .get_metadata(name)
            .await
            .map_err(|e| classify(e, name, namespace))?;
        Ok(secret.metadata.labels.unwrap_or_default())
    }

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<bool, StoreError> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| classify(e, name, namespace))?;
        debug!(secret.name = name, secret.namespace = namespace, "secret deleted");
        Ok(true)
    }
}
