//! # Secret Materialization
//!
//! Connection attributes of a usable remote object, written to the
//! credential store under the owning resource's name and namespace.
//!
//! A secret that already exists under that name is only replaced or removed
//! when it carries this operator's labels for the same kind.

use crate::constants::{KIND_LABEL, MANAGED_BY};
use crate::provider::credential_store::{CredentialStore, Labels, SecretData, StoreError};
use tracing::{debug, warn};

/// Flat key to bytes mapping; absent attributes are omitted, never stored empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretPayload(SecretData);

impl SecretPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` only when the attribute is present
    #[must_use]
    pub fn with(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.0.insert(key.to_string(), value.as_bytes().to_vec());
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.0.get(key).map(Vec::as_slice)
    }

    #[must_use]
    pub fn data(&self) -> &SecretData {
        &self.0
    }
}

/// Labels marking a secret as owned by this operator
#[must_use]
pub fn secret_labels(kind: &str) -> Labels {
    Labels::from([
        ("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string()),
        (KIND_LABEL.to_string(), kind.to_string()),
    ])
}

/// Whether `existing` carries every label in `ours`
fn owned(existing: &Labels, ours: &Labels) -> bool {
    ours.iter().all(|(k, v)| existing.get(k) == Some(v))
}

/// Create the secret, or replace our own when it already exists (last write wins)
///
/// # Errors
///
/// Returns [`StoreError::NotOwned`] when a secret of that name belongs to
/// someone else, and any other store error except "already exists" on create.
pub async fn upsert(
    store: &dyn CredentialStore,
    name: &str,
    namespace: &str,
    labels: &Labels,
    payload: &SecretPayload,
) -> Result<bool, StoreError> {
    match store.create_secret(name, namespace, labels, payload.data()).await {
        Ok(written) => Ok(written),
        Err(e) if e.is_already_exists() => {
            let existing = store.get_labels(name, namespace).await?;
            if !owned(&existing, labels) {
                return Err(StoreError::NotOwned {
                    name: name.to_string(),
                    namespace: namespace.to_string(),
                });
            }
            debug!(secret.name = name, secret.namespace = namespace, "secret exists, updating");
            store.update_secret(name, namespace, labels, payload.data()).await
        }
        Err(e) => Err(e),
    }
}

/// Best-effort removal of our own secret; failures are logged and never returned
pub async fn remove(store: &dyn CredentialStore, name: &str, namespace: &str, labels: &Labels) {
    let result = match store.get_labels(name, namespace).await {
        Ok(existing) if owned(&existing, labels) => store.delete_secret(name, namespace).await.map(drop),
        Ok(_) => {
            warn!(
                secret.name = name,
                secret.namespace = namespace,
                "secret is not managed by this operator, leaving it in place"
            );
            return;
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => debug!(secret.name = name, secret.namespace = namespace, "secret removed"),
        Err(e) if e.is_not_found() => {}
        Err(e) => warn!(
            secret.name = name,
            secret.namespace = namespace,
            error = %e,
            "failed to remove secret, leaving it behind"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_attributes_are_omitted() {
        let payload = SecretPayload::new()
            .with("primaryFqdn", Some("redis.example"))
            .with("replicasFqdn", None)
            .with("primaryEndpointIpAddress", Some(""));

        assert_eq!(payload.get("primaryFqdn"), Some(b"redis.example".as_slice()));
        assert_eq!(payload.get("replicasFqdn"), None);
        // present but empty is distinct from absent
        assert_eq!(payload.get("primaryEndpointIpAddress"), Some(b"".as_slice()));
        assert_eq!(payload.data().len(), 2);
    }

    #[test]
    fn test_ownership_needs_every_label() {
        let ours = secret_labels("Stream");
        let mut existing = secret_labels("Stream");
        existing.insert("team".to_string(), "payments".to_string());
        assert!(owned(&existing, &ours));
        assert!(!owned(&secret_labels("RedisCluster"), &ours));
        assert!(!owned(&Labels::new(), &ours));
    }

    #[test]
    fn test_labels_name_owner_and_kind() {
        let labels = secret_labels("Stream");
        assert_eq!(labels["app.kubernetes.io/managed-by"], "oci-service-operator");
        assert_eq!(labels["oci.oracle.com/kind"], "Stream");
    }
}
