//! Common test utilities: in-memory fakes for the engine's outbound boundaries
#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use oci_service_operator::controller::convergence::secret::secret_labels;
use oci_service_operator::provider::credential_store::{CredentialStore, Labels, SecretData, StoreError};
use oci_service_operator::provider::oci::kms::{CreateKeyDetails, Key, KeyManagementClient};
use oci_service_operator::provider::{
    ListFilter, ProviderError, ProviderResult, RemoteObject, RemoteSummary, ResourceClient,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, Once};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Err only means a provider is already installed
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

pub fn not_found() -> ProviderError {
    ProviderError::Service {
        status: 404,
        code: "NotAuthorizedOrNotFound".to_string(),
        message: "Authorization failed or requested resource not found".to_string(),
        request_id: "test".to_string(),
    }
}

pub fn bad_request(message: &str) -> ProviderError {
    ProviderError::Service {
        status: 400,
        code: "InvalidParameter".to_string(),
        message: message.to_string(),
        request_id: "test".to_string(),
    }
}

/// A body that does not decode into the expected type
pub fn undecodable() -> ProviderError {
    ProviderError::Decode {
        what: "test object",
        source: serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
    }
}

pub fn summary(id: &str, display_name: &str, state: &str) -> RemoteSummary {
    RemoteSummary {
        id: id.to_string(),
        display_name: display_name.to_string(),
        lifecycle_state: state.to_string(),
    }
}

/// Scripted [`ResourceClient`] that records every call
///
/// `get` answers from `scripted_gets` first, then with the current object
/// (404 when there is none). `update` applies the request to the current
/// object; `delete` swaps in `after_delete`.
pub struct FakeClient<R, C, U> {
    pub current: Mutex<Option<R>>,
    pub scripted_gets: Mutex<VecDeque<ProviderResult<R>>>,
    pub listed: Mutex<Vec<RemoteSummary>>,
    pub create_result: Mutex<Option<ProviderResult<R>>>,
    pub after_delete: Mutex<Option<R>>,
    pub creates: Mutex<Vec<C>>,
    pub updates: Mutex<Vec<(String, U)>>,
    pub deletes: Mutex<Vec<String>>,
    pub gets: Mutex<Vec<String>>,
    pub lists: Mutex<Vec<ListFilter>>,
    apply_update: fn(&mut R, &U),
}

impl<R: Clone, C, U> FakeClient<R, C, U> {
    pub fn new(apply_update: fn(&mut R, &U)) -> Self {
        Self {
            current: Mutex::new(None),
            scripted_gets: Mutex::new(VecDeque::new()),
            listed: Mutex::new(Vec::new()),
            create_result: Mutex::new(None),
            after_delete: Mutex::new(None),
            creates: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            gets: Mutex::new(Vec::new()),
            lists: Mutex::new(Vec::new()),
            apply_update,
        }
    }

    pub fn with_current(self, remote: R) -> Self {
        *self.current.lock().unwrap() = Some(remote);
        self
    }

    pub fn with_listed(self, listed: Vec<RemoteSummary>) -> Self {
        *self.listed.lock().unwrap() = listed;
        self
    }

    pub fn with_create_result(self, result: ProviderResult<R>) -> Self {
        *self.create_result.lock().unwrap() = Some(result);
        self
    }

    pub fn with_scripted_get(self, result: ProviderResult<R>) -> Self {
        self.scripted_gets.lock().unwrap().push_back(result);
        self
    }

    pub fn with_after_delete(self, remote: R) -> Self {
        *self.after_delete.lock().unwrap() = Some(remote);
        self
    }

    pub fn set_current(&self, remote: R) {
        *self.current.lock().unwrap() = Some(remote);
    }

    pub fn create_count(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.lock().unwrap().len()
    }

    pub fn get_count(&self) -> usize {
        self.gets.lock().unwrap().len()
    }

    pub fn list_count(&self) -> usize {
        self.lists.lock().unwrap().len()
    }

    /// Every remote call made so far
    pub fn total_calls(&self) -> usize {
        self.create_count() + self.update_count() + self.delete_count() + self.get_count() + self.list_count()
    }
}

#[async_trait]
impl<R, C, U> ResourceClient for FakeClient<R, C, U>
where
    R: RemoteObject,
    C: std::fmt::Debug + Clone + Send + Sync,
    U: std::fmt::Debug + Clone + Send + Sync,
{
    type Remote = R;
    type Create = C;
    type Update = U;

    async fn create(&self, details: &C) -> ProviderResult<R> {
        self.creates.lock().unwrap().push(details.clone());
        let result = self
            .create_result
            .lock()
            .unwrap()
            .take()
            .expect("create was not scripted");
        if let Ok(created) = &result {
            self.set_current(created.clone());
        }
        result
    }

    async fn get(&self, id: &str) -> ProviderResult<R> {
        self.gets.lock().unwrap().push(id.to_string());
        if let Some(scripted) = self.scripted_gets.lock().unwrap().pop_front() {
            return scripted;
        }
        self.current.lock().unwrap().clone().ok_or_else(not_found)
    }

    async fn list(&self, filter: &ListFilter) -> ProviderResult<Vec<RemoteSummary>> {
        self.lists.lock().unwrap().push(filter.clone());
        Ok(self.listed.lock().unwrap().clone())
    }

    async fn update(&self, id: &str, details: &U) -> ProviderResult<R> {
        self.updates.lock().unwrap().push((id.to_string(), details.clone()));
        let mut current = self.current.lock().unwrap();
        let remote = current.as_mut().ok_or_else(not_found)?;
        (self.apply_update)(remote, details);
        Ok(remote.clone())
    }

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        self.deletes.lock().unwrap().push(id.to_string());
        let after = self.after_delete.lock().unwrap().take();
        *self.current.lock().unwrap() = after;
        Ok(())
    }
}

/// In-memory [`CredentialStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub secrets: Mutex<BTreeMap<(String, String), (Labels, SecretData)>>,
    pub updates: Mutex<usize>,
}

impl MemoryStore {
    pub fn with_secret(self, name: &str, namespace: &str, key: &str, value: &str) -> Self {
        self.secrets.lock().unwrap().insert(
            (namespace.to_string(), name.to_string()),
            (Labels::new(), SecretData::from([(key.to_string(), value.as_bytes().to_vec())])),
        );
        self
    }

    /// Seed a secret labelled as written by the operator for `kind`
    pub fn with_owned_secret(self, kind: &str, name: &str, namespace: &str, key: &str, value: &str) -> Self {
        self.secrets.lock().unwrap().insert(
            (namespace.to_string(), name.to_string()),
            (
                secret_labels(kind),
                SecretData::from([(key.to_string(), value.as_bytes().to_vec())]),
            ),
        );
        self
    }

    pub fn value(&self, name: &str, namespace: &str, key: &str) -> Option<String> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|(_, data)| data.get(key))
            .map(|v| String::from_utf8(v.clone()).unwrap())
    }

    pub fn labels(&self, name: &str, namespace: &str) -> Option<Labels> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .map(|(labels, _)| labels.clone())
    }

    pub fn contains(&self, name: &str, namespace: &str) -> bool {
        self.secrets
            .lock()
            .unwrap()
            .contains_key(&(namespace.to_string(), name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.secrets.lock().unwrap().len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_secret(
        &self,
        name: &str,
        namespace: &str,
        labels: &Labels,
        data: &SecretData,
    ) -> Result<bool, StoreError> {
        let mut secrets = self.secrets.lock().unwrap();
        let key = (namespace.to_string(), name.to_string());
        if secrets.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                name: name.to_string(),
                namespace: namespace.to_string(),
            });
        }
        secrets.insert(key, (labels.clone(), data.clone()));
        Ok(true)
    }

    async fn update_secret(
        &self,
        name: &str,
        namespace: &str,
        labels: &Labels,
        data: &SecretData,
    ) -> Result<bool, StoreError> {
        let mut secrets = self.secrets.lock().unwrap();
        let key = (namespace.to_string(), name.to_string());
        if !secrets.contains_key(&key) {
            return Err(StoreError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            });
        }
        secrets.insert(key, (labels.clone(), data.clone()));
        *self.updates.lock().unwrap() += 1;
        Ok(true)
    }

    async fn get_secret(&self, name: &str, namespace: &str) -> Result<SecretData, StoreError> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .map(|(_, data)| data.clone())
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }

    async fn get_labels(&self, name: &str, namespace: &str) -> Result<Labels, StoreError> {
        self.labels(name, namespace).ok_or_else(|| StoreError::NotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })
    }

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<bool, StoreError> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some())
    }
}

/// [`KeyManagementClient`] whose key states are set by the test
#[derive(Debug, Default)]
pub struct FakeKeys {
    pub keys: Mutex<Vec<RemoteSummary>>,
    pub created: Mutex<Vec<CreateKeyDetails>>,
    pub scheduled: Mutex<Vec<String>>,
}

impl FakeKeys {
    pub fn set_state(&self, state: &str) {
        for key in self.keys.lock().unwrap().iter_mut() {
            key.lifecycle_state = state.to_string();
        }
    }
}

#[async_trait]
impl KeyManagementClient for FakeKeys {
    async fn list_keys(&self, _management_endpoint: &str, _compartment_id: &str) -> ProviderResult<Vec<RemoteSummary>> {
        Ok(self.keys.lock().unwrap().clone())
    }

    async fn create_key(&self, _management_endpoint: &str, details: &CreateKeyDetails) -> ProviderResult<Key> {
        self.created.lock().unwrap().push(details.clone());
        let key = Key {
            id: format!("ocid1.key.oc1..{}", details.display_name),
            display_name: details.display_name.clone(),
            lifecycle_state: "CREATING".to_string(),
            vault_id: None,
        };
        self.keys
            .lock()
            .unwrap()
            .push(summary(&key.id, &key.display_name, &key.lifecycle_state));
        Ok(key)
    }

    async fn schedule_key_deletion(&self, _management_endpoint: &str, key_id: &str) -> ProviderResult<()> {
        self.scheduled.lock().unwrap().push(key_id.to_string());
        for key in self.keys.lock().unwrap().iter_mut() {
            if key.id == key_id {
                key.lifecycle_state = "SCHEDULING_DELETION".to_string();
            }
        }
        Ok(())
    }
}
