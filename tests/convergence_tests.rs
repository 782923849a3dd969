//! Convergence engine tests
//!
//! Drives `ConvergenceEngine` against scripted remote clients and an
//! in-memory credential store. Lifecycle polls run on paused time.

mod common;

use common::{bad_request, summary, undecodable, FakeClient, FakeKeys, MemoryStore};
use oci_service_operator::controller::convergence::{ConvergenceEngine, KindClient, ReconcileError};
use oci_service_operator::controller::kinds::{FunctionsApplicationKind, RedisClusterKind, StreamKind, VaultKind};
use oci_service_operator::crd::{
    FunctionsApplication, FunctionsApplicationSpec, KeyAlgorithm, OciResourceStatus, RedisCluster, RedisClusterSpec,
    ResourcePhase, Stream, StreamSpec, Vault, VaultKeySpec, VaultSpec,
};
use oci_service_operator::provider::credential_store::CredentialStore;
use oci_service_operator::provider::oci::functions::{Application, CreateApplicationDetails, UpdateApplicationDetails};
use oci_service_operator::provider::oci::kms::{self, CreateVaultDetails, KeyManagementClient, UpdateVaultDetails};
use oci_service_operator::provider::oci::redis::{self, CreateRedisClusterDetails, UpdateRedisClusterDetails};
use oci_service_operator::provider::oci::streaming::{self, CreateStreamDetails, UpdateStreamDetails};
use std::sync::Arc;

const NAMESPACE: &str = "apps";

type StreamClient = FakeClient<streaming::Stream, CreateStreamDetails, UpdateStreamDetails>;
type RedisClient = FakeClient<redis::RedisCluster, CreateRedisClusterDetails, UpdateRedisClusterDetails>;
type ApplicationClient = FakeClient<Application, CreateApplicationDetails, UpdateApplicationDetails>;
type VaultClient = FakeClient<kms::Vault, CreateVaultDetails, UpdateVaultDetails>;

fn no_stream_update(_remote: &mut streaming::Stream, _update: &UpdateStreamDetails) {}

fn apply_redis_update(remote: &mut redis::RedisCluster, update: &UpdateRedisClusterDetails) {
    if let Some(name) = &update.display_name {
        remote.display_name.clone_from(name);
    }
    if let Some(count) = update.node_count {
        remote.node_count = count;
    }
}

fn no_application_update(_remote: &mut Application, _update: &UpdateApplicationDetails) {}

fn no_vault_update(_remote: &mut kms::Vault, _update: &UpdateVaultDetails) {}

fn remote_stream(state: &str) -> streaming::Stream {
    streaming::Stream {
        id: "ocid1.stream.oc1..new".to_string(),
        name: "new-stream".to_string(),
        compartment_id: "ocid1.compartment.oc1..app".to_string(),
        partitions: 1,
        retention_in_hours: 24,
        lifecycle_state: state.to_string(),
        messages_endpoint: Some("https://cell-1.streaming.us-ashburn-1.oci.oraclecloud.com".to_string()),
        ..streaming::Stream::default()
    }
}

fn stream(spec: StreamSpec) -> Stream {
    let mut resource = Stream::new("orders", spec);
    resource.metadata.namespace = Some(NAMESPACE.to_string());
    resource
}

fn new_stream_spec() -> StreamSpec {
    StreamSpec {
        name: "new-stream".to_string(),
        compartment_id: Some("ocid1.compartment.oc1..app".to_string()),
        partitions: Some(1),
        ..StreamSpec::default()
    }
}

fn bound_status(ocid: &str) -> Option<OciResourceStatus> {
    Some(OciResourceStatus {
        ocid: Some(ocid.to_string()),
        phase: Some(ResourcePhase::Active),
        created_at: Some("2024-01-01T00:00:00Z".to_string()),
        ..OciResourceStatus::default()
    })
}

fn stream_engine(client: &Arc<StreamClient>, store: &Arc<MemoryStore>) -> ConvergenceEngine<StreamKind> {
    ConvergenceEngine::new(
        StreamKind,
        Arc::clone(client) as KindClient<StreamKind>,
        Arc::clone(store) as Arc<dyn CredentialStore>,
    )
}

#[tokio::test(start_paused = true)]
async fn test_missing_identity_makes_no_remote_call() {
    let client = Arc::new(StreamClient::new(no_stream_update));
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(StreamSpec::default());
    let err = engine.reconcile(&mut resource).await.unwrap_err();

    assert!(matches!(err, ReconcileError::MissingIdentity { kind: "Stream", .. }));
    assert!(err.is_input_error());
    assert_eq!(client.total_calls(), 0);
    assert!(resource.status.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_new_stream_is_created_and_polled_until_active() {
    let client = Arc::new(
        StreamClient::new(no_stream_update)
            .with_create_result(Ok(remote_stream("CREATING")))
            .with_scripted_get(Ok(remote_stream("CREATING")))
            .with_scripted_get(Ok(remote_stream("ACTIVE"))),
    );
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    assert!(engine.reconcile(&mut resource).await.unwrap());

    assert_eq!(client.list_count(), 1);
    assert_eq!(client.create_count(), 1);
    assert_eq!(client.get_count(), 2);
    let created = client.creates.lock().unwrap()[0].clone();
    assert_eq!(created.name, "new-stream");
    assert_eq!(created.partitions, 1);

    let status = resource.status.as_ref().unwrap();
    assert_eq!(status.ocid.as_deref(), Some("ocid1.stream.oc1..new"));
    assert_eq!(status.phase, Some(ResourcePhase::Active));
    assert_eq!(status.lifecycle_state.as_deref(), Some("ACTIVE"));
    assert!(status.created_at.is_some());
    assert_eq!(
        store.value("orders", NAMESPACE, "endpoint").as_deref(),
        Some("https://cell-1.streaming.us-ashburn-1.oci.oraclecloud.com")
    );
    let labels = store.labels("orders", NAMESPACE).unwrap();
    assert_eq!(labels.get("oci.oracle.com/kind").map(String::as_str), Some("Stream"));
}

#[tokio::test(start_paused = true)]
async fn test_second_pass_reuses_recorded_ocid_and_keeps_created_at() {
    let client = Arc::new(
        StreamClient::new(no_stream_update)
            .with_create_result(Ok(remote_stream("CREATING")))
            .with_scripted_get(Ok(remote_stream("ACTIVE"))),
    );
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    assert!(engine.reconcile(&mut resource).await.unwrap());
    let first_created_at = resource.status.as_ref().unwrap().created_at.clone();

    client.set_current(remote_stream("ACTIVE"));
    assert!(engine.reconcile(&mut resource).await.unwrap());

    assert_eq!(client.create_count(), 1);
    assert_eq!(client.list_count(), 1);
    assert_eq!(resource.status.as_ref().unwrap().created_at, first_created_at);
    assert_eq!(
        resource.status.as_ref().unwrap().ocid.as_deref(),
        Some("ocid1.stream.oc1..new")
    );
}

#[tokio::test(start_paused = true)]
async fn test_bind_by_id_without_drift_makes_no_update() {
    let client = Arc::new(StreamClient::new(no_stream_update).with_current(remote_stream("ACTIVE")));
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(StreamSpec {
        id: Some("ocid1.stream.oc1..new".to_string()),
        ..StreamSpec::default()
    });
    assert!(engine.reconcile(&mut resource).await.unwrap());
    assert!(engine.reconcile(&mut resource).await.unwrap());

    assert_eq!(client.update_count(), 0);
    assert_eq!(client.list_count(), 0);
    assert_eq!(client.create_count(), 0);
    assert_eq!(resource.status.as_ref().unwrap().phase, Some(ResourcePhase::Active));
}

#[tokio::test(start_paused = true)]
async fn test_immutable_field_change_is_rejected_without_update() {
    let client = Arc::new(StreamClient::new(no_stream_update).with_current(remote_stream("ACTIVE")));
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(StreamSpec {
        id: Some("ocid1.stream.oc1..new".to_string()),
        partitions: Some(6),
        ..StreamSpec::default()
    });
    let err = engine.reconcile(&mut resource).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::ImmutableField {
            field: "partitions",
            ..
        }
    ));
    assert_eq!(client.update_count(), 0);
    assert_eq!(store.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_lifecycle_reports_false_and_writes_no_secret() {
    let client = Arc::new(StreamClient::new(no_stream_update).with_current(remote_stream("FAILED")));
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    resource.status = bound_status("ocid1.stream.oc1..new");
    assert!(!engine.reconcile(&mut resource).await.unwrap());

    assert_eq!(resource.status.as_ref().unwrap().phase, Some(ResourcePhase::Failed));
    assert!(!store.contains("orders", NAMESPACE));
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_poll_response_keeps_polling() {
    let client = Arc::new(
        StreamClient::new(no_stream_update)
            .with_create_result(Ok(remote_stream("CREATING")))
            .with_scripted_get(Err(undecodable()))
            .with_scripted_get(Ok(remote_stream("ACTIVE"))),
    );
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    assert!(engine.reconcile(&mut resource).await.unwrap());

    assert_eq!(client.get_count(), 2);
    assert_eq!(resource.status.as_ref().unwrap().phase, Some(ResourcePhase::Active));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_create_marks_status_failed() {
    let client = Arc::new(
        StreamClient::new(no_stream_update).with_create_result(Err(bad_request("partitions must be positive"))),
    );
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    let err = engine.reconcile(&mut resource).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Provider(ref e) if e.is_bad_request()));
    let status = resource.status.as_ref().unwrap();
    assert_eq!(status.phase, Some(ResourcePhase::Failed));
    assert!(status.message.as_deref().unwrap().contains("partitions must be positive"));
    assert_eq!(client.get_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_without_compartment_or_pool_is_an_input_error() {
    let client = Arc::new(StreamClient::new(no_stream_update));
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(StreamSpec {
        name: "new-stream".to_string(),
        ..StreamSpec::default()
    });
    let err = engine.reconcile(&mut resource).await.unwrap_err();

    assert!(matches!(err, ReconcileError::InvalidSpec(_)));
    assert!(err.is_input_error());
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_redis_without_compartment_fails_before_lookup() {
    let client = Arc::new(RedisClient::new(apply_redis_update));
    let store = Arc::new(MemoryStore::default());
    let engine = ConvergenceEngine::new(
        RedisClusterKind,
        Arc::clone(&client) as KindClient<RedisClusterKind>,
        Arc::clone(&store) as Arc<dyn CredentialStore>,
    );

    let mut resource = RedisCluster::new(
        "cache",
        RedisClusterSpec {
            display_name: "cache".to_string(),
            node_count: Some(3),
            ..RedisClusterSpec::default()
        },
    );
    let err = engine.reconcile(&mut resource).await.unwrap_err();

    assert!(matches!(err, ReconcileError::InvalidSpec(ref msg) if msg.contains("compartmentId")));
    assert_eq!(client.total_calls(), 0);
    assert!(resource.status.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_name_match_does_not_block_create() {
    let client = Arc::new(
        StreamClient::new(no_stream_update)
            .with_listed(vec![summary("ocid1.stream.oc1..broken", "new-stream", "FAILED")])
            .with_create_result(Ok(remote_stream("CREATING")))
            .with_scripted_get(Ok(remote_stream("ACTIVE"))),
    );
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    assert!(engine.reconcile(&mut resource).await.unwrap());

    assert_eq!(client.list_count(), 1);
    assert_eq!(client.create_count(), 1);
    assert!(!client.gets.lock().unwrap().contains(&"ocid1.stream.oc1..broken".to_string()));
    assert_eq!(
        resource.status.as_ref().unwrap().ocid.as_deref(),
        Some("ocid1.stream.oc1..new")
    );
}

#[tokio::test(start_paused = true)]
async fn test_existing_secret_is_overwritten() {
    let client = Arc::new(StreamClient::new(no_stream_update).with_current(remote_stream("ACTIVE")));
    let store = Arc::new(MemoryStore::default().with_owned_secret("Stream", "orders", NAMESPACE, "endpoint", "https://stale"));
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    resource.status = bound_status("ocid1.stream.oc1..new");
    assert!(engine.reconcile(&mut resource).await.unwrap());

    assert_eq!(*store.updates.lock().unwrap(), 1);
    assert_eq!(
        store.value("orders", NAMESPACE, "endpoint").as_deref(),
        Some("https://cell-1.streaming.us-ashburn-1.oci.oraclecloud.com")
    );
}

#[tokio::test(start_paused = true)]
async fn test_foreign_secret_with_same_name_is_not_taken_over() {
    let client = Arc::new(StreamClient::new(no_stream_update).with_current(remote_stream("ACTIVE")));
    let store = Arc::new(MemoryStore::default().with_secret("orders", NAMESPACE, "password", "hunter2"));
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    resource.status = bound_status("ocid1.stream.oc1..new");
    let err = engine.reconcile(&mut resource).await.unwrap_err();

    assert!(matches!(err, ReconcileError::CredentialStore(ref e) if e.is_not_owned()));
    assert!(!err.is_input_error());
    assert_eq!(*store.updates.lock().unwrap(), 0);
    assert_eq!(store.value("orders", NAMESPACE, "password").as_deref(), Some("hunter2"));
    assert_eq!(store.value("orders", NAMESPACE, "endpoint"), None);
}

#[tokio::test(start_paused = true)]
async fn test_secret_of_another_kind_is_not_taken_over() {
    let client = Arc::new(StreamClient::new(no_stream_update).with_current(remote_stream("ACTIVE")));
    let store = Arc::new(MemoryStore::default().with_owned_secret(
        "RedisCluster",
        "orders",
        NAMESPACE,
        "primaryFqdn",
        "primary.cache.example",
    ));
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    resource.status = bound_status("ocid1.stream.oc1..new");
    let err = engine.reconcile(&mut resource).await.unwrap_err();

    assert!(matches!(err, ReconcileError::CredentialStore(ref e) if e.is_not_owned()));
    assert_eq!(
        store.value("orders", NAMESPACE, "primaryFqdn").as_deref(),
        Some("primary.cache.example")
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_leaves_foreign_secret_in_place() {
    let client = Arc::new(StreamClient::new(no_stream_update));
    let store = Arc::new(MemoryStore::default().with_secret("orders", NAMESPACE, "password", "hunter2"));
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    assert!(engine.delete(&mut resource).await.unwrap());

    assert_eq!(client.total_calls(), 0);
    assert_eq!(store.value("orders", NAMESPACE, "password").as_deref(), Some("hunter2"));
}

#[tokio::test(start_paused = true)]
async fn test_delete_with_nothing_bound_is_done() {
    let client = Arc::new(StreamClient::new(no_stream_update));
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    assert!(engine.delete(&mut resource).await.unwrap());
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_delete_of_vanished_object_is_done_and_removes_secret() {
    let client = Arc::new(StreamClient::new(no_stream_update));
    let store = Arc::new(MemoryStore::default().with_owned_secret("Stream", "orders", NAMESPACE, "endpoint", "https://old"));
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    resource.status = bound_status("ocid1.stream.oc1..new");
    assert!(engine.delete(&mut resource).await.unwrap());

    assert_eq!(client.delete_count(), 0);
    assert!(!store.contains("orders", NAMESPACE));
}

#[tokio::test(start_paused = true)]
async fn test_delete_polls_until_gone() {
    let client = Arc::new(StreamClient::new(no_stream_update).with_current(remote_stream("ACTIVE")));
    let store = Arc::new(MemoryStore::default());
    let engine = stream_engine(&client, &store);

    let mut resource = stream(new_stream_spec());
    resource.status = bound_status("ocid1.stream.oc1..new");
    assert!(engine.delete(&mut resource).await.unwrap());

    assert_eq!(*client.deletes.lock().unwrap(), vec!["ocid1.stream.oc1..new".to_string()]);
    assert_eq!(resource.status.as_ref().unwrap().phase, Some(ResourcePhase::Terminating));
}

#[tokio::test(start_paused = true)]
async fn test_application_found_by_name_is_bound_without_create() {
    let existing = Application {
        id: "ocid1.fnapp.oc1..existing".to_string(),
        display_name: "existing-app".to_string(),
        compartment_id: "ocid1.compartment.oc1..app".to_string(),
        lifecycle_state: "ACTIVE".to_string(),
        ..Application::default()
    };
    let client = Arc::new(
        ApplicationClient::new(no_application_update)
            .with_current(existing)
            .with_listed(vec![
                summary("ocid1.fnapp.oc1..deleted", "existing-app", "DELETED"),
                summary("ocid1.fnapp.oc1..existing", "existing-app", "ACTIVE"),
            ]),
    );
    let store = Arc::new(MemoryStore::default());
    let engine = ConvergenceEngine::new(
        FunctionsApplicationKind,
        Arc::clone(&client) as KindClient<FunctionsApplicationKind>,
        Arc::clone(&store) as Arc<dyn CredentialStore>,
    );

    let mut resource = FunctionsApplication::new(
        "existing-app",
        FunctionsApplicationSpec {
            display_name: "existing-app".to_string(),
            compartment_id: Some("ocid1.compartment.oc1..app".to_string()),
            ..FunctionsApplicationSpec::default()
        },
    );
    assert!(engine.reconcile(&mut resource).await.unwrap());

    assert_eq!(client.create_count(), 0);
    assert_eq!(*client.gets.lock().unwrap(), vec!["ocid1.fnapp.oc1..existing".to_string()]);
    assert_eq!(
        resource.status.as_ref().unwrap().ocid.as_deref(),
        Some("ocid1.fnapp.oc1..existing")
    );
    assert_eq!(store.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_redis_drift_is_corrected_once() {
    let remote = redis::RedisCluster {
        id: "ocid1.rediscluster.oc1..cache".to_string(),
        display_name: "old-name".to_string(),
        compartment_id: "ocid1.compartment.oc1..app".to_string(),
        node_count: 3,
        node_memory_in_gbs: 16.0,
        software_version: "V7_0_5".to_string(),
        subnet_id: "ocid1.subnet.oc1..private".to_string(),
        lifecycle_state: "ACTIVE".to_string(),
        primary_fqdn: Some("primary.cache.example".to_string()),
        ..redis::RedisCluster::default()
    };
    let client = Arc::new(RedisClient::new(apply_redis_update).with_current(remote));
    let store = Arc::new(MemoryStore::default());
    let engine = ConvergenceEngine::new(
        RedisClusterKind,
        Arc::clone(&client) as KindClient<RedisClusterKind>,
        Arc::clone(&store) as Arc<dyn CredentialStore>,
    );

    let mut resource = RedisCluster::new(
        "cache",
        RedisClusterSpec {
            id: Some("ocid1.rediscluster.oc1..cache".to_string()),
            display_name: "new-name".to_string(),
            ..RedisClusterSpec::default()
        },
    );
    assert!(engine.reconcile(&mut resource).await.unwrap());
    assert!(engine.reconcile(&mut resource).await.unwrap());

    let updates = client.updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, "ocid1.rediscluster.oc1..cache");
    assert_eq!(updates[0].1.display_name.as_deref(), Some("new-name"));
    assert_eq!(updates[0].1.node_count, None);
    assert_eq!(
        store.value("cache", "default", "primaryFqdn").as_deref(),
        Some("primary.cache.example")
    );
}

fn remote_vault(state: &str) -> kms::Vault {
    kms::Vault {
        id: "ocid1.vault.oc1..secrets".to_string(),
        display_name: "secrets".to_string(),
        compartment_id: "ocid1.compartment.oc1..app".to_string(),
        vault_type: "DEFAULT".to_string(),
        lifecycle_state: state.to_string(),
        crypto_endpoint: Some("https://abc-crypto.kms.us-ashburn-1.oraclecloud.com".to_string()),
        management_endpoint: Some("https://abc-management.kms.us-ashburn-1.oraclecloud.com".to_string()),
        ..kms::Vault::default()
    }
}

fn vault_resource() -> Vault {
    let mut resource = Vault::new(
        "secrets",
        VaultSpec {
            display_name: "secrets".to_string(),
            compartment_id: Some("ocid1.compartment.oc1..app".to_string()),
            keys: vec![VaultKeySpec {
                display_name: "master".to_string(),
                algorithm: KeyAlgorithm::Aes,
                length: 32,
                curve_id: None,
                protection_mode: None,
            }],
            ..VaultSpec::default()
        },
    );
    resource.metadata.namespace = Some(NAMESPACE.to_string());
    resource
}

#[tokio::test(start_paused = true)]
async fn test_vault_keys_are_created_once_vault_is_active() {
    let client = Arc::new(VaultClient::new(no_vault_update).with_current(remote_vault("ACTIVE")));
    let keys = Arc::new(FakeKeys::default());
    let store = Arc::new(MemoryStore::default());
    let engine = ConvergenceEngine::new(
        VaultKind::new(Arc::clone(&keys) as Arc<dyn KeyManagementClient>),
        Arc::clone(&client) as KindClient<VaultKind>,
        Arc::clone(&store) as Arc<dyn CredentialStore>,
    );

    let mut resource = vault_resource();
    resource.status = bound_status("ocid1.vault.oc1..secrets");
    assert!(engine.reconcile(&mut resource).await.unwrap());
    assert!(engine.reconcile(&mut resource).await.unwrap());

    let created = keys.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].display_name, "master");
    assert!(store.value("secrets", NAMESPACE, "managementEndpoint").is_some());
    assert!(store.value("secrets", NAMESPACE, "cryptoEndpoint").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_vault_is_deleted_only_after_its_keys() {
    let client = Arc::new(
        VaultClient::new(no_vault_update)
            .with_current(remote_vault("ACTIVE"))
            .with_after_delete(remote_vault("PENDING_DELETION")),
    );
    let keys = Arc::new(FakeKeys::default());
    keys.keys
        .lock()
        .unwrap()
        .push(summary("ocid1.key.oc1..master", "master", "ENABLED"));
    let store = Arc::new(MemoryStore::default().with_owned_secret("Vault", "secrets", NAMESPACE, "cryptoEndpoint", "https://old"));
    let engine = ConvergenceEngine::new(
        VaultKind::new(Arc::clone(&keys) as Arc<dyn KeyManagementClient>),
        Arc::clone(&client) as KindClient<VaultKind>,
        Arc::clone(&store) as Arc<dyn CredentialStore>,
    );

    let mut resource = vault_resource();
    resource.status = bound_status("ocid1.vault.oc1..secrets");

    assert!(!engine.delete(&mut resource).await.unwrap());
    assert_eq!(*keys.scheduled.lock().unwrap(), vec!["ocid1.key.oc1..master".to_string()]);
    assert_eq!(client.delete_count(), 0);
    assert_eq!(resource.status.as_ref().unwrap().phase, Some(ResourcePhase::Terminating));

    // Still scheduling: nothing new is requested
    assert!(!engine.delete(&mut resource).await.unwrap());
    assert_eq!(keys.scheduled.lock().unwrap().len(), 1);
    assert_eq!(client.delete_count(), 0);

    keys.set_state("PENDING_DELETION");
    assert!(engine.delete(&mut resource).await.unwrap());
    assert_eq!(client.delete_count(), 1);
    assert!(!store.contains("secrets", NAMESPACE));
}
