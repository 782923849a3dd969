//! Autonomous databases.
//!
//! The ADMIN password is read from a Secret in the resource's namespace at
//! create time and never stored on the resource.

use super::{non_empty, required};
use crate::constants::{DEFAULT_PASSWORD_KEY, FIXED_POLL_ATTEMPTS};
use crate::controller::convergence::{
    ensure_unchanged, fixed_interval, Drift, DriftDetector, Lifecycle, Observation, ReconcileError, ResourceKind,
    RetryPolicy, SecretPayload,
};
use crate::crd::{AutonomousDatabase, SecretKeyRef};
use crate::provider::credential_store::CredentialStore;
use crate::provider::oci::database::{
    self, AdminPassword, CreateAutonomousDatabaseDetails, UpdateAutonomousDatabaseDetails,
};
use crate::provider::ListFilter;
use async_trait::async_trait;
use kube::ResourceExt;
use zeroize::Zeroize;

#[derive(Debug, Clone, Copy, Default)]
pub struct AutonomousDatabaseKind;

fn lifecycle(raw_state: &str) -> Lifecycle {
    match raw_state {
        "PROVISIONING" => Lifecycle::Creating,
        "AVAILABLE" => Lifecycle::Active,
        "UPDATING"
        | "SCALE_IN_PROGRESS"
        | "BACKUP_IN_PROGRESS"
        | "RESTORE_IN_PROGRESS"
        | "MAINTENANCE_IN_PROGRESS"
        | "UPGRADING"
        | "STARTING"
        | "STOPPING"
        | "RESTARTING" => Lifecycle::Updating,
        "STOPPED" | "AVAILABLE_NEEDS_ATTENTION" => Lifecycle::Other,
        "UNAVAILABLE" => Lifecycle::Failed,
        "TERMINATING" => Lifecycle::Deleting,
        "TERMINATED" => Lifecycle::Deleted,
        _ => Lifecycle::Unknown,
    }
}

fn creating(observation: &Observation<database::AutonomousDatabase>) -> bool {
    observation.retry_while(|db| lifecycle(&db.lifecycle_state).is_creating())
}

fn deleting(observation: &Observation<database::AutonomousDatabase>) -> bool {
    observation.retry_while(|db| lifecycle(&db.lifecycle_state).is_deleting())
}

async fn admin_password(
    store: &dyn CredentialStore,
    reference: &SecretKeyRef,
    namespace: &str,
) -> Result<AdminPassword, ReconcileError> {
    let key = non_empty(reference.key.as_deref()).unwrap_or(DEFAULT_PASSWORD_KEY);
    let secret = &reference.secret_name;

    let mut data = match store.get_secret(secret, namespace).await {
        Ok(data) => data,
        Err(e) if e.is_not_found() => {
            return Err(ReconcileError::InvalidSpec(format!(
                "admin password secret {namespace}/{secret} not found"
            )))
        }
        Err(e) => return Err(e.into()),
    };
    let value = data.remove(key);
    data.values_mut().for_each(Zeroize::zeroize);

    let bytes = value.ok_or_else(|| {
        ReconcileError::InvalidSpec(format!("admin password secret {namespace}/{secret} has no key `{key}`"))
    })?;
    match String::from_utf8(bytes) {
        Ok(password) => Ok(AdminPassword::new(password)),
        Err(e) => {
            e.into_bytes().zeroize();
            Err(ReconcileError::InvalidSpec(format!(
                "admin password in {namespace}/{secret} key `{key}` is not valid UTF-8"
            )))
        }
    }
}

#[async_trait]
impl ResourceKind for AutonomousDatabaseKind {
    type Resource = AutonomousDatabase;
    type Remote = database::AutonomousDatabase;
    type Create = CreateAutonomousDatabaseDetails;
    type Update = UpdateAutonomousDatabaseDetails;

    const KIND: &'static str = "AutonomousDatabase";

    fn lifecycle(&self, raw_state: &str) -> Lifecycle {
        lifecycle(raw_state)
    }

    fn list_filter(&self, resource: &AutonomousDatabase) -> Result<ListFilter, ReconcileError> {
        let spec = &resource.spec;
        Ok(ListFilter {
            display_name: spec.display_name.clone(),
            compartment_id: Some(required(Self::KIND, "compartmentId", spec.compartment_id.as_deref())?.to_string()),
            container_id: None,
        })
    }

    async fn create_details(
        &self,
        resource: &AutonomousDatabase,
        store: &dyn CredentialStore,
    ) -> Result<CreateAutonomousDatabaseDetails, ReconcileError> {
        let spec = &resource.spec;
        let compartment_id = required(Self::KIND, "compartmentId", spec.compartment_id.as_deref())?;
        let db_name = required(Self::KIND, "dbName", spec.db_name.as_deref())?;

        let admin_password = match &spec.admin_password {
            Some(reference) => {
                let namespace = resource.namespace().unwrap_or_else(|| "default".to_string());
                Some(admin_password(store, reference, &namespace).await?)
            }
            None => None,
        };

        Ok(CreateAutonomousDatabaseDetails {
            compartment_id: compartment_id.to_string(),
            display_name: spec.display_name.clone(),
            db_name: db_name.to_string(),
            cpu_core_count: spec.cpu_core_count,
            data_storage_size_in_tbs: spec.data_storage_size_in_tbs,
            is_auto_scaling_enabled: spec.is_auto_scaling_enabled,
            db_workload: spec.db_workload.clone(),
            is_free_tier: spec.is_free_tier,
            admin_password,
            freeform_tags: spec.freeform_tags.clone(),
            defined_tags: spec.defined_tags.clone(),
        })
    }

    fn check_immutable(
        &self,
        resource: &AutonomousDatabase,
        remote: &database::AutonomousDatabase,
    ) -> Result<(), ReconcileError> {
        let spec = &resource.spec;
        ensure_unchanged(
            Self::KIND,
            "dbName",
            non_empty(spec.db_name.as_deref()),
            remote.db_name.as_str(),
        )?;
        ensure_unchanged(
            Self::KIND,
            "dbWorkload",
            non_empty(spec.db_workload.as_deref()),
            remote.db_workload.as_deref().unwrap_or_default(),
        )
    }

    fn drift(
        &self,
        resource: &AutonomousDatabase,
        remote: &database::AutonomousDatabase,
    ) -> Option<Drift<UpdateAutonomousDatabaseDetails>> {
        let spec = &resource.spec;
        DriftDetector::<UpdateAutonomousDatabaseDetails>::new()
            .text("displayName", &spec.display_name, &remote.display_name, |u, v| {
                u.display_name = Some(v);
            })
            .value(
                "cpuCoreCount",
                spec.cpu_core_count.map(Some),
                remote.cpu_core_count,
                |u, v| u.cpu_core_count = v,
            )
            .value(
                "dataStorageSizeInTBs",
                spec.data_storage_size_in_tbs.map(Some),
                remote.data_storage_size_in_tbs,
                |u, v| u.data_storage_size_in_tbs = v,
            )
            .value(
                "isAutoScalingEnabled",
                spec.is_auto_scaling_enabled.map(Some),
                remote.is_auto_scaling_enabled,
                |u, v| u.is_auto_scaling_enabled = v,
            )
            .map("freeformTags", &spec.freeform_tags, &remote.freeform_tags, |u, v| {
                u.freeform_tags = Some(v);
            })
            .map("definedTags", &spec.defined_tags, &remote.defined_tags, |u, v| {
                u.defined_tags = Some(v);
            })
            .finish()
    }

    fn secret_payload(&self, remote: &database::AutonomousDatabase) -> SecretPayload {
        let strings = remote.connection_strings.as_ref();
        SecretPayload::new()
            .with("high", strings.and_then(|c| c.high.as_deref()))
            .with("medium", strings.and_then(|c| c.medium.as_deref()))
            .with("low", strings.and_then(|c| c.low.as_deref()))
            .with("dedicated", strings.and_then(|c| c.dedicated.as_deref()))
    }

    fn create_policy(&self) -> RetryPolicy<database::AutonomousDatabase> {
        RetryPolicy::new(FIXED_POLL_ATTEMPTS, creating, fixed_interval)
    }

    fn delete_policy(&self) -> RetryPolicy<database::AutonomousDatabase> {
        RetryPolicy::new(FIXED_POLL_ATTEMPTS, deleting, fixed_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::kinds::test_support::SeededStore;
    use crate::crd::AutonomousDatabaseSpec;
    use crate::provider::oci::database::ConnectionStrings;

    fn resource(admin_password: Option<SecretKeyRef>) -> AutonomousDatabase {
        let mut db = AutonomousDatabase::new(
            "orders-db",
            AutonomousDatabaseSpec {
                display_name: "orders-db".to_string(),
                db_name: Some("ORDERS".to_string()),
                compartment_id: Some("ocid1.compartment.oc1..app".to_string()),
                cpu_core_count: Some(2),
                admin_password,
                ..AutonomousDatabaseSpec::default()
            },
        );
        db.metadata.namespace = Some("shop".to_string());
        db
    }

    fn secret_ref(key: Option<&str>) -> SecretKeyRef {
        SecretKeyRef {
            secret_name: "orders-db-admin".to_string(),
            key: key.map(str::to_string),
        }
    }

    #[test]
    fn test_lifecycle_mapping() {
        assert_eq!(lifecycle("PROVISIONING"), Lifecycle::Creating);
        assert_eq!(lifecycle("AVAILABLE"), Lifecycle::Active);
        assert_eq!(lifecycle("SCALE_IN_PROGRESS"), Lifecycle::Updating);
        assert_eq!(lifecycle("STOPPED"), Lifecycle::Other);
        assert_eq!(lifecycle("UNAVAILABLE"), Lifecycle::Failed);
        assert_eq!(lifecycle("TERMINATED"), Lifecycle::Deleted);
    }

    #[tokio::test]
    async fn test_password_is_read_from_the_default_key() {
        let store = SeededStore::default().with_secret("shop", "orders-db-admin", "password", b"Welcome#12345");
        let details = AutonomousDatabaseKind
            .create_details(&resource(Some(secret_ref(None))), &store)
            .await
            .unwrap();
        assert_eq!(details.admin_password.as_ref().map(AdminPassword::expose), Some("Welcome#12345"));
        assert!(!format!("{details:?}").contains("Welcome#12345"));
    }

    #[tokio::test]
    async fn test_missing_password_secret_or_key_is_an_input_error() {
        let empty = SeededStore::default();
        let err = AutonomousDatabaseKind
            .create_details(&resource(Some(secret_ref(None))), &empty)
            .await
            .unwrap_err();
        assert!(err.is_input_error());

        let other_key = SeededStore::default().with_secret("shop", "orders-db-admin", "pw", b"x");
        let err = AutonomousDatabaseKind
            .create_details(&resource(Some(secret_ref(Some("admin")))), &other_key)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("has no key `admin`"));
    }

    #[test]
    fn test_scaling_drift_and_workload_immutability() {
        let observed = database::AutonomousDatabase {
            display_name: "orders-db".to_string(),
            db_name: "ORDERS".to_string(),
            cpu_core_count: Some(1),
            db_workload: Some("OLTP".to_string()),
            lifecycle_state: "AVAILABLE".to_string(),
            ..database::AutonomousDatabase::default()
        };
        let drift = AutonomousDatabaseKind.drift(&resource(None), &observed).unwrap();
        assert_eq!(drift.fields, vec!["cpuCoreCount"]);
        assert_eq!(drift.update.cpu_core_count, Some(2));

        let mut warehouse = resource(None);
        warehouse.spec.db_workload = Some("DW".to_string());
        AutonomousDatabaseKind
            .check_immutable(&warehouse, &observed)
            .unwrap_err();
    }

    #[test]
    fn test_secret_publishes_connection_strings() {
        let observed = database::AutonomousDatabase {
            connection_strings: Some(ConnectionStrings {
                high: Some("adb.example:1522/orders_high".to_string()),
                low: Some("adb.example:1522/orders_low".to_string()),
                ..ConnectionStrings::default()
            }),
            ..database::AutonomousDatabase::default()
        };
        let payload = AutonomousDatabaseKind.secret_payload(&observed);
        assert_eq!(payload.data().len(), 2);
        assert_eq!(payload.get("high"), Some(b"adb.example:1522/orders_high".as_slice()));
    }
}
