//! # Initialization
//!
//! Operator startup: rustls, OpenTelemetry, tracing, metrics, the HTTP
//! server, the Kubernetes client, OCI clients and one reconciler per
//! enabled kind.

use crate::config::{ControllerConfig, OciConfig, OciService, ServerConfig};
use crate::controller::convergence::{ConvergenceEngine, KindClient, ResourceKind};
use crate::controller::kinds::{
    AutonomousDatabaseKind, FunctionsApplicationKind, RedisClusterKind, StreamKind, VaultKind,
};
use crate::crd::OciResource;
use crate::observability::{self, OtelSettings, TracerProviderHandle};
use crate::provider::credential_store::{CredentialStore, KubeSecretStore};
use crate::provider::oci::database::AutonomousDatabaseClient;
use crate::provider::oci::functions::ApplicationClient;
use crate::provider::oci::kms::{KeyClient, VaultClient};
use crate::provider::oci::redis::RedisClusterClient;
use crate::provider::oci::streaming::StreamClient;
use crate::provider::oci::OciTransport;
use crate::runtime::reconciler::Reconciler;
use crate::server::{start_server, ServerState};
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// One reconciler per kind; `None` when the kind is disabled
#[derive(Debug, Default)]
pub struct Controllers {
    pub stream: Option<Arc<Reconciler<StreamKind>>>,
    pub redis_cluster: Option<Arc<Reconciler<RedisClusterKind>>>,
    pub functions_application: Option<Arc<Reconciler<FunctionsApplicationKind>>>,
    pub vault: Option<Arc<Reconciler<VaultKind>>>,
    pub autonomous_database: Option<Arc<Reconciler<AutonomousDatabaseKind>>>,
}

impl Controllers {
    /// Wire the OCI clients and the Secret store into an engine per enabled kind
    ///
    /// # Errors
    ///
    /// Fails when the OCI signer or HTTP client cannot be built.
    pub fn build(client: &Client, config: &ControllerConfig, oci: &OciConfig) -> Result<Self> {
        let transport = Arc::new(
            OciTransport::from_config(oci).context("Failed to build the OCI request transport")?,
        );
        let store: Arc<dyn CredentialStore> = Arc::new(KubeSecretStore::new(client.clone()));

        let stream = config.is_kind_enabled(StreamKind::KIND).then(|| {
            let remote: KindClient<StreamKind> = Arc::new(StreamClient::new(
                Arc::clone(&transport),
                oci.endpoint(OciService::Streaming),
            ));
            reconciler_for(client, config, StreamKind, remote, &store)
        });

        let redis_cluster = config.is_kind_enabled(RedisClusterKind::KIND).then(|| {
            let remote: KindClient<RedisClusterKind> = Arc::new(RedisClusterClient::new(
                Arc::clone(&transport),
                oci.endpoint(OciService::Redis),
            ));
            reconciler_for(client, config, RedisClusterKind, remote, &store)
        });

        let functions_application = config.is_kind_enabled(FunctionsApplicationKind::KIND).then(|| {
            let remote: KindClient<FunctionsApplicationKind> = Arc::new(ApplicationClient::new(
                Arc::clone(&transport),
                oci.endpoint(OciService::Functions),
            ));
            reconciler_for(client, config, FunctionsApplicationKind, remote, &store)
        });

        let vault = config.is_kind_enabled(VaultKind::KIND).then(|| {
            let remote: KindClient<VaultKind> = Arc::new(VaultClient::new(
                Arc::clone(&transport),
                oci.endpoint(OciService::Kms),
            ));
            let kind = VaultKind::new(Arc::new(KeyClient::new(Arc::clone(&transport))));
            reconciler_for(client, config, kind, remote, &store)
        });

        let autonomous_database = config.is_kind_enabled(AutonomousDatabaseKind::KIND).then(|| {
            let remote: KindClient<AutonomousDatabaseKind> = Arc::new(AutonomousDatabaseClient::new(
                Arc::clone(&transport),
                oci.endpoint(OciService::Database),
            ));
            reconciler_for(client, config, AutonomousDatabaseKind, remote, &store)
        });

        Ok(Self {
            stream,
            redis_cluster,
            functions_application,
            vault,
            autonomous_database,
        })
    }

    /// Names of the kinds that got a reconciler
    #[must_use]
    pub fn enabled_kinds(&self) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        if self.stream.is_some() {
            kinds.push(StreamKind::KIND);
        }
        if self.redis_cluster.is_some() {
            kinds.push(RedisClusterKind::KIND);
        }
        if self.functions_application.is_some() {
            kinds.push(FunctionsApplicationKind::KIND);
        }
        if self.vault.is_some() {
            kinds.push(VaultKind::KIND);
        }
        if self.autonomous_database.is_some() {
            kinds.push(AutonomousDatabaseKind::KIND);
        }
        kinds
    }
}

fn reconciler_for<K: ResourceKind>(
    client: &Client,
    config: &ControllerConfig,
    kind: K,
    remote: KindClient<K>,
    store: &Arc<dyn CredentialStore>,
) -> Arc<Reconciler<K>> {
    Arc::new(Reconciler::new(
        client.clone(),
        ConvergenceEngine::new(kind, remote, Arc::clone(store)),
        config.clone(),
    ))
}

/// Initialization result containing all necessary components for the operator
pub struct InitializationResult {
    pub client: Client,
    pub controllers: Controllers,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// OpenTelemetry tracer provider (if initialized)
    pub otel_tracer_provider: Option<TracerProviderHandle>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("controllers", &self.controllers.enabled_kinds())
            .field("server_listening", &self.server_state.is_listening.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
///
/// # Errors
///
/// Fails when tracing, metrics, the HTTP server, the Kubernetes client or
/// the OCI configuration cannot be set up.
pub async fn initialize() -> Result<InitializationResult> {
    // Err means a provider is already installed, which is all that matters
    let provider_preinstalled = rustls::crypto::ring::default_provider()
        .install_default()
        .is_err();

    let controller_config = ControllerConfig::from_env();
    let server_config = ServerConfig::from_env();

    let otel_settings = OtelSettings::from_env();
    let otel_tracer_provider =
        observability::init_otel(&otel_settings).context("Failed to initialize OpenTelemetry")?;

    init_tracing(&controller_config, otel_tracer_provider.is_some())?;
    if provider_preinstalled {
        debug!("rustls crypto provider was already installed");
    }

    info!("Starting OCI Service Operator v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build info: timestamp={}, built_at={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        build_datetime(env!("BUILD_TIMESTAMP")),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let oci_config = OciConfig::from_env().context("Failed to load OCI configuration")?;
    info!(
        region = %oci_config.region,
        tenancy = %oci_config.tenancy,
        "OCI configuration loaded"
    );

    let controllers = Controllers::build(&client, &controller_config, &oci_config)?;
    let enabled = controllers.enabled_kinds();
    if enabled.is_empty() {
        anyhow::bail!(
            "ENABLED_KINDS selects no known kind (got {:?})",
            controller_config.enabled_kinds
        );
    }
    info!(kinds = ?enabled, "Controllers configured");

    log_startup_inventory(&client, &controllers).await;

    Ok(InitializationResult {
        client,
        controllers,
        server_state,
        otel_tracer_provider,
    })
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` applies to this crate
fn init_tracing(config: &ControllerConfig, otel_enabled: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("oci_service_operator={}", config.log_level)));

    let result = if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).try_init()
    } else {
        tracing_subscriber::fmt().compact().with_env_filter(filter).try_init()
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if otel_enabled => {
            // The Datadog integration may have installed its own subscriber
            warn!("Tracing subscriber init returned error (may already be initialized by Datadog): {}", e);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("Failed to initialize tracing subscriber: {e}")),
    }
}

async fn wait_for_server_ready(
    server_state: &ServerState,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_listening.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Log how many objects of each enabled kind exist, per namespace
///
/// A failed list usually means the CRD is not installed yet; the watch loop
/// reports that again, so this only warns.
async fn log_startup_inventory(client: &Client, controllers: &Controllers) {
    if controllers.stream.is_some() {
        log_inventory::<crate::crd::Stream>(client, StreamKind::KIND).await;
    }
    if controllers.redis_cluster.is_some() {
        log_inventory::<crate::crd::RedisCluster>(client, RedisClusterKind::KIND).await;
    }
    if controllers.functions_application.is_some() {
        log_inventory::<crate::crd::FunctionsApplication>(client, FunctionsApplicationKind::KIND).await;
    }
    if controllers.vault.is_some() {
        log_inventory::<crate::crd::Vault>(client, VaultKind::KIND).await;
    }
    if controllers.autonomous_database.is_some() {
        log_inventory::<crate::crd::AutonomousDatabase>(client, AutonomousDatabaseKind::KIND).await;
    }
}

async fn log_inventory<R: OciResource>(client: &Client, kind: &str) {
    let api: Api<R> = Api::all(client.clone());
    match api.list(&ListParams::default()).await {
        Ok(list) => {
            let mut by_namespace: BTreeMap<String, usize> = BTreeMap::new();
            for item in &list.items {
                let namespace = item.namespace().unwrap_or_else(|| "default".to_string());
                *by_namespace.entry(namespace).or_default() += 1;
            }
            info!(
                kind,
                total = list.items.len(),
                namespaces = ?by_namespace,
                "Existing resources before starting watch"
            );
        }
        Err(e) => warn!(kind, error = %e, "Could not list existing resources; is the CRD installed?"),
    }
}

/// Render the build timestamp (Unix seconds) for the startup log
fn build_datetime(timestamp: &str) -> String {
    timestamp
        .parse::<i64>()
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map_or_else(|| "unknown".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_datetime_formats_unix_seconds() {
        assert_eq!(build_datetime("1700000000"), "2023-11-14 22:13:20 UTC");
        assert_eq!(build_datetime("not-a-number"), "unknown");
    }
}
