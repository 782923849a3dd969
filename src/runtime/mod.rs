//! # Runtime
//!
//! The Kubernetes side of the operator.
//!
//! - `initialization.rs` - process startup and wiring
//! - `reconciler.rs` - finalizer, deletion, status writes and requeues
//! - `error_policy.rs` - per-object error backoff and watch error handling
//! - `watch_loop.rs` - one restartable `Controller` per kind

pub mod error_policy;
pub mod initialization;
pub mod reconciler;
pub mod watch_loop;

use crate::controller::convergence::ResourceKind;
use crate::server::ServerState;
use futures::future::{FutureExt, LocalBoxFuture};
use kube::api::Api;
use kube::Client;
use std::sync::Arc;
use tracing::info;

pub use initialization::{initialize, Controllers, InitializationResult};
pub use reconciler::{Reconciler, ReconcilerError};

/// Run every configured controller until shutdown
///
/// Readiness is reported once the loops start and cleared on SIGINT/SIGTERM.
///
/// # Errors
///
/// Returns the first watch loop failure.
pub async fn run_controllers(
    client: &Client,
    controllers: &Controllers,
    server_state: &Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let mut loops: Vec<LocalBoxFuture<'static, Result<(), anyhow::Error>>> = Vec::new();
    if let Some(reconciler) = &controllers.stream {
        loops.push(watch(client, reconciler, server_state));
    }
    if let Some(reconciler) = &controllers.redis_cluster {
        loops.push(watch(client, reconciler, server_state));
    }
    if let Some(reconciler) = &controllers.functions_application {
        loops.push(watch(client, reconciler, server_state));
    }
    if let Some(reconciler) = &controllers.vault {
        loops.push(watch(client, reconciler, server_state));
    }
    if let Some(reconciler) = &controllers.autonomous_database {
        loops.push(watch(client, reconciler, server_state));
    }

    let shutdown_listener = watch_loop::spawn_shutdown_listener(Arc::clone(server_state));
    server_state.mark_ready();
    info!(controllers = loops.len(), "Operator ready, watching resources");

    let result = futures::future::try_join_all(loops).await.map(|_| ());
    shutdown_listener.abort();
    result
}

fn watch<K: ResourceKind>(
    client: &Client,
    reconciler: &Arc<Reconciler<K>>,
    server_state: &Arc<ServerState>,
) -> LocalBoxFuture<'static, Result<(), anyhow::Error>> {
    watch_loop::run_watch_loop(
        Api::<K::Resource>::all(client.clone()),
        Arc::clone(reconciler),
        Arc::clone(server_state),
    )
    .boxed_local()
}
