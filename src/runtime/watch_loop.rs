//! # Watch Loop
//!
//! One kube-runtime `Controller` per managed kind. Each loop restarts its
//! watch after stream errors or a stream end, until shutdown is requested.

use crate::controller::convergence::ResourceKind;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use crate::runtime::reconciler::{reconcile, Reconciler};
use crate::server::ServerState;
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::{controller, watcher, Controller};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Run the watch loop for one kind
///
/// # Errors
///
/// Currently always returns `Ok` once shutdown is requested; the `Result`
/// lets callers join the loops with `try_join_all`.
pub async fn run_watch_loop<K: ResourceKind>(
    api: Api<K::Resource>,
    reconciler: Arc<Reconciler<K>>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let config = reconciler.config.clone();
    let backoff_duration_ms = Arc::new(AtomicU64::new(config.backoff_start_ms));

    loop {
        if server_state.is_shutting_down() {
            info!(kind = K::KIND, "Shutdown requested, exiting watch loop");
            break;
        }

        info!(
            kind = K::KIND,
            concurrency = config.max_concurrent_reconciles,
            "Starting controller watch loop..."
        );
        let backoff = Arc::clone(&backoff_duration_ms);
        let backoff_start_ms = config.backoff_start_ms;
        let backoff_max_ms = config.backoff_max_ms;
        let watch_restart_delay_secs = config.watch_restart_delay_secs;

        Controller::new(api.clone(), watcher::Config::default().any_semantic())
            .with_config(controller::Config::default().concurrency(config.max_concurrent_reconciles))
            .shutdown_on_signal()
            .run(reconcile::<K>, handle_reconciliation_error::<K>, Arc::clone(&reconciler))
            .filter_map(move |x| {
                let backoff = Arc::clone(&backoff);
                async move {
                    match &x {
                        Ok((object, action)) => {
                            backoff.store(backoff_start_ms, Ordering::Relaxed);
                            debug!(object = %object.name, action = ?action, "watch.event.reconciled");
                            Some(x)
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            handle_watch_stream_error(
                                K::KIND,
                                &error_string,
                                &backoff,
                                backoff_max_ms,
                                watch_restart_delay_secs,
                            )
                            .await
                            .map(|()| x)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .instrument(tracing::info_span!("controller.watch", kind = K::KIND))
            .await;

        if server_state.is_shutting_down() {
            info!(kind = K::KIND, "Shutdown requested, exiting watch loop");
            break;
        }

        let delay = config.watch_restart_delay_after_end_duration();
        warn!(
            kind = K::KIND,
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!(kind = K::KIND, "Controller stopped gracefully");
    Ok(())
}

/// Clear readiness on SIGINT/SIGTERM so the loops stop restarting
pub fn spawn_shutdown_listener(server_state: Arc<ServerState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        server_state.mark_shutting_down();
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    })
}
