//! # OCI Service Operator
//!
//! Operator entry point: initialize, run one controller per enabled kind
//! until SIGINT/SIGTERM, then flush traces.

use anyhow::Result;
use oci_service_operator::observability::shutdown_otel;
use oci_service_operator::runtime::{initialize, run_controllers};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    let result = run_controllers(&init.client, &init.controllers, &init.server_state).await;
    if let Err(e) = &result {
        error!("Controller failed: {:?}", e);
    }

    shutdown_otel(init.otel_tracer_provider);
    info!("OCI Service Operator stopped");
    result
}
