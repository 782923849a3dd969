//! # OpenTelemetry Support
//!
//! Optional trace export, selected from the environment:
//!
//! - `DD_AGENT_HOST` or `DD_API_KEY`: Datadog, through `datadog-opentelemetry`
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: recognized, but no OTLP exporter is wired yet
//!
//! With neither set, tracing stays local to the fmt subscriber.

use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_SERVICE_NAME: &str = "oci-service-operator";

/// Tracer provider handle for graceful shutdown
#[derive(Debug)]
pub enum TracerProviderHandle {
    Datadog(opentelemetry_sdk::trace::SdkTracerProvider),
}

/// Trace export settings read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtelSettings {
    pub datadog_agent_host: Option<String>,
    pub datadog_api_key_present: bool,
    pub otlp_endpoint: Option<String>,
}

impl OtelSettings {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            datadog_agent_host: crate::config::env_var_non_empty("DD_AGENT_HOST"),
            datadog_api_key_present: crate::config::env_var_non_empty("DD_API_KEY").is_some(),
            otlp_endpoint: crate::config::env_var_non_empty("OTEL_EXPORTER_OTLP_ENDPOINT"),
        }
    }

    #[must_use]
    pub fn datadog_enabled(&self) -> bool {
        self.datadog_agent_host.is_some() || self.datadog_api_key_present
    }
}

/// Start trace export when configured
///
/// Returns `Ok(None)` when nothing is configured.
///
/// # Errors
///
/// Reserved for exporters whose setup can fail; Datadog setup currently cannot.
pub fn init_otel(settings: &OtelSettings) -> Result<Option<TracerProviderHandle>> {
    if settings.datadog_enabled() {
        return Ok(Some(init_datadog(settings)));
    }
    if let Some(endpoint) = &settings.otlp_endpoint {
        warn!(endpoint = %endpoint, "OTLP endpoint configured but only Datadog export is supported, skipping");
        return Ok(None);
    }
    info!("No OpenTelemetry configuration provided, skipping Otel initialization");
    Ok(None)
}

fn init_datadog(settings: &OtelSettings) -> TracerProviderHandle {
    // datadog-opentelemetry reads its settings from DD_* variables
    if std::env::var("DD_SERVICE").is_err() {
        std::env::set_var("DD_SERVICE", DEFAULT_SERVICE_NAME);
    }
    if std::env::var("DD_VERSION").is_err() {
        std::env::set_var(
            "DD_VERSION",
            format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("BUILD_GIT_HASH")),
        );
    }
    if std::env::var("DD_TRACE_AGENT_URL").is_err() {
        let host = settings.datadog_agent_host.as_deref().unwrap_or("localhost");
        std::env::set_var("DD_TRACE_AGENT_URL", format!("http://{host}:8126"));
    }

    info!(
        service = %std::env::var("DD_SERVICE").unwrap_or_default(),
        version = %std::env::var("DD_VERSION").unwrap_or_default(),
        agent = %std::env::var("DD_TRACE_AGENT_URL").unwrap_or_default(),
        "Initializing Datadog OpenTelemetry tracing"
    );
    TracerProviderHandle::Datadog(datadog_opentelemetry::tracing().init())
}

/// Flush pending spans and stop the exporter
pub fn shutdown_otel(tracer_provider: Option<TracerProviderHandle>) {
    match tracer_provider {
        Some(TracerProviderHandle::Datadog(provider)) => {
            info!("Shutting down Datadog tracer provider...");
            if let Err(e) = provider.shutdown_with_timeout(Duration::from_secs(5)) {
                warn!("Error shutting down Datadog tracer provider: {}", e);
            }
        }
        None => {}
    }
}
