//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//! - `otel`: optional OpenTelemetry trace export

pub mod metrics;
pub mod otel;

pub use otel::{init_otel, shutdown_otel, OtelSettings, TracerProviderHandle};
