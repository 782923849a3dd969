//! # OCI Service Operator
//!
//! A Kubernetes operator that converges Oracle Cloud Infrastructure resources
//! onto the state declared in custom resources.
//!
//! ## Managed kinds
//!
//! - `Stream` - Streaming service streams
//! - `RedisCluster` - OCI Cache clusters
//! - `FunctionsApplication` - Functions applications
//! - `Vault` - KMS vaults and their keys
//! - `AutonomousDatabase` - Autonomous databases
//!
//! Each reconcile binds the custom resource to a remote object (by id, by the
//! OCID recorded in status, or by display name), creating it when nothing
//! matches. Drift on mutable fields is corrected, status is projected from the
//! remote lifecycle state, and connection details are written to a Secret
//! named after the resource.
//!
//! ## Module Structure
//!
//! - `config` - Environment-driven configuration
//! - `constants` - Defaults
//! - `crd` - Custom resource types
//! - `provider` - Remote client traits, the Secret store and the OCI REST clients
//! - `controller` - The convergence engine and the per-kind plug-ins
//! - `runtime` - kube-runtime controllers, finalizers and status writes
//! - `observability` - Metrics and tracing
//! - `server` - `/metrics`, `/healthz` and `/readyz`

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod provider;
pub mod runtime;
pub mod server;
