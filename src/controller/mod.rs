//! # Controller
//!
//! Convergence logic, independent of the Kubernetes runtime that drives it.
//!
//! - `convergence`: the generic engine and its building blocks
//! - `kinds`: per-kind plug-ins for the engine
//! - `backoff`: Fibonacci requeue backoff for failing reconciles

pub mod backoff;
pub mod convergence;
pub mod kinds;
