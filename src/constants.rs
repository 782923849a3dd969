//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default number of concurrent reconciles per resource kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 3;

/// Default requeue interval once a resource is Active (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;

/// Default requeue interval while a resource is still Provisioning (seconds)
pub const DEFAULT_PROVISIONING_REQUEUE_SECS: u64 = 30;

/// Default requeue interval after the remote object reported a failed lifecycle state (seconds)
pub const DEFAULT_FAILED_REQUEUE_SECS: u64 = 300;

/// Default requeue interval while teardown is still in progress (seconds)
pub const DEFAULT_DELETE_REQUEUE_SECS: u64 = 30;

/// Default Fibonacci backoff floor for reconcile errors (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;

/// Default Fibonacci backoff ceiling for reconcile errors (minutes)
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// Default exponential backoff starting value for watch stream 429s (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value for watch stream 429s (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Timeout applied to every OCI REST call (seconds)
pub const DEFAULT_OCI_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Upper bound on pages followed by a single list call
pub const MAX_LIST_PAGES: usize = 100;

/// Finalizer placed on every managed resource so teardown runs before the object disappears
pub const FINALIZER: &str = "oci.oracle.com/finalizer";

/// Field manager recorded on secret writes
pub const FIELD_MANAGER: &str = "oci-service-operator";

/// Value of the `app.kubernetes.io/managed-by` label on materialized secrets
pub const MANAGED_BY: &str = "oci-service-operator";

/// Label carrying the owning kind on materialized secrets
pub const KIND_LABEL: &str = "oci.oracle.com/kind";

/// Attempt budget for exponential lifecycle polling
pub const EXPONENTIAL_POLL_ATTEMPTS: u32 = 10;

/// Upper bound for a single exponential poll delay (seconds)
pub const EXPONENTIAL_POLL_MAX_DELAY_SECS: u64 = 60;

/// Attempt budget for fixed-interval lifecycle polling (long-running provisioning)
pub const FIXED_POLL_ATTEMPTS: u32 = 30;

/// Interval between fixed-interval lifecycle polls (seconds)
pub const FIXED_POLL_INTERVAL_SECS: u64 = 60;

/// Default key inside the admin password secret of an autonomous database
pub const DEFAULT_PASSWORD_KEY: &str = "password";
