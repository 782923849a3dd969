//! # Lifecycle Polling
//!
//! A [`RetryPolicy`] is an attempt budget plus two pure functions: a predicate
//! over the last observation (keep polling?) and a delay over the retry state.
//! [`poll`] threads a fresh [`RetryState`] value through each iteration.
//!
//! Predicates must answer `true` for [`Observation::Unrecognized`], so a
//! response of unexpected shape keeps polling instead of ending it early.

use crate::constants::{EXPONENTIAL_POLL_MAX_DELAY_SECS, FIXED_POLL_INTERVAL_SECS};
use crate::provider::ProviderError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// What one poll attempt saw
#[derive(Debug, Clone, PartialEq)]
pub enum Observation<T> {
    /// The remote object, decoded
    Object(T),
    /// A response that did not decode into the expected shape
    Unrecognized,
    /// The remote object no longer exists
    Gone,
}

impl<T> Observation<T> {
    #[must_use]
    pub fn object(&self) -> Option<&T> {
        match self {
            Self::Object(obj) => Some(obj),
            Self::Unrecognized | Self::Gone => None,
        }
    }

    #[must_use]
    pub fn into_object(self) -> Option<T> {
        match self {
            Self::Object(obj) => Some(obj),
            Self::Unrecognized | Self::Gone => None,
        }
    }

    /// Shared predicate shape: poll while `in_progress` holds, keep polling on
    /// unrecognized responses, stop once the object is gone
    pub fn retry_while(&self, in_progress: impl FnOnce(&T) -> bool) -> bool {
        match self {
            Self::Object(obj) => in_progress(obj),
            Self::Unrecognized => true,
            Self::Gone => false,
        }
    }
}

/// Snapshot handed to the delay function after each attempt
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState<T> {
    /// 1-based number of the attempt just made
    pub attempt: u32,
    pub elapsed: Duration,
    pub last: Observation<T>,
}

pub type ShouldRetry<T> = fn(&Observation<T>) -> bool;
pub type NextDelay<T> = fn(&RetryState<T>) -> Duration;

#[derive(Debug)]
pub struct RetryPolicy<T> {
    max_attempts: u32,
    should_retry: ShouldRetry<T>,
    next_delay: NextDelay<T>,
}

impl<T> RetryPolicy<T> {
    /// A budget of zero is raised to one; the operation always runs at least once
    #[must_use]
    pub fn new(max_attempts: u32, should_retry: ShouldRetry<T>, next_delay: NextDelay<T>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            should_retry,
            next_delay,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn should_retry(&self, observation: &Observation<T>) -> bool {
        (self.should_retry)(observation)
    }

    #[must_use]
    pub fn next_delay(&self, state: &RetryState<T>) -> Duration {
        (self.next_delay)(state)
    }
}

/// `2^(attempt-1)` seconds, capped
#[must_use]
pub fn exponential_backoff<T>(state: &RetryState<T>) -> Duration {
    let exponent = state.attempt.saturating_sub(1).min(32);
    let secs = 1_u64
        .checked_shl(exponent)
        .unwrap_or(u64::MAX)
        .min(EXPONENTIAL_POLL_MAX_DELAY_SECS);
    Duration::from_secs(secs)
}

/// One fixed interval for slow-provisioning services
#[must_use]
pub fn fixed_interval<T>(_state: &RetryState<T>) -> Duration {
    Duration::from_secs(FIXED_POLL_INTERVAL_SECS)
}

/// Result of running a policy to completion
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome<T> {
    pub last: Observation<T>,
    pub attempts: u32,
    /// The budget ran out while the predicate still asked to continue
    pub exhausted: bool,
}

/// Run `op` until the policy's predicate says stop or the budget is spent
///
/// Errors returned by `op` end the poll immediately; only lifecycle states are
/// retried, never error values.
///
/// # Errors
///
/// Returns the first error produced by `op`.
pub async fn poll<T, F, Fut>(policy: &RetryPolicy<T>, mut op: F) -> Result<PollOutcome<T>, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation<T>, ProviderError>>,
{
    let started = Instant::now();
    let mut attempt = 1;
    loop {
        let last = op().await?;
        if !policy.should_retry(&last) {
            return Ok(PollOutcome {
                last,
                attempts: attempt,
                exhausted: false,
            });
        }
        if attempt >= policy.max_attempts() {
            return Ok(PollOutcome {
                last,
                attempts: attempt,
                exhausted: true,
            });
        }

        let state = RetryState {
            attempt,
            elapsed: started.elapsed(),
            last,
        };
        let delay = policy.next_delay(&state);
        debug!(attempt, delay_secs = delay.as_secs(), "lifecycle still in progress");
        crate::observability::metrics::increment_poll_attempts();
        tokio::time::sleep(delay).await;
        attempt = state.attempt + 1;
    }
}
