//! Retry/backoff policy
//!
//! An explicit bounded-attempt state machine instead of ad hoc
//! sleep-in-a-loop: [`Backoff`] owns the attempt budget and the delay
//! schedule, so the schedule is testable without real time, and
//! [`with_retry`] drives an async operation through it.
//!
//! Only transient errors consume the retry budget. Permanent errors
//! (auth, permission, not-found, payload rejection) are returned
//! immediately - retrying them with the same inputs cannot succeed.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use drivesink_core::config::RetryConfig;
use drivesink_core::ports::{ProviderError, SinkError};

// ============================================================================
// Transience classification
// ============================================================================

/// Errors that know whether a retry is worthwhile
pub trait Transient {
    /// Returns true if the failure is worth retrying with backoff
    fn is_transient(&self) -> bool;
}

impl Transient for ProviderError {
    fn is_transient(&self) -> bool {
        ProviderError::is_transient(self)
    }
}

impl Transient for SinkError {
    fn is_transient(&self) -> bool {
        SinkError::is_transient(self)
    }
}

// ============================================================================
// RetryPolicy and Backoff
// ============================================================================

/// Configured retry limits, shared by every pipeline step
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per operation (first attempt included); at least 1
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Cap on the exponential delay growth
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Builds a policy from the operator configuration
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
        }
    }

    /// Delay to wait after the given failed attempt (1-based):
    /// `base * 2^(attempt-1)`, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Per-operation retry state: how many attempts were made, what to wait
/// before the next one
#[derive(Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    attempts_made: u32,
}

impl Backoff {
    /// Creates a fresh backoff with a full attempt budget
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts_made: 0,
        }
    }

    /// Records one attempt. Returns `Some(delay)` to wait before the next
    /// attempt, or `None` when the budget is exhausted.
    pub fn attempt_failed(&mut self) -> Option<Duration> {
        self.attempts_made += 1;
        if self.attempts_made >= self.policy.max_attempts {
            None
        } else {
            Some(self.policy.delay_after(self.attempts_made))
        }
    }

    /// Number of attempts made so far
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }
}

// ============================================================================
// with_retry driver
// ============================================================================

/// Executes an async operation under the retry policy.
///
/// The closure receives the 1-based attempt number. Transient errors are
/// retried with exponential backoff until the attempt budget is spent;
/// the last error is then returned. Permanent errors return immediately
/// without consuming the budget.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, f: F) -> Result<T, E>
where
    E: Transient + Display,
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = Backoff::new(policy.clone());

    loop {
        let attempt = backoff.attempts_made() + 1;
        match f(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() => match backoff.attempt_failed() {
                Some(delay) => {
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(operation, attempt, error = %err, "Retry budget exhausted");
                    return Err(err);
                }
            },
            Err(err) => {
                warn!(operation, attempt, error = %err, "Permanent error, not retrying");
                return Err(err);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
