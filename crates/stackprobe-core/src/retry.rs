//! Retry policy for interactive actions
//!
//! Wraps a zero-argument action and re-runs it only when the failure matches
//! a caller-supplied predicate. Any other failure is returned untouched on
//! the first occurrence, and once the attempt budget is spent the last
//! failure is returned rather than swallowed.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::StackError;

/// Attempt budget and fixed backoff between attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause before each retry
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    2000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff_ms: backoff.as_millis() as u64,
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Run `action`, retrying while `retryable` accepts the error
    pub async fn run<T, E, F, Fut, P>(&self, operation: &str, retryable: P, mut action: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match action().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && retryable(&e) => {
                    debug!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation,
                        attempt,
                        max_attempts,
                        self.backoff(),
                        e
                    );
                    tokio::time::sleep(self.backoff()).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(
                        "{} failed (attempt {}/{}): {}",
                        operation, attempt, max_attempts, e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Run `action`, retrying only "element not interactable yet" failures
    pub async fn run_transient<T, F, Fut>(&self, operation: &str, action: F) -> Result<T, StackError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StackError>>,
    {
        self.run(operation, StackError::is_transient, action).await
    }
}
