//! Readiness waiting
//!
//! Polls a status source until it reports ready, sleeping between polls
//! according to a [`WaitPolicy`]. The wait is all-or-nothing: it either
//! returns the ready value or fails with [`StackError::Timeout`] once the
//! poll budget is spent. Errors raised by the status source itself are
//! propagated on the spot.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::{Result, StackError};

/// Outcome of a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<T> {
    /// Condition holds, carrying whatever the poll observed
    Ready(T),
    /// Condition does not hold yet; the string describes what was seen
    NotReady(String),
}

/// Poll interval and budget for a readiness wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    /// Delay before the second poll
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Growth factor applied to the delay after every poll (1 = fixed)
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,

    /// Upper bound for the delay
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Total number of polls before giving up
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_multiplier() -> u32 {
    2
}

fn default_max_interval_ms() -> u64 {
    60_000
}

fn default_max_polls() -> u32 {
    8
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            multiplier: default_multiplier(),
            max_interval_ms: default_max_interval_ms(),
            max_polls: default_max_polls(),
        }
    }
}

impl WaitPolicy {
    /// Same delay between every poll
    pub fn fixed(interval: Duration, max_polls: u32) -> Self {
        let interval_ms = interval.as_millis() as u64;
        Self {
            interval_ms,
            multiplier: 1,
            max_interval_ms: interval_ms,
            max_polls,
        }
    }

    /// Delay doubles after each poll up to `max_interval`
    pub fn exponential(initial: Duration, max_interval: Duration, max_polls: u32) -> Self {
        Self {
            interval_ms: initial.as_millis() as u64,
            multiplier: 2,
            max_interval_ms: max_interval.as_millis() as u64,
            max_polls,
        }
    }

    /// Delay to sleep after the given (1-based) poll
    pub fn delay_after(&self, poll: u32) -> Duration {
        let factor = u64::from(self.multiplier.max(1)).saturating_pow(poll.saturating_sub(1));
        let ms = self
            .interval_ms
            .saturating_mul(factor)
            .min(self.max_interval_ms.max(self.interval_ms));
        Duration::from_millis(ms)
    }
}

/// Blocks the calling flow until a status source reports ready
#[derive(Debug, Clone)]
pub struct ReadinessWaiter {
    policy: WaitPolicy,
}

impl ReadinessWaiter {
    pub fn new(policy: WaitPolicy) -> Self {
        Self { policy }
    }

    /// Poll `check` until it returns [`Readiness::Ready`]
    ///
    /// `what` names the condition in logs and in the timeout error.
    pub async fn until<T, F, Fut>(&self, what: &str, mut check: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Readiness<T>>>,
    {
        let max_polls = self.policy.max_polls.max(1);
        let started = Instant::now();

        for poll in 1..=max_polls {
            match check().await? {
                Readiness::Ready(value) => {
                    debug!("{} ready after {} poll(s)", what, poll);
                    return Ok(value);
                }
                Readiness::NotReady(observed) => {
                    debug!(
                        "{} not ready (poll {}/{}): {}",
                        what, poll, max_polls, observed
                    );
                    if poll < max_polls {
                        tokio::time::sleep(self.policy.delay_after(poll)).await;
                    }
                }
            }
        }

        Err(StackError::Timeout {
            what: what.to_string(),
            polls: max_polls,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(max_polls: u32) -> ReadinessWaiter {
        ReadinessWaiter::new(WaitPolicy::fixed(Duration::from_millis(1), max_polls))
    }

    #[test]
    fn test_fixed_delay() {
        let policy = WaitPolicy::fixed(Duration::from_millis(500), 20);
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(7), Duration::from_millis(500));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = WaitPolicy::exponential(Duration::from_secs(1), Duration::from_secs(60), 8);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(4), Duration::from_secs(8));
        assert_eq!(policy.delay_after(7), Duration::from_secs(60));
        assert_eq!(policy.delay_after(40), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_ready_after_n_not_ready_polls() {
        for not_ready in 0..4u32 {
            let mut polls = 0u32;
            let value = quick(5)
                .until("server status", || {
                    polls += 1;
                    let current = polls;
                    async move {
                        if current <= not_ready {
                            Ok(Readiness::NotReady("BUILD".to_string()))
                        } else {
                            Ok(Readiness::Ready(current))
                        }
                    }
                })
                .await
                .unwrap();

            assert_eq!(polls, not_ready + 1);
            assert_eq!(value, not_ready + 1);
        }
    }

    #[tokio::test]
    async fn test_timeout_stops_polling() {
        let mut polls = 0u32;
        let err = quick(3)
            .until("page change", || {
                polls += 1;
                async { Ok::<Readiness<()>, StackError>(Readiness::NotReady("/horizon".to_string())) }
            })
            .await
            .unwrap_err();

        assert_eq!(polls, 3);
        match err {
            StackError::Timeout { what, polls, .. } => {
                assert_eq!(what, "page change");
                assert_eq!(polls, 3);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_check_error_propagates_immediately() {
        let mut polls = 0u32;
        let err = quick(5)
            .until("server status", || {
                polls += 1;
                async { Err::<Readiness<()>, _>(StackError::ControlPlane("500".to_string())) }
            })
            .await
            .unwrap_err();

        assert_eq!(polls, 1);
        assert!(matches!(err, StackError::ControlPlane(_)));
    }

    #[tokio::test]
    async fn test_zero_budget_still_polls_once() {
        let mut polls = 0u32;
        let result = quick(0)
            .until("anything", || {
                polls += 1;
                async { Ok::<_, StackError>(Readiness::Ready(())) }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(polls, 1);
    }
}
