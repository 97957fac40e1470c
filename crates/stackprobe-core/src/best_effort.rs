//! Cleanup and diagnostic steps that must not change a run's outcome
//!
//! Token revocation, browser close and the failure screenshot all run after
//! the check itself has succeeded or failed. Their own errors are logged at
//! `warn` and dropped so the check's result reaches the caller untouched.

use std::future::Future;
use tracing::{debug, warn};

use crate::Result;

/// Await `step`, turning its error into a warning
///
/// ```no_run
/// use stackprobe_core::best_effort::best_effort;
/// use stackprobe_core::Result;
///
/// async fn revoke_token() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     if best_effort("token revocation", revoke_token()).await.is_none() {
///         // the token outlives the run
///     }
/// }
/// ```
pub async fn best_effort<T>(what: &str, step: impl Future<Output = Result<T>>) -> Option<T> {
    step.await
        .map(|value| {
            debug!("{} done", what);
            value
        })
        .map_err(|e| warn!("{} skipped: {}", what, e))
        .ok()
}
