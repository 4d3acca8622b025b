//! Retry-with-backoff wrapper for fallible remote calls

use std::future::Future;
use std::time::Duration;

use log::{error, warn};

use super::errors::BotResult;

/// Default attempt budget for remote calls
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Run `operation` up to `max_attempts` times with exponential backoff.
///
/// Sleeps `2^(k-1)` seconds between attempt `k` and `k+1` (1s, 2s, 4s, ...),
/// never after the final attempt. Each failure is logged with its attempt
/// number. Returns `None` once the budget is exhausted; callers must treat
/// that as a soft failure, not a fatal condition.
pub async fn call_with_retry<T, F, Fut>(label: &str, max_attempts: u32, operation: F) -> Option<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = BotResult<T>>,
{
    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(value) => return Some(value),
            Err(e) => {
                warn!("{} failed (attempt {}/{}): {}", label, attempt, max_attempts, e);
                if attempt < max_attempts {
                    let delay = Duration::from_secs(1u64 << (attempt - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    error!("{}: giving up after {} attempts", label, max_attempts);
    None
}
