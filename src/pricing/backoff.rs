//! Exponential backoff retry helper used by the pricing fetch step.
//!
//! Up to 3 attempts total, sleeping `{1s, 2s, 4s}` between them (the sleep
//! after the final attempt is never taken). Each failure is logged as a
//! warning; the final failure is returned to the caller.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 4000;

fn backoff_for_attempt(attempt: u32) -> Duration {
    let ms = INITIAL_BACKOFF_MS.saturating_mul(1u64 << attempt).min(MAX_BACKOFF_MS);
    Duration::from_millis(ms)
}

pub async fn retry_with_backoff<F, Fut, T>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt = attempt + 1, error = %e, "pricing fetch attempt failed");
                last_err = Some(e);
                if attempt + 1 < MAX_ATTEMPTS {
                    tokio::time::sleep(backoff_for_attempt(attempt)).await;
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}
