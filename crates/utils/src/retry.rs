// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{error, warn};

pub enum RetryError {
    Failure(anyhow::Error),
    Retry(anyhow::Error),
}

pub fn to_retry(e: impl Into<anyhow::Error>) -> RetryError {
    RetryError::Retry(e.into())
}

pub fn to_failure(e: impl Into<anyhow::Error>) -> RetryError {
    RetryError::Failure(e.into())
}

pub const BACKOFF_DELAY: u64 = 500;
pub const BACKOFF_MAX_RETRIES: u32 = 4;

/// Retries an async operation with exponential backoff
///
/// # Arguments
/// * `operation` - Async function to retry
/// * `max_attempts` - Maximum number of attempts
/// * `initial_delay_ms` - Initial delay between retries in milliseconds
///
/// # Returns
/// * `Result<T>` - The value of the first successful attempt, or the last error
pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    max_attempts: u32,
    initial_delay_ms: u64,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RetryError>>,
{
    let mut current_attempt = 1;
    let mut delay_ms = initial_delay_ms;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(RetryError::Retry(e)) => {
                if current_attempt >= max_attempts {
                    return Err(e.context(format!(
                        "Operation failed after {} attempts",
                        max_attempts
                    )));
                }

                warn!(
                    "Attempt {}/{} failed, retrying in {}ms: {}",
                    current_attempt, max_attempts, delay_ms, e
                );

                sleep(Duration::from_millis(delay_ms)).await;
                current_attempt += 1;
                delay_ms *= 2;
            }
            Err(RetryError::Failure(e)) => {
                error!("Non retryable failure, returning to caller: {}", e);
                return Err(e);
            }
        }
    }
}
