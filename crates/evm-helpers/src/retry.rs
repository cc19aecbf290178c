// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use sealed_utils::{retry_with_backoff, to_failure, to_retry};
use std::future::Future;
use tracing::info;

const RETRY_MAX_ATTEMPTS: u32 = 3;
const RETRY_INITIAL_DELAY_MS: u64 = 500;

fn should_retry_error(error: &str, retry_on_errors: &[&str]) -> bool {
    if retry_on_errors.is_empty() {
        return true;
    }
    let error = error.to_lowercase();
    retry_on_errors.iter().any(|code| error.contains(code))
}

/// Retry a view call on transport-class failures. Only reads go through here: a broadcast is
/// never repeated since a repeated submission would reuse a ciphertext handle.
pub async fn call_with_retry<F, Fut, T>(
    operation_name: &str,
    retry_on_errors: &[&str],
    read_fn: F,
) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    retry_with_backoff(
        || {
            let fut = read_fn();
            async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(e) if should_retry_error(&format!("{e:#}"), retry_on_errors) => {
                        info!("{}: error, will retry: {}", operation_name, e);
                        Err(to_retry(e))
                    }
                    Err(e) => Err(to_failure(e)),
                }
            }
        },
        RETRY_MAX_ATTEMPTS,
        RETRY_INITIAL_DELAY_MS,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_should_retry_matches_case_insensitively() {
        assert!(should_retry_error("Request Timeout", &["timeout"]));
        assert!(!should_retry_error("execution reverted", &["timeout"]));
        assert!(should_retry_error("anything", &[]));
    }

    #[tokio::test]
    async fn test_reverts_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let res: anyhow::Result<u8> = call_with_retry("getTally", &["timeout"], move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("execution reverted"))
        })
        .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeouts_are_retried() -> anyhow::Result<()> {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let value = call_with_retry("numOptions", &["timeout"], move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(anyhow::anyhow!("request timeout"))
            } else {
                Ok(3u8)
            }
        })
        .await?;
        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }
}
