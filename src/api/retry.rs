use crate::config::RetryPolicy;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use std::future::Future;
use tokio::time::sleep;

/// Runs `operation` until it succeeds or `policy.max_attempts` are used up.
///
/// Sleeps `policy.pace` before every attempt and `policy.backoff` after each
/// failure that will be retried. Returns the last error on exhaustion.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    context: &str,
    mut operation: F,
) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error: Option<AppError> = None;

    for attempt in 1..=max_attempts {
        if !policy.pace.is_zero() {
            sleep(policy.pace).await;
        }

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt < max_attempts {
                    log(
                        LogLevel::Warning,
                        &format!(
                            "{} (Try {}/{}) failed: {}. Retrying.",
                            context, attempt, max_attempts, e
                        ),
                    );
                    if !policy.backoff.is_zero() {
                        sleep(policy.backoff).await;
                    }
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        AppError::Transport(format!("{} made no attempts", context))
    }))
}
