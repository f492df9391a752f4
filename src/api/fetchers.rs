use super::retry::with_retry;
use super::AuctionSource;
use crate::config::RetryPolicy;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::{PageRequest, PageResult};

/// Total listing count; any failure here is fatal for the run.
pub async fn fetch_total_count<S>(source: &S, disposal_method: &str) -> AppResult<u64>
where
    S: AuctionSource + ?Sized,
{
    match source.fetch_total_count(disposal_method).await {
        Ok(total) => Ok(total),
        Err(e) => {
            log(
                LogLevel::Error,
                &format!("Total count FAIL [{}]: {}", disposal_method, e),
            );
            Err(AppError::fatal(&e))
        }
    }
}

/// Fetches one page under `policy`. Never fails: an exhausted page is
/// logged and comes back as `PageStatus::Failed` with no records.
pub async fn fetch_page_resilient<S>(
    source: &S,
    request: &PageRequest,
    policy: &RetryPolicy,
) -> PageResult
where
    S: AuctionSource + ?Sized,
{
    let ctx = format!("Page {} [{}]", request.page_no, request.disposal_method);

    match with_retry(policy, &ctx, |_| source.fetch_page(request)).await {
        Ok(records) => PageResult::fetched(request.page_no, records),
        Err(e) => {
            log(
                LogLevel::Error,
                &format!(
                    "{} - giving up after {} attempt(s): {}",
                    ctx,
                    policy.max_attempts.max(1),
                    e
                ),
            );
            PageResult::failed(request.page_no)
        }
    }
}
