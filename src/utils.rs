use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, Local, TimeZone};
use std::future::Future;
use tokio::task;

pub async fn run_blocking<F, T>(func: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    match task::spawn_blocking(func).await {
        Ok(Ok(res)) => Ok(res),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(AppError::from(e)),
    }
}

/// Drives `work` to completion while watching `shutdown`.
///
/// The work is never cancelled; the flag tells whether `shutdown` fired first.
pub async fn complete_watching<W, S>(work: W, shutdown: S) -> (W::Output, bool)
where
    W: Future,
    S: Future<Output = ()>,
{
    tokio::pin!(work);
    let early = tokio::select! {
        biased;
        out = &mut work => Some(out),
        _ = shutdown => None,
    };
    match early {
        Some(out) => (out, false),
        None => (work.await, true),
    }
}

/// `YYYYMMDD` of the day `days` before `now`.
pub fn days_ago_stamp<Tz: TimeZone>(now: DateTime<Tz>, days: i64) -> String
where
    Tz::Offset: std::fmt::Display,
{
    (now - Duration::days(days)).format("%Y%m%d").to_string()
}

pub fn file_timestamp() -> String {
    Local::now()
        .format(crate::config::TIMESTAMP_FORMAT)
        .to_string()
}

pub fn div_ceil(numerator: usize, denominator: usize) -> usize {
    if denominator == 0 {
        return 0;
    }
    (numerator + denominator - 1) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn week_window_crosses_month_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap();
        assert_eq!(days_ago_stamp(now, 7), "20240225");
    }

    #[test]
    fn ceil_division() {
        assert_eq!(div_ceil(250, 100), 3);
        assert_eq!(div_ceil(200, 100), 2);
        assert_eq!(div_ceil(0, 100), 0);
        assert_eq!(div_ceil(5, 0), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn watched_work_runs_to_completion() {
        let work = async {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            7
        };
        assert_eq!(complete_watching(work, async {}).await, (7, true));

        let quick = async { 3 };
        assert_eq!(
            complete_watching(quick, std::future::pending::<()>()).await,
            (3, false)
        );
    }

    #[tokio::test]
    async fn blocking_errors_pass_through() {
        let result: AppResult<()> =
            run_blocking(|| Err(AppError::Write("boom".to_string()))).await;
        assert_eq!(result, Err(AppError::Write("boom".to_string())));
    }
}
