pub mod client;
pub mod fetchers;
pub mod model;
pub mod retry;

use crate::error::AppResult;
use crate::model::{AuctionRecord, PageRequest};
use async_trait::async_trait;

/// The remote listing service as seen by the collector.
#[async_trait]
pub trait AuctionSource: Send + Sync {
    /// Number of listings for `disposal_method` opened within the query window.
    async fn fetch_total_count(&self, disposal_method: &str) -> AppResult<u64>;

    /// One page of normalized listings. A single attempt, no retry.
    async fn fetch_page(&self, request: &PageRequest) -> AppResult<Vec<AuctionRecord>>;
}
