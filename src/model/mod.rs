pub mod record;

pub use record::{AuctionRecord, PageRequest, PageResult, PageStatus};
