use crate::api::model::RawItem;
use crate::config;
use crate::model::AuctionRecord;

/// Normalizes one raw `<item>` through the fixed field table.
///
/// Every mapped column is present in the result; fields the API left out
/// become `""`. Source elements outside the table are dropped.
pub fn map_record(raw: &RawItem) -> AuctionRecord {
    AuctionRecord::from_pairs(config::FIELD_MAPPING.iter().map(|(source, target)| {
        (
            *target,
            raw.get(*source).cloned().unwrap_or_default(),
        )
    }))
}
