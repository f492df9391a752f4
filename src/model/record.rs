use std::collections::HashMap;

/// One normalized listing: output column name to text value.
///
/// Values are never validated or converted; dates and amounts stay as the
/// API delivered them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuctionRecord {
    fields: HashMap<String, String>,
}

impl AuctionRecord {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        AuctionRecord {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// The value of `field`, or `""` when the record has no such column.
    pub fn value(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_no: u32,
    pub disposal_method: String,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new<S: Into<String>>(page_no: u32, disposal_method: S, page_size: u32) -> Self {
        PageRequest {
            page_no,
            disposal_method: disposal_method.into(),
            page_size,
        }
    }

    /// One request per page, `1..=total_pages`.
    pub fn plan(total_pages: u32, disposal_method: &str, page_size: u32) -> Vec<PageRequest> {
        (1..=total_pages)
            .map(|page_no| PageRequest::new(page_no, disposal_method, page_size))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Fetched,
    Empty,
    /// Every attempt failed; the page contributes nothing.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub page_no: u32,
    pub records: Vec<AuctionRecord>,
    pub status: PageStatus,
}

impl PageResult {
    pub fn fetched(page_no: u32, records: Vec<AuctionRecord>) -> Self {
        let status = if records.is_empty() {
            PageStatus::Empty
        } else {
            PageStatus::Fetched
        };
        PageResult {
            page_no,
            records,
            status,
        }
    }

    pub fn failed(page_no: u32) -> Self {
        PageResult {
            page_no,
            records: Vec::new(),
            status: PageStatus::Failed,
        }
    }
}
