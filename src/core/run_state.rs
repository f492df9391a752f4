use crate::model::AuctionRecord;
use std::path::PathBuf;

/// Records held for one collection run: everything collected so far plus the
/// chunk that has not reached disk yet.
#[derive(Debug)]
pub struct CollectionState {
    chunk_size: usize,
    backup_interval: usize,
    accumulated: Vec<AuctionRecord>,
    pending: Vec<AuctionRecord>,
    chunk_files: Vec<(PathBuf, usize)>,
}

impl CollectionState {
    pub fn new(chunk_size: usize, backup_interval: usize) -> Self {
        CollectionState {
            chunk_size: chunk_size.max(1),
            backup_interval,
            accumulated: Vec::new(),
            pending: Vec::new(),
            chunk_files: Vec::new(),
        }
    }

    /// Appends one page. Returns true when the running total crossed a
    /// multiple of the backup interval.
    pub fn absorb(&mut self, records: Vec<AuctionRecord>) -> bool {
        if records.is_empty() {
            return false;
        }
        let before = self.accumulated.len();
        self.pending.extend(records.iter().cloned());
        self.accumulated.extend(records);
        let after = self.accumulated.len();

        self.backup_interval > 0 && after / self.backup_interval > before / self.backup_interval
    }

    pub fn chunk_ready(&self) -> bool {
        self.pending.len() >= self.chunk_size
    }

    pub fn next_chunk_index(&self) -> usize {
        self.chunk_files.len() + 1
    }

    pub fn mark_chunk_flushed(&mut self, path: PathBuf) {
        let len = self.pending.len();
        self.pending.clear();
        self.chunk_files.push((path, len));
    }

    pub fn accumulated(&self) -> &[AuctionRecord] {
        &self.accumulated
    }

    pub fn pending(&self) -> &[AuctionRecord] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Written chunk files with the number of records in each.
    pub fn chunk_files(&self) -> &[(PathBuf, usize)] {
        &self.chunk_files
    }

    pub fn into_records(self) -> Vec<AuctionRecord> {
        self.accumulated
    }
}
