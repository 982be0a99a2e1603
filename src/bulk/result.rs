// src/bulk/result.rs

use std::fmt;

/// One failed item: the object key (or local file path for uploads) and why.
#[derive(Debug)]
pub struct ItemError {
    pub key: String,
    pub error: anyhow::Error,
}

impl ItemError {
    pub fn new(key: impl Into<String>, error: anyhow::Error) -> Self {
        Self { key: key.into(), error }
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.key, self.error)
    }
}

/// Outcome of a bulk operation.
///
/// `success_count + error_count` equals the number of items dispatched.
/// With `cancelled == false` that is every item that passed the filter.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<ItemError>,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.success_count + self.error_count
    }

    pub fn is_complete_success(&self) -> bool {
        self.error_count == 0 && !self.cancelled
    }

    pub(crate) fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub(crate) fn record_error(&mut self, err: ItemError) {
        self.error_count += 1;
        self.errors.push(err);
    }
}

pub type UploadResult = BatchResult;
pub type DownloadResult = BatchResult;
pub type CopyResult = BatchResult;
pub type DeleteResult = BatchResult;
