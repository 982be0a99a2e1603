// src/error.rs
//
// Call-level errors for the bulk operations. Per-item failures never surface
// here; they are collected in `BatchResult::errors` instead.

use thiserror::Error;

/// Error that prevents a bulk operation from running (or finishing) at all.
#[derive(Error, Debug)]
pub enum BulkError {
    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("invalid storage class: {0}")]
    InvalidStorageClass(String),

    #[error("invalid local path: {0}")]
    InvalidLocalPath(String),

    /// Listing or directory walk failed part way through.
    #[error("enumeration failed: {0:#}")]
    Enumeration(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A worker task panicked or was aborted by the runtime.
    #[error("worker task failed: {0}")]
    Worker(String),
}

pub type BulkResult<T> = std::result::Result<T, BulkError>;
