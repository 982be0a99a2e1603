// src/lib.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
// Crate root: module declarations and public re-exports.

//! Bulk object-storage operations driven through a bounded-concurrency
//! batch engine.
//!
//! ```no_run
//! use std::sync::Arc;
//! use s3bulk::{BulkClient, DeleteAllOptions, FilterOptions, S3ObjectStore};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = Arc::new(S3ObjectStore::from_env().await?);
//! let client = BulkClient::new(store).with_max_parallel(32);
//! let result = client
//!     .delete_all(
//!         &CancellationToken::new(),
//!         "my-bucket",
//!         DeleteAllOptions {
//!             object_key_prefix: "tmp/".into(),
//!             filter: Some(vec![FilterOptions::include(r"\.log$")]),
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! println!("deleted {} object(s), {} failed", result.success_count, result.error_count);
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod config;
pub mod error;
pub mod filter;
pub mod progress;
pub mod storage_class;

pub mod concurrency;

pub mod object_store;
pub mod s3_store;
pub mod file_store;

pub mod bulk;

pub use bulk::{
    BatchResult, BulkClient, CopyAllOptions, CopyResult, DeleteAllOptions, DeleteResult,
    DownloadAllOptions, DownloadResult, ItemError, UploadDirOptions, UploadResult,
};
pub use concurrency::{BatchRunner, RunSummary};
pub use config::{resolve_batch_size, BatchConfig};
pub use error::{BulkError, BulkResult};
pub use file_store::FileSystemObjectStore;
pub use filter::{matches_pattern, should_process, FilterOptions, FilterSet};
pub use object_store::{CopyPath, ObjectInfo, ObjectStore, PutBody, PutOptions};
pub use progress::{BarProgress, CountingProgress, ProgressReporter};
pub use s3_store::S3ObjectStore;
pub use storage_class::{validate_storage_class, StorageClass};
