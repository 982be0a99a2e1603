// src/bulk/mod.rs
//
// Bulk operations over an ObjectStore: upload a directory tree, and
// download, copy or delete everything under a prefix. Each operation
// enumerates its items, filters them, and drives them through the
// client's BatchRunner.

use futures::stream::Stream;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::concurrency::BatchRunner;
use crate::config::BatchConfig;
use crate::error::{BulkError, BulkResult};
use crate::object_store::ObjectStore;
use crate::progress::ProgressReporter;

pub mod copy;
pub mod delete;
pub mod download;
pub mod result;
pub mod upload;

pub use copy::CopyAllOptions;
pub use delete::DeleteAllOptions;
pub use download::DownloadAllOptions;
pub use result::{BatchResult, CopyResult, DeleteResult, DownloadResult, ItemError, UploadResult};
pub use upload::UploadDirOptions;

/// Entry point for bulk operations.
///
/// Cloning is cheap and clones share the same parallelism bound, so
/// operations started concurrently from clones of one client never have
/// more than `max_parallel` requests in flight between them.
#[derive(Clone)]
pub struct BulkClient {
    store: Arc<dyn ObjectStore>,
    runner: BatchRunner,
    config: BatchConfig,
    progress: Option<Arc<dyn ProgressReporter>>,
}

impl BulkClient {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_config(store, BatchConfig::default())
    }

    pub fn with_config(store: Arc<dyn ObjectStore>, config: BatchConfig) -> Self {
        Self {
            store,
            runner: BatchRunner::new(config.max_parallel),
            config,
            progress: None,
        }
    }

    /// Replace the parallelism bound. Clones made before this call keep the old one.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.config = self.config.with_max_parallel(max_parallel);
        self.runner = BatchRunner::new(self.config.max_parallel);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    fn batch_size(&self, requested: Option<i64>) -> usize {
        self.config.with_batch_size(requested).batch_size
    }

    fn progress_start(&self, total: u64) {
        if let Some(p) = &self.progress {
            p.start(total);
        }
    }

    /// Drive `input` through `handler`, collecting outcomes into a [`BatchResult`].
    async fn run_items<T, S, H, Fut>(
        &self,
        operation: &'static str,
        input: S,
        batch_size: usize,
        cancel: &CancellationToken,
        handler: H,
    ) -> BulkResult<BatchResult>
    where
        T: Send + 'static,
        S: Stream<Item = anyhow::Result<T>>,
        H: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ItemError>> + Send + 'static,
    {
        let acc = Arc::new(Mutex::new(BatchResult::default()));

        let on_success = {
            let acc = acc.clone();
            let progress = self.progress.clone();
            move || {
                acc.lock().unwrap_or_else(PoisonError::into_inner).record_success();
                if let Some(p) = &progress {
                    p.add(1);
                }
            }
        };
        let on_error = {
            let acc = acc.clone();
            let progress = self.progress.clone();
            move |err: ItemError| {
                warn!("{} failed for {}: {:#}", operation, err.key, err.error);
                acc.lock().unwrap_or_else(PoisonError::into_inner).record_error(err);
                if let Some(p) = &progress {
                    p.add(1);
                }
            }
        };

        let outcome = self
            .runner
            .run(input, batch_size, cancel, handler, on_success, on_error)
            .await;
        if let Some(p) = &self.progress {
            p.finish();
        }
        let summary = match outcome {
            Ok(summary) => summary,
            Err(e) => {
                if matches!(e, BulkError::Enumeration(_)) {
                    error!("{} aborted: {}", operation, e);
                }
                return Err(e);
            }
        };

        let mut result = std::mem::take(&mut *acc.lock().unwrap_or_else(PoisonError::into_inner));
        result.cancelled = summary.cancelled;
        debug!(
            "{}: {} batch(es), {} dispatched, cancelled={}",
            operation, summary.batches, summary.dispatched, summary.cancelled
        );
        Ok(result)
    }
}

pub(crate) fn validate_bucket(bucket: &str) -> BulkResult<()> {
    if bucket.is_empty() {
        return Err(BulkError::InvalidBucketName(bucket.to_string()));
    }
    Ok(())
}
