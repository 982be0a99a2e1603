// src/bulk/delete.rs

use futures::future;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{validate_bucket, BulkClient, DeleteResult, ItemError};
use crate::error::BulkResult;
use crate::filter::{FilterOptions, FilterSet};
use crate::object_store::ObjectInfo;

#[derive(Debug, Clone, Default)]
pub struct DeleteAllOptions {
    /// Empty deletes across the whole bucket.
    pub object_key_prefix: String,
    pub filter: Option<Vec<FilterOptions>>,
    pub batch_size: Option<i64>,
}

impl BulkClient {
    /// Delete every object under `opts.object_key_prefix`, one request per
    /// object, so each failure is reported against its own key.
    pub async fn delete_all(
        &self,
        cancel: &CancellationToken,
        bucket: &str,
        opts: DeleteAllOptions,
    ) -> BulkResult<DeleteResult> {
        validate_bucket(bucket)?;

        info!("Starting delete of {}/{}", bucket, opts.object_key_prefix);
        self.progress_start(0);

        let filters = FilterSet::compile(opts.filter.as_deref());
        let listing = self
            .store
            .list(bucket, &opts.object_key_prefix, true)
            .filter(move |item| {
                future::ready(match item {
                    Ok(obj) => filters.should_process(&obj.key),
                    Err(_) => true,
                })
            });

        let store = self.store.clone();
        let bucket_name: Arc<str> = Arc::from(bucket);
        let handler = move |obj: ObjectInfo| {
            let store = store.clone();
            let bucket = bucket_name.clone();
            async move {
                debug!("deleting {}/{}", bucket, obj.key);
                store
                    .remove(&bucket, &obj.key)
                    .await
                    .map_err(|e| ItemError::new(obj.key, e))
            }
        };

        let batch_size = self.batch_size(opts.batch_size);
        let result = self.run_items("delete", listing, batch_size, cancel, handler).await?;

        info!(
            "Delete in {} finished: {} deleted, {} failed{}",
            bucket,
            result.success_count,
            result.error_count,
            if result.cancelled { " (cancelled)" } else { "" }
        );
        Ok(result)
    }
}
