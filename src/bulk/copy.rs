// src/bulk/copy.rs
//
// Server-side copy of everything under a prefix, possibly across buckets.

use futures::future;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{validate_bucket, BulkClient, CopyResult, ItemError};
use crate::error::BulkResult;
use crate::filter::{FilterOptions, FilterSet};
use crate::object_store::{join_key, CopyPath, ObjectInfo};
use crate::storage_class::validate_storage_class;

#[derive(Debug, Clone, Default)]
pub struct CopyAllOptions {
    /// Evaluated against the source key.
    pub filter: Option<Vec<FilterOptions>>,
    pub storage_class: Option<String>,
    pub batch_size: Option<i64>,
}

impl BulkClient {
    /// Copy every object under `src.object_key` in `src.bucket_name` to
    /// `dst.bucket_name`, re-rooted under `dst.object_key`.
    ///
    /// Directory markers are skipped and don't appear in the counts.
    pub async fn copy_all(
        &self,
        cancel: &CancellationToken,
        src: &CopyPath,
        dst: &CopyPath,
        opts: CopyAllOptions,
    ) -> BulkResult<CopyResult> {
        validate_bucket(&src.bucket_name)?;
        validate_bucket(&dst.bucket_name)?;
        let storage_class = validate_storage_class(opts.storage_class.as_deref())?;

        info!(
            "Starting copy of {}/{} to {}/{}",
            src.bucket_name, src.object_key, dst.bucket_name, dst.object_key
        );
        self.progress_start(0);

        let filters = FilterSet::compile(opts.filter.as_deref());
        let listing = self
            .store
            .list(&src.bucket_name, &src.object_key, true)
            .filter(move |item| {
                future::ready(match item {
                    Ok(obj) => !obj.is_dir_marker() && filters.should_process(&obj.key),
                    Err(_) => true,
                })
            });

        let store = self.store.clone();
        let src_root = Arc::new(src.clone());
        let dst_root = Arc::new(dst.clone());

        let handler = move |obj: ObjectInfo| {
            let store = store.clone();
            let src = src_root.clone();
            let dst = dst_root.clone();
            async move {
                let from = CopyPath::new(src.bucket_name.as_str(), obj.key.as_str());
                let to = CopyPath::new(
                    dst.bucket_name.as_str(),
                    destination_key(&src.object_key, &dst.object_key, &obj.key),
                );
                debug!(
                    "copying {}/{} -> {}/{}",
                    from.bucket_name, from.object_key, to.bucket_name, to.object_key
                );
                store
                    .copy(&from, &to, storage_class)
                    .await
                    .map_err(|e| ItemError::new(obj.key, e))
            }
        };

        let batch_size = self.batch_size(opts.batch_size);
        let result = self.run_items("copy", listing, batch_size, cancel, handler).await?;

        info!(
            "Copy finished: {} copied, {} failed{}",
            result.success_count,
            result.error_count,
            if result.cancelled { " (cancelled)" } else { "" }
        );
        Ok(result)
    }
}

/// Destination key for `key` listed under `src_prefix`. An empty destination
/// prefix keeps the source key as is.
pub(crate) fn destination_key(src_prefix: &str, dst_prefix: &str, key: &str) -> String {
    if dst_prefix.is_empty() {
        return key.to_string();
    }
    let rel = key.strip_prefix(src_prefix).unwrap_or(key);
    join_key(dst_prefix, rel)
}
