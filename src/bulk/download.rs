// src/bulk/download.rs
//
// Download every object under a prefix into a local directory.

use anyhow::{bail, Context};
use futures::future;
use futures::stream::StreamExt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{validate_bucket, BulkClient, DownloadResult, ItemError};
use crate::constants::KEY_SEPARATOR;
use crate::error::{BulkError, BulkResult};
use crate::filter::{FilterOptions, FilterSet};
use crate::object_store::{ObjectInfo, ObjectStore};

#[derive(Debug, Clone, Default)]
pub struct DownloadAllOptions {
    /// Empty downloads the whole bucket.
    pub prefix: String,
    pub filter: Option<Vec<FilterOptions>>,
    pub batch_size: Option<i64>,
}

impl BulkClient {
    /// Download every object under `opts.prefix` into `dest_path`, which is
    /// created if missing. Local paths mirror the full object key.
    ///
    /// Directory markers become local directories without a fetch. Existing
    /// files are overwritten; nothing else in `dest_path` is touched.
    pub async fn download_all(
        &self,
        cancel: &CancellationToken,
        bucket: &str,
        dest_path: impl AsRef<Path>,
        opts: DownloadAllOptions,
    ) -> BulkResult<DownloadResult> {
        let dest_path = dest_path.as_ref();
        validate_bucket(bucket)?;
        if dest_path.as_os_str().is_empty() {
            return Err(BulkError::InvalidLocalPath(String::new()));
        }
        fs::create_dir_all(dest_path).await?;

        info!(
            "Starting download of {}/{} to {}",
            bucket,
            opts.prefix,
            dest_path.display()
        );
        self.progress_start(0);

        let filters = FilterSet::compile(opts.filter.as_deref());
        let listing = self
            .store
            .list(bucket, &opts.prefix, true)
            .filter(move |item| {
                future::ready(match item {
                    Ok(obj) => filters.should_process(&obj.key),
                    Err(_) => true,
                })
            });

        let store = self.store.clone();
        let bucket_name: Arc<str> = Arc::from(bucket);
        let dest: Arc<Path> = Arc::from(dest_path);

        let handler = move |obj: ObjectInfo| {
            let store = store.clone();
            let bucket = bucket_name.clone();
            let dest = dest.clone();
            async move {
                download_one(store.as_ref(), &bucket, &dest, &obj)
                    .await
                    .map_err(|e| ItemError::new(obj.key, e))
            }
        };

        let batch_size = self.batch_size(opts.batch_size);
        let result = self.run_items("download", listing, batch_size, cancel, handler).await?;

        info!(
            "Download from {} finished: {} downloaded, {} failed{}",
            bucket,
            result.success_count,
            result.error_count,
            if result.cancelled { " (cancelled)" } else { "" }
        );
        Ok(result)
    }
}

async fn download_one(
    store: &dyn ObjectStore,
    bucket: &str,
    dest: &Path,
    obj: &ObjectInfo,
) -> anyhow::Result<()> {
    let local = local_path_for(dest, &obj.key)?;

    if obj.is_dir_marker() {
        debug!("creating directory {} for marker {}", local.display(), obj.key);
        fs::create_dir_all(&local)
            .await
            .with_context(|| format!("failed to create {}", local.display()))?;
        return Ok(());
    }

    if let Some(parent) = local.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut reader = store.get(bucket, &obj.key).await?;
    let mut file = fs::File::create(&local)
        .await
        .with_context(|| format!("failed to create {}", local.display()))?;

    let copied = async {
        let n = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok::<u64, std::io::Error>(n)
    }
    .await;

    match copied {
        Ok(n) => {
            debug!("downloaded {}/{} -> {} ({} bytes)", bucket, obj.key, local.display(), n);
            Ok(())
        }
        Err(e) => {
            drop(file);
            // Leave nothing half-written behind.
            if let Err(rm) = fs::remove_file(&local).await {
                debug!("could not remove partial file {}: {}", local.display(), rm);
            }
            Err(anyhow::Error::new(e).context(format!("transfer of {} failed", obj.key)))
        }
    }
}

/// Map an object key onto a path under `dest`, refusing keys that would
/// climb out of it.
fn local_path_for(dest: &Path, key: &str) -> anyhow::Result<PathBuf> {
    let mut path = dest.to_path_buf();
    for part in key.split(KEY_SEPARATOR).filter(|p| !p.is_empty()) {
        let mut comps = Path::new(part).components();
        match (comps.next(), comps.next()) {
            (Some(Component::Normal(c)), None) => path.push(c),
            (Some(Component::CurDir), None) => {}
            _ => bail!("object key {:?} does not map to a path inside {}", key, dest.display()),
        }
    }
    if path == dest {
        bail!("object key {:?} does not name a file", key);
    }
    Ok(path)
}
