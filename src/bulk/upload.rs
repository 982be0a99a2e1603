// src/bulk/upload.rs
//
// Upload a local directory tree under a bucket prefix.

use anyhow::Context;
use futures::stream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{validate_bucket, BulkClient, ItemError, UploadResult};
use crate::constants::KEY_SEPARATOR;
use crate::error::{BulkError, BulkResult};
use crate::filter::{FilterOptions, FilterSet};
use crate::object_store::{content_type_for, join_key, PutBody, PutOptions};
use crate::storage_class::validate_storage_class;

#[derive(Debug, Clone, Default)]
pub struct UploadDirOptions {
    /// Only upload the files directly inside the source directory.
    pub shallow: bool,
    pub storage_class: Option<String>,
    /// Unset, zero or negative means the client default.
    pub batch_size: Option<i64>,
    /// Evaluated against the local file path.
    pub filter: Option<Vec<FilterOptions>>,
}

impl BulkClient {
    /// Upload every regular file below `source_dir` to `dest_bucket`, keyed
    /// by `dest_prefix` plus the path relative to `source_dir`.
    ///
    /// The tree is walked completely before the first upload starts, so a
    /// progress reporter sees the real total. Per-file failures are recorded
    /// in the result with the local path as the key.
    pub async fn upload_dir(
        &self,
        cancel: &CancellationToken,
        dest_bucket: &str,
        dest_prefix: &str,
        source_dir: impl AsRef<Path>,
        opts: UploadDirOptions,
    ) -> BulkResult<UploadResult> {
        let source_dir = source_dir.as_ref();
        validate_bucket(dest_bucket)?;
        if source_dir.as_os_str().is_empty() {
            return Err(BulkError::InvalidLocalPath(String::new()));
        }
        let storage_class = validate_storage_class(opts.storage_class.as_deref())?;
        match fs::metadata(source_dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(BulkError::InvalidLocalPath(source_dir.display().to_string())),
        }

        let filters = FilterSet::compile(opts.filter.as_deref());
        let mut files = Vec::new();
        collect_files(source_dir, opts.shallow, &mut files)
            .await
            .map_err(BulkError::Enumeration)?;
        files.retain(|f| filters.should_process(&f.path.to_string_lossy()));

        info!(
            "Starting upload of {} file(s) from {} to {}/{} (shallow={})",
            files.len(),
            source_dir.display(),
            dest_bucket,
            dest_prefix,
            opts.shallow
        );
        self.progress_start(files.len() as u64);

        let store = self.store.clone();
        let bucket: Arc<str> = Arc::from(dest_bucket);
        let prefix: Arc<str> = Arc::from(dest_prefix);
        let root: Arc<Path> = Arc::from(source_dir);

        let handler = move |file: LocalFile| {
            let store = store.clone();
            let bucket = bucket.clone();
            let prefix = prefix.clone();
            let root = root.clone();
            async move {
                let local_path = file.path.display().to_string();
                let key = object_key_for(&root, &prefix, &file.path)
                    .map_err(|e| ItemError::new(local_path.clone(), e))?;
                let put_opts = PutOptions {
                    content_type: Some(content_type_for(&key)),
                    storage_class,
                };
                debug!("uploading {} -> {}/{} ({} bytes)", local_path, bucket, key, file.size);
                store
                    .put(&bucket, &key, PutBody::File { path: file.path, size: file.size }, &put_opts)
                    .await
                    .map_err(|e| ItemError::new(local_path, e))
            }
        };

        let batch_size = self.batch_size(opts.batch_size);
        let input = stream::iter(files.into_iter().map(Ok));
        let result = self.run_items("upload", input, batch_size, cancel, handler).await?;

        info!(
            "Upload to {} finished: {} uploaded, {} failed{}",
            dest_bucket,
            result.success_count,
            result.error_count,
            if result.cancelled { " (cancelled)" } else { "" }
        );
        Ok(result)
    }
}

#[derive(Debug)]
struct LocalFile {
    path: PathBuf,
    size: u64,
}

/// Collect regular files below `dir`. Symlinks and other special files are skipped.
async fn collect_files(dir: &Path, shallow: bool, results: &mut Vec<LocalFile>) -> anyhow::Result<()> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to read directory {}", dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            if !shallow {
                Box::pin(collect_files(&entry.path(), shallow, results)).await?;
            }
        } else if file_type.is_file() {
            let size = entry.metadata().await?.len();
            results.push(LocalFile { path: entry.path(), size });
        }
    }
    Ok(())
}

fn object_key_for(root: &Path, prefix: &str, path: &Path) -> anyhow::Result<String> {
    let rel = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    let sep = KEY_SEPARATOR.to_string();
    let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join(sep.as_str());
    Ok(join_key(prefix, &rel))
}
