// src/file_store.rs
//
// Local-filesystem ObjectStore. Each bucket is a directory under `root`;
// keys are paths relative to the bucket directory with `/` separators.
// An empty directory lists as a zero-byte `dir/` marker.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::constants::KEY_SEPARATOR;
use crate::object_store::{
    CopyPath, ObjectInfo, ObjectListing, ObjectReader, ObjectStore, PutBody, PutOptions,
};
use crate::storage_class::StorageClass;

#[derive(Debug, Clone)]
pub struct FileSystemObjectStore {
    root: PathBuf,
}

impl FileSystemObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            bail!("invalid bucket directory name {:?}", bucket);
        }
        Ok(self.root.join(bucket))
    }

    /// Map `bucket`/`key` onto a path that cannot leave the bucket directory.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let mut path = self.bucket_path(bucket)?;
        let rel = Path::new(key.trim_start_matches(KEY_SEPARATOR));
        for comp in rel.components() {
            match comp {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => bail!("key {:?} escapes bucket {:?}", key, bucket),
            }
        }
        Ok(path)
    }

    async fn collect_objects(dir: &Path, prefix: &str, results: &mut Vec<ObjectInfo>) -> Result<()> {
        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("failed to read directory {}", dir.display()))?;
        let mut empty = true;

        while let Some(entry) = entries.next_entry().await? {
            empty = false;
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = if prefix.is_empty() {
                name
            } else {
                format!("{}{}{}", prefix, KEY_SEPARATOR, name)
            };

            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                Box::pin(Self::collect_objects(&entry.path(), &key, results)).await?;
            } else if file_type.is_file() {
                let size = entry.metadata().await?.len();
                results.push(ObjectInfo::new(key, size));
            }
        }

        if empty && !prefix.is_empty() {
            results.push(ObjectInfo::new(format!("{}{}", prefix, KEY_SEPARATOR), 0));
        }
        Ok(())
    }

    async fn list_all(&self, bucket: &str, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>> {
        let base = self.bucket_path(bucket)?;
        if !fs::try_exists(&base).await.unwrap_or(false) {
            bail!("bucket not found: {}", bucket);
        }

        let mut all = Vec::new();
        Self::collect_objects(&base, "", &mut all).await?;
        all.retain(|o| o.key.starts_with(prefix));
        all.sort_by(|a, b| a.key.cmp(&b.key));

        if recursive {
            return Ok(all);
        }

        // Group everything below the next separator into one common prefix.
        let mut out: Vec<ObjectInfo> = Vec::new();
        for obj in all {
            match obj.key[prefix.len()..].find(KEY_SEPARATOR) {
                Some(pos) => {
                    let common = &obj.key[..prefix.len() + pos + 1];
                    if out.last().map(|o| o.key.as_str()) != Some(common) {
                        out.push(ObjectInfo::new(common, 0));
                    }
                }
                None => out.push(obj),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ObjectStore for FileSystemObjectStore {
    fn list<'a>(&'a self, bucket: &'a str, prefix: &'a str, recursive: bool) -> ObjectListing<'a> {
        Box::pin(async_stream::stream! {
            match self.list_all(bucket, prefix, recursive).await {
                Ok(objects) => {
                    for obj in objects {
                        yield Ok(obj);
                    }
                }
                Err(e) => yield Err(e),
            }
        })
    }

    async fn put(&self, bucket: &str, key: &str, body: PutBody, opts: &PutOptions) -> Result<()> {
        let dest = self.object_path(bucket, key)?;
        if key.ends_with(KEY_SEPARATOR) {
            fs::create_dir_all(&dest).await?;
            return Ok(());
        }
        if let Some(class) = opts.storage_class {
            debug!("storage class {} has no effect on local files", class);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        match body {
            PutBody::File { path, .. } => {
                fs::copy(&path, &dest)
                    .await
                    .with_context(|| format!("failed to copy {} to {}", path.display(), dest.display()))?;
            }
            PutBody::Bytes(b) => {
                fs::write(&dest, &b)
                    .await
                    .with_context(|| format!("failed to write {}", dest.display()))?;
            }
        }
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        let path = self.object_path(bucket, key)?;
        let file = fs::File::open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        if !file.metadata().await?.is_file() {
            bail!("not a file: {}", path.display());
        }
        Ok(Box::pin(file))
    }

    async fn copy(&self, src: &CopyPath, dst: &CopyPath, _storage_class: Option<StorageClass>) -> Result<()> {
        let from = self.object_path(&src.bucket_name, &src.object_key)?;
        let to = self.object_path(&dst.bucket_name, &dst.object_key)?;
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&from, &to)
            .await
            .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        let res = if key.ends_with(KEY_SEPARATOR) {
            fs::remove_dir(&path).await
        } else {
            fs::remove_file(&path).await
        };
        match res {
            // Deleting a missing object is not an error, same as S3.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other.with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}
