// src/object_store.rs
//
// Data-plane abstraction driven by the bulk operations.
// Implementations: S3 (s3_store.rs) and local filesystem (file_store.rs).

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::AsyncRead;

use crate::constants::KEY_SEPARATOR;
use crate::storage_class::StorageClass;

/// One entry returned by a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<String>,
    pub e_tag: Option<String>,
}

impl ObjectInfo {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self { key: key.into(), size, ..Default::default() }
    }

    /// A zero-byte object whose key ends with `/`, standing in for a folder.
    pub fn is_dir_marker(&self) -> bool {
        self.size == 0 && self.key.ends_with(KEY_SEPARATOR)
    }
}

/// Bucket + key pair. For bulk copies the key is a prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyPath {
    pub bucket_name: String,
    pub object_key: String,
}

impl CopyPath {
    pub fn new(bucket_name: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self { bucket_name: bucket_name.into(), object_key: object_key.into() }
    }

    pub fn bucket(bucket_name: impl Into<String>) -> Self {
        Self::new(bucket_name, "")
    }
}

/// Body handed to [`ObjectStore::put`].
#[derive(Debug, Clone)]
pub enum PutBody {
    /// Streamed from disk by the implementation; never read fully into memory.
    File { path: PathBuf, size: u64 },
    Bytes(Bytes),
}

impl PutBody {
    pub fn len(&self) -> u64 {
        match self {
            PutBody::File { size, .. } => *size,
            PutBody::Bytes(b) => b.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub storage_class: Option<StorageClass>,
}

/// Listing results, produced lazily page by page.
pub type ObjectListing<'a> = Pin<Box<dyn Stream<Item = Result<ObjectInfo>> + Send + 'a>>;

/// Streaming object body returned by [`ObjectStore::get`].
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Object-storage data plane. Retries, authentication and wire protocol are
/// the implementation's business.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects whose key starts with `prefix`. With `recursive == false`
    /// keys are grouped at the next `/`.
    fn list<'a>(&'a self, bucket: &'a str, prefix: &'a str, recursive: bool) -> ObjectListing<'a>;

    /// Store an object.
    async fn put(&self, bucket: &str, key: &str, body: PutBody, opts: &PutOptions) -> Result<()>;

    /// Open an object for streaming read.
    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader>;

    /// Server-side copy; no data passes through the client.
    async fn copy(&self, src: &CopyPath, dst: &CopyPath, storage_class: Option<StorageClass>) -> Result<()>;

    /// Delete a single object.
    async fn remove(&self, bucket: &str, key: &str) -> Result<()>;
}

/// Join a key prefix and a relative key with exactly one `/` between them.
pub fn join_key(prefix: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches(KEY_SEPARATOR);
    if prefix.is_empty() {
        return rel.to_string();
    }
    let prefix = prefix.trim_end_matches(KEY_SEPARATOR);
    if rel.is_empty() {
        return format!("{}{}", prefix, KEY_SEPARATOR);
    }
    format!("{}{}{}", prefix, KEY_SEPARATOR, rel)
}

/// Guess a content type from the file extension, `application/octet-stream` when unknown.
pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name).first_or_octet_stream().to_string()
}
