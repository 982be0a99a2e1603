// tests/common/mod.rs
//
// Shared helpers for the integration tests: an in-memory ObjectStore with
// failure injection and call recording.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use s3bulk::object_store::{ObjectListing, ObjectReader};
use s3bulk::{CopyPath, ObjectInfo, ObjectStore, PutBody, PutOptions, StorageClass};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, ReadBuf};

/// One recorded call against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List { bucket: String, prefix: String },
    Put { bucket: String, key: String, content_type: Option<String>, storage_class: Option<StorageClass> },
    Get { bucket: String, key: String },
    Copy { src: CopyPath, dst: CopyPath, storage_class: Option<StorageClass> },
    Remove { bucket: String, key: String },
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Bytes>>,
    failing_keys: Mutex<HashSet<String>>,
    broken_keys: Mutex<HashSet<String>>,
    listing_fails_after: Mutex<Option<usize>>,
    latency: Mutex<Option<Duration>>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, bucket: &str, key: &str, data: &[u8]) -> Self {
        self.insert(bucket, key, Bytes::copy_from_slice(data));
        self
    }

    /// Zero-byte `key/` object.
    pub fn with_dir_marker(self, bucket: &str, key: &str) -> Self {
        assert!(key.ends_with('/'));
        self.insert(bucket, key, Bytes::new());
        self
    }

    /// Every data-plane call naming `key` (as source or destination) fails.
    pub fn failing_on(self, key: &str) -> Self {
        self.failing_keys.lock().unwrap().insert(key.to_string());
        self
    }

    /// `get` on `key` returns a reader that errors after the first chunk.
    pub fn broken_midway(self, key: &str) -> Self {
        self.broken_keys.lock().unwrap().insert(key.to_string());
        self
    }

    /// Listings yield `n` entries and then an error.
    pub fn listing_fails_after(self, n: usize) -> Self {
        *self.listing_fails_after.lock().unwrap() = Some(n);
        self
    }

    /// Each put/get/copy/remove sleeps this long while counted as in flight.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().unwrap() = Some(latency);
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, data: Bytes) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Get { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn copies(&self) -> Vec<(CopyPath, CopyPath, Option<StorageClass>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Copy { src, dst, storage_class } => Some((src, dst, storage_class)),
                _ => None,
            })
            .collect()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_key(&self, key: &str) -> Result<()> {
        if self.failing_keys.lock().unwrap().contains(key) {
            bail!("injected failure for {}", key);
        }
        Ok(())
    }

    async fn simulate_request(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        match latency {
            Some(d) => tokio::time::sleep(d).await,
            None => tokio::task::yield_now().await,
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn listing(&self, bucket: &str, prefix: &str) -> Vec<ObjectInfo> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), v)| ObjectInfo::new(k.clone(), v.len() as u64))
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn list<'a>(&'a self, bucket: &'a str, prefix: &'a str, _recursive: bool) -> ObjectListing<'a> {
        self.record(Call::List { bucket: bucket.to_string(), prefix: prefix.to_string() });
        let entries = self.listing(bucket, prefix);
        let fail_after = *self.listing_fails_after.lock().unwrap();
        Box::pin(async_stream::stream! {
            for (i, obj) in entries.into_iter().enumerate() {
                if fail_after == Some(i) {
                    yield Err(anyhow!("listing interrupted"));
                    return;
                }
                yield Ok(obj);
            }
        })
    }

    async fn put(&self, bucket: &str, key: &str, body: PutBody, opts: &PutOptions) -> Result<()> {
        self.record(Call::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: opts.content_type.clone(),
            storage_class: opts.storage_class,
        });
        self.simulate_request().await;
        self.check_key(key)?;
        let data = match body {
            PutBody::File { path, .. } => Bytes::from(tokio::fs::read(&path).await?),
            PutBody::Bytes(b) => b,
        };
        self.insert(bucket, key, data);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        self.record(Call::Get { bucket: bucket.to_string(), key: key.to_string() });
        self.simulate_request().await;
        self.check_key(key)?;
        let data = self
            .object(bucket, key)
            .ok_or_else(|| anyhow!("no such key: {}", key))?;
        if self.broken_keys.lock().unwrap().contains(key) {
            return Ok(Box::pin(BrokenReader { data, sent: false }));
        }
        Ok(Box::pin(io::Cursor::new(data)))
    }

    async fn copy(&self, src: &CopyPath, dst: &CopyPath, storage_class: Option<StorageClass>) -> Result<()> {
        self.record(Call::Copy { src: src.clone(), dst: dst.clone(), storage_class });
        self.simulate_request().await;
        self.check_key(&src.object_key)?;
        self.check_key(&dst.object_key)?;
        let data = self
            .object(&src.bucket_name, &src.object_key)
            .ok_or_else(|| anyhow!("no such key: {}", src.object_key))?;
        self.insert(&dst.bucket_name, &dst.object_key, data);
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<()> {
        self.record(Call::Remove { bucket: bucket.to_string(), key: key.to_string() });
        self.simulate_request().await;
        self.check_key(key)?;
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

/// Hands out the first chunk of the body, then fails like a dropped connection.
struct BrokenReader {
    data: Bytes,
    sent: bool,
}

impl AsyncRead for BrokenReader {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if self.sent {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset mid-transfer",
            )));
        }
        let n = buf.remaining().min(self.data.len()).min(4);
        buf.put_slice(&self.data[..n]);
        self.sent = true;
        Poll::Ready(Ok(()))
    }
}

/// Write `files` (relative path, contents) under `root`.
pub fn write_tree(root: &std::path::Path, files: &[(&str, &[u8])]) {
    for (rel, data) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, data).unwrap();
    }
}
