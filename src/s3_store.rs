// src/s3_store.rs
//
// ObjectStore over aws-sdk-s3. Works against AWS and S3-compatible services
// (MinIO, Ceph, ...) via AWS_ENDPOINT_URL.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::{ByteStream, DateTimeFormat};
use aws_sdk_s3::types::StorageClass as S3StorageClass;
use aws_sdk_s3::Client;
use std::env;
use tracing::debug;

use crate::constants::{DEFAULT_REGION, ENV_FORCE_PATH_STYLE, KEY_SEPARATOR};
use crate::object_store::{
    CopyPath, ObjectInfo, ObjectListing, ObjectReader, ObjectStore, PutBody, PutOptions,
};
use crate::storage_class::StorageClass;

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from `.env` and the standard `AWS_*` variables.
    ///
    /// Path-style addressing is on unless `S3BULK_FORCE_PATH_STYLE` is set to
    /// a false value; virtual-hosted buckets don't resolve against most
    /// custom endpoints.
    pub async fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        if env::var("AWS_ACCESS_KEY_ID").is_err() || env::var("AWS_SECRET_ACCESS_KEY").is_err() {
            bail!("Missing AWS_ACCESS_KEY_ID or AWS_SECRET_ACCESS_KEY");
        }

        let region = RegionProviderChain::first_try(env::var("AWS_REGION").ok().map(Region::new))
            .or_default_provider()
            .or_else(Region::new(DEFAULT_REGION));

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);
        if let Ok(endpoint) = env::var("AWS_ENDPOINT_URL") {
            if !endpoint.is_empty() {
                debug!("using custom S3 endpoint {}", endpoint);
                loader = loader.endpoint_url(endpoint);
            }
        }
        let cfg = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&cfg)
            .force_path_style(force_path_style())
            .build();
        Ok(Self::new(Client::from_conf(s3_config)))
    }
}

fn force_path_style() -> bool {
    match env::var(ENV_FORCE_PATH_STYLE) {
        Ok(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"),
        Err(_) => true,
    }
}

fn sdk_storage_class(class: StorageClass) -> S3StorageClass {
    match class {
        StorageClass::Standard => S3StorageClass::Standard,
        other => S3StorageClass::from(other.as_str().to_ascii_uppercase().as_str()),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn list<'a>(&'a self, bucket: &'a str, prefix: &'a str, recursive: bool) -> ObjectListing<'a> {
        Box::pin(async_stream::stream! {
            let mut cont: Option<String> = None;
            loop {
                let mut req = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
                if !recursive {
                    req = req.delimiter(KEY_SEPARATOR.to_string());
                }
                if let Some(token) = &cont {
                    req = req.continuation_token(token);
                }
                let resp = match req.send().await {
                    Ok(resp) => resp,
                    Err(e) => {
                        yield Err(anyhow::Error::new(e)
                            .context(format!("list_objects_v2 failed for s3://{}/{}", bucket, prefix)));
                        break;
                    }
                };

                for obj in resp.contents() {
                    let Some(key) = obj.key() else { continue };
                    yield Ok(ObjectInfo {
                        key: key.to_string(),
                        size: obj.size().unwrap_or(0).max(0) as u64,
                        last_modified: obj
                            .last_modified()
                            .and_then(|t| t.fmt(DateTimeFormat::DateTime).ok()),
                        e_tag: obj.e_tag().map(str::to_string),
                    });
                }
                for cp in resp.common_prefixes() {
                    if let Some(p) = cp.prefix() {
                        yield Ok(ObjectInfo::new(p, 0));
                    }
                }

                match resp.next_continuation_token() {
                    Some(token) => cont = Some(token.to_string()),
                    None => break,
                }
            }
        })
    }

    async fn put(&self, bucket: &str, key: &str, body: PutBody, opts: &PutOptions) -> Result<()> {
        let stream = match body {
            PutBody::File { path, .. } => ByteStream::from_path(&path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?,
            PutBody::Bytes(b) => ByteStream::from(b),
        };

        let mut req = self.client.put_object().bucket(bucket).key(key).body(stream);
        if let Some(ct) = &opts.content_type {
            req = req.content_type(ct);
        }
        if let Some(class) = opts.storage_class {
            req = req.storage_class(sdk_storage_class(class));
        }
        req.send()
            .await
            .with_context(|| format!("put_object failed for s3://{}/{}", bucket, key))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("get_object failed for s3://{}/{}", bucket, key))?;
        Ok(Box::pin(resp.body.into_async_read()))
    }

    async fn copy(&self, src: &CopyPath, dst: &CopyPath, storage_class: Option<StorageClass>) -> Result<()> {
        let mut req = self
            .client
            .copy_object()
            .copy_source(copy_source_for(src))
            .bucket(&dst.bucket_name)
            .key(&dst.object_key);
        if let Some(class) = storage_class {
            req = req.storage_class(sdk_storage_class(class));
        }
        req.send().await.with_context(|| {
            format!(
                "copy_object failed for s3://{}/{} -> s3://{}/{}",
                src.bucket_name, src.object_key, dst.bucket_name, dst.object_key
            )
        })?;
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("delete_object failed for s3://{}/{}", bucket, key))?;
        Ok(())
    }
}

/// `x-amz-copy-source` value: bucket and key, each key segment percent-encoded.
fn copy_source_for(src: &CopyPath) -> String {
    let key: Vec<_> = src.object_key.split(KEY_SEPARATOR).map(urlencoding::encode).collect();
    format!("{}{}{}", src.bucket_name, KEY_SEPARATOR, key.join("/"))
}
