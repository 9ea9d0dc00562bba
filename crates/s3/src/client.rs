//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from ts-core.

use std::path::Path;

use async_trait::async_trait;

use ts_core::{Error, ListPage, ObjectEntry, ObjectStore, Result};

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a client from the ambient credential/region chain
    /// (environment, shared config files, instance metadata).
    pub async fn new() -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        Self {
            inner: aws_sdk_s3::Client::new(&config),
        }
    }

    /// Create a client for an S3-compatible endpoint with static credentials.
    ///
    /// Uses path-style addressing, which MinIO and similar servers expect.
    pub async fn connect(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        let credentials = aws_credential_types::Credentials::new(
            access_key.into(),
            secret_key.into(),
            None, // session token
            None, // expiry
            "treesync-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(region.into()))
            .endpoint_url(endpoint.into())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();

        Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        }
    }

    /// Wrap an already-configured SDK client
    pub fn from_client(inner: aws_sdk_s3::Client) -> Self {
        Self { inner }
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

fn map_get_error(err: impl std::fmt::Display, what: impl std::fmt::Display) -> Error {
    let err_str = err.to_string();
    if err_str.contains("NotFound") || err_str.contains("NoSuchKey") {
        Error::NotFound(what.to_string())
    } else {
        Error::Network(err_str)
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<String>,
    ) -> Result<ListPage> {
        let mut request = self.inner.list_objects_v2().bucket(bucket);

        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }

        if let Some(token) = token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let entries = response
            .contents()
            .iter()
            .map(|object| {
                let mut entry = ObjectEntry::new(
                    object.key().unwrap_or_default(),
                    object.size().unwrap_or(0),
                );
                if let Some(modified) = object.last_modified() {
                    entry.last_modified = jiff::Timestamp::from_second(modified.secs()).ok();
                }
                entry
            })
            .collect();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(|s| s.to_string())
        } else {
            None
        };

        Ok(ListPage {
            entries,
            next_token,
        })
    }

    async fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<()> {
        let data = std::fs::read(local)?;
        let body = aws_sdk_s3::primitives::ByteStream::from(data);

        self.inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        tracing::debug!(local = %local.display(), bucket, key, "uploaded");
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str, local: &Path) -> Result<()> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_get_error(e, format!("s3://{bucket}/{key}")))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes();

        if let Some(parent) = local.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(local, &data)?;

        tracing::debug!(bucket, key, local = %local.display(), "downloaded");
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        let copy_source = format!("{src_bucket}/{src_key}");

        self.inner
            .copy_object()
            .copy_source(&copy_source)
            .bucket(dst_bucket)
            .key(dst_key)
            .send()
            .await
            .map_err(|e| map_get_error(e, format!("s3://{src_bucket}/{src_key}")))?;

        tracing::debug!(src_bucket, src_key, dst_bucket, dst_key, "copied");
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        use aws_sdk_s3::types::{Delete, ObjectIdentifier};

        if keys.is_empty() {
            return Ok(());
        }

        let objects = keys
            .iter()
            .map(|k| {
                ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .map_err(|e| Error::General(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.errors().is_empty() {
            let failed: Vec<String> = response
                .errors()
                .iter()
                .filter_map(|e| e.key().map(|k| k.to_string()))
                .collect();
            tracing::warn!(bucket, ?failed, "bulk delete reported failures");
            return Err(Error::BulkDelete { failed });
        }

        tracing::debug!(bucket, count = keys.len(), "deleted batch");
        Ok(())
    }
}
