//! ObjectStore trait definition
//!
//! This trait defines the backend contract the reconciliation engine
//! requires from a remote object store: paginated ascending-ordered
//! listing, single-object transfers, server-side copy, and bounded bulk
//! deletion. It allows the engine to be decoupled from the specific S3
//! SDK implementation and tested against in-memory backends.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One listed object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Full object key
    pub key: String,

    /// Size in bytes
    pub size: i64,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,
}

impl ObjectEntry {
    /// Create a new ObjectEntry
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Entries in ascending key order
    pub entries: Vec<ObjectEntry>,

    /// Continuation token; `Some` means the listing is truncated
    pub next_token: Option<String>,
}

/// Backend contract for a remote object store
///
/// Listing must return keys in ascending lexicographic order for a given
/// prefix, the order the streaming merge in the reconciliation engine
/// relies on. A prefix with no objects yields an empty page, not an error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one listing page for `prefix`, continuing from `token`
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<String>,
    ) -> Result<ListPage>;

    /// Upload a local file to `bucket`/`key`
    async fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<()>;

    /// Download `bucket`/`key` to a local file, creating missing parent
    /// directories of `local`
    async fn download(&self, bucket: &str, key: &str, local: &Path) -> Result<()>;

    /// Server-side copy of one object
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()>;

    /// Delete up to [`S3_DELETE_BATCH`](crate::S3_DELETE_BATCH) keys in one
    /// request. Per-key failures reported by the backend are aggregated into
    /// [`Error::BulkDelete`](crate::Error::BulkDelete).
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<String>,
    ) -> Result<ListPage> {
        (**self).list_page(bucket, prefix, token).await
    }

    async fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<()> {
        (**self).upload(local, bucket, key).await
    }

    async fn download(&self, bucket: &str, key: &str, local: &Path) -> Result<()> {
        (**self).download(bucket, key, local).await
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        (**self)
            .copy_object(src_bucket, src_key, dst_bucket, dst_key)
            .await
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        (**self).delete_objects(bucket, keys).await
    }
}
