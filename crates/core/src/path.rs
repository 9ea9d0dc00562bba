//! Path identities
//!
//! A reconciliation root or object lives in one of two addressing schemes:
//! a local filesystem path, or an s3://bucket/key location. Both are
//! represented by [`TreePath`], which supplies the relative-key and join
//! operations the reconciliation engine is built on.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Maximum number of keys one S3 bulk-delete request accepts
pub const S3_DELETE_BATCH: usize = 1000;

/// A location inside an S3-compatible backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    /// Bucket name, immutable once constructed
    pub bucket: String,
    /// Object key or prefix; `/` is the only hierarchy delimiter.
    /// Empty denotes the bucket root.
    pub key: String,
}

impl RemoteLocation {
    /// Create a new RemoteLocation
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// A backend-tagged address: local filesystem path or remote bucket+key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreePath {
    /// Local filesystem path, native separator encoded
    Local(PathBuf),
    /// Remote S3 location
    Remote(RemoteLocation),
}

impl TreePath {
    /// Create a remote path
    pub fn remote(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        TreePath::Remote(RemoteLocation::new(bucket, key))
    }

    /// Create a local path
    pub fn local(path: impl Into<PathBuf>) -> Self {
        TreePath::Local(path.into())
    }

    /// Check if this is a remote path
    pub fn is_remote(&self) -> bool {
        matches!(self, TreePath::Remote(_))
    }

    /// Get the remote location if this is a remote path
    pub fn as_remote(&self) -> Option<&RemoteLocation> {
        match self {
            TreePath::Remote(r) => Some(r),
            TreePath::Local(_) => None,
        }
    }

    /// Get the local path if this is a local path
    pub fn as_local(&self) -> Option<&PathBuf> {
        match self {
            TreePath::Local(p) => Some(p),
            TreePath::Remote(_) => None,
        }
    }

    /// Compute this identity's relative key under `root`.
    ///
    /// The result is `/`-delimited with no leading delimiter. Fails with
    /// [`Error::IncompatibleRoot`] when the variants or buckets differ, and
    /// with [`Error::InvalidPath`] when `self` is not reachable under `root`.
    pub fn relative_to(&self, root: &TreePath) -> Result<String> {
        match (self, root) {
            (TreePath::Local(path), TreePath::Local(root_path)) => {
                let rel = path.strip_prefix(root_path).map_err(|_| {
                    Error::InvalidPath(format!(
                        "{} is not under {}",
                        path.display(),
                        root_path.display()
                    ))
                })?;
                let mut key = rel.to_string_lossy().into_owned();
                if std::path::MAIN_SEPARATOR != '/' {
                    key = key.replace(std::path::MAIN_SEPARATOR, "/");
                }
                Ok(key)
            }
            (TreePath::Remote(loc), TreePath::Remote(root_loc)) => {
                if loc.bucket != root_loc.bucket {
                    return Err(Error::IncompatibleRoot(format!(
                        "bucket {} vs {}",
                        loc.bucket, root_loc.bucket
                    )));
                }
                let not_under = || {
                    Error::InvalidPath(format!("{} is not under {}", loc.key, root_loc.key))
                };
                let rest = loc.key.strip_prefix(&root_loc.key).ok_or_else(not_under)?;
                if root_loc.key.is_empty() || root_loc.key.ends_with('/') || rest.is_empty() {
                    Ok(rest.to_string())
                } else {
                    // Root has no trailing delimiter; the next byte must be one,
                    // otherwise "dir-old/f" would count as under "dir".
                    rest.strip_prefix('/')
                        .map(str::to_string)
                        .ok_or_else(not_under)
                }
            }
            (a, b) => Err(Error::IncompatibleRoot(format!(
                "cannot relativize {a} against {b}"
            ))),
        }
    }

    /// Join a `/`-delimited relative key onto this root, producing a new
    /// identity of the same variant. Inverse of [`TreePath::relative_to`].
    pub fn join(&self, relative: &str) -> TreePath {
        match self {
            TreePath::Local(path) => {
                let native = if std::path::MAIN_SEPARATOR == '/' {
                    relative.to_string()
                } else {
                    relative.replace('/', std::path::MAIN_SEPARATOR_STR)
                };
                TreePath::Local(path.join(native))
            }
            TreePath::Remote(loc) => {
                let key = if loc.key.is_empty() || loc.key.ends_with('/') {
                    format!("{}{relative}", loc.key)
                } else {
                    format!("{}/{relative}", loc.key)
                };
                TreePath::remote(&loc.bucket, key)
            }
        }
    }

    /// Maximum number of objects one delete call against this backend accepts
    pub fn delete_batch_size(&self) -> usize {
        match self {
            TreePath::Local(_) => 1,
            TreePath::Remote(_) => S3_DELETE_BATCH,
        }
    }
}

impl std::fmt::Display for TreePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreePath::Local(path) => write!(f, "{}", path.display()),
            TreePath::Remote(loc) => write!(f, "s3://{}/{}", loc.bucket, loc.key),
        }
    }
}

/// Parse an address string into a TreePath
///
/// `s3://bucket/key` selects the remote variant; the key may be empty,
/// denoting the bucket root. Anything else is a local path.
pub fn parse_path(path: &str) -> Result<TreePath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    let Some(rest) = path.strip_prefix("s3://") else {
        return Ok(TreePath::Local(PathBuf::from(path)));
    };

    let (bucket, key) = match rest.split_once('/') {
        Some((bucket, key)) => (bucket, key),
        None => (rest, ""),
    };

    if bucket.is_empty() {
        return Err(Error::InvalidPath(format!(
            "Bucket name cannot be empty: '{path}'"
        )));
    }

    Ok(TreePath::remote(bucket, key))
}
