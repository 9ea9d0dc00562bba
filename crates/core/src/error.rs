//! Error types for ts-core
//!
//! One unified error type covers address parsing, enumeration, and
//! backend operation failures. No retries happen at this level; every
//! error is surfaced to the caller of the top-level tree operation.

use thiserror::Error;

/// Result type alias for treesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for treesync operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed address string
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Relative-key computation across mismatched variants or buckets
    #[error("Incompatible root: {0}")]
    IncompatibleRoot(String),

    /// Local filesystem error (walk, read, write, unlink)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote backend error (listing, transfer)
    #[error("Network error: {0}")]
    Network(String),

    /// Remote object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bulk-delete response reported per-key failures
    #[error("Bulk delete failed for {} key(s): {}", .failed.len(), .failed.join(", "))]
    BulkDelete {
        /// Keys the backend refused to delete
        failed: Vec<String>,
    },

    /// Operation not supported by this engine
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// General error
    #[error("{0}")]
    General(String),
}
