//! ts-core: Core primitives for the treesync reconciliation engine
//!
//! This crate provides the backend-independent pieces of treesync:
//! - Error taxonomy
//! - Path identities (local filesystem paths and s3://bucket/key locations)
//! - The ObjectStore trait describing the remote backend contract
//!
//! This crate is designed to be independent of any specific S3 SDK,
//! allowing the reconciliation engine to be tested against in-memory
//! backends.

pub mod error;
pub mod path;
pub mod store;

pub use error::{Error, Result};
pub use path::{parse_path, RemoteLocation, TreePath, S3_DELETE_BATCH};
pub use store::{ListPage, ObjectEntry, ObjectStore};
