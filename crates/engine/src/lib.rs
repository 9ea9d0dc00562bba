//! treesync: tree reconciliation between local directories and S3 prefixes
//!
//! Diffs two hierarchical key spaces (a local directory tree or an S3
//! prefix) into a minimal set of copy and delete operations, then executes
//! them with bounded concurrency. The building blocks:
//!
//! - [`enumerate`]: lazily lists every object under a root in ascending
//!   relative-key order
//! - [`reconcile`]: streaming merge-diff of two key sequences into
//!   skip/copy/delete verdicts
//! - [`dispatch::execute`]: runs the resulting operations against the
//!   backends, batching bulk deletes and failing on the first error
//! - [`tree_sync`] / [`tree_copy`] / [`tree_rm`] / [`tree_move`]: the
//!   whole-tree operations built from those pieces
//!
//! ```no_run
//! # async fn demo() -> treesync::Result<()> {
//! let store = treesync::S3Client::new().await;
//! treesync::tree_sync(&store, "/data/photos", "s3://backup/photos/").await?;
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod enumerate;
pub mod ops;
pub mod reconcile;
pub mod walk;

pub use enumerate::{enumerate, relative_keys};
pub use ops::{tree_copy, tree_move, tree_rm, tree_sync, Engine, DEFAULT_CONCURRENCY};
pub use reconcile::{reconcile, Action, ClassifiedAction};
pub use walk::LocalWalker;

pub use ts_core::{
    parse_path, Error, ListPage, ObjectEntry, ObjectStore, RemoteLocation, Result, TreePath,
    S3_DELETE_BATCH,
};
pub use ts_s3::S3Client;
