//! Whole-tree operations
//!
//! Wires enumeration, reconciliation, and dispatch into the tree-level
//! calls: one-way sync, superimposing copy, recursive delete, and move.
//! All-or-error contract: when a call returns `Ok(())` the destination
//! holds exactly the source's relative keys (sync) or the source's keys on
//! top of its prior contents (copy); on error, work already executed is
//! not rolled back.

use futures::stream::{self, BoxStream, StreamExt};

use ts_core::{parse_path, ObjectStore, Result, TreePath};

use crate::dispatch::execute;
use crate::enumerate::{enumerate, relative_keys};
use crate::reconcile::{reconcile, ClassifiedAction};

/// Default width of the worker pool executing backend operations
pub const DEFAULT_CONCURRENCY: usize = 25;

/// Tree reconciliation engine over one object store
pub struct Engine<S> {
    store: S,
    concurrency: usize,
}

impl<S: ObjectStore> Engine<S> {
    /// Create an engine with the default concurrency
    pub fn new(store: S) -> Self {
        Self {
            store,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Override the number of operations allowed in flight at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Get the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Classify every relative key across the two roots without touching
    /// the destination.
    ///
    /// An absent `src_root` stands for an empty source (full-tree
    /// deletion); `sync == false` leaves the destination unenumerated, so
    /// nothing is ever skipped or deleted.
    pub fn reconcile_roots<'a>(
        &'a self,
        src_root: Option<&TreePath>,
        dst_root: &TreePath,
        sync: bool,
    ) -> BoxStream<'a, Result<ClassifiedAction>> {
        let src_keys = match src_root {
            Some(root) => relative_keys(enumerate(&self.store, root), root),
            None => stream::empty().boxed(),
        };
        let dst_keys = if sync {
            relative_keys(enumerate(&self.store, dst_root), dst_root)
        } else {
            stream::empty().boxed()
        };
        reconcile(src_keys, dst_keys)
    }

    /// Reconcile and execute: make `dst_root` match `src_root` (sync) or
    /// superimpose the source onto it (copy).
    pub async fn copy_tree(
        &self,
        src_root: Option<&TreePath>,
        dst_root: &TreePath,
        sync: bool,
    ) -> Result<()> {
        tracing::info!(?src_root, %dst_root, sync, "copy tree");
        let actions = self.reconcile_roots(src_root, dst_root, sync);
        execute(&self.store, actions, src_root, dst_root, self.concurrency).await
    }
}

/// One-way sync: make `dst` contain exactly the relative keys of `src`.
///
/// Keys present on both sides are skipped by key identity alone; content
/// and timestamps are never compared.
pub async fn tree_sync<S: ObjectStore>(store: &S, src: &str, dst: &str) -> Result<()> {
    let src_path = parse_path(src)?;
    let dst_path = parse_path(dst)?;
    Engine::new(store)
        .copy_tree(Some(&src_path), &dst_path, true)
        .await
}

/// Copy: superimpose the keys of `src` onto `dst`, deleting nothing
pub async fn tree_copy<S: ObjectStore>(store: &S, src: &str, dst: &str) -> Result<()> {
    let src_path = parse_path(src)?;
    let dst_path = parse_path(dst)?;
    Engine::new(store)
        .copy_tree(Some(&src_path), &dst_path, false)
        .await
}

/// Recursively delete every object under `path`
pub async fn tree_rm<S: ObjectStore>(store: &S, path: &str) -> Result<()> {
    let dst_path = parse_path(path)?;
    Engine::new(store).copy_tree(None, &dst_path, true).await
}

/// Move: copy `src` to `dst`, then delete the source tree.
///
/// Never atomic; a failure between the two phases leaves both trees
/// populated. A local source is removed directories included, a remote
/// source is emptied through the engine.
pub async fn tree_move<S: ObjectStore>(store: &S, src: &str, dst: &str) -> Result<()> {
    tree_copy(store, src, dst).await?;

    let src_path = parse_path(src)?;
    match &src_path {
        TreePath::Remote(_) => Engine::new(store).copy_tree(None, &src_path, true).await,
        TreePath::Local(path) => Ok(std::fs::remove_dir_all(path)?),
    }
}
