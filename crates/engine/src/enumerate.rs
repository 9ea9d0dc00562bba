//! Key enumeration
//!
//! Turns a reconciliation root into a lazy, single-pass stream of the path
//! identities that exist under it, in ascending relative-key order. Local
//! roots walk the filesystem; remote roots follow paginated prefix listings
//! across continuation tokens. Enumeration never mutates the backend, and
//! each call opens a fresh stream.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use ts_core::{Error, ObjectStore, Result, TreePath};

use crate::walk::LocalWalker;

/// Enumerate every object under `root` as a full path identity.
///
/// A remote prefix with no objects yields an empty stream; a missing local
/// root surfaces its walk error.
pub fn enumerate<'a, S: ObjectStore>(
    store: &'a S,
    root: &TreePath,
) -> BoxStream<'a, Result<TreePath>> {
    tracing::debug!(%root, "enumerating");
    match root {
        TreePath::Local(path) => stream::iter(LocalWalker::new(path))
            .map(|entry| entry.map(TreePath::Local).map_err(Error::from))
            .boxed(),
        TreePath::Remote(loc) => {
            let bucket = loc.bucket.clone();
            let prefix = loc.key.clone();
            // One unfold step per listing page; None token state means the
            // previous page was final.
            stream::try_unfold(Some(None::<String>), move |state| {
                let bucket = bucket.clone();
                let prefix = prefix.clone();
                async move {
                    let Some(token) = state else {
                        return Ok::<_, Error>(None);
                    };
                    let page = store.list_page(&bucket, &prefix, token).await?;
                    let next_state = page.next_token.map(Some);
                    let paths = page
                        .entries
                        .into_iter()
                        .map(move |entry| Ok(TreePath::remote(bucket.clone(), entry.key)));
                    Ok(Some((stream::iter(paths), next_state)))
                }
            })
            .try_flatten()
            .boxed()
        }
    }
}

/// Project a stream of full path identities to relative keys under `root`
pub fn relative_keys<'a>(
    paths: BoxStream<'a, Result<TreePath>>,
    root: &TreePath,
) -> BoxStream<'a, Result<String>> {
    let root = root.clone();
    paths
        .map(move |path| path.and_then(|p| p.relative_to(&root)))
        .boxed()
}
