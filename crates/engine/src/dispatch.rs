//! Execution dispatcher
//!
//! Turns classified actions into backend operations and runs them with
//! bounded concurrency. Copy actions become one operation each; delete
//! actions are grouped into batches no larger than the destination's bulk
//! delete limit (1 for local paths, 1000 for S3). The first failed
//! operation aborts the run; operations already in flight are allowed to
//! finish, and nothing is rolled back.

use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};

use ts_core::{Error, ObjectStore, Result, TreePath};

use crate::reconcile::{Action, ClassifiedAction};

/// One backend mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Copy a single object between two absolute path identities
    Copy {
        /// Where the object lives
        src: TreePath,
        /// Where it goes
        dst: TreePath,
    },
    /// Delete a bounded batch of objects, all of one variant
    DeleteBatch(Vec<TreePath>),
}

struct OpState<'a> {
    actions: BoxStream<'a, Result<ClassifiedAction>>,
    src_root: Option<TreePath>,
    dst_root: TreePath,
    batch_size: usize,
    pending: Vec<TreePath>,
    drained: bool,
}

/// Translate classified actions into operations, batching deletes.
///
/// The final partial delete batch is submitted as-is; an exact multiple of
/// the batch size produces no trailing empty batch. Skips are dropped here.
fn op_stream<'a>(
    actions: BoxStream<'a, Result<ClassifiedAction>>,
    src_root: Option<TreePath>,
    dst_root: TreePath,
) -> impl Stream<Item = Result<Op>> + 'a {
    let batch_size = dst_root.delete_batch_size();
    let state = OpState {
        actions,
        src_root,
        dst_root,
        batch_size,
        pending: Vec::new(),
        drained: false,
    };

    stream::try_unfold(state, |mut st| async move {
        loop {
            if st.drained {
                if st.pending.is_empty() {
                    return Ok(None);
                }
                let batch = std::mem::take(&mut st.pending);
                return Ok(Some((Op::DeleteBatch(batch), st)));
            }

            match st.actions.next().await {
                None => st.drained = true,
                Some(Err(e)) => return Err(e),
                Some(Ok(action)) => match action.action {
                    Action::Skip => {}
                    Action::Copy => {
                        let src_root = st.src_root.as_ref().ok_or_else(|| {
                            Error::General(format!(
                                "copy action for '{}' without a source root",
                                action.key
                            ))
                        })?;
                        let op = Op::Copy {
                            src: src_root.join(&action.key),
                            dst: st.dst_root.join(&action.key),
                        };
                        return Ok(Some((op, st)));
                    }
                    Action::Delete => {
                        st.pending.push(st.dst_root.join(&action.key));
                        if st.pending.len() == st.batch_size {
                            let batch = std::mem::take(&mut st.pending);
                            return Ok(Some((Op::DeleteBatch(batch), st)));
                        }
                    }
                },
            }
        }
    })
}

async fn copy_entry<S: ObjectStore>(store: &S, src: &TreePath, dst: &TreePath) -> Result<()> {
    match (src, dst) {
        (TreePath::Local(path), TreePath::Remote(loc)) => {
            store.upload(path, &loc.bucket, &loc.key).await
        }
        (TreePath::Remote(loc), TreePath::Local(path)) => {
            store.download(&loc.bucket, &loc.key, path).await
        }
        (TreePath::Remote(s), TreePath::Remote(d)) => {
            store.copy_object(&s.bucket, &s.key, &d.bucket, &d.key).await
        }
        (TreePath::Local(_), TreePath::Local(_)) => Err(Error::Unsupported(
            "local to local copy; use a plain filesystem copy".into(),
        )),
    }
}

async fn delete_batch<S: ObjectStore>(store: &S, batch: &[TreePath]) -> Result<()> {
    let Some(first) = batch.first() else {
        return Ok(());
    };
    match first {
        TreePath::Local(_) => {
            for path in batch {
                if let TreePath::Local(p) = path {
                    std::fs::remove_file(p)?;
                }
            }
            Ok(())
        }
        TreePath::Remote(loc) => {
            let keys: Vec<String> = batch
                .iter()
                .filter_map(|p| p.as_remote().map(|r| r.key.clone()))
                .collect();
            store.delete_objects(&loc.bucket, &keys).await
        }
    }
}

/// Execute every non-skip action against the backends.
///
/// At most `concurrency` operations run at once. Returns once all
/// submitted operations have completed, or propagates the first observed
/// failure after letting in-flight operations finish.
pub async fn execute<'a, S: ObjectStore>(
    store: &S,
    actions: BoxStream<'a, Result<ClassifiedAction>>,
    src_root: Option<&TreePath>,
    dst_root: &TreePath,
    concurrency: usize,
) -> Result<()> {
    tracing::debug!(?src_root, %dst_root, concurrency, "dispatching");
    op_stream(actions, src_root.cloned(), dst_root.clone())
        .try_for_each_concurrent(concurrency, |op| async move {
            match op {
                Op::Copy { src, dst } => {
                    tracing::debug!(%src, %dst, "copy");
                    copy_entry(store, &src, &dst).await
                }
                Op::DeleteBatch(batch) => {
                    tracing::debug!(count = batch.len(), "delete batch");
                    delete_batch(store, &batch).await
                }
            }
        })
        .await
}
