//! Streaming reconciliation
//!
//! Merges two ascending relative-key streams (source and destination) and
//! classifies every distinct key: present on both sides means skip, source
//! only means copy, destination only means delete. Both inputs must be
//! individually sorted, which the enumerators guarantee; equal keys are then
//! always adjacent in the merge, so one forward pass with O(m+n)
//! comparisons classifies everything without materializing either key set.

use std::cmp::Ordering;
use std::pin::Pin;

use futures::stream::{self, BoxStream, Peekable, Stream, StreamExt};

use ts_core::{Error, Result};

/// Verdict for one relative key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Present on both sides; nothing to do
    Skip,
    /// Present only on the source; copy it to the destination
    Copy,
    /// Present only on the destination; delete it
    Delete,
}

/// A relative key paired with its verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedAction {
    /// `/`-delimited relative key
    pub key: String,
    /// What the dispatcher should do with it
    pub action: Action,
}

impl ClassifiedAction {
    fn new(key: String, action: Action) -> Self {
        Self { key, action }
    }
}

type KeyStream<'a> = Pin<Box<Peekable<BoxStream<'a, Result<String>>>>>;

/// Peek the next key without consuming it; a buffered error is consumed
/// and propagated.
async fn peek_key<St>(mut stream: Pin<&mut Peekable<St>>) -> Result<Option<String>>
where
    St: Stream<Item = Result<String>>,
{
    match stream.as_mut().peek().await {
        None => Ok(None),
        Some(Ok(key)) => Ok(Some(key.clone())),
        Some(Err(_)) => match stream.next().await {
            Some(Err(e)) => Err(e),
            // peek() just resolved this item to an error
            _ => Err(Error::General("key stream lost a buffered item".into())),
        },
    }
}

/// Consume the peeked occurrence of `key` plus any adjacent duplicates of
/// it from the same stream. A key listed twice by one origin counts once.
async fn advance_past<St>(mut stream: Pin<&mut Peekable<St>>, key: &str)
where
    St: Stream<Item = Result<String>>,
{
    let _ = stream.next().await;
    loop {
        let duplicate = matches!(stream.as_mut().peek().await, Some(Ok(next)) if next == key);
        if !duplicate {
            return;
        }
        let _ = stream.next().await;
    }
}

/// Merge two ascending relative-key streams into one ascending stream of
/// classified actions, one per distinct key.
pub fn reconcile<'a>(
    src: BoxStream<'a, Result<String>>,
    dst: BoxStream<'a, Result<String>>,
) -> BoxStream<'a, Result<ClassifiedAction>> {
    let src: KeyStream<'a> = Box::pin(src.peekable());
    let dst: KeyStream<'a> = Box::pin(dst.peekable());

    stream::try_unfold((src, dst), |(mut src, mut dst)| async move {
        let src_key = peek_key(src.as_mut()).await?;
        let dst_key = peek_key(dst.as_mut()).await?;

        let action = match (src_key, dst_key) {
            (None, None) => None,
            (Some(key), None) => {
                advance_past(src.as_mut(), &key).await;
                Some(ClassifiedAction::new(key, Action::Copy))
            }
            (None, Some(key)) => {
                advance_past(dst.as_mut(), &key).await;
                Some(ClassifiedAction::new(key, Action::Delete))
            }
            (Some(s), Some(d)) => match s.cmp(&d) {
                Ordering::Less => {
                    advance_past(src.as_mut(), &s).await;
                    Some(ClassifiedAction::new(s, Action::Copy))
                }
                Ordering::Greater => {
                    advance_past(dst.as_mut(), &d).await;
                    Some(ClassifiedAction::new(d, Action::Delete))
                }
                Ordering::Equal => {
                    advance_past(src.as_mut(), &s).await;
                    advance_past(dst.as_mut(), &s).await;
                    Some(ClassifiedAction::new(s, Action::Skip))
                }
            },
        };

        Ok(action.map(|a| {
            tracing::debug!(key = %a.key, action = ?a.action, "classified");
            (a, (src, dst))
        }))
    })
    .boxed()
}
