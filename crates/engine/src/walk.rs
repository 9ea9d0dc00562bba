//! Recursive directory walk in relative-key order
//!
//! The reconciliation merge requires each input sequence to be sorted by
//! relative key. S3 listings already arrive in ascending byte order, so the
//! local walk has to produce the same total order: sibling entries are
//! sorted with a `/` appended to directory names, because that is the byte
//! every descendant key carries at that position. Sorting plain names would
//! put `foo/x` before `foo-bar` and silently corrupt the diff.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

enum WalkItem {
    File(PathBuf),
    Dir(PathBuf),
}

/// Lazy depth-first iterator over the files under a local root.
///
/// Yields full paths whose relative keys (see
/// [`TreePath::relative_to`](ts_core::TreePath::relative_to)) come out in
/// ascending byte order. Directories themselves are not yielded. A missing
/// or unreadable directory surfaces its `io::Error` and ends the walk.
/// Symbolic links are treated as files; link cycles are not guarded against.
pub struct LocalWalker {
    stack: Vec<std::vec::IntoIter<WalkItem>>,
    failed: bool,
}

impl LocalWalker {
    /// Start a walk at `root`. The directory is not touched until the
    /// first call to `next`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            stack: vec![vec![WalkItem::Dir(root.into())].into_iter()],
            failed: false,
        }
    }

    fn read_dir_sorted(dir: &Path) -> io::Result<Vec<WalkItem>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let is_dir = entry.file_type()?.is_dir();
            let mut order_key = entry.file_name().to_string_lossy().into_owned();
            if is_dir {
                order_key.push('/');
            }
            entries.push((order_key, is_dir, entry.path()));
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(entries
            .into_iter()
            .map(|(_, is_dir, path)| {
                if is_dir {
                    WalkItem::Dir(path)
                } else {
                    WalkItem::File(path)
                }
            })
            .collect())
    }
}

impl Iterator for LocalWalker {
    type Item = io::Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(WalkItem::File(path)) => return Some(Ok(path)),
                Some(WalkItem::Dir(path)) => match Self::read_dir_sorted(&path) {
                    Ok(items) => self.stack.push(items.into_iter()),
                    Err(e) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                },
            }
        }
    }
}
