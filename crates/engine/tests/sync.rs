//! End-to-end reconciliation scenarios against an in-memory object store
//! and temporary directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use treesync::{
    tree_copy, tree_move, tree_rm, tree_sync, Action, Engine, Error, ListPage, ObjectEntry,
    ObjectStore, Result, TreePath,
};

/// BTreeMap-backed object store. Iteration order of the map provides the
/// ascending key order the listing contract requires.
#[derive(Default)]
struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    delete_batches: Mutex<Vec<usize>>,
    /// 0 means everything in one page
    page_size: usize,
    /// Keys this store refuses to delete
    fail_delete_keys: Vec<String>,
}

impl MemoryStore {
    fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    fn put(&self, bucket: &str, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
    }

    fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn batch_sizes(&self) -> Vec<usize> {
        self.delete_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<String>,
    ) -> Result<ListPage> {
        let objects = self.objects.lock().unwrap();
        let page_size = if self.page_size == 0 {
            usize::MAX
        } else {
            self.page_size
        };

        let mut entries: Vec<ObjectEntry> = Vec::new();
        let mut next_token = None;
        for ((b, key), data) in objects.iter() {
            if b != bucket || !key.starts_with(prefix) {
                continue;
            }
            if let Some(t) = &token {
                if key.as_str() <= t.as_str() {
                    continue;
                }
            }
            if entries.len() == page_size {
                next_token = entries.last().map(|e| e.key.clone());
                break;
            }
            entries.push(ObjectEntry::new(key.clone(), data.len() as i64));
        }

        Ok(ListPage {
            entries,
            next_token,
        })
    }

    async fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<()> {
        let data = fs::read(local)?;
        self.put(bucket, key, &data);
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str, local: &Path) -> Result<()> {
        let data = self
            .get(bucket, key)
            .ok_or_else(|| Error::NotFound(format!("s3://{bucket}/{key}")))?;
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(local, data)?;
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        let data = self
            .get(src_bucket, src_key)
            .ok_or_else(|| Error::NotFound(format!("s3://{src_bucket}/{src_key}")))?;
        self.put(dst_bucket, dst_key, &data);
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        self.delete_batches.lock().unwrap().push(keys.len());

        let failed: Vec<String> = keys
            .iter()
            .filter(|k| self.fail_delete_keys.contains(k))
            .cloned()
            .collect();
        if !failed.is_empty() {
            return Err(Error::BulkDelete { failed });
        }

        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(&(bucket.to_string(), key.clone()));
        }
        Ok(())
    }
}

fn touch(root: &Path, rel: &str, data: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, data).unwrap();
}

/// Relative key -> content for every file under a local root
fn local_tree_map(root: &Path) -> BTreeMap<String, Vec<u8>> {
    treesync::LocalWalker::new(root)
        .map(|r| {
            let path = r.unwrap();
            let key = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            (key, fs::read(path).unwrap())
        })
        .collect()
}

async fn classify(
    engine: &Engine<&MemoryStore>,
    src: Option<&TreePath>,
    dst: &TreePath,
    sync: bool,
) -> Vec<(String, Action)> {
    use futures::TryStreamExt;
    engine
        .reconcile_roots(src, dst, sync)
        .map_ok(|a| (a.key, a.action))
        .try_collect()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sync_single_file_into_empty_prefix() {
    let store = MemoryStore::default();
    let src = TempDir::new().unwrap();
    touch(src.path(), "a.txt", b"hello");

    tree_sync(
        &store,
        src.path().to_str().unwrap(),
        "s3://bucket/pre/",
    )
    .await
    .unwrap();

    assert_eq!(store.keys("bucket"), vec!["pre/a.txt"]);
    assert_eq!(store.get("bucket", "pre/a.txt").unwrap(), b"hello");
}

#[tokio::test]
async fn test_sync_classifies_copy_skip_delete() {
    let store = MemoryStore::default();
    store.put("bucket", "pre/b.txt", b"old-b");
    store.put("bucket", "pre/c.txt", b"stale");

    let src = TempDir::new().unwrap();
    touch(src.path(), "a.txt", b"new-a");
    touch(src.path(), "b.txt", b"new-b");

    let src_root = TreePath::local(src.path());
    let dst_root = TreePath::remote("bucket", "pre/");
    let engine = Engine::new(&store);

    let actions = classify(&engine, Some(&src_root), &dst_root, true).await;
    assert_eq!(
        actions,
        vec![
            ("a.txt".to_string(), Action::Copy),
            ("b.txt".to_string(), Action::Skip),
            ("c.txt".to_string(), Action::Delete),
        ]
    );

    engine
        .copy_tree(Some(&src_root), &dst_root, true)
        .await
        .unwrap();

    assert_eq!(store.keys("bucket"), vec!["pre/a.txt", "pre/b.txt"]);
    // skipped by key identity alone: the old content stays
    assert_eq!(store.get("bucket", "pre/b.txt").unwrap(), b"old-b");
}

#[tokio::test]
async fn test_second_sync_is_a_no_op() {
    let store = MemoryStore::default();
    let src = TempDir::new().unwrap();
    touch(src.path(), "a.txt", b"1");
    touch(src.path(), "d/b.txt", b"2");

    let src_root = TreePath::local(src.path());
    let dst_root = TreePath::remote("bucket", "pre/");
    let engine = Engine::new(&store);

    engine
        .copy_tree(Some(&src_root), &dst_root, true)
        .await
        .unwrap();

    let actions = classify(&engine, Some(&src_root), &dst_root, true).await;
    assert_eq!(actions.len(), 2);
    assert!(actions.iter().all(|(_, a)| *a == Action::Skip));
}

#[tokio::test]
async fn test_copy_mode_deletes_nothing() {
    let store = MemoryStore::default();
    store.put("bucket", "pre/stale.txt", b"keep me");

    let src = TempDir::new().unwrap();
    touch(src.path(), "a.txt", b"1");

    tree_copy(&store, src.path().to_str().unwrap(), "s3://bucket/pre/")
        .await
        .unwrap();

    assert_eq!(store.keys("bucket"), vec!["pre/a.txt", "pre/stale.txt"]);
    assert!(store.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_tree_rm_batches_bulk_deletes() {
    let store = MemoryStore::default();
    for i in 0..2500 {
        store.put("bucket", &format!("pre/{i:05}"), b"x");
    }

    tree_rm(&store, "s3://bucket/pre/").await.unwrap();

    assert_eq!(store.batch_sizes(), vec![1000, 1000, 500]);
    assert!(store.keys("bucket").is_empty());
}

#[tokio::test]
async fn test_tree_rm_exact_batch_multiple() {
    let store = MemoryStore::default();
    for i in 0..2000 {
        store.put("bucket", &format!("pre/{i:05}"), b"x");
    }

    tree_rm(&store, "s3://bucket/pre/").await.unwrap();

    assert_eq!(store.batch_sizes(), vec![1000, 1000]);
}

#[tokio::test]
async fn test_round_trip_preserves_content_map() {
    let store = MemoryStore::with_page_size(2);
    let src = TempDir::new().unwrap();
    touch(src.path(), "a.txt", b"alpha");
    touch(src.path(), "sub/b.txt", b"beta");
    touch(src.path(), "sub/deep/c.txt", b"gamma");

    let down = TempDir::new().unwrap();

    tree_sync(&store, src.path().to_str().unwrap(), "s3://bucket/rt/")
        .await
        .unwrap();
    tree_sync(&store, "s3://bucket/rt/", down.path().to_str().unwrap())
        .await
        .unwrap();

    assert_eq!(local_tree_map(src.path()), local_tree_map(down.path()));
}

#[tokio::test]
async fn test_sync_down_deletes_stale_local_files() {
    let store = MemoryStore::default();
    store.put("bucket", "pre/a.txt", b"remote");

    let dst = TempDir::new().unwrap();
    touch(dst.path(), "b.txt", b"stale");

    tree_sync(&store, "s3://bucket/pre/", dst.path().to_str().unwrap())
        .await
        .unwrap();

    let map = local_tree_map(dst.path());
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("a.txt").unwrap(), b"remote");
}

#[tokio::test]
async fn test_remote_to_remote_server_side_copy() {
    let store = MemoryStore::default();
    store.put("bucket", "src/a.txt", b"payload");

    tree_sync(&store, "s3://bucket/src/", "s3://bucket/dst/")
        .await
        .unwrap();

    assert_eq!(store.get("bucket", "dst/a.txt").unwrap(), b"payload");
}

#[tokio::test]
async fn test_tree_move_local_source_is_removed() {
    let store = MemoryStore::default();
    let src = TempDir::new().unwrap();
    let root = src.path().join("tree");
    touch(&root, "a.txt", b"1");
    touch(&root, "sub/b.txt", b"2");

    tree_move(&store, root.to_str().unwrap(), "s3://bucket/moved/")
        .await
        .unwrap();

    assert!(!root.exists());
    assert_eq!(
        store.keys("bucket"),
        vec!["moved/a.txt", "moved/sub/b.txt"]
    );
}

#[tokio::test]
async fn test_tree_move_remote_source_is_emptied() {
    let store = MemoryStore::default();
    store.put("bucket", "from/a.txt", b"1");

    let dst = TempDir::new().unwrap();
    tree_move(&store, "s3://bucket/from/", dst.path().to_str().unwrap())
        .await
        .unwrap();

    assert!(store.keys("bucket").is_empty());
    assert_eq!(local_tree_map(dst.path()).len(), 1);
}

#[tokio::test]
async fn test_bulk_delete_failure_propagates() {
    let store = MemoryStore {
        fail_delete_keys: vec!["pre/poison.txt".to_string()],
        ..MemoryStore::default()
    };
    store.put("bucket", "pre/poison.txt", b"x");

    let result = tree_rm(&store, "s3://bucket/pre/").await;
    match result {
        Err(Error::BulkDelete { failed }) => assert_eq!(failed, vec!["pre/poison.txt"]),
        other => panic!("expected BulkDelete error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_local_source_fails() {
    let store = MemoryStore::default();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let result = tree_sync(&store, missing.to_str().unwrap(), "s3://bucket/pre/").await;
    assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_local_to_local_is_unsupported() {
    let store = MemoryStore::default();
    let src = TempDir::new().unwrap();
    touch(src.path(), "a.txt", b"1");
    let dst = TempDir::new().unwrap();

    let result = tree_copy(
        &store,
        src.path().to_str().unwrap(),
        dst.path().to_str().unwrap(),
    )
    .await;
    assert!(matches!(result, Err(Error::Unsupported(_))));
}
