//! Document store persisted to a JSON file.
//!
//! The whole document set is rewritten on every commit: serialized to a
//! unique temp file in the same directory, then renamed over the real file,
//! so a crash or failed write leaves the previous contents in place.
//!
//! Every handle, in this process or another, takes an exclusive lock on
//! `<file>.lock` around each read-apply-save sequence.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use fs2::FileExt;
use serde_json::Value;
use tempfile::NamedTempFile;

use super::state::StoreState;
use super::subscription::SubscriberRegistry;
use super::{BatchOp, CollectionPath, Document, DocumentStore, Filter, OrderBy, Subscription};
use crate::error::{GroupCalError, GroupCalResult};

/// File name used inside a data directory.
pub const STORE_FILE: &str = "groupcal.json";

/// Holds the cross-process lock until dropped.
struct FileLock {
    _file: File,
}

#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    state: Arc<Mutex<StoreState>>,
    subscribers: Arc<SubscriberRegistry>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> GroupCalResult<Self> {
        let path = path.into();
        let state = read_state(&path)?;
        tracing::debug!(path = %path.display(), "opened file store");

        Ok(FileStore {
            path,
            state: Arc::new(Mutex::new(state)),
            subscribers: Arc::new(SubscriberRegistry::default()),
        })
    }

    /// Open `STORE_FILE` inside `dir`, creating the directory if needed.
    pub fn open_in(dir: &Path) -> GroupCalResult<Self> {
        std::fs::create_dir_all(dir)?;
        Self::open(dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    fn lock(&self) -> GroupCalResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| GroupCalError::Store("store lock poisoned".into()))
    }

    /// Block until no other handle is reading or writing the file.
    fn lock_file(&self) -> GroupCalResult<FileLock> {
        let path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| GroupCalError::Store(format!("Could not open {}: {e}", path.display())))?;

        file.lock_exclusive()
            .map_err(|e| GroupCalError::Store(format!("Could not lock {}: {e}", path.display())))?;

        Ok(FileLock { _file: file })
    }

    fn save(&self, state: &StoreState) -> GroupCalResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let content = serde_json::to_string_pretty(state)?;

        NamedTempFile::new_in(dir)
            .and_then(|mut temp| {
                temp.write_all(content.as_bytes())?;
                temp.persist(&self.path).map_err(|e| e.error)?;
                Ok(())
            })
            .map_err(|e| {
                GroupCalError::Store(format!("Could not write {}: {e}", self.path.display()))
            })
    }

    /// Pick up writes made to the file by another process, notifying
    /// subscribers of every collection that changed. Returns whether
    /// anything did.
    pub fn reload(&self) -> GroupCalResult<bool> {
        let mut state = self.lock()?;
        let on_disk = {
            let _guard = self.lock_file()?;
            read_state(&self.path)?
        };

        let touched = state.changed_collections(&on_disk);
        if touched.is_empty() {
            return Ok(false);
        }
        *state = on_disk;

        tracing::debug!(collections = touched.len(), path = %self.path.display(), "reloaded");
        self.subscribers.publish(&state, &touched);
        Ok(true)
    }

    /// Apply to the latest file contents, persist, and only then make the
    /// result current. The file lock is held from the read to the rename.
    fn commit(&self, ops: Vec<BatchOp>) -> GroupCalResult<()> {
        let count = ops.len();
        let mut state = self.lock()?;

        let (next, touched) = {
            let _guard = self.lock_file()?;
            let mut next = read_state(&self.path)?;
            let mut touched = state.changed_collections(&next);
            touched.extend(next.apply(ops)?);
            self.save(&next)?;
            (next, touched)
        };
        *state = next;

        tracing::debug!(ops = count, path = %self.path.display(), "committed batch");
        self.subscribers.publish(&state, &touched);
        Ok(())
    }
}

fn read_state(path: &Path) -> GroupCalResult<StoreState> {
    if !path.exists() {
        return Ok(StoreState::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| GroupCalError::Store(format!("Could not read {}: {e}", path.display())))
}

impl DocumentStore for FileStore {
    async fn get_document(&self, path: &CollectionPath, id: &str) -> GroupCalResult<Option<Document>> {
        Ok(self.lock()?.get(path, id))
    }

    async fn query_collection(
        &self,
        path: &CollectionPath,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> GroupCalResult<Vec<Document>> {
        Ok(self.lock()?.query(path, filters, order))
    }

    async fn subscribe(&self, path: &CollectionPath, filters: Vec<Filter>) -> GroupCalResult<Subscription> {
        let state = self.lock()?;
        self.subscribers.register(&state, path, filters)
    }

    async fn create_document(&self, path: &CollectionPath, data: Value) -> GroupCalResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.commit(vec![BatchOp::Create {
            path: path.clone(),
            id: id.clone(),
            data,
        }])?;
        Ok(id)
    }

    async fn set_document(&self, path: &CollectionPath, id: &str, data: Value) -> GroupCalResult<()> {
        self.commit(vec![BatchOp::Set {
            path: path.clone(),
            id: id.to_string(),
            data,
        }])
    }

    async fn delete_document(&self, path: &CollectionPath, id: &str) -> GroupCalResult<()> {
        self.commit(vec![BatchOp::Delete {
            path: path.clone(),
            id: id.to_string(),
        }])
    }

    async fn atomic_batch(&self, ops: Vec<BatchOp>) -> GroupCalResult<()> {
        self.commit(ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn events() -> CollectionPath {
        CollectionPath::events("s1")
    }

    #[tokio::test]
    async fn documents_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open_in(dir.path()).unwrap();
        store
            .atomic_batch(vec![
                BatchOp::Create { path: events(), id: "a".into(), data: json!({ "n": 1 }) },
                BatchOp::Create { path: events(), id: "b".into(), data: json!({ "n": 2 }) },
            ])
            .await
            .unwrap();
        store.delete_document(&events(), "a").await.unwrap();

        let reopened = FileStore::open_in(dir.path()).unwrap();
        let docs = reopened.query_collection(&events(), &[], None).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "b");
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .filter(|name| name != STORE_FILE && name != "groupcal.json.lock")
            .collect::<Vec<_>>();
        assert!(leftovers.is_empty(), "stray files: {leftovers:?}");
    }

    #[tokio::test]
    async fn rejected_batch_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open_in(dir.path()).unwrap();
        store.set_document(&events(), "a", json!({})).await.unwrap();

        let result = store
            .atomic_batch(vec![
                BatchOp::Create { path: events(), id: "b".into(), data: json!({}) },
                BatchOp::Create { path: events(), id: "a".into(), data: json!({}) },
            ])
            .await;
        assert!(result.is_err());

        let reopened = FileStore::open_in(dir.path()).unwrap();
        assert!(reopened.get_document(&events(), "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_commit_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let store = FileStore::open_in(&data).unwrap();
        store.set_document(&events(), "a", json!({})).await.unwrap();

        // The data directory vanishing makes the next commit fail.
        std::fs::remove_dir_all(&data).unwrap();
        let err = store.set_document(&events(), "b", json!({})).await.unwrap_err();
        assert!(matches!(err, GroupCalError::Store(_)));
        assert!(store.get_document(&events(), "b").await.unwrap().is_none());
        assert!(store.get_document(&events(), "a").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_handles_keep_every_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut writers = Vec::new();
        for writer in 0..4 {
            let store = FileStore::open_in(dir.path()).unwrap();
            writers.push(tokio::spawn(async move {
                for n in 0..50 {
                    let id = format!("w{writer}-{n}");
                    store.set_document(&events(), &id, json!({ "n": n })).await.unwrap();
                }
            }));
        }
        for writer in writers {
            writer.await.unwrap();
        }

        let reopened = FileStore::open_in(dir.path()).unwrap();
        let docs = reopened.query_collection(&events(), &[], None).await.unwrap();
        assert_eq!(docs.len(), 200);
    }

    #[tokio::test]
    async fn reload_sees_writes_from_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = FileStore::open_in(dir.path()).unwrap();
        let writer = FileStore::open_in(dir.path()).unwrap();

        let mut sub = watcher.subscribe(&events(), vec![]).await.unwrap();
        assert!(sub.next().await.unwrap().is_empty());
        assert!(!watcher.reload().unwrap());

        writer.set_document(&events(), "a", json!({ "n": 1 })).await.unwrap();
        assert!(watcher.reload().unwrap());
        assert_eq!(sub.next().await.unwrap().len(), 1);
        assert!(!watcher.reload().unwrap());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STORE_FILE), "not json").unwrap();
        let err = FileStore::open_in(dir.path()).err().unwrap();
        assert!(matches!(err, GroupCalError::Store(_)));
    }
}
