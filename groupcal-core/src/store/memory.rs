//! In-process document store.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use super::state::StoreState;
use super::subscription::SubscriberRegistry;
use super::{BatchOp, CollectionPath, Document, DocumentStore, Filter, OrderBy, Subscription};
use crate::error::{GroupCalError, GroupCalResult};

/// Store that keeps everything in memory. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    subscribers: Arc<SubscriberRegistry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn lock(&self) -> GroupCalResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| GroupCalError::Store("store lock poisoned".into()))
    }

    fn commit(&self, ops: Vec<BatchOp>) -> GroupCalResult<()> {
        let count = ops.len();
        let mut state = self.lock()?;
        let touched = state.apply(ops)?;
        tracing::debug!(ops = count, collections = touched.len(), "committed batch");
        self.subscribers.publish(&state, &touched);
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
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
    async fn create_then_get() {
        let store = MemoryStore::new();
        let id = store.create_document(&events(), json!({ "title": "x" })).await.unwrap();
        let doc = store.get_document(&events(), &id).await.unwrap().unwrap();
        assert_eq!(doc.data["title"], "x");
        assert!(store.get_document(&events(), "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn subscription_sees_initial_and_later_snapshots() {
        let store = MemoryStore::new();
        store.set_document(&events(), "a", json!({ "g": "g1" })).await.unwrap();

        let mut sub = store
            .subscribe(&events(), vec![Filter::equals("g", "g1")])
            .await
            .unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 1);

        store.set_document(&events(), "b", json!({ "g": "g1" })).await.unwrap();
        store.set_document(&events(), "c", json!({ "g": "g2" })).await.unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 2);
        // The g2 write still produces a snapshot, filtered to g1 records.
        assert_eq!(sub.next().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn writes_to_other_collections_do_not_notify() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&events(), vec![]).await.unwrap();
        sub.next().await.unwrap();

        store
            .set_document(&CollectionPath::members("s1"), "u1", json!({}))
            .await
            .unwrap();
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn cancel_and_drop_unregister() {
        let store = MemoryStore::new();
        let first = store.subscribe(&events(), vec![]).await.unwrap();
        let second = store.subscribe(&events(), vec![]).await.unwrap();
        assert_eq!(store.subscriber_count(), 2);

        first.cancel();
        assert_eq!(store.subscriber_count(), 1);
        drop(second);
        assert_eq!(store.subscriber_count(), 0);

        // Writing with nobody listening is fine.
        store.set_document(&events(), "a", json!({})).await.unwrap();
    }

    #[tokio::test]
    async fn failed_batch_is_not_published() {
        let store = MemoryStore::new();
        store.set_document(&events(), "a", json!({})).await.unwrap();
        let mut sub = store.subscribe(&events(), vec![]).await.unwrap();
        sub.next().await.unwrap();

        let result = store
            .atomic_batch(vec![
                BatchOp::Delete { path: events(), id: "a".into() },
                BatchOp::Create { path: events(), id: "a".into(), data: json!({}) },
            ])
            .await;
        // Create sees "a" before the delete is applied.
        assert!(result.is_err());
        assert!(sub.try_next().is_none());
        assert!(store.get_document(&events(), "a").await.unwrap().is_some());
    }
}
