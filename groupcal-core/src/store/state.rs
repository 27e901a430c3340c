//! In-memory document table shared by the store implementations.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BatchOp, CollectionPath, Document, Filter, OrderBy};
use crate::error::{GroupCalError, GroupCalResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoreState {
    #[serde(default)]
    collections: BTreeMap<String, BTreeMap<String, Value>>,
}

impl StoreState {
    pub fn get(&self, path: &CollectionPath, id: &str) -> Option<Document> {
        self.collections
            .get(path.as_str())?
            .get(id)
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            })
    }

    pub fn contains(&self, path: &CollectionPath, id: &str) -> bool {
        self.collections
            .get(path.as_str())
            .is_some_and(|c| c.contains_key(id))
    }

    /// Matching documents, in id order unless `order` says otherwise.
    pub fn query(
        &self,
        path: &CollectionPath,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Vec<Document> {
        let Some(collection) = self.collections.get(path.as_str()) else {
            return Vec::new();
        };

        let mut docs: Vec<Document> = collection
            .iter()
            .filter(|(_, data)| filters.iter().all(|f| f.matches(data)))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect();

        if let Some(order) = order {
            docs.sort_by(|a, b| order.compare(a, b));
        }
        docs
    }

    /// Validate every op, then apply them all. Nothing is changed on error.
    /// Returns the collections that were written to.
    pub fn apply(&mut self, ops: Vec<BatchOp>) -> GroupCalResult<BTreeSet<CollectionPath>> {
        let mut created: BTreeSet<(CollectionPath, String)> = BTreeSet::new();
        for op in &ops {
            match op {
                BatchOp::Create { path, id, data } => {
                    ensure_object(path, data)?;
                    let key = (path.clone(), id.clone());
                    if self.contains(path, id) || created.contains(&key) {
                        return Err(GroupCalError::Store(format!(
                            "Document '{id}' already exists in '{path}'"
                        )));
                    }
                    created.insert(key);
                }
                BatchOp::Set { path, data, .. } => ensure_object(path, data)?,
                BatchOp::Delete { .. } => {}
            }
        }

        let mut touched = BTreeSet::new();
        for op in ops {
            match op {
                BatchOp::Create { path, id, data } | BatchOp::Set { path, id, data } => {
                    self.collections
                        .entry(path.as_str().to_string())
                        .or_default()
                        .insert(id, data);
                    touched.insert(path);
                }
                BatchOp::Delete { path, id } => {
                    if let Some(collection) = self.collections.get_mut(path.as_str()) {
                        collection.remove(&id);
                        if collection.is_empty() {
                            self.collections.remove(path.as_str());
                        }
                    }
                    touched.insert(path);
                }
            }
        }
        Ok(touched)
    }

    /// Collections whose contents differ between `self` and `other`.
    pub fn changed_collections(&self, other: &StoreState) -> BTreeSet<CollectionPath> {
        self.collections
            .keys()
            .chain(other.collections.keys())
            .filter(|name| self.collections.get(*name) != other.collections.get(*name))
            .map(|name| CollectionPath::new(name))
            .collect()
    }
}

fn ensure_object(path: &CollectionPath, data: &Value) -> GroupCalResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(GroupCalError::Store(format!(
            "Documents in '{path}' must be JSON objects"
        )))
    }
}
