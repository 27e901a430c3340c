//! Document store boundary.
//!
//! Records live in collections addressed by slash-separated paths
//! (`schedules`, `schedules/{id}/members`, `schedules/{id}/events`, `users`).
//! Each document is a JSON object keyed by id. Multi-record writes go through
//! [`DocumentStore::atomic_batch`], which applies every op or none of them.
//!
//! Two implementations ship with the crate: [`MemoryStore`] for tests and
//! embedding, and [`FileStore`], which persists everything to a single JSON
//! file.

mod file;
mod memory;
mod state;
mod subscription;

use std::cmp::Ordering;
use std::fmt;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{SCHEDULES_COLLECTION, USERS_COLLECTION};
use crate::error::GroupCalResult;

pub use file::{FileStore, STORE_FILE};
pub use memory::MemoryStore;
pub use subscription::Subscription;

/// Path of a collection, e.g. `schedules/abc/events`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: &str) -> Self {
        CollectionPath(path.trim_matches('/').to_string())
    }

    pub fn schedules() -> Self {
        CollectionPath::new(SCHEDULES_COLLECTION)
    }

    pub fn users() -> Self {
        CollectionPath::new(USERS_COLLECTION)
    }

    pub fn members(schedule_id: &str) -> Self {
        CollectionPath(format!("{SCHEDULES_COLLECTION}/{schedule_id}/members"))
    }

    pub fn events(schedule_id: &str) -> Self {
        CollectionPath(format!("{SCHEDULES_COLLECTION}/{schedule_id}/events"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored record and its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Deserialize the record, filling in `id` from the document key if the
    /// data does not carry one.
    pub fn decode<T: DeserializeOwned>(&self) -> GroupCalResult<T> {
        let mut data = self.data.clone();
        if let Value::Object(map) = &mut data {
            map.entry("id")
                .or_insert_with(|| Value::String(self.id.clone()));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// Serialize a record for storage.
pub fn encode<T: Serialize>(record: &T) -> GroupCalResult<Value> {
    Ok(serde_json::to_value(record)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Field comparison applied to the top-level fields of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn equals(field: &str, value: impl Into<Value>) -> Self {
        Filter::new(field, FilterOp::Eq, value)
    }

    pub fn ge(field: &str, value: impl Into<Value>) -> Self {
        Filter::new(field, FilterOp::Ge, value)
    }

    pub fn le(field: &str, value: impl Into<Value>) -> Self {
        Filter::new(field, FilterOp::Le, value)
    }

    /// A missing field never matches.
    pub fn matches(&self, data: &Value) -> bool {
        let Some(actual) = data.get(&self.field) else {
            return false;
        };

        if self.op == FilterOp::Eq {
            return actual == &self.value;
        }

        match compare_values(actual, &self.value) {
            Some(ord) => match self.op {
                FilterOp::Lt => ord == Ordering::Less,
                FilterOp::Le => ord != Ordering::Greater,
                FilterOp::Gt => ord == Ordering::Greater,
                FilterOp::Ge => ord != Ordering::Less,
                FilterOp::Eq => ord == Ordering::Equal,
            },
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort order for query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        OrderBy {
            field: field.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        OrderBy {
            field: field.to_string(),
            direction: Direction::Desc,
        }
    }

    pub(crate) fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ord = match (a.data.get(&self.field), b.data.get(&self.field)) {
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Insert a new document. Fails the whole batch if the id is taken.
    Create { path: CollectionPath, id: String, data: Value },
    /// Insert or overwrite.
    Set { path: CollectionPath, id: String, data: Value },
    /// Remove a document. Removing a missing document is not an error.
    Delete { path: CollectionPath, id: String },
}

/// Persistence and change notification for schedule data.
///
/// Implementations are cheap-to-clone handles onto shared state.
pub trait DocumentStore: Clone + Send + Sync + 'static {
    fn get_document(
        &self,
        path: &CollectionPath,
        id: &str,
    ) -> impl Future<Output = GroupCalResult<Option<Document>>> + Send;

    fn query_collection(
        &self,
        path: &CollectionPath,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> impl Future<Output = GroupCalResult<Vec<Document>>> + Send;

    /// Live view of a filtered collection. The handle receives the current
    /// snapshot straight away and a fresh one after every write.
    fn subscribe(
        &self,
        path: &CollectionPath,
        filters: Vec<Filter>,
    ) -> impl Future<Output = GroupCalResult<Subscription>> + Send;

    /// Insert `data` under a generated id and return the id.
    fn create_document(
        &self,
        path: &CollectionPath,
        data: Value,
    ) -> impl Future<Output = GroupCalResult<String>> + Send;

    fn set_document(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Value,
    ) -> impl Future<Output = GroupCalResult<()>> + Send;

    fn delete_document(
        &self,
        path: &CollectionPath,
        id: &str,
    ) -> impl Future<Output = GroupCalResult<()>> + Send;

    /// Apply every op, or none of them.
    fn atomic_batch(&self, ops: Vec<BatchOp>) -> impl Future<Output = GroupCalResult<()>> + Send;
}

/// Order two JSON scalars of the same kind. Strings compare lexicographically,
/// which is chronological for ISO dates and timestamps.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_compare_iso_dates_as_strings() {
        let data = json!({ "date": "2024-03-15", "isRecurring": true });
        assert!(Filter::ge("date", "2024-03-01").matches(&data));
        assert!(Filter::le("date", "2024-03-15").matches(&data));
        assert!(!Filter::new("date", FilterOp::Gt, "2024-03-15").matches(&data));
        assert!(Filter::equals("isRecurring", true).matches(&data));
        assert!(!Filter::equals("missing", true).matches(&data));
    }

    #[test]
    fn mismatched_types_never_match_ranges() {
        let data = json!({ "count": 3 });
        assert!(!Filter::ge("count", "2").matches(&data));
        assert!(Filter::ge("count", 2).matches(&data));
    }

    #[test]
    fn decode_fills_in_missing_id() {
        #[derive(Deserialize)]
        struct Row {
            id: String,
            name: String,
        }
        let doc = Document {
            id: "abc".into(),
            data: json!({ "name": "x" }),
        };
        let row: Row = doc.decode().unwrap();
        assert_eq!((row.id.as_str(), row.name.as_str()), ("abc", "x"));
    }

    #[test]
    fn collection_paths() {
        assert_eq!(CollectionPath::events("s1").as_str(), "schedules/s1/events");
        assert_eq!(CollectionPath::new("/users/").as_str(), "users");
    }
}
