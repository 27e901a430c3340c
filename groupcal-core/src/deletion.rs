//! Deleting one occurrence or a whole recurring series.
//!
//! Deciding what to delete ([`resolve_series_deletion`]) is separate from
//! doing it ([`execute_deletion`]); asking the user which one they meant is
//! left to the caller.

use serde::{Deserialize, Serialize};

use crate::error::{GroupCalError, GroupCalResult};
use crate::model::Event;
use crate::store::{BatchOp, CollectionPath, DocumentStore, Filter};

/// The user's answer when deleting a recurring occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteChoice {
    ThisOccurrence,
    WholeSeries,
}

/// What will be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionPlan {
    Single { event_id: String },
    Series { group_id: String },
}

/// Decide what deleting `event` means.
///
/// Non-recurring events ignore `choice`. Recurring events need one; without it
/// the request is rejected rather than guessed.
pub fn resolve_series_deletion(
    event: &Event,
    choice: Option<DeleteChoice>,
) -> GroupCalResult<DeletionPlan> {
    let single = DeletionPlan::Single {
        event_id: event.id.clone(),
    };

    let Some(group_id) = event.series_id() else {
        return Ok(single);
    };

    match choice {
        Some(DeleteChoice::ThisOccurrence) => Ok(single),
        Some(DeleteChoice::WholeSeries) => Ok(DeletionPlan::Series {
            group_id: group_id.to_string(),
        }),
        None => Err(GroupCalError::validation(
            "Choose whether to delete this occurrence or the whole series",
        )),
    }
}

/// Carry out `plan` against the events of `schedule_id`.
///
/// Returns how many records were removed. A series is removed in one atomic
/// batch; a series that no longer has any records removes nothing.
pub async fn execute_deletion<S: DocumentStore>(
    store: &S,
    schedule_id: &str,
    plan: &DeletionPlan,
) -> GroupCalResult<usize> {
    let path = CollectionPath::events(schedule_id);

    let ids: Vec<String> = match plan {
        DeletionPlan::Single { event_id } => store
            .get_document(&path, event_id)
            .await?
            .map(|doc| doc.id)
            .into_iter()
            .collect(),
        DeletionPlan::Series { group_id } => store
            .query_collection(
                &path,
                &[Filter::equals("recurringGroupId", group_id.as_str())],
                None,
            )
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect(),
    };

    if ids.is_empty() {
        return Ok(0);
    }

    let count = ids.len();
    let ops = ids
        .into_iter()
        .map(|id| BatchOp::Delete {
            path: path.clone(),
            id,
        })
        .collect();
    store.atomic_batch(ops).await?;

    tracing::info!(schedule = schedule_id, deleted = count, ?plan, "deleted events");
    Ok(count)
}
