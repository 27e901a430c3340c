//! Build the event records for a single or recurring event request.
//!
//! Building is pure: it validates the request and returns the records to
//! write. Persisting them (as one atomic batch) is the caller's job, see
//! [`ScheduleService::create_events`](crate::service::ScheduleService::create_events).

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_OCCURRENCES;
use crate::error::{GroupCalError, GroupCalResult};
use crate::identity::Identity;
use crate::model::{Event, RecurrenceType};
use crate::recurrence::occurrences;

/// How an event repeats, and until when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub pattern: RecurrenceType,
    /// Last date (inclusive) an occurrence may fall on.
    pub end_date: NaiveDate,
    /// Days to repeat on for [`RecurrenceType::Custom`].
    #[serde(default)]
    pub selected_weekdays: Vec<Weekday>,
}

/// Input collected from the user for a new event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Date of the event, or the first date of a recurring series.
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub recurring: Option<RecurrenceRule>,
}

/// Records produced from one draft.
#[derive(Debug, Clone, PartialEq)]
pub enum EventSeries {
    Single(Event),
    Recurring { group_id: String, events: Vec<Event> },
}

impl EventSeries {
    pub fn events(&self) -> &[Event] {
        match self {
            EventSeries::Single(event) => std::slice::from_ref(event),
            EventSeries::Recurring { events, .. } => events,
        }
    }

    pub fn into_events(self) -> Vec<Event> {
        match self {
            EventSeries::Single(event) => vec![event],
            EventSeries::Recurring { events, .. } => events,
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }
}

/// Last date an event, or the end of a series, may be scheduled on.
pub fn latest_event_date(today: NaiveDate) -> NaiveDate {
    today
        .checked_add_months(Months::new(12))
        .unwrap_or(NaiveDate::MAX)
}

/// Validate `draft` and produce the event records authored by `author`.
///
/// Fails with [`GroupCalError::Validation`] when the end time is not after the
/// start time, when the date is before `today` or the date or repeat end is
/// more than a year after it, when a custom pattern has no days, or when the
/// recurrence yields no occurrences or more than [`MAX_OCCURRENCES`].
pub fn build_event_series(
    draft: &EventDraft,
    author: &Identity,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> GroupCalResult<EventSeries> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(GroupCalError::validation("Event title is required"));
    }

    if draft.end_time <= draft.start_time {
        return Err(GroupCalError::validation("End time must be after start time"));
    }

    let latest = latest_event_date(today);
    if draft.date < today {
        return Err(GroupCalError::validation("Event date cannot be in the past"));
    }
    if draft.date > latest {
        return Err(GroupCalError::validation(format!(
            "Event date must be on or before {latest}"
        )));
    }
    if let Some(rule) = &draft.recurring
        && rule.end_date > latest
    {
        return Err(GroupCalError::validation(format!(
            "Repeat end date must be on or before {latest}"
        )));
    }

    let template = Event {
        id: String::new(),
        title: title.to_string(),
        description: draft
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from),
        date: draft.date,
        start_time: draft.date.and_time(draft.start_time),
        end_time: draft.date.and_time(draft.end_time),
        created_by: author.id.clone(),
        created_by_name: author.display_label().to_string(),
        created_at: now,
        updated_at: now,
        is_recurring: false,
        recurring_group_id: None,
        recurring_type: None,
    };

    let Some(rule) = &draft.recurring else {
        return Ok(EventSeries::Single(Event {
            id: new_id(),
            ..template
        }));
    };

    // One past the cap is enough to know the range is too large.
    let dates: Vec<NaiveDate> = occurrences(
        draft.date,
        rule.end_date,
        rule.pattern,
        &rule.selected_weekdays,
    )?
    .take(MAX_OCCURRENCES + 1)
    .collect();

    if dates.is_empty() {
        return Err(GroupCalError::validation(
            "No events to create with the selected repeat settings",
        ));
    }
    if dates.len() > MAX_OCCURRENCES {
        return Err(GroupCalError::validation(format!(
            "Too many recurring events (max {MAX_OCCURRENCES}). Please shorten the date range"
        )));
    }

    let group_id = format!("recurring_{}", uuid::Uuid::new_v4().simple());
    let events = dates
        .into_iter()
        .map(|date| Event {
            id: new_id(),
            date,
            start_time: date.and_time(draft.start_time),
            end_time: date.and_time(draft.end_time),
            is_recurring: true,
            recurring_group_id: Some(group_id.clone()),
            recurring_type: Some(rule.pattern),
            ..template.clone()
        })
        .collect();

    Ok(EventSeries::Recurring { group_id, events })
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
