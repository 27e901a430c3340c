use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GroupCalError;

/// How a recurring series repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    /// Every day.
    Daily,
    /// Every 7 days, on the start date's weekday.
    Weekly,
    /// Monday to Friday.
    Weekdays,
    /// An explicit set of weekdays.
    Custom,
}

impl RecurrenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Weekdays => "weekdays",
            RecurrenceType::Custom => "custom",
        }
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceType {
    type Err = GroupCalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(RecurrenceType::Daily),
            "weekly" => Ok(RecurrenceType::Weekly),
            "weekdays" => Ok(RecurrenceType::Weekdays),
            "custom" => Ok(RecurrenceType::Custom),
            other => Err(GroupCalError::validation(format!(
                "Unknown repeat pattern '{other}'. Expected daily, weekly, weekdays or custom"
            ))),
        }
    }
}

/// One concrete occurrence on a schedule.
///
/// `start_time` and `end_time` are local-clock timestamps on the same calendar
/// day as `date`. Recurring occurrences carry the `recurring_group_id` shared
/// by every occurrence created from the same request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub created_by: String,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Recurrence fields
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_type: Option<RecurrenceType>,
}

impl Event {
    /// True when the event's day is before `today`.
    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.date < today
    }

    /// The series this occurrence belongs to, if any.
    pub fn series_id(&self) -> Option<&str> {
        if self.is_recurring {
            self.recurring_group_id.as_deref()
        } else {
            None
        }
    }

    pub fn render_time_range(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%-I:%M %p"),
            self.end_time.format("%-I:%M %p")
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}
