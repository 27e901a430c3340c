//! Recurrence expansion.
//!
//! Expands a repeat pattern over an inclusive date range into the concrete
//! calendar dates a series occurs on. Expansion is lazy: [`occurrences`]
//! yields dates one at a time so callers can stop early, and [`expand`]
//! collects the whole range.

use std::iter::FusedIterator;

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::{GroupCalError, GroupCalResult};
use crate::model::RecurrenceType;

/// Weekday for a Sunday-based index (Sunday = 0 .. Saturday = 6).
pub fn weekday_from_index(index: u8) -> GroupCalResult<Weekday> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        _ => Err(GroupCalError::validation(format!(
            "Invalid weekday index {index}. Expected 0 (Sunday) to 6 (Saturday)"
        ))),
    }
}

/// Sunday-based index of a weekday.
pub fn weekday_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

/// Lazily generated, strictly increasing occurrence dates.
#[derive(Debug, Clone)]
pub struct Occurrences {
    cursor: Option<NaiveDate>,
    end: NaiveDate,
    kind: RecurrenceType,
    selected: Vec<Weekday>,
}

impl Occurrences {
    fn step(&self) -> Days {
        match self.kind {
            RecurrenceType::Weekly => Days::new(7),
            _ => Days::new(1),
        }
    }

    fn matches(&self, date: NaiveDate) -> bool {
        match self.kind {
            RecurrenceType::Daily | RecurrenceType::Weekly => true,
            RecurrenceType::Weekdays => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            RecurrenceType::Custom => self.selected.contains(&date.weekday()),
        }
    }
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        loop {
            let date = self.cursor.filter(|d| *d <= self.end)?;
            self.cursor = date.checked_add_days(self.step());
            if self.matches(date) {
                return Some(date);
            }
        }
    }
}

impl FusedIterator for Occurrences {}

/// Start expanding `kind` from `start` through `end` (both inclusive).
///
/// `selected` is only consulted for [`RecurrenceType::Custom`], where it must
/// not be empty. An `end` before `start` produces no dates.
pub fn occurrences(
    start: NaiveDate,
    end: NaiveDate,
    kind: RecurrenceType,
    selected: &[Weekday],
) -> GroupCalResult<Occurrences> {
    if kind == RecurrenceType::Custom && selected.is_empty() {
        return Err(GroupCalError::validation(
            "Select at least one day for a custom repeat pattern",
        ));
    }

    Ok(Occurrences {
        cursor: Some(start),
        end,
        kind,
        selected: selected.to_vec(),
    })
}

/// Every occurrence date of `kind` between `start` and `end`, inclusive.
pub fn expand(
    start: NaiveDate,
    end: NaiveDate,
    kind: RecurrenceType,
    selected: &[Weekday],
) -> GroupCalResult<Vec<NaiveDate>> {
    Ok(occurrences(start, end, kind, selected)?.collect())
}
