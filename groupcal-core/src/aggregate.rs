//! Group events by calendar date for the list and month views.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};

use crate::access::can_create_events;
use crate::constants::MONTH_CELL_EVENT_LIMIT;
use crate::error::{GroupCalError, GroupCalResult};
use crate::model::{Event, Role};

/// Events keyed by date; each day's events ordered by start time.
pub type EventsByDate = BTreeMap<NaiveDate, Vec<Event>>;

pub fn group_by_date<I>(events: I) -> EventsByDate
where
    I: IntoIterator<Item = Event>,
{
    let mut grouped = EventsByDate::new();
    for event in events {
        grouped.entry(event.date).or_default().push(event);
    }
    for day in grouped.values_mut() {
        day.sort_by_key(|e| e.start_time);
    }
    grouped
}

// =============================================================================
// List view
// =============================================================================

/// One day's heading in the list view.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub is_past: bool,
    pub events: Vec<Event>,
}

/// Days in ascending order, each with its events in time order.
pub fn list_view<I>(events: I, today: NaiveDate) -> Vec<DayGroup>
where
    I: IntoIterator<Item = Event>,
{
    group_by_date(events)
        .into_iter()
        .map(|(date, events)| DayGroup {
            date,
            is_past: date < today,
            events,
        })
        .collect()
}

/// Heading for a day: "Today", "Tomorrow", or e.g. "Monday, January 1".
/// The year is added when it differs from `today`'s.
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ if date.year() != today.year() => date.format("%A, %B %-d, %Y").to_string(),
        _ => date.format("%A, %B %-d").to_string(),
    }
}

// =============================================================================
// Month grid
// =============================================================================

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarMonth {
    year: i32,
    month: u32,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> GroupCalResult<Self> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(GroupCalError::validation(format!(
                "Invalid month {year}-{month:02}"
            )));
        }
        Ok(CalendarMonth { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        CalendarMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    /// Inclusive date range covered by the month.
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        (self.first_day(), self.last_day())
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            CalendarMonth { year: self.year + 1, month: 1 }
        } else {
            CalendarMonth { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            CalendarMonth { year: self.year - 1, month: 12 }
        } else {
            CalendarMonth { year: self.year, month: self.month - 1 }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.first_day().format("%B %Y"))
    }
}

impl FromStr for CalendarMonth {
    type Err = GroupCalError;

    /// Parse `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map_err(|_| {
                GroupCalError::validation(format!("Invalid month '{s}'. Expected YYYY-MM"))
            })?;
        Ok(CalendarMonth::containing(date))
    }
}

/// What a click inside the month grid leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellClick {
    /// Open event creation with the date pre-filled.
    CreateEvent(NaiveDate),
    /// Open the clicked event. Never also triggers the day's click.
    OpenEvent(String),
    Nothing,
}

/// One day in the month grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    pub date: NaiveDate,
    /// False for padding days from the adjacent months.
    pub in_current_month: bool,
    pub is_today: bool,
    /// Styling only; past days are not locked here.
    pub is_past: bool,
    /// At most [`MONTH_CELL_EVENT_LIMIT`] events, in time order.
    pub events: Vec<Event>,
    /// Events that did not fit, shown as "+N more".
    pub overflow: usize,
    can_create: bool,
}

impl DayCell {
    pub fn click(&self) -> CellClick {
        if self.can_create {
            CellClick::CreateEvent(self.date)
        } else {
            CellClick::Nothing
        }
    }

    pub fn click_event(&self, event_id: &str) -> CellClick {
        if self.events.iter().any(|e| e.id == event_id) {
            CellClick::OpenEvent(event_id.to_string())
        } else {
            CellClick::Nothing
        }
    }

    pub fn overflow_label(&self) -> Option<String> {
        (self.overflow > 0).then(|| format!("+{} more", self.overflow))
    }
}

/// Weeks (Sunday first) covering a month, with each day's events.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid {
    pub month: CalendarMonth,
    pub weeks: Vec<Vec<DayCell>>,
}

impl MonthGrid {
    pub fn cells(&self) -> impl Iterator<Item = &DayCell> {
        self.weeks.iter().flatten()
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&DayCell> {
        self.cells().find(|c| c.date == date)
    }
}

/// Lay out `month` as a grid of weeks.
///
/// `viewer_role` decides whether day cells offer event creation.
pub fn month_grid<I>(
    month: CalendarMonth,
    events: I,
    today: NaiveDate,
    viewer_role: Option<Role>,
) -> MonthGrid
where
    I: IntoIterator<Item = Event>,
{
    let mut by_date = group_by_date(events);
    let can_create = viewer_role.is_some_and(can_create_events);

    let (first, last) = month.range();
    let grid_start = first - Days::new(u64::from(first.weekday().num_days_from_sunday()));
    let grid_end = last + Days::new(u64::from(6 - last.weekday().num_days_from_sunday()));

    let mut weeks = Vec::new();
    let mut week = Vec::with_capacity(7);
    for date in grid_start.iter_days().take_while(|d| *d <= grid_end) {
        let mut events = by_date.remove(&date).unwrap_or_default();
        let overflow = events.len().saturating_sub(MONTH_CELL_EVENT_LIMIT);
        events.truncate(MONTH_CELL_EVENT_LIMIT);

        week.push(DayCell {
            date,
            in_current_month: month.contains(date),
            is_today: date == today,
            is_past: date < today,
            events,
            overflow,
            can_create,
        });

        if week.len() == 7 {
            weeks.push(std::mem::replace(&mut week, Vec::with_capacity(7)));
        }
    }

    MonthGrid { month, weeks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc, Weekday};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn event(id: &str, date: NaiveDate, hour: u32) -> Event {
        let start = NaiveTime::from_hms_opt(hour, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(hour, 45, 0).unwrap();
        Event {
            id: id.into(),
            title: id.into(),
            description: None,
            date,
            start_time: date.and_time(start),
            end_time: date.and_time(end),
            created_by: "u1".into(),
            created_by_name: "Ana".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_recurring: false,
            recurring_group_id: None,
            recurring_type: None,
        }
    }

    #[test]
    fn single_event_groups_under_its_date() {
        let e = event("a", d(2024, 5, 2), 9);
        let grouped = group_by_date(vec![e.clone()]);
        assert_eq!(grouped.get(&e.date), Some(&vec![e]));
    }

    #[test]
    fn events_within_a_day_are_time_ordered() {
        let day = d(2024, 5, 2);
        let grouped = group_by_date(vec![event("late", day, 15), event("early", day, 8), event("mid", day, 11)]);
        let titles: Vec<_> = grouped[&day].iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["early", "mid", "late"]);
    }

    #[test]
    fn list_view_sorts_days_and_flags_past() {
        let today = d(2024, 5, 10);
        let groups = list_view(
            vec![event("b", d(2024, 5, 12), 9), event("a", d(2024, 5, 1), 9), event("c", today, 9)],
            today,
        );
        let dates: Vec<_> = groups.iter().map(|g| g.date).collect();
        assert_eq!(dates, [d(2024, 5, 1), today, d(2024, 5, 12)]);
        assert_eq!(groups.iter().map(|g| g.is_past).collect::<Vec<_>>(), [true, false, false]);
    }

    #[test]
    fn day_labels() {
        let today = d(2024, 12, 30);
        assert_eq!(day_label(today, today), "Today");
        assert_eq!(day_label(d(2024, 12, 31), today), "Tomorrow");
        assert_eq!(day_label(d(2024, 12, 2), today), "Monday, December 2");
        assert_eq!(day_label(d(2025, 1, 3), today), "Friday, January 3, 2025");
    }

    #[test]
    fn month_range_and_navigation() {
        let feb = CalendarMonth::new(2024, 2).unwrap();
        assert_eq!(feb.range(), (d(2024, 2, 1), d(2024, 2, 29)));
        assert_eq!(CalendarMonth::new(2024, 12).unwrap().next(), CalendarMonth::new(2025, 1).unwrap());
        assert_eq!(CalendarMonth::new(2024, 1).unwrap().prev(), CalendarMonth::new(2023, 12).unwrap());
        assert_eq!("2024-02".parse::<CalendarMonth>().unwrap(), feb);
        assert!("2024-13".parse::<CalendarMonth>().is_err());
        assert_eq!(feb.to_string(), "February 2024");
    }

    #[test]
    fn grid_pads_to_whole_sunday_first_weeks() {
        // March 2024 starts on a Friday and ends on a Sunday
        let grid = month_grid(CalendarMonth::new(2024, 3).unwrap(), vec![], d(2024, 3, 15), None);
        assert_eq!(grid.weeks.len(), 6);
        assert!(grid.weeks.iter().all(|w| w.len() == 7));
        assert!(grid.weeks.iter().all(|w| w[0].date.weekday() == Weekday::Sun));
        assert_eq!(grid.weeks[0][0].date, d(2024, 2, 25));
        assert_eq!(grid.weeks[5][6].date, d(2024, 4, 6));
        assert!(!grid.cell(d(2024, 2, 29)).unwrap().in_current_month);
        assert!(grid.cell(d(2024, 3, 1)).unwrap().in_current_month);
    }

    #[test]
    fn grid_caps_events_per_cell() {
        let day = d(2024, 3, 20);
        let events = (0..5).map(|i| event(&format!("e{i}"), day, 8 + i)).collect::<Vec<_>>();
        let grid = month_grid(CalendarMonth::containing(day), events, d(2024, 3, 1), Some(Role::Viewer));
        let cell = grid.cell(day).unwrap();
        assert_eq!(cell.events.len(), 3);
        assert_eq!(cell.events[0].id, "e0");
        assert_eq!(cell.overflow, 2);
        assert_eq!(cell.overflow_label().as_deref(), Some("+2 more"));
    }

    #[test]
    fn grid_marks_today_and_past() {
        let today = d(2024, 3, 15);
        let grid = month_grid(CalendarMonth::containing(today), vec![], today, None);
        let cell = grid.cell(today).unwrap();
        assert!(cell.is_today && !cell.is_past);
        assert!(grid.cell(d(2024, 3, 14)).unwrap().is_past);
        assert_eq!(grid.cells().filter(|c| c.is_today).count(), 1);
    }

    #[test]
    fn only_creators_get_a_create_click() {
        let day = d(2024, 3, 20);
        let month = CalendarMonth::containing(day);
        let editor = month_grid(month, vec![event("x", day, 9)], day, Some(Role::Editor));
        let viewer = month_grid(month, vec![event("x", day, 9)], day, Some(Role::Viewer));

        assert_eq!(editor.cell(day).unwrap().click(), CellClick::CreateEvent(day));
        assert_eq!(viewer.cell(day).unwrap().click(), CellClick::Nothing);
        assert_eq!(
            editor.cell(day).unwrap().click_event("x"),
            CellClick::OpenEvent("x".into())
        );
    }
}
