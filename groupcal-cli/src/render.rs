//! Terminal rendering for groupcal types.
//!
//! Extension traits that add colored output to groupcal-core types using
//! owo_colors.

use chrono::{Datelike, NaiveDate};
use groupcal_core::aggregate::{DayCell, day_label};
use groupcal_core::{DayGroup, Event, Member, MonthGrid, Role, Schedule};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Role {
    fn render(&self) -> String {
        match self {
            Role::Admin => self.as_str().magenta().to_string(),
            Role::Editor => self.as_str().yellow().to_string(),
            Role::Viewer => self.as_str().blue().to_string(),
        }
    }
}

impl Render for Schedule {
    fn render(&self) -> String {
        format!("📅 {} {}", self.title.bold(), format!("[{}]", self.id).dimmed())
    }
}

impl Render for Member {
    fn render(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.display_name,
            self.email,
            self.role.render(),
            format!("[{}]", self.id).dimmed()
        )
    }
}

impl Render for Event {
    fn render(&self) -> String {
        let repeat = if self.is_recurring { " ↻" } else { "" };
        format!(
            "{:>19}  {}{} {}",
            self.render_time_range(),
            self.title,
            repeat,
            format!("by {}", self.created_by_name).dimmed()
        )
    }
}

/// List view: one block per day, with the ids of events the viewer may
/// delete.
pub fn render_day_groups(
    groups: &[DayGroup],
    today: NaiveDate,
    deletable: impl Fn(&Event) -> bool,
) -> String {
    if groups.is_empty() {
        return "No events".dimmed().to_string();
    }

    let mut lines = Vec::new();
    for group in groups {
        if !lines.is_empty() {
            lines.push(String::new());
        }

        let label = day_label(group.date, today);
        if group.is_past {
            lines.push(label.dimmed().to_string());
        } else {
            lines.push(label.bold().to_string());
        }

        for event in &group.events {
            let mut line = format!("  {}", event.render());
            if deletable(event) {
                line.push_str(&format!(" {}", format!("[{}]", event.id).dimmed()));
            }
            if group.is_past {
                line = line.dimmed().to_string();
            }
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// Width of one day column in the month grid.
const CELL_WIDTH: usize = 14;

const WEEKDAY_HEADERS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Truncate and pad `text` to the cell width.
fn fit(text: &str) -> String {
    let clipped: String = text.chars().take(CELL_WIDTH - 1).collect();
    format!("{clipped:<width$}", width = CELL_WIDTH)
}

impl Render for MonthGrid {
    fn render(&self) -> String {
        let mut lines = vec![self.month.to_string().bold().to_string()];
        lines.push(
            WEEKDAY_HEADERS
                .iter()
                .map(|d| fit(d))
                .collect::<String>()
                .dimmed()
                .to_string(),
        );

        for week in &self.weeks {
            lines.push(week.iter().map(render_day_number).collect());

            let rows = week
                .iter()
                .map(|c| c.events.len() + usize::from(c.overflow > 0))
                .max()
                .unwrap_or(0);
            for row in 0..rows {
                lines.push(week.iter().map(|c| render_cell_row(c, row)).collect());
            }
        }

        lines.join("\n")
    }
}

fn render_day_number(cell: &DayCell) -> String {
    let text = fit(&cell.date.day().to_string());
    if cell.is_today {
        text.bold().reversed().to_string()
    } else if !cell.in_current_month || cell.is_past {
        text.dimmed().to_string()
    } else {
        text
    }
}

fn render_cell_row(cell: &DayCell, row: usize) -> String {
    if let Some(event) = cell.events.get(row) {
        let text = fit(&format!("{} {}", event.start_time.format("%H:%M"), event.title));
        return if cell.is_past {
            text.dimmed().to_string()
        } else {
            text
        };
    }

    match cell.overflow_label() {
        Some(more) if row == cell.events.len() => fit(&more).dimmed().to_string(),
        _ => fit(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_pads_and_clips() {
        assert_eq!(fit("ab").len(), CELL_WIDTH);
        let long = fit("a very long event title");
        assert_eq!(long.chars().count(), CELL_WIDTH);
        assert!(long.ends_with(' '));
    }

    #[test]
    fn empty_list_view() {
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert!(render_day_groups(&[], today, |_| false).contains("No events"));
    }
}
