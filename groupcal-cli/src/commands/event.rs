use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveTime, TimeDelta, Utc};
use clap::Args;
use dialoguer::{Input, MultiSelect, Select};
use groupcal_core::access::{can_delete_event, ensure_can_delete_event};
use groupcal_core::recurrence::weekday_from_index;
use groupcal_core::{
    CalendarMonth, DeleteChoice, EventDraft, GroupCalResult, Notifier, RecurrenceRule,
    RecurrenceType, list_view,
};
use owo_colors::OwoColorize;

use super::{Context, today};
use crate::parse::{parse_date, parse_time, parse_weekdays};
use crate::render::render_day_groups;

#[derive(Args)]
pub struct NewEventArgs {
    /// Event title (prompted for when missing)
    pub title: Option<String>,

    #[arg(short, long)]
    pub schedule: Option<String>,

    /// Date of the (first) event, YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Start time, e.g. 09:00 or 9am
    #[arg(long, value_parser = parse_time)]
    pub start: Option<NaiveTime>,

    /// End time, e.g. 10:30
    #[arg(long, value_parser = parse_time)]
    pub end: Option<NaiveTime>,

    #[arg(short, long)]
    pub description: Option<String>,

    /// daily, weekly, weekdays or custom
    #[arg(long)]
    pub repeat: Option<RecurrenceType>,

    /// Last date of the repeat range, YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub until: Option<NaiveDate>,

    /// Days for --repeat custom, e.g. "mon,wed,fri" or "1,3,5"
    #[arg(long)]
    pub on: Option<String>,
}

pub async fn new(ctx: &Context, args: NewEventArgs) -> Result<()> {
    let schedule_id = ctx.schedule_id(args.schedule.as_deref())?;
    let interactive = args.title.is_none();

    // Fail before prompting if the caller may not create events.
    let open = ctx.service.open_schedule(&schedule_id, &ctx.identity).await?;
    if !open.can_create_events() {
        bail!("You can only view events in '{}'", open.schedule.title);
    }

    let title = match args.title {
        Some(t) => t,
        None => Input::<String>::new().with_prompt("  Title").interact_text()?,
    };

    let date = match args.date {
        Some(d) => d,
        None if interactive => prompt_parsed("  Date", &today().to_string(), parse_date)?,
        None => today(),
    };

    let start_time = match args.start {
        Some(t) => t,
        None if interactive => prompt_parsed("  Starts", "09:00", parse_time)?,
        None => bail!("--start is required"),
    };

    let default_end = start_time + TimeDelta::hours(1);
    let end_time = match args.end {
        Some(t) => t,
        None if interactive => {
            prompt_parsed("  Ends", &default_end.format("%H:%M").to_string(), parse_time)?
        }
        None => default_end,
    };

    let recurring = match args.repeat {
        Some(pattern) => Some(recurrence_from_args(pattern, args.until, args.on.as_deref())?),
        None if interactive => prompt_recurrence(date)?,
        None => None,
    };

    let draft = EventDraft {
        title,
        description: args.description,
        date,
        start_time,
        end_time,
        recurring,
    };

    let series = ctx
        .service
        .create_events(&schedule_id, &ctx.identity, &draft, today(), Utc::now())
        .await?;

    if interactive {
        println!();
    }
    let message = match series.len() {
        1 => format!("Created: {}", draft.title.trim()),
        n => format!("Created {n} recurring events: {}", draft.title.trim()),
    };
    ctx.notifier.success(&message);
    Ok(())
}

fn recurrence_from_args(
    pattern: RecurrenceType,
    until: Option<NaiveDate>,
    on: Option<&str>,
) -> Result<RecurrenceRule> {
    let Some(end_date) = until else {
        bail!("--until is required with --repeat");
    };
    let selected_weekdays = match on {
        Some(days) => parse_weekdays(days)?,
        None => Vec::new(),
    };
    Ok(RecurrenceRule {
        pattern,
        end_date,
        selected_weekdays,
    })
}

fn prompt_recurrence(start: NaiveDate) -> Result<Option<RecurrenceRule>> {
    let options = [
        "Does not repeat",
        "Daily",
        "Weekly",
        "Weekdays (Mon-Fri)",
        "Custom days",
    ];
    let pattern = match Select::new()
        .with_prompt("  Repeat")
        .items(&options)
        .default(0)
        .interact()?
    {
        1 => RecurrenceType::Daily,
        2 => RecurrenceType::Weekly,
        3 => RecurrenceType::Weekdays,
        4 => RecurrenceType::Custom,
        _ => return Ok(None),
    };

    let selected_weekdays = if pattern == RecurrenceType::Custom {
        let names = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        MultiSelect::new()
            .with_prompt("  On which days")
            .items(&names)
            .interact()?
            .into_iter()
            .map(|i| weekday_from_index(i as u8))
            .collect::<GroupCalResult<Vec<_>>>()?
    } else {
        Vec::new()
    };

    let end_date = prompt_parsed("  Until", &start.to_string(), parse_date)?;

    Ok(Some(RecurrenceRule {
        pattern,
        end_date,
        selected_weekdays,
    }))
}

/// Prompt with a default, retrying until the input parses.
fn prompt_parsed<T>(prompt: &str, default: &str, parse: fn(&str) -> Result<T>) -> Result<T> {
    loop {
        let input: String = Input::new()
            .with_prompt(prompt)
            .default(default.to_string())
            .interact_text()?;
        match parse(&input) {
            Ok(value) => return Ok(value),
            Err(e) => eprintln!("  {}", e.to_string().red()),
        }
    }
}

pub async fn list(ctx: &Context, schedule: Option<&str>, month: Option<CalendarMonth>) -> Result<()> {
    let schedule_id = ctx.schedule_id(schedule)?;
    let open = ctx.service.open_schedule(&schedule_id, &ctx.identity).await?;

    let events = match month {
        Some(month) => {
            ctx.service
                .events_in_month(&schedule_id, &ctx.identity, month)
                .await?
        }
        None => ctx.service.list_events(&schedule_id, &ctx.identity).await?,
    };

    let today = today();
    let groups = list_view(events, today);
    println!(
        "{}",
        render_day_groups(&groups, today, |event| {
            can_delete_event(open.role, event, &ctx.identity, today)
        })
    );
    Ok(())
}

pub async fn delete(
    ctx: &Context,
    schedule: Option<&str>,
    event_id: &str,
    series: bool,
    only_this: bool,
) -> Result<()> {
    let schedule_id = ctx.schedule_id(schedule)?;
    let today = today();

    let choice = if series {
        Some(DeleteChoice::WholeSeries)
    } else if only_this {
        Some(DeleteChoice::ThisOccurrence)
    } else {
        let open = ctx.service.open_schedule(&schedule_id, &ctx.identity).await?;
        let event = ctx.service.get_event(&schedule_id, event_id).await?;
        // Refuse before asking which occurrences to delete.
        ensure_can_delete_event(open.role, &event, &ctx.identity, today)?;
        if event.series_id().is_some() {
            let Some(choice) = prompt_delete_choice(&event.title)? else {
                println!("{}", "Nothing deleted".dimmed());
                return Ok(());
            };
            Some(choice)
        } else {
            None
        }
    };

    let deleted = ctx
        .service
        .delete_event(&schedule_id, &ctx.identity, event_id, choice, today)
        .await?;

    let message = match deleted {
        0 => "Nothing to delete".to_string(),
        1 => "Deleted 1 event".to_string(),
        n => format!("Deleted {n} events"),
    };
    ctx.notifier.success(&message);
    Ok(())
}

const DELETE_OPTIONS: [&str; 3] = ["Only this event", "All events in the series", "Cancel"];

/// Ask which occurrences to delete. `None` when the user cancels.
fn prompt_delete_choice(title: &str) -> Result<Option<DeleteChoice>> {
    let selection = Select::new()
        .with_prompt(format!("  '{title}' repeats. Delete"))
        .items(&DELETE_OPTIONS)
        .default(0)
        .interact()?;

    Ok(delete_choice_at(selection))
}

fn delete_choice_at(selection: usize) -> Option<DeleteChoice> {
    match selection {
        0 => Some(DeleteChoice::ThisOccurrence),
        1 => Some(DeleteChoice::WholeSeries),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn repeat_needs_an_end_date() {
        assert!(recurrence_from_args(RecurrenceType::Daily, None, None).is_err());

        let until = NaiveDate::from_ymd_opt(2030, 1, 31).unwrap();
        let rule = recurrence_from_args(
            RecurrenceType::Custom,
            Some(until),
            Some("mon,thu"),
        )
        .unwrap();
        assert_eq!(rule.end_date, until);
        assert_eq!(rule.selected_weekdays, vec![Weekday::Mon, Weekday::Thu]);

        let bad = recurrence_from_args(RecurrenceType::Custom, Some(until), Some("funday"));
        assert!(bad.is_err());
    }

    #[test]
    fn cancel_maps_to_no_choice() {
        assert_eq!(delete_choice_at(0), Some(DeleteChoice::ThisOccurrence));
        assert_eq!(delete_choice_at(1), Some(DeleteChoice::WholeSeries));
        assert_eq!(DELETE_OPTIONS[2], "Cancel");
        assert_eq!(delete_choice_at(2), None);
    }
}
