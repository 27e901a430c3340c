use anyhow::Result;
use groupcal_core::aggregate::CellClick;
use groupcal_core::{CalendarMonth, month_grid};
use owo_colors::OwoColorize;

use super::{Context, today};
use crate::render::Render;

pub async fn run(ctx: &Context, schedule: Option<&str>, month: Option<CalendarMonth>) -> Result<()> {
    let schedule_id = ctx.schedule_id(schedule)?;
    let today = today();
    let month = month.unwrap_or_else(|| CalendarMonth::containing(today));

    let open = ctx.service.open_schedule(&schedule_id, &ctx.identity).await?;
    let events = ctx
        .service
        .events_in_month(&schedule_id, &ctx.identity, month)
        .await?;

    let grid = month_grid(month, events, today, Some(open.role));
    println!("{}", grid.render());

    println!();
    println!(
        "{}",
        format!(
            "{}: groupcal calendar --month {}   {}: --month {}",
            "prev".bold(),
            format_month(month.prev()),
            "next".bold(),
            format_month(month.next())
        )
        .dimmed()
    );

    let first = grid.cells().find(|c| c.in_current_month).map(|c| c.click());
    if let Some(CellClick::CreateEvent(date)) = first {
        println!(
            "{}",
            format!("add: groupcal event new --date {date}").dimmed()
        );
    }
    Ok(())
}

fn format_month(month: CalendarMonth) -> String {
    format!("{:04}-{:02}", month.year(), month.month())
}
