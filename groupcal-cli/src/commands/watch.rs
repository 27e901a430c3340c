use std::time::Duration;

use anyhow::Result;
use groupcal_core::access::can_delete_event;
use groupcal_core::{CalendarMonth, Event, IdentityProvider, Notifier, list_view};
use owo_colors::OwoColorize;

use super::{Context, today};
use crate::render::render_day_groups;

/// How often the data file is checked for writes from other processes.
const RELOAD_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(ctx: &Context, schedule: Option<&str>, month: Option<CalendarMonth>) -> Result<()> {
    let schedule_id = ctx.schedule_id(schedule)?;
    let open = ctx.service.open_schedule(&schedule_id, &ctx.identity).await?;

    let mut subscription = ctx
        .service
        .subscribe_events(&schedule_id, &ctx.identity, month)
        .await?;
    let mut identity = ctx.identities.watch();
    let mut reload = tokio::time::interval(RELOAD_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("{}", format!("Watching {} (Ctrl-C to stop)", open.schedule.title).dimmed());

    loop {
        tokio::select! {
            snapshot = subscription.next_as::<Event>() => {
                let Some(events) = snapshot else { break };
                let today = today();
                let groups = list_view(events?, today);
                println!();
                println!("{}", format!("── {} ──", chrono::Local::now().format("%H:%M:%S")).dimmed());
                println!(
                    "{}",
                    render_day_groups(&groups, today, |event| {
                        can_delete_event(open.role, event, &ctx.identity, today)
                    })
                );
            }
            _ = reload.tick() => {
                if let Err(e) = ctx.service.store().reload() {
                    tracing::warn!(error = %e, "could not reload data file");
                }
                if let Err(e) = ctx.refresh_identity() {
                    tracing::warn!(error = %e, "could not re-read config");
                }
            }
            _ = identity.changed() => {
                let still_signed_in = identity
                    .borrow_and_update()
                    .as_ref()
                    .is_some_and(|i| i.id == ctx.identity.id);
                if !still_signed_in {
                    println!("{}", "Identity changed in config".dimmed());
                    break;
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    subscription.cancel();
    ctx.notifier.success("Stopped watching");
    Ok(())
}
