use anyhow::Result;
use chrono::Utc;
use groupcal_core::Notifier;
use groupcal_core::access::RoleResolution;
use owo_colors::OwoColorize;

use super::Context;
use crate::render::Render;

pub async fn new(
    ctx: &Context,
    title: &str,
    description: Option<&str>,
    make_default: bool,
) -> Result<()> {
    let schedule = ctx
        .service
        .create_schedule(&ctx.identity, title, description, Utc::now())
        .await?;

    ctx.notifier
        .success(&format!("Created schedule: {} [{}]", schedule.title, schedule.id));

    // Already created; a failed save is only reported.
    if make_default || ctx.config.default_schedule.is_none() {
        let mut config = ctx.config.clone();
        config.default_schedule = Some(schedule.id.clone());
        ctx.notifier
            .report(config.save(), |_| format!("Set {} as the default schedule", schedule.title));
    }
    Ok(())
}

pub async fn list(ctx: &Context) -> Result<()> {
    let schedules = ctx.service.list_owned_schedules(&ctx.identity).await?;

    if schedules.is_empty() {
        println!("{}", "No schedules yet. Create one with: groupcal schedule new <title>".dimmed());
        return Ok(());
    }

    for schedule in &schedules {
        let marker = if ctx.config.default_schedule.as_deref() == Some(schedule.id.as_str()) {
            " (default)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("{}{}", schedule.render(), marker);
    }
    Ok(())
}

pub async fn show(ctx: &Context, schedule: Option<&str>) -> Result<()> {
    let schedule_id = ctx.schedule_id(schedule)?;
    let open = ctx.service.open_schedule(&schedule_id, &ctx.identity).await?;

    println!("{}", open.schedule.render());
    if let Some(description) = &open.schedule.description {
        println!("   {}", description.dimmed());
    }
    println!("   Owner: {}", open.schedule.owner_name);

    let access = match open.access {
        RoleResolution::Owner => format!("{} (owner)", open.role.render()),
        _ => open.role.render(),
    };
    println!("   Your role: {access}");

    println!();
    println!("{}", format!("Members ({})", open.members.len()).bold());
    for member in &open.members {
        println!("   {}", member.render());
    }
    Ok(())
}
