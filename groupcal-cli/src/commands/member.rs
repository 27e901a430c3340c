use anyhow::Result;
use chrono::Utc;
use groupcal_core::{Notifier, Role};
use owo_colors::OwoColorize;

use super::Context;
use crate::render::Render;

pub async fn add(ctx: &Context, schedule: Option<&str>, email: &str, role: Role) -> Result<()> {
    let schedule_id = ctx.schedule_id(schedule)?;
    let member = ctx
        .service
        .add_member(&schedule_id, &ctx.identity, email, role, Utc::now())
        .await?;

    ctx.notifier
        .success(&format!("Added {} as {}", member.display_name, member.role));
    Ok(())
}

pub async fn remove(ctx: &Context, schedule: Option<&str>, member_id: &str) -> Result<()> {
    let schedule_id = ctx.schedule_id(schedule)?;
    let member = ctx
        .service
        .remove_member(&schedule_id, &ctx.identity, member_id)
        .await?;

    ctx.notifier
        .success(&format!("Removed {}", member.display_name));
    Ok(())
}

pub async fn list(ctx: &Context, schedule: Option<&str>) -> Result<()> {
    let schedule_id = ctx.schedule_id(schedule)?;
    let open = ctx.service.open_schedule(&schedule_id, &ctx.identity).await?;

    if open.members.is_empty() {
        println!("{}", "No members".dimmed());
    }
    for member in &open.members {
        println!("{}", member.render());
    }

    if !open.can_manage_members() {
        println!();
        println!("{}", "Only admins can add or remove members.".dimmed());
    }
    Ok(())
}
