//! Role resolution and permission checks.
//!
//! The owner of a schedule is always an admin, whether or not a member record
//! exists for them. Everyone else gets the role on their member record, and
//! identities with neither are refused.

use chrono::NaiveDate;

use crate::error::{GroupCalError, GroupCalResult};
use crate::identity::Identity;
use crate::model::{Event, Member, Role, Schedule};

/// Where an identity's access to a schedule comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleResolution {
    /// Owner of the schedule; implicitly admin.
    Owner,
    /// Explicit member record.
    Member(Role),
    NoAccess,
}

impl RoleResolution {
    pub fn role(&self) -> Option<Role> {
        match self {
            RoleResolution::Owner => Some(Role::Admin),
            RoleResolution::Member(role) => Some(*role),
            RoleResolution::NoAccess => None,
        }
    }
}

pub fn resolve_role(schedule: &Schedule, members: &[Member], identity: &Identity) -> RoleResolution {
    if schedule.is_owned_by(&identity.id) {
        return RoleResolution::Owner;
    }

    members
        .iter()
        .find(|m| m.id == identity.id)
        .map(|m| RoleResolution::Member(m.role))
        .unwrap_or(RoleResolution::NoAccess)
}

/// Effective role of `identity`, or an authorization error if it has none.
pub fn role_of(schedule: &Schedule, members: &[Member], identity: &Identity) -> GroupCalResult<Role> {
    resolve_role(schedule, members, identity).role().ok_or_else(|| {
        GroupCalError::denied(format!(
            "You do not have access to schedule '{}'",
            schedule.title
        ))
    })
}

pub fn can_manage_members(role: Role) -> bool {
    role == Role::Admin
}

pub fn can_create_events(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Editor)
}

/// Only the creator may delete an event, only with create permission, and
/// only while the event's day is today or later.
pub fn can_delete_event(role: Role, event: &Event, identity: &Identity, today: NaiveDate) -> bool {
    can_create_events(role) && event.created_by == identity.id && !event.is_past(today)
}

pub fn ensure_can_manage_members(role: Role) -> GroupCalResult<()> {
    if can_manage_members(role) {
        Ok(())
    } else {
        Err(GroupCalError::denied("Only admins can manage members"))
    }
}

pub fn ensure_can_create_events(role: Role) -> GroupCalResult<()> {
    if can_create_events(role) {
        Ok(())
    } else {
        Err(GroupCalError::denied("Viewers cannot create events"))
    }
}

pub fn ensure_can_delete_event(
    role: Role,
    event: &Event,
    identity: &Identity,
    today: NaiveDate,
) -> GroupCalResult<()> {
    if !can_create_events(role) {
        return Err(GroupCalError::denied("Viewers cannot delete events"));
    }
    if event.created_by != identity.id {
        return Err(GroupCalError::denied("You can only delete events you created"));
    }
    if event.is_past(today) {
        return Err(GroupCalError::denied("Past events cannot be deleted"));
    }
    Ok(())
}

/// Member removal never applies to the acting identity, whatever its role.
pub fn ensure_not_self(actor: &Identity, member_id: &str) -> GroupCalResult<()> {
    if actor.id == member_id {
        Err(GroupCalError::denied("You can't remove yourself"))
    } else {
        Ok(())
    }
}
