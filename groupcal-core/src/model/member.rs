use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GroupCalError;

/// Access level a member holds on a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including member management.
    Admin,
    /// May create events and delete their own upcoming ones.
    Editor,
    /// Read-only.
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = GroupCalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(GroupCalError::validation(format!(
                "Unknown role '{other}'. Expected admin, editor or viewer"
            ))),
        }
    }
}

/// Membership of one identity in one schedule.
///
/// Stored under the schedule's `members` collection keyed by `id`, so a
/// schedule holds at most one record per identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Identity key of the member.
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub added_at: DateTime<Utc>,
    /// Identity that added this member.
    pub added_by: String,
}
