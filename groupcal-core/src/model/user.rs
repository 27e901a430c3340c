use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Directory entry used to find a user by email when adding members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    /// Always stored lower-cased.
    pub email: String,
    pub display_name: String,
}

impl From<&Identity> for UserProfile {
    fn from(identity: &Identity) -> Self {
        UserProfile {
            id: identity.id.clone(),
            email: normalize_email(&identity.email),
            display_name: identity.display_label().to_string(),
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
