//! The acting identity, passed explicitly into every operation.
//!
//! Sign-up and login live outside this crate. Whatever performs them exposes
//! the signed-in user through [`IdentityProvider`].

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{GroupCalError, GroupCalResult};

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(id: &str, email: &str, display_name: Option<&str>) -> Self {
        Identity {
            id: id.to_string(),
            email: email.to_string(),
            display_name: display_name.map(String::from),
        }
    }

    /// Display name, falling back to the email address.
    pub fn display_label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

/// Source of the currently signed-in identity.
pub trait IdentityProvider {
    fn current_identity(&self) -> Option<Identity>;

    /// Observe sign-in / sign-out transitions.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;

    /// The signed-in identity, or an authorization error when nobody is.
    fn require_identity(&self) -> GroupCalResult<Identity> {
        self.current_identity()
            .ok_or_else(|| GroupCalError::Authorization("Not signed in".into()))
    }
}

/// Provider backed by a watch channel; sign-in state is changed by the owner.
pub struct FixedIdentityProvider {
    tx: watch::Sender<Option<Identity>>,
}

impl FixedIdentityProvider {
    pub fn new(identity: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(identity);
        FixedIdentityProvider { tx }
    }

    pub fn sign_in(&self, identity: Identity) {
        self.tx.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    /// Follow a freshly read identity: sign in when it names someone else,
    /// sign out when it is gone. Returns whether anything changed.
    pub fn follow(&self, latest: Option<Identity>) -> bool {
        self.tx.send_if_modified(|current| {
            let same = match (current.as_ref(), latest.as_ref()) {
                (Some(a), Some(b)) => a.id == b.id,
                (None, None) => true,
                _ => false,
            };
            if !same {
                *current = latest;
            }
            !same
        })
    }
}

impl IdentityProvider for FixedIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}
