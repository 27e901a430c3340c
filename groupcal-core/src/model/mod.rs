//! Records stored for a shared schedule.
//!
//! Everything here is plain data: (de)serializable with camelCase keys so the
//! records round-trip through any [`DocumentStore`](crate::store::DocumentStore).

mod event;
mod member;
mod schedule;
mod user;

pub use event::{Event, RecurrenceType};
pub use member::{Member, Role};
pub use schedule::Schedule;
pub use user::UserProfile;
pub(crate) use user::normalize_email;
