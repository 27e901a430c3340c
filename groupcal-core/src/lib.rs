//! Shared group schedules.
//!
//! This crate holds everything groupcal front-ends build on:
//! - schedules, members, roles and events (`model`)
//! - recurrence expansion and event series construction
//! - role-based permission checks
//! - day and month aggregation for calendar views
//! - series deletion
//! - a document store with atomic batches and live subscriptions
//!
//! [`ScheduleService`] ties these together into user-level operations.

pub mod access;
pub mod aggregate;
pub mod constants;
pub mod deletion;
pub mod error;
pub mod groupcal_config;
pub mod identity;
pub mod model;
pub mod notify;
pub mod recurrence;
pub mod series;
pub mod service;
pub mod store;

pub use access::{RoleResolution, resolve_role, role_of};
pub use aggregate::{CalendarMonth, DayGroup, MonthGrid, group_by_date, list_view, month_grid};
pub use deletion::{DeleteChoice, DeletionPlan, execute_deletion, resolve_series_deletion};
pub use error::{ErrorKind, GroupCalError, GroupCalResult};
pub use groupcal_config::GroupCalConfig;
pub use identity::{FixedIdentityProvider, Identity, IdentityProvider};
pub use model::{Event, Member, RecurrenceType, Role, Schedule, UserProfile};
pub use notify::{NoticeKind, Notifier};
pub use recurrence::expand;
pub use series::{EventDraft, EventSeries, RecurrenceRule, build_event_series, latest_event_date};
pub use service::{OpenSchedule, ScheduleService};
pub use store::{DocumentStore, FileStore, MemoryStore};
