//! Limits shared across the crate.

/// Upper bound on occurrences produced by a single recurrence request.
pub const MAX_OCCURRENCES: usize = 100;

/// Events shown in one month-grid cell before collapsing into "+N more".
pub const MONTH_CELL_EVENT_LIMIT: usize = 3;

/// Collection holding one record per known user.
pub const USERS_COLLECTION: &str = "users";

/// Top-level collection of schedules.
pub const SCHEDULES_COLLECTION: &str = "schedules";
