//! Domain services
//!
//! Each service owns a handle to the row store and the names of the tables
//! it reads. Handlers call into these; nothing here knows about HTTP.

pub mod allocator;
pub mod attendance;
pub mod auth;
pub mod collectors;
pub mod roster;
pub mod summary;

pub use allocator::{BoxAllocator, CargoFilter};
pub use attendance::AttendanceService;
pub use auth::{AuthService, Session};
pub use collectors::{CollectorCounts, CollectorRegistry};
pub use roster::{AddOutcome, Candidate, CommitReport, CommitTuple, RosterService};
pub use summary::DailySummary;

use wops_common::{Error, Result};

/// Trimmed `value`, or a validation error naming `name` when it is empty
pub(crate) fn required<'a>(value: &'a str, name: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", name)));
    }
    Ok(value)
}
