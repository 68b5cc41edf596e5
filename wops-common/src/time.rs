//! Date and timestamp utilities
//!
//! Spreadsheet dates are plain `DD/MM/YYYY` strings in local time.

use chrono::{DateTime, Local, NaiveDate};

/// Date format used by every date column
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Timestamp format used by "updated at" columns
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Get current local timestamp
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Today's date as `DD/MM/YYYY`
pub fn today() -> String {
    format_date(now().date_naive())
}

/// Current local time as `DD/MM/YYYY HH:MM`
pub fn timestamp() -> String {
    now().format(TIMESTAMP_FORMAT).to_string()
}

/// Format a calendar date as `DD/MM/YYYY`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
