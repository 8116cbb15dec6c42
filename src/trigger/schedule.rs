//! Five-field cron parsing and fire-time math.
//!
//! The public contract is standard five-field syntax
//! (`minute hour day-of-month month day-of-week`). The underlying parser
//! wants a seconds column, so a fixed `0` is prepended after validating the
//! field count — without that check a six-field input would silently
//! re-interpret every column.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::Error;

/// Parses a standard five-field cron expression.
pub fn parse_standard(expr: &str) -> Result<Schedule, Error> {
    let count = expr.split_whitespace().count();
    if count != 5 {
        return Err(Error::InvalidSchedule {
            expr: expr.to_string(),
            reason: format!("expected 5 fields, found {count}"),
        });
    }
    Schedule::from_str(&format!("0 {expr}")).map_err(|e| Error::InvalidSchedule {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

/// First fire time strictly after `after`, `None` when the schedule has no
/// future match.
pub fn next_after(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}
