//! Schedule trigger: cron registrations, fire-time lookup, dispatch loop.

mod job;
pub(crate) mod schedule;
#[allow(clippy::module_inception)]
mod trigger;

pub use job::{Job, JobFn, JobRef};
pub use trigger::{CronTrigger, EntryId, FireTimes};
