//! Serializable task views for listing and query APIs.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::trigger::{EntryId, FireTimes};

use super::spec::ScheduleSpec;
use super::status::Status;

/// Value copy of one task: identity + descriptor + runtime snapshot,
/// optionally paired with trigger fire times.
///
/// Serializes as a flat camelCase object with empty runtime fields omitted,
/// ready to embed in an API response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub name: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    pub cron: ScheduleSpec,
    pub start_immediately: bool,
    pub max_retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_secs: Option<u64>,

    /// Trigger entry id; zero in cleared snapshots.
    pub id: EntryId,
    pub cron_expr: String,

    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "pid_is_zero")]
    pub pid: u32,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_fire: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire: Option<DateTime<Utc>>,
}

impl TaskSnapshot {
    /// Attaches the trigger's live fire times.
    pub fn with_fire_times(mut self, times: FireTimes) -> Self {
        self.prev_fire = times.prev;
        self.next_fire = times.next;
        self
    }
}

fn pid_is_zero(pid: &u32) -> bool {
    *pid == 0
}
