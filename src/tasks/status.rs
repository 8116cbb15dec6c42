//! Task lifecycle states and the legal-transition table.
//!
//! Transitions happen only through [`Task`](crate::Task) under its runtime
//! lock; the table here is plain data so tests can enumerate every pair.
//!
//! ```text
//!            ┌──────────► Done ────┐
//!            │                     │
//! Created ─► Running ─► Failed ◄───┼──► Removed (terminal)
//!    │          │  ▲       │       │
//!    │          │  └───────┘       │
//!    └──────────┤   (re-fired)     │
//!               ▼                  │
//!            Cancelled ────────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Compiled and registered, never run.
    Created,
    /// A live process is executing; pid is populated.
    Running,
    /// Last attempt failed to launch, exited unsuccessfully, or could not be killed.
    Failed,
    /// Superseded: a newer firing killed the in-flight process.
    Cancelled,
    /// Explicitly removed; terminal.
    Removed,
    /// Last attempt exited successfully.
    Done,
}

impl Status {
    /// Every state, in declaration order.
    pub const ALL: [Status; 6] = [
        Status::Created,
        Status::Running,
        Status::Failed,
        Status::Cancelled,
        Status::Removed,
        Status::Done,
    ];

    /// States legally reachable from `self`.
    ///
    /// `Created → Failed` covers a launch failure on the first-ever attempt;
    /// everything else must pass through `Running` first. `Removed` has no
    /// successors.
    pub fn successors(self) -> &'static [Status] {
        match self {
            Status::Created => &[Status::Running, Status::Failed],
            Status::Running => &[
                Status::Failed,
                Status::Cancelled,
                Status::Removed,
                Status::Done,
            ],
            Status::Failed => &[Status::Running, Status::Removed],
            Status::Cancelled => &[Status::Running, Status::Removed],
            Status::Done => &[Status::Running, Status::Removed],
            Status::Removed => &[],
        }
    }

    /// Whether moving from `self` to `to` is legal.
    pub fn can_transition(self, to: Status) -> bool {
        self.successors().contains(&to)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Created => "created",
            Status::Running => "running",
            Status::Failed => "failed",
            Status::Cancelled => "cancelled",
            Status::Removed => "removed",
            Status::Done => "done",
        };
        f.write_str(s)
    }
}
