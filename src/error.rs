//! Error types used by the scheduler and its run loops.
//!
//! This module defines two error enums:
//!
//! - [`Error`] — synchronous errors returned to callers of [`Manager`](crate::Manager)
//!   operations (validation, lookup, config loading).
//! - [`RunError`] — failures inside a task's asynchronous run loop. These are
//!   never returned to a caller: the run loop has no synchronous caller, so
//!   they are absorbed into task state (status + note) and logs.
//!
//! Both types provide `as_label()` returning a short stable label for
//! structured log fields.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error as ThisError;

use crate::trigger::EntryId;

/// # Errors returned synchronously from manager operations.
///
/// Validation errors mean registration never occurred; lookup errors mean
/// the given entry id matched no registered task.
#[non_exhaustive]
#[derive(ThisError, Debug)]
pub enum Error {
    /// Task descriptor carried an empty name.
    #[error("task name is empty")]
    EmptyName,

    /// The combined five-field cron expression failed to parse.
    #[error("invalid cron expression {expr:?}: {reason}")]
    InvalidSchedule {
        /// The expression that was rejected.
        expr: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// No task is registered under the given entry id.
    #[error("task {id} not found")]
    NotFound {
        /// The id that matched nothing.
        id: EntryId,
    },

    /// Jobs file could not be read.
    #[error("failed to read config {path:?}: {source}")]
    ConfigRead {
        /// Path that was being read.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Jobs file was not valid YAML for the expected shape.
    #[error("failed to parse config {path:?}: {source}")]
    ConfigParse {
        /// Path that was being parsed.
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl Error {
    /// Returns a short stable label (snake_case) for use in log fields.
    ///
    /// # Example
    /// ```
    /// use cronvisor::Error;
    ///
    /// assert_eq!(Error::EmptyName.as_label(), "empty_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::EmptyName => "empty_name",
            Error::InvalidSchedule { .. } => "invalid_schedule",
            Error::NotFound { .. } => "not_found",
            Error::ConfigRead { .. } => "config_read",
            Error::ConfigParse { .. } => "config_parse",
        }
    }
}

/// # Failures inside a task's run loop.
///
/// Launch and exit failures count against the retry bound uniformly; a kill
/// failure is fatal to the invocation that attempted it (the process may
/// still be alive and must never be silently treated as dead).
#[non_exhaustive]
#[derive(ThisError, Debug)]
pub enum RunError {
    /// The executable could not be started.
    #[error("failed to launch {path:?}: {source}")]
    Launch {
        /// Executable that failed to start.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The process exited unsuccessfully (nonzero code or signal).
    #[error("{status}")]
    Exit {
        /// The exit status as reported by the OS.
        status: ExitStatus,
    },

    /// Waiting on the child failed at the OS level.
    #[error("failed to wait on pid {pid}: {source}")]
    Wait {
        /// Pid that was being awaited.
        pid: u32,
        #[source]
        source: io::Error,
    },

    /// SIGKILL could not be delivered.
    #[error("failed to kill pid {pid}: {source}")]
    Kill {
        /// Pid the signal was aimed at.
        pid: u32,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in log fields.
    ///
    /// # Example
    /// ```
    /// use cronvisor::RunError;
    ///
    /// let err = RunError::Kill {
    ///     pid: 42,
    ///     source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
    /// };
    /// assert_eq!(err.as_label(), "kill_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Launch { .. } => "launch_failed",
            RunError::Exit { .. } => "nonzero_exit",
            RunError::Wait { .. } => "wait_failed",
            RunError::Kill { .. } => "kill_failed",
        }
    }
}
