//! # Task: runtime state and the single-flight run loop.
//!
//! One [`Task`] owns one schedulable job: the immutable descriptor it was
//! compiled from, its mutable runtime state behind a mutex, and a capacity-1
//! admission semaphore serializing successive firings.
//!
//! ## Architecture
//! ```text
//! trigger firing ──► Task::run()
//!
//!   ├─► Removed?          ──► return (late callback, no-op)
//!   ├─► Running?          ──► kill(pid)
//!   │     ├─ ok           ──► status = Cancelled
//!   │     └─ error        ──► status = Failed, return (never double-start)
//!   ├─► acquire admission permit (blocks until the previous loop is done)
//!   └─► retry loop, up to max_retries + 1 attempts:
//!         ├─► spawn(path, args, workdir)
//!         │     ├─ error  ──► status = Failed, next attempt
//!         │     └─ ok     ──► status = Running (pid captured)
//!         ├─► wait for exit
//!         │     ├─ success──► status = Done, loop ends
//!         │     └─ failure──► status = Failed
//!         └─► externally Cancelled/Removed? ──► stop retrying
//! ```
//!
//! ## Rules
//! - The runtime mutex is held only for state reads/updates, never across
//!   spawn or wait.
//! - The admission permit is held for one whole retry loop and released on
//!   every exit path.
//! - Pid is non-zero exactly while Running; every other state clears it.
//! - Illegal transitions are rejected and logged, state unchanged.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::error::{Error, RunError};
use crate::process;
use crate::trigger::{EntryId, Job};

use super::snapshot::TaskSnapshot;
use super::spec::TaskSpec;
use super::status::Status;

/// Mutable runtime fields, guarded by the task's mutex.
struct Runtime {
    status: Status,
    pid: u32,
    created_at: DateTime<Utc>,
    start_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    note: Option<String>,
}

impl Runtime {
    fn fresh() -> Self {
        Self {
            status: Status::Created,
            pid: 0,
            created_at: Utc::now(),
            start_at: None,
            updated_at: None,
            note: None,
        }
    }
}

/// One schedulable job: compiled descriptor plus live state.
///
/// Created by [`Task::new`] from a valid [`TaskSpec`]; shared behind an
/// [`Arc`] between the trigger (which fires [`Task::run`]) and the manager
/// (which queries and removes).
pub struct Task {
    spec: TaskSpec,
    cron_expr: String,
    entry: OnceLock<EntryId>,
    gate: Arc<Semaphore>,
    runtime: Mutex<Runtime>,
}

impl Task {
    /// Compiles `spec` and builds a task with pristine runtime state.
    ///
    /// Fails with the spec's validation errors; on success the task is
    /// `Created`, pid 0, admission permit free.
    pub fn new(spec: TaskSpec) -> Result<Arc<Self>, Error> {
        let cron_expr = spec.compile()?;
        Ok(Arc::new(Self {
            spec,
            cron_expr,
            entry: OnceLock::new(),
            gate: Arc::new(Semaphore::new(1)),
            runtime: Mutex::new(Runtime::fresh()),
        }))
    }

    /// Job name from the descriptor.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// The descriptor this task was compiled from.
    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    /// The compiled five-field cron expression.
    pub fn cron_expr(&self) -> &str {
        &self.cron_expr
    }

    /// Trigger entry id; zero until the manager binds one.
    pub fn entry(&self) -> EntryId {
        self.entry.get().copied().unwrap_or_default()
    }

    pub(crate) fn bind_entry(&self, id: EntryId) {
        if self.entry.set(id).is_err() {
            warn!(task = %self.spec.name, entry = %id, "entry id already bound");
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> Status {
        self.state().status
    }

    /// Trigger-invoked entry point: one firing.
    ///
    /// Late firings on a removed task are no-ops. A firing that finds the
    /// previous process still running kills it (superseding it) before
    /// queueing on the admission permit; if that kill fails the invocation
    /// aborts rather than risk two live processes.
    pub async fn run(&self) {
        {
            let mut state = self.state();
            match state.status {
                Status::Removed => {
                    debug!(task = %self.spec.name, "firing ignored: task removed");
                    return;
                }
                Status::Running => {
                    let pid = state.pid;
                    match process::kill(pid) {
                        Ok(()) => {
                            self.apply(
                                &mut state,
                                Status::Cancelled,
                                Some("superseded by a newer firing".to_string()),
                                0,
                            );
                        }
                        Err(e) => {
                            let err = RunError::Kill { pid, source: e };
                            warn!(
                                task = %self.spec.name,
                                pid,
                                label = err.as_label(),
                                "in-flight process survived kill; not starting another"
                            );
                            self.apply(&mut state, Status::Failed, Some(err.to_string()), 0);
                            return;
                        }
                    }
                }
                _ => {}
            }
        }

        let _permit = match Arc::clone(&self.gate).acquire_owned().await {
            Ok(permit) => permit,
            Err(_closed) => return,
        };
        if self.status() == Status::Removed {
            return;
        }

        self.retry_loop().await;
    }

    /// Bounded retry loop: `max_retries + 1` attempts, each with a fresh
    /// process handle. Launch failures and unsuccessful exits count against
    /// the bound uniformly.
    async fn retry_loop(&self) {
        let attempts = self.spec.max_retries.saturating_add(1);
        for attempt in 1..=attempts {
            if attempt > 1 {
                if let Some(delay) = self.spec.retry_delay() {
                    time::sleep(delay).await;
                }
                let status = self.status();
                if matches!(status, Status::Cancelled | Status::Removed) {
                    debug!(task = %self.spec.name, %status, attempt, "retrying abandoned");
                    return;
                }
            }

            let handle = match process::spawn(
                &self.spec.path,
                &self.spec.args,
                self.spec.work_dir.as_deref(),
            ) {
                Ok(handle) => handle,
                Err(e) => {
                    let err = RunError::Launch {
                        path: self.spec.path.clone(),
                        source: e,
                    };
                    self.record_failure(attempt, attempts, &err);
                    continue;
                }
            };

            let pid = handle.pid();
            let started = {
                let mut state = self.state();
                self.apply(&mut state, Status::Running, None, pid)
            };
            if !started {
                // Removal won the race against this spawn; the fresh child
                // must not outlive the task.
                if let Err(e) = process::kill(pid) {
                    let err = RunError::Kill { pid, source: e };
                    warn!(
                        task = %self.spec.name,
                        pid,
                        label = err.as_label(),
                        "could not kill child spawned past removal"
                    );
                }
                let _ = handle.wait().await;
                return;
            }

            info!(
                task = %self.spec.name,
                entry = %self.entry(),
                pid,
                attempt,
                "process started"
            );

            match handle.wait().await {
                Ok(status) if status.success() => {
                    self.update_status(Status::Done, None);
                    return;
                }
                Ok(status) => {
                    let err = RunError::Exit { status };
                    self.record_failure(attempt, attempts, &err);
                }
                Err(e) => {
                    let err = RunError::Wait { pid, source: e };
                    self.record_failure(attempt, attempts, &err);
                }
            }
        }

        debug!(task = %self.spec.name, attempts, "attempts exhausted");
    }

    fn record_failure(&self, attempt: u32, attempts: u32, err: &RunError) {
        debug!(
            task = %self.spec.name,
            attempt,
            attempts,
            label = err.as_label(),
            "attempt failed"
        );
        self.update_status(
            Status::Failed,
            Some(format!("attempt {attempt}/{attempts}: {err}")),
        );
    }

    /// Thread-safe transition request.
    ///
    /// Validated against the table in [`Status::successors`]; rejected
    /// transitions leave state unchanged and return `false`. On success the
    /// note replaces the previous one (`None` clears it) and pid is cleared
    /// unless the new state is `Running` — only the run loop, which holds
    /// the live handle, populates a pid.
    pub fn update_status(&self, to: Status, note: Option<String>) -> bool {
        let mut state = self.state();
        let pid = state.pid;
        self.apply(&mut state, to, note, pid)
    }

    /// Kills the in-flight process if Running and marks the task `Removed`.
    ///
    /// Returns whether a live process was actually terminated. When the
    /// kill fails the task is left `Failed` instead — a process that might
    /// still be alive is never reported removed.
    pub fn remove(&self, by: &str, reason: &str) -> bool {
        let mut state = self.state();
        let mut killed = false;

        if state.status == Status::Running && state.pid != 0 {
            let pid = state.pid;
            match process::kill(pid) {
                Ok(()) => killed = true,
                Err(e) => {
                    let err = RunError::Kill { pid, source: e };
                    warn!(
                        task = %self.spec.name,
                        pid,
                        label = err.as_label(),
                        "removal could not kill process"
                    );
                    self.apply(&mut state, Status::Failed, Some(err.to_string()), 0);
                    return false;
                }
            }
        }

        self.apply(
            &mut state,
            Status::Removed,
            Some(format!("by: {by}, reason: {reason}")),
            0,
        );
        killed
    }

    /// Value copy of descriptor + runtime, safe to hand out.
    ///
    /// With `clear_runtime` the copy reports pristine state (Created, pid 0,
    /// unset entry id, fresh created-at) regardless of the live task, which
    /// stays untouched either way.
    pub fn snapshot(&self, clear_runtime: bool) -> TaskSnapshot {
        let state = self.state();
        let mut snap = TaskSnapshot {
            name: self.spec.name.clone(),
            path: self.spec.path.clone(),
            args: self.spec.args.clone(),
            work_dir: self.spec.work_dir.clone(),
            cron: self.spec.cron.clone(),
            start_immediately: self.spec.start_immediately,
            max_retries: self.spec.max_retries,
            retry_delay_secs: self.spec.retry_delay_secs,
            id: self.entry(),
            cron_expr: self.cron_expr.clone(),
            created_at: state.created_at,
            start_at: state.start_at,
            updated_at: state.updated_at,
            pid: state.pid,
            status: state.status,
            note: state.note.clone(),
            prev_fire: None,
            next_fire: None,
        };
        drop(state);

        if clear_runtime {
            snap.id = EntryId::default();
            snap.created_at = Utc::now();
            snap.start_at = None;
            snap.updated_at = None;
            snap.pid = 0;
            snap.status = Status::Created;
            snap.note = None;
        }
        snap
    }

    fn state(&self) -> MutexGuard<'_, Runtime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies one transition under an already-held guard.
    ///
    /// `pid` is recorded only when entering `Running`; every other state
    /// clears the field. A `Failed → Failed` request is not a transition
    /// but refreshes the note, keeping consecutive launch errors visible.
    fn apply(&self, state: &mut Runtime, to: Status, note: Option<String>, pid: u32) -> bool {
        let from = state.status;

        if !from.can_transition(to) {
            if from == Status::Failed && to == Status::Failed {
                state.note = note;
                state.updated_at = Some(Utc::now());
                return false;
            }
            warn!(
                task = %self.spec.name,
                entry = %self.entry(),
                %from,
                %to,
                "illegal status transition rejected"
            );
            return false;
        }

        state.status = to;
        state.updated_at = Some(Utc::now());
        state.note = note;
        if to == Status::Running {
            state.pid = pid;
            state.start_at = Some(Utc::now());
        } else {
            state.pid = 0;
        }

        let name = self.spec.name.as_str();
        let entry = self.entry();
        let note = state.note.as_deref();
        match to {
            Status::Failed => {
                error!(task = name, entry = %entry, %from, %to, note, "status updated")
            }
            Status::Cancelled | Status::Removed => {
                warn!(task = name, entry = %entry, %from, %to, note, "status updated")
            }
            _ => info!(task = name, entry = %entry, %from, %to, note, "status updated"),
        }
        true
    }
}

#[async_trait]
impl Job for Task {
    async fn run(&self) {
        Task::run(self).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Arc<Task> {
        Task::new(TaskSpec::new("unit", "/bin/true")).unwrap()
    }

    #[test]
    fn test_new_task_is_pristine() {
        let t = task();
        assert_eq!(t.status(), Status::Created);
        assert_eq!(t.entry(), EntryId::default());
        assert_eq!(t.cron_expr(), "* * * * *");
        let snap = t.snapshot(false);
        assert_eq!(snap.pid, 0);
        assert!(snap.start_at.is_none());
        assert!(snap.note.is_none());
    }

    #[test]
    fn test_new_rejects_invalid_spec() {
        assert!(Task::new(TaskSpec::new("", "/bin/true")).is_err());
    }

    #[test]
    fn test_illegal_transition_leaves_state_unchanged() {
        let t = task();
        assert!(!t.update_status(Status::Done, Some("nope".into())));
        assert_eq!(t.status(), Status::Created);
        assert!(t.snapshot(false).note.is_none());
    }

    #[test]
    fn test_first_launch_failure_is_recordable() {
        let t = task();
        assert!(t.update_status(Status::Failed, Some("attempt 1/1: boom".into())));
        assert_eq!(t.status(), Status::Failed);
        assert_eq!(t.snapshot(false).note.as_deref(), Some("attempt 1/1: boom"));
    }

    #[test]
    fn test_repeated_failure_refreshes_note_without_transition() {
        let t = task();
        assert!(t.update_status(Status::Failed, Some("first".into())));
        assert!(!t.update_status(Status::Failed, Some("second".into())));
        assert_eq!(t.status(), Status::Failed);
        assert_eq!(t.snapshot(false).note.as_deref(), Some("second"));
    }

    #[test]
    fn test_removed_is_terminal() {
        let t = task();
        assert!(t.update_status(Status::Failed, None));
        assert!(t.update_status(Status::Removed, None));
        for to in Status::ALL {
            assert!(!t.update_status(to, None));
        }
        assert_eq!(t.status(), Status::Removed);
    }

    #[test]
    fn test_remove_without_live_process_reports_nothing_killed() {
        let t = task();
        assert!(t.update_status(Status::Failed, None));
        assert!(!t.remove("tests", "cleanup"));
        assert_eq!(t.status(), Status::Removed);
        let note = t.snapshot(false).note.unwrap();
        assert!(note.contains("by: tests"));
        assert!(note.contains("reason: cleanup"));
    }

    #[test]
    fn test_remove_never_run_task_keeps_created() {
        // Created has no Removed edge; the manager still drops the task,
        // but its final recorded state stays Created.
        let t = task();
        assert!(!t.remove("tests", "early"));
        assert_eq!(t.status(), Status::Created);
    }

    #[test]
    fn test_bind_entry_is_write_once() {
        let t = task();
        t.bind_entry(EntryId::from(7));
        t.bind_entry(EntryId::from(8));
        assert_eq!(t.entry(), EntryId::from(7));
    }

    #[test]
    fn test_cleared_snapshot_reports_pristine_state() {
        let t = task();
        t.bind_entry(EntryId::from(3));
        t.update_status(Status::Failed, Some("boom".into()));

        let snap = t.snapshot(true);
        assert_eq!(snap.status, Status::Created);
        assert_eq!(snap.id, EntryId::default());
        assert_eq!(snap.pid, 0);
        assert!(snap.note.is_none());
        assert!(snap.updated_at.is_none());

        // the live task is untouched
        assert_eq!(t.status(), Status::Failed);
        assert_eq!(t.entry(), EntryId::from(3));
    }
}
