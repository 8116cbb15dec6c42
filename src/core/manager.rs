//! # Manager: task registry and lifecycle coordinator.
//!
//! The manager owns the ordered task collection and is the sole integration
//! point with the trigger: it registers each task's run as the firing
//! callback, resolves entry ids for queries and removal, and drives startup
//! and shutdown.
//!
//! ## Architecture
//! ```text
//! descriptors (code or jobs file)
//!        │ add_task / load_config
//!        ▼
//! ┌─────────────────────────────────────────────┐
//! │ Manager                                     │
//! │  - tasks: Vec<Arc<Task>> (insertion order)  │
//! │  - trigger: CronTrigger                     │
//! └───────┬───────────────────────────┬─────────┘
//!         │ register(expr, task)      │ find / list / remove
//!         ▼                           ▼
//!    CronTrigger ── fires ──► Task::run()     TaskSnapshot + FireTimes
//! ```
//!
//! ## Rules
//! - The collection lock is distinct from any per-task lock and is never
//!   held across an await.
//! - Add is all-or-nothing: a compile or registration failure stores
//!   nothing.
//! - Removal unregisters from the trigger first, so no further firing races
//!   with it.
//! - Shutdown is best-effort: one task's kill failure never stops the rest.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::config;
use crate::error::Error;
use crate::tasks::{Task, TaskSnapshot, TaskSpec};
use crate::trigger::{CronTrigger, EntryId, JobRef};

/// Registry of scheduled tasks wired to one [`CronTrigger`].
///
/// Construct one explicitly and hand references to whatever boundary layer
/// needs it; all methods take `&self`.
///
/// # Example
/// ```no_run
/// use cronvisor::{Manager, TaskSpec};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), cronvisor::Error> {
/// let manager = Manager::new();
/// let mut spec = TaskSpec::new("heartbeat", "/usr/bin/touch");
/// spec.args = vec!["/tmp/heartbeat".into()];
/// spec.cron.minute = "*/5".into();
///
/// let id = manager.add_task(spec)?;
/// manager.start();
/// // ... later
/// manager.remove_task(id, "operator", "no longer needed")?;
/// manager.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct Manager {
    trigger: CronTrigger,
    tasks: Mutex<Vec<Arc<Task>>>,
    pid: u32,
}

impl Manager {
    /// Creates an empty manager with a stopped trigger.
    pub fn new() -> Self {
        Self {
            trigger: CronTrigger::new(),
            tasks: Mutex::new(Vec::new()),
            pid: std::process::id(),
        }
    }

    /// Compiles `spec`, registers its run with the trigger, and appends it
    /// to the collection. Returns the assigned entry id.
    ///
    /// Fails with the first compile or registration error; nothing is
    /// stored on failure.
    pub fn add_task(&self, spec: TaskSpec) -> Result<EntryId, Error> {
        let task = match Task::new(spec) {
            Ok(task) => task,
            Err(e) => {
                error!(label = e.as_label(), error = %e, "compiling task failed");
                return Err(e);
            }
        };

        let job: JobRef = task.clone();
        let id = match self.trigger.register(task.cron_expr(), job) {
            Ok(id) => id,
            Err(e) => {
                error!(task = task.name(), label = e.as_label(), error = %e, "registering task failed");
                return Err(e);
            }
        };
        task.bind_entry(id);

        info!(task = task.name(), entry = %id, cron = task.cron_expr(), "task added");
        self.tasks().push(task);
        Ok(id)
    }

    /// Reads a YAML jobs file and adds every descriptor in file order.
    ///
    /// Stops at the first failing descriptor; returns how many were added.
    pub fn load_config(&self, path: impl AsRef<Path>) -> Result<usize, Error> {
        let path = path.as_ref();
        let specs = config::read_specs(path)?;
        let mut added = 0;
        for spec in specs {
            self.add_task(spec)?;
            added += 1;
        }
        info!(path = %path.display(), added, "jobs loaded from config");
        Ok(added)
    }

    /// Unregisters the task from the trigger, terminates any live process,
    /// and drops it from the collection.
    pub fn remove_task(&self, id: EntryId, by: &str, reason: &str) -> Result<(), Error> {
        let mut tasks = self.tasks();
        let Some(pos) = tasks.iter().position(|t| t.entry() == id) else {
            warn!(entry = %id, "removal requested for unknown task");
            return Err(Error::NotFound { id });
        };

        self.trigger.unregister(id);
        let task = tasks.remove(pos);
        let killed = task.remove(by, reason);
        debug!(task = task.name(), entry = %id, killed, "task removed from registry");
        Ok(())
    }

    /// Snapshot of one task, paired with its live fire times.
    pub fn find_task(&self, id: EntryId) -> Result<TaskSnapshot, Error> {
        let snap = {
            let tasks = self.tasks();
            let task = tasks
                .iter()
                .find(|t| t.entry() == id)
                .ok_or(Error::NotFound { id })?;
            task.snapshot(false)
        };
        let times = self.trigger.lookup(id).unwrap_or_default();
        Ok(snap.with_fire_times(times))
    }

    /// Snapshots of every task in insertion order, each paired with its
    /// live fire times.
    pub fn find_all_tasks(&self) -> Vec<TaskSnapshot> {
        let snaps: Vec<TaskSnapshot> = self.tasks().iter().map(|t| t.snapshot(false)).collect();
        snaps
            .into_iter()
            .map(|snap| {
                let times = self.trigger.lookup(snap.id).unwrap_or_default();
                snap.with_fire_times(times)
            })
            .collect()
    }

    /// Bulk export of the collection, without fire times.
    pub fn clone_tasks(&self, clear_runtime: bool) -> Vec<TaskSnapshot> {
        self.tasks()
            .iter()
            .map(|t| t.snapshot(clear_runtime))
            .collect()
    }

    /// Fires every start-immediately task on its own context, then starts
    /// the trigger's dispatch loop.
    pub fn start(&self) {
        let tasks = self.tasks();
        info!(pid = self.pid, tasks = tasks.len(), "scheduler starting");
        for task in tasks.iter().filter(|t| t.spec().start_immediately) {
            let task = Arc::clone(task);
            tokio::spawn(async move {
                task.run().await;
            });
        }
        drop(tasks);

        self.trigger.start();
    }

    /// Stops the trigger, then removes every task best-effort.
    ///
    /// Tasks stay in the collection with their final status, so callers can
    /// still list outcomes after shutdown.
    pub fn shutdown(&self) {
        info!(pid = self.pid, "scheduler shutting down");
        self.trigger.stop();

        let tasks = self.tasks();
        for task in tasks.iter() {
            let killed = task.remove("manager", "shutdown");
            debug!(task = task.name(), killed, "shutdown removal");
        }
        info!(tasks = tasks.len(), "scheduler stopped");
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<Arc<Task>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
