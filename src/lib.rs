//! # cronvisor
//!
//! **Cronvisor** is a lightweight process-oriented job scheduler for Rust.
//!
//! It launches external executables on cron-style schedules, tracks per-job
//! run state behind a queryable live registry, prevents overlapping
//! executions of the same job, retries failed runs up to a bound, and
//! supports safe cancellation and removal of in-flight jobs. The crate is
//! designed as a building block for daemons and API servers that need an
//! in-process job runner.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   TaskSpec   │   │   TaskSpec   │   │   TaskSpec   │
//!     │ (job #1)     │   │ (job #2)     │   │ (job #3)     │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ add_task         ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Manager (registry + lifecycle coordinator)                   │
//! │  - tasks: ordered collection of Task (insertion order)        │
//! │  - trigger: CronTrigger (dispatch loop, fire-time lookup)     │
//! │  - add / remove / find / list / start / shutdown              │
//! └──────┬──────────────────────┬─────────────────────────┬──────┘
//!        │ register(expr, task) │ fires on schedule       │ queries
//!        ▼                      ▼                         ▼
//!   CronTrigger ──spawn──► Task::run()             TaskSnapshot
//!                               │                  (+ FireTimes)
//!                               ▼
//!                     ┌──────────────────┐
//!                     │ retry loop       │
//!                     │ spawn ─► wait    │──► OS process
//!                     └──────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! TaskSpec ──► Manager::add_task ──► CronTrigger ──► Task::run()
//!
//! run() {
//!   ├─► Removed?  ─► return (late firing, no-op)
//!   ├─► Running?  ─► kill previous process
//!   │        ├─ ok    ─► Cancelled
//!   │        └─ error ─► Failed, return (never two live processes)
//!   ├─► acquire admission permit (previous loop fully finished)
//!   └─► loop, up to max_retries + 1 attempts {
//!         ├─► spawn(path, args, workdir)
//!         │     ├─ error ─► Failed, next attempt
//!         │     └─ ok    ─► Running (pid captured)
//!         ├─► wait for exit
//!         │     ├─ success ─► Done, exit loop
//!         │     └─ failure ─► Failed
//!         └─► Cancelled/Removed externally? ─► stop retrying
//!       }
//! }
//!
//! Manager::remove_task / shutdown: unregister from the trigger first,
//! then kill any live process and mark the task Removed.
//! ```
//!
//! ## Features
//! | Area          | Description                                                       | Key types / traits              |
//! |---------------|-------------------------------------------------------------------|---------------------------------|
//! | **Tasks**     | Describe jobs as plain data, compile to cron expressions.         | [`TaskSpec`], [`ScheduleSpec`]  |
//! | **Lifecycle** | Data-driven state machine with single-flight runs.                | [`Task`], [`Status`]            |
//! | **Registry**  | Add/remove/query live tasks, config-file loading.                 | [`Manager`], [`TaskSnapshot`]   |
//! | **Trigger**   | Cron dispatch loop with prev/next fire-time lookup.               | [`CronTrigger`], [`Job`]        |
//! | **Errors**    | Typed errors for validation, lookup, and run-loop failures.       | [`Error`], [`RunError`]         |
//!
//! ## Example
//! ```no_run
//! use cronvisor::{wait_for_shutdown_signal, Manager, TaskSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = Manager::new();
//!
//!     // A job that runs every five minutes.
//!     let mut spec = TaskSpec::new("heartbeat", "/usr/bin/touch");
//!     spec.args = vec!["/tmp/heartbeat".into()];
//!     spec.cron.minute = "*/5".into();
//!     manager.add_task(spec)?;
//!
//!     manager.start();
//!     wait_for_shutdown_signal().await?;
//!     manager.shutdown();
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod process;
mod tasks;
mod trigger;

// ---- Public re-exports ----

pub use core::{wait_for_shutdown_signal, Manager};
pub use error::{Error, RunError};
pub use tasks::{ScheduleSpec, Status, Task, TaskSnapshot, TaskSpec};
pub use trigger::{CronTrigger, EntryId, FireTimes, Job, JobFn, JobRef};
