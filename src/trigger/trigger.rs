//! # CronTrigger: the schedule dispatch loop.
//!
//! Registrations map a five-field cron expression to a [`Job`](super::Job);
//! the dispatch loop sleeps until the earliest upcoming fire time, then runs
//! every due entry on its own spawned context. No dispatch context is ever
//! blocked by a job.
//!
//! ## Architecture
//! ```text
//! register(expr, job) ──► Entry { id, schedule, prev, next }
//!                               │
//!                               ▼
//! dispatch loop:  sleep_until(min next) ──► fire due entries
//!                      ▲                        │  (tokio::spawn per entry)
//!                      │                        ▼
//!                      └── recompute next ◄── prev = scheduled time
//!
//! register/unregister wake the loop; stop() ends it.
//! ```
//!
//! ## Rules
//! - Entry ids are assigned once, monotonically, and never reused.
//! - `prev` stays `None` until the entry's first firing.
//! - `stop()` is terminal: entries survive for lookups, nothing fires after.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use super::job::JobRef;
use super::schedule;
use crate::error::Error;

/// Sleep horizon while no entry has an upcoming fire time.
const IDLE_WAKE: Duration = Duration::from_secs(3600);

/// Opaque handle identifying one registration.
///
/// Zero is never assigned; it serves as the unset sentinel in cleared
/// snapshots.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    /// Raw id value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntryId {
    fn from(value: u64) -> Self {
        EntryId(value)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Previous and next fire times of one registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FireTimes {
    /// Scheduled time of the last firing; `None` before the first.
    pub prev: Option<DateTime<Utc>>,
    /// Upcoming fire time; `None` when the expression has no future match.
    pub next: Option<DateTime<Utc>>,
}

struct Entry {
    id: EntryId,
    schedule: Schedule,
    job: JobRef,
    prev: Option<DateTime<Utc>>,
    next: Option<DateTime<Utc>>,
}

/// Cron-driven job trigger.
///
/// Cheap to share: callers hold it by reference while the dispatch loop
/// holds the same state through an [`Arc`].
pub struct CronTrigger {
    inner: Arc<Inner>,
}

struct Inner {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
    changed: Notify,
    stop: CancellationToken,
    started: AtomicBool,
}

impl CronTrigger {
    /// Creates a trigger with no registrations and no running loop.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                changed: Notify::new(),
                stop: CancellationToken::new(),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Registers `job` under a five-field cron expression.
    ///
    /// The first upcoming fire time is computed immediately, so
    /// [`lookup`](Self::lookup) answers before the loop starts. Callable
    /// before or after [`start`](Self::start).
    pub fn register(&self, cron_expr: &str, job: JobRef) -> Result<EntryId, Error> {
        let schedule = schedule::parse_standard(cron_expr)?;
        let id = EntryId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let next = schedule::next_after(&schedule, Utc::now());

        self.inner.entries().push(Entry {
            id,
            schedule,
            job,
            prev: None,
            next,
        });
        self.inner.changed.notify_one();

        debug!(entry = %id, expr = cron_expr, "schedule registered");
        Ok(id)
    }

    /// Drops a registration. Unknown ids are a no-op.
    pub fn unregister(&self, id: EntryId) {
        self.inner.entries().retain(|e| e.id != id);
        self.inner.changed.notify_one();
        debug!(entry = %id, "schedule unregistered");
    }

    /// Fire times of one registration, `None` for unknown ids.
    pub fn lookup(&self, id: EntryId) -> Option<FireTimes> {
        self.inner.entries().iter().find(|e| e.id == id).map(|e| FireTimes {
            prev: e.prev,
            next: e.next,
        })
    }

    /// Spawns the dispatch loop on the current runtime. Idempotent.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::spawn(Inner::dispatch(Arc::clone(&self.inner)));
    }

    /// Ends the dispatch loop. Idempotent and terminal: registrations stay
    /// queryable, nothing fires afterwards.
    pub fn stop(&self) {
        self.inner.stop.cancel();
    }
}

impl Default for CronTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn dispatch(self: Arc<Self>) {
        debug!("dispatch loop running");
        loop {
            let wake = self.entries().iter().filter_map(|e| e.next).min();
            let sleep_for = match wake {
                Some(at) => (at - Utc::now()).to_std().unwrap_or(Duration::ZERO),
                None => IDLE_WAKE,
            };

            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = self.changed.notified() => continue,
                _ = time::sleep(sleep_for) => self.fire_due(),
            }
        }
        debug!("dispatch loop stopped");
    }

    /// Fires every entry whose next time has passed, each on its own
    /// context, and rolls prev/next forward.
    fn fire_due(&self) {
        let now = Utc::now();
        for entry in self.entries().iter_mut() {
            let Some(next) = entry.next else { continue };
            if next > now {
                continue;
            }

            let job = Arc::clone(&entry.job);
            let span = info_span!("entry", id = %entry.id);
            tokio::spawn(async move { job.run().await }.instrument(span));

            entry.prev = Some(next);
            entry.next = schedule::next_after(&entry.schedule, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::super::job::JobFn;
    use super::*;

    fn noop_job() -> JobRef {
        JobFn::arc(|| async {})
    }

    #[test]
    fn test_register_assigns_monotonic_ids() {
        let trigger = CronTrigger::new();
        let a = trigger.register("* * * * *", noop_job()).unwrap();
        let b = trigger.register("*/2 * * * *", noop_job()).unwrap();
        assert!(b > a);
        assert_ne!(a.value(), 0);
    }

    #[test]
    fn test_register_rejects_bad_expression() {
        let trigger = CronTrigger::new();
        assert!(matches!(
            trigger.register("not a cron", noop_job()),
            Err(Error::InvalidSchedule { .. })
        ));
        assert!(trigger.inner.entries().is_empty());
    }

    #[test]
    fn test_lookup_before_first_fire() {
        let trigger = CronTrigger::new();
        let id = trigger.register("* * * * *", noop_job()).unwrap();
        let times = trigger.lookup(id).unwrap();
        assert!(times.prev.is_none());
        let next = times.next.unwrap();
        assert!(next > Utc::now() - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_unregister_forgets_entry() {
        let trigger = CronTrigger::new();
        let id = trigger.register("* * * * *", noop_job()).unwrap();
        trigger.unregister(id);
        assert!(trigger.lookup(id).is_none());
        // unknown ids are a no-op
        trigger.unregister(EntryId::from(9999));
    }

    #[tokio::test]
    async fn test_fires_due_entry_and_rolls_times_forward() {
        let fired = Arc::new(AtomicUsize::new(0));
        let trigger = CronTrigger::new();
        let counter = Arc::clone(&fired);
        let job = JobFn::arc(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        let id = trigger.register("* * * * *", job).unwrap();
        trigger.start();

        // Backdate the entry so the loop sees it as due now.
        let due_at = Utc::now() - chrono::Duration::seconds(1);
        trigger
            .inner
            .entries()
            .iter_mut()
            .find(|e| e.id == id)
            .unwrap()
            .next = Some(due_at);
        trigger.inner.changed.notify_one();

        let mut waited = 0;
        while fired.load(Ordering::SeqCst) == 0 && waited < 500 {
            time::sleep(Duration::from_millis(10)).await;
            waited += 1;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let times = trigger.lookup(id).unwrap();
        assert_eq!(times.prev, Some(due_at));
        assert!(times.next.unwrap() > Utc::now());
        trigger.stop();
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let trigger = CronTrigger::new();
        trigger.start();
        trigger.start();
        trigger.stop();
        trigger.stop();
        // registrations stay queryable after stop
        let id = trigger.register("* * * * *", noop_job()).unwrap();
        assert!(trigger.lookup(id).is_some());
    }
}
