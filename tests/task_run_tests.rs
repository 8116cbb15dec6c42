//! Run-loop properties driven with real executables: bounded retry,
//! overlap cancellation, removal, and pid bookkeeping.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use cronvisor::{Status, Task, TaskSpec};

/// Polls until `cond` holds, panicking after a generous timeout.
async fn wait_for<F: Fn() -> bool>(what: &str, cond: F) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Whether `pid` refers to a live (unreaped) process.
fn pid_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

fn sleeper(secs: &str) -> TaskSpec {
    let mut spec = TaskSpec::new("sleeper", "/bin/sleep");
    spec.args = vec![secs.to_string()];
    spec
}

#[tokio::test]
async fn test_successful_run_reaches_done_and_clears_pid() {
    let task = Task::new(TaskSpec::new("ok", "/bin/true")).unwrap();
    task.run().await;

    let snap = task.snapshot(false);
    assert_eq!(snap.status, Status::Done);
    assert_eq!(snap.pid, 0);
    assert!(snap.start_at.is_some());
    assert!(snap.note.is_none());
}

#[tokio::test]
async fn test_retry_bound_with_always_failing_command() {
    // max_retries = 2 -> exactly 3 attempts, final status Failed.
    let mut spec = TaskSpec::new("t1", "/bin/false");
    spec.max_retries = 2;
    let task = Task::new(spec).unwrap();

    task.run().await;

    let snap = task.snapshot(false);
    assert_eq!(snap.status, Status::Failed);
    assert_eq!(snap.pid, 0);
    let note = snap.note.expect("failure note recorded");
    assert!(note.contains("attempt 3/3"), "note was {note:?}");
}

#[tokio::test]
async fn test_retry_bound_with_missing_executable() {
    let mut spec = TaskSpec::new("ghost", "/definitely/not/here");
    spec.max_retries = 1;
    let task = Task::new(spec).unwrap();

    task.run().await;

    let snap = task.snapshot(false);
    assert_eq!(snap.status, Status::Failed);
    let note = snap.note.expect("launch failure recorded");
    assert!(note.contains("attempt 2/2"), "note was {note:?}");
    assert!(note.contains("failed to launch"), "note was {note:?}");
}

#[tokio::test]
async fn test_pid_is_nonzero_exactly_while_running() {
    let task = Task::new(sleeper("600")).unwrap();
    assert_eq!(task.snapshot(false).pid, 0);

    let runner = Arc::clone(&task);
    let handle = tokio::spawn(async move { runner.run().await });

    let probe = Arc::clone(&task);
    wait_for("task to start", || probe.status() == Status::Running).await;
    let pid = task.snapshot(false).pid;
    assert_ne!(pid, 0);
    assert!(pid_alive(pid));

    assert!(task.remove("tests", "cleanup"));
    handle.await.unwrap();
    assert_eq!(task.snapshot(false).pid, 0);
}

#[tokio::test]
async fn test_overlapping_firing_cancels_the_previous_process() {
    // A one-second retry delay keeps the first invocation parked between
    // attempts after its process is killed, so the Cancelled window is
    // observable before the second invocation takes over.
    let mut spec = sleeper("1");
    spec.max_retries = 1;
    spec.retry_delay_secs = Some(1);
    let task = Task::new(spec).unwrap();

    let first = Arc::clone(&task);
    let first_run = tokio::spawn(async move { first.run().await });

    let probe = Arc::clone(&task);
    wait_for("first process to start", || probe.status() == Status::Running).await;
    let first_pid = task.snapshot(false).pid;
    assert_ne!(first_pid, 0);

    // Second firing before the first completes.
    let second = Arc::clone(&task);
    let second_run = tokio::spawn(async move { second.run().await });

    let probe = Arc::clone(&task);
    wait_for("cancellation", || probe.status() == Status::Cancelled).await;
    wait_for("first process to die", || !pid_alive(first_pid)).await;

    // The superseding firing starts its own process and finishes normally.
    let probe = Arc::clone(&task);
    wait_for("second process to start", || {
        let snap = probe.snapshot(false);
        snap.status == Status::Running && snap.pid != first_pid
    })
    .await;
    let second_pid = task.snapshot(false).pid;
    assert!(pid_alive(second_pid));
    assert!(!pid_alive(first_pid));

    first_run.await.unwrap();
    second_run.await.unwrap();
    assert_eq!(task.status(), Status::Done);
}

#[tokio::test]
async fn test_no_retry_after_cancellation() {
    // A killed attempt with retries still budgeted: the superseded loop
    // must abandon its remaining attempts, otherwise it would respawn the
    // sleeper itself and never return.
    let mut spec = sleeper("600");
    spec.max_retries = 3;
    spec.retry_delay_secs = Some(1);
    let task = Task::new(spec).unwrap();

    let first = Arc::clone(&task);
    let first_run = tokio::spawn(async move { first.run().await });

    let probe = Arc::clone(&task);
    wait_for("first process to start", || probe.status() == Status::Running).await;
    let first_pid = task.snapshot(false).pid;

    let second = Arc::clone(&task);
    let second_run = tokio::spawn(async move { second.run().await });

    let probe = Arc::clone(&task);
    wait_for("cancellation", || probe.status() == Status::Cancelled).await;

    // The first loop observes the cancellation during its retry delay and
    // returns; the second firing then owns the only live process.
    tokio::time::timeout(Duration::from_secs(10), first_run)
        .await
        .expect("superseded loop must give up retrying")
        .unwrap();

    let probe = Arc::clone(&task);
    wait_for("second process to start", || {
        let snap = probe.snapshot(false);
        snap.status == Status::Running && snap.pid != first_pid
    })
    .await;
    assert!(!pid_alive(first_pid));

    assert!(task.remove("tests", "teardown"));
    second_run.await.unwrap();
}

#[tokio::test]
async fn test_firings_on_a_removed_task_are_no_ops() {
    let task = Task::new(TaskSpec::new("gone", "/bin/true")).unwrap();
    task.run().await;
    assert_eq!(task.status(), Status::Done);

    assert!(!task.remove("tests", "done with it"));
    assert_eq!(task.status(), Status::Removed);

    task.run().await;
    task.run().await;
    assert_eq!(task.status(), Status::Removed);
}

#[tokio::test]
async fn test_remove_kills_the_inflight_process() {
    let task = Task::new(sleeper("600")).unwrap();

    let runner = Arc::clone(&task);
    let run = tokio::spawn(async move { runner.run().await });

    let probe = Arc::clone(&task);
    wait_for("task to start", || probe.status() == Status::Running).await;
    let pid = task.snapshot(false).pid;

    let killed = task.remove("tests", "teardown");
    assert!(killed);
    assert_eq!(task.status(), Status::Removed);

    run.await.unwrap();
    assert!(!pid_alive(pid));
    assert_eq!(task.status(), Status::Removed);
}

#[tokio::test]
async fn test_working_directory_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let mut spec = TaskSpec::new("toucher", "/usr/bin/touch");
    spec.args = vec!["marker".into()];
    spec.work_dir = Some(dir.path().to_path_buf());
    let task = Task::new(spec).unwrap();

    task.run().await;

    assert_eq!(task.status(), Status::Done);
    assert!(dir.path().join("marker").exists());
}
