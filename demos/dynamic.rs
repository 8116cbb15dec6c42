//! # Demo: dynamic
//!
//! Dynamically add, query, and remove tasks at runtime via the `Manager`.
//!
//! Demonstrates how to:
//! - Add tasks from code (no jobs file) and fire one immediately.
//! - Query live snapshots with prev/next fire times while jobs run.
//! - Remove a task mid-flight (killing its process) and shut down.
//!
//! ## Run
//! ```bash
//! cargo run --example dynamic
//! ```

use std::time::Duration;

use cronvisor::{Manager, TaskSpec};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let manager = Manager::new();

    // 1) A quick job that fires as soon as the manager starts
    let mut hello = TaskSpec::new("hello", "/bin/echo");
    hello.args = vec!["hello from cronvisor".into()];
    hello.start_immediately = true;
    let hello_id = manager.add_task(hello)?;

    // 2) A long sleeper we will remove mid-flight
    let mut sleeper = TaskSpec::new("sleeper", "/bin/sleep");
    sleeper.args = vec!["600".into()];
    sleeper.start_immediately = true;
    let sleeper_id = manager.add_task(sleeper)?;

    manager.start();
    tokio::time::sleep(Duration::from_millis(500)).await;

    // 3) Query live state
    for task in manager.find_all_tasks() {
        println!(
            "[dynamic] #{} {} status={} pid={} next={:?}",
            task.id, task.name, task.status, task.pid, task.next_fire
        );
    }

    // 4) Remove the sleeper: its process is killed, the entry unregistered
    println!("[dynamic] removing sleeper");
    manager.remove_task(sleeper_id, "demo", "no longer needed")?;

    let hello = manager.find_task(hello_id)?;
    println!("[dynamic] hello finished as {}", hello.status);

    // 5) Shut down whatever is left
    manager.shutdown();
    Ok(())
}
