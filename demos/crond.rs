//! # Demo: crond
//!
//! A config-driven scheduler daemon: load a jobs file, start the scheduler,
//! run until the process receives a termination signal, then shut down
//! (terminating any in-flight jobs).
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Manager::load_config(jobs.yaml)
//!   ├─► Manager::start()          (start-immediately firings + dispatch loop)
//!   ├─► wait_for_shutdown_signal()
//!   └─► Manager::shutdown()       (stop trigger, kill live processes)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example crond -- jobs.yaml
//! ```
//!
//! with a jobs file like:
//! ```yaml
//! jobs:
//!   - name: heartbeat
//!     path: /usr/bin/touch
//!     args: ["/tmp/heartbeat"]
//!     start_immediately: true
//!   - name: backup
//!     path: /usr/local/bin/backup
//!     cron:
//!       minute: "0"
//!       hour: "2"
//!     max_retries: 2
//! ```

use std::env;

use cronvisor::{wait_for_shutdown_signal, Manager};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1) Route the crate's tracing output to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cronvisor=debug".into()),
        )
        .init();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "jobs.yaml".to_string());

    // 2) Load descriptors and register each with the trigger
    let manager = Manager::new();
    let added = manager.load_config(&path)?;
    println!("[crond] loaded {added} jobs from {path}");
    for task in manager.find_all_tasks() {
        println!(
            "[crond] #{} {} -> {} (next fire: {:?})",
            task.id, task.name, task.cron_expr, task.next_fire
        );
    }

    // 3) Run until told to stop
    manager.start();
    wait_for_shutdown_signal().await?;

    // 4) Stop the dispatch loop and terminate live processes
    manager.shutdown();
    for task in manager.clone_tasks(false) {
        println!("[crond] #{} {} finished as {}", task.id, task.name, task.status);
    }
    Ok(())
}
