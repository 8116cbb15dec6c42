//! Scheduler core: registry and lifecycle.
//!
//! The public API from this module is [`Manager`], which owns the task
//! collection, wires each task to the trigger, and drives startup and
//! shutdown. [`wait_for_shutdown_signal`] is a helper for embedding
//! binaries that want to block until the process is told to stop.

mod manager;
mod shutdown;

pub use manager::Manager;
pub use shutdown::wait_for_shutdown_signal;
