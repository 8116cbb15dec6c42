//! Task abstractions: descriptors, lifecycle states, runtime, snapshots.

mod snapshot;
mod spec;
mod status;
mod task;

pub use snapshot::TaskSnapshot;
pub use spec::{ScheduleSpec, TaskSpec};
pub use status::Status;
pub use task::Task;
