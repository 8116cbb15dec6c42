//! The callback seam between the trigger and whatever it fires.
//!
//! The trigger knows nothing about tasks: it fires values implementing
//! [`Job`]. [`Task`](crate::Task) implements it, and [`JobFn`] lifts plain
//! async closures for tests and embedders.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// One schedulable unit of work.
///
/// `run` takes `&self` so a single registered value can be fired many
/// times; implementations serialize or reject overlap themselves.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Executes one firing. Errors are the implementation's business;
    /// the trigger has nowhere to report them.
    async fn run(&self);
}

/// Shared, clonable handle to a [`Job`].
pub type JobRef = Arc<dyn Job>;

/// Adapter turning an async closure into a [`Job`].
///
/// # Example
/// ```
/// use cronvisor::JobFn;
///
/// let job = JobFn::arc(|| async {
///     println!("tick");
/// });
/// # let _ = job;
/// ```
pub struct JobFn<F> {
    f: F,
}

impl<F> JobFn<F> {
    /// Wraps `f` and returns it as a shared [`JobRef`].
    pub fn arc<Fut>(f: F) -> JobRef
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Arc::new(Self { f })
    }
}

#[async_trait]
impl<F, Fut> Job for JobFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn run(&self) {
        (self.f)().await;
    }
}
