//! Scheduling services.
//!
//! The race engine holds no threads of its own. Every start, delayed
//! callback and result delivery goes through a [`Scheduler`], which also
//! owns the sink for failures that cannot be delivered anywhere else.
//!
//! Two implementations are provided:
//! - [`TestScheduler`], a virtual clock driven manually with
//!   [`tick`](TestScheduler::tick), used for deterministic tests,
//! - [`ThreadScheduler`], a real-time scheduler backed by worker threads
//!   and a timer thread, configured through [`SchedulerBuilder`].
//!
//! Both fire callbacks due at the same instant in registration order.

mod builder;
mod testing;
mod thread;
mod timer;

pub use builder::SchedulerBuilder;
pub use testing::TestScheduler;
pub use thread::ThreadScheduler;

use crate::cancel::CancelableRef;
use crate::error::TaskError;

use std::sync::Arc;
use std::time::Duration;

/// A callback queued on a scheduler.
pub type Job = Box<dyn FnOnce() + Send>;

/// Shared, type-erased scheduler.
pub type SchedulerRef = Arc<dyn Scheduler>;

/// Destination of failures that no pending result can receive.
pub type FailureSink = Arc<dyn Fn(&TaskError) + Send + Sync>;

/// The environment the race engine runs on.
pub trait Scheduler: Send + Sync {
    /// Runs `job` soon, after callbacks already queued for the current
    /// instant.
    ///
    /// Implementations must never run `job` inline on the calling stack.
    fn execute(&self, job: Job);

    /// Runs `job` once `delay` has elapsed.
    ///
    /// Canceling the returned cancelable before the deadline prevents the
    /// job from running.
    fn schedule_once(&self, delay: Duration, job: Job) -> CancelableRef;

    /// Time elapsed since the scheduler was created.
    fn now(&self) -> Duration;

    /// Reports a failure that has nowhere else to go.
    fn report_failure(&self, error: &TaskError);
}
