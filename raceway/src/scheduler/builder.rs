use super::{FailureSink, ThreadScheduler};
use crate::error::TaskError;

use std::io;
use std::sync::Arc;
use std::thread;

/// Builder for configuring and creating a [`ThreadScheduler`].
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new()
///     .worker_threads(4)
///     .thread_name("races")
///     .on_failure(|err| eprintln!("orphaned failure: {err}"))
///     .build()?;
/// ```
pub struct SchedulerBuilder {
    /// Number of worker threads draining the run queue.
    worker_threads: usize,

    /// Prefix for thread names.
    thread_name: String,

    /// Sink for failures that cannot be delivered to any result.
    sink: FailureSink,
}

impl SchedulerBuilder {
    /// Creates a builder with default configuration.
    ///
    /// By default:
    /// - the number of worker threads is the number of available logical
    ///   CPUs, falling back to `1`,
    /// - threads are named `raceway-worker-<id>` and `raceway-worker-timer`,
    /// - orphaned failures are logged with `tracing::error!`.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: String::from("raceway-worker"),
            sink: Arc::new(log_failure),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the prefix used to name the scheduler threads.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Replaces the sink receiving orphaned failures.
    pub fn on_failure<F>(mut self, sink: F) -> Self
    where
        F: Fn(&TaskError) + Send + Sync + 'static,
    {
        self.sink = Arc::new(sink);
        self
    }

    /// Builds the scheduler and spawns its threads.
    ///
    /// # Errors
    ///
    /// Returns an error if a thread cannot be spawned.
    pub fn build(self) -> io::Result<Arc<ThreadScheduler>> {
        ThreadScheduler::start(self.worker_threads, self.thread_name, self.sink)
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn log_failure(error: &TaskError) {
    tracing::error!(%error, "unhandled task failure");
}
