use super::timer::TimerEntry;
use super::{FailureSink, Job, Scheduler};
use crate::cancel::{BooleanCancelable, CancelableRef};
use crate::error::TaskError;

use parking_lot::Mutex;

use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

/// A scheduler driven by a virtual clock.
///
/// Nothing runs until the clock is advanced with [`tick`](Self::tick).
/// Jobs queued through [`Scheduler::execute`] are due at the current
/// virtual instant; delayed jobs are due at `now + delay`. Jobs sharing a
/// deadline run in registration order.
///
/// Failures reported through [`Scheduler::report_failure`] are recorded
/// and can be inspected with [`reported_failures`](Self::reported_failures).
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = TestScheduler::new();
/// let handle: SchedulerRef = scheduler.clone();
///
/// let future = Task::now(1).delay_execution(Duration::from_secs(1)).run_async(&handle);
/// scheduler.tick(Duration::from_secs(1));
///
/// assert_eq!(future.value().unwrap().unwrap(), 1);
/// ```
pub struct TestScheduler {
    state: Mutex<State>,

    /// Optional sink invoked in addition to recording the failure.
    sink: Option<FailureSink>,
}

struct State {
    /// Current virtual time.
    clock: Duration,

    /// Next registration sequence number.
    seq: u64,

    /// Pending jobs, earliest first.
    timers: BinaryHeap<TimerEntry<Duration>>,

    /// Failures reported so far.
    failures: Vec<TaskError>,
}

impl TestScheduler {
    /// Creates a scheduler whose clock starts at zero.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_sink(None))
    }

    /// Creates a scheduler that also forwards reported failures to `sink`.
    pub fn with_failure_sink(sink: FailureSink) -> Arc<Self> {
        Arc::new(Self::with_sink(Some(sink)))
    }

    fn with_sink(sink: Option<FailureSink>) -> Self {
        Self {
            state: Mutex::new(State {
                clock: Duration::ZERO,
                seq: 0,
                timers: BinaryHeap::new(),
                failures: Vec::new(),
            }),
            sink,
        }
    }

    /// Advances the clock by `by`, running every job due on the way.
    ///
    /// Jobs scheduled by running jobs are picked up as well when they fall
    /// within the window. `tick(Duration::ZERO)` drains the jobs due now.
    ///
    /// Returns the number of jobs that ran.
    pub fn tick(&self, by: Duration) -> usize {
        let target = self.state.lock().clock + by;
        let mut ran = 0;

        while let Some(job) = self.pop_due(target) {
            job();
            ran += 1;
        }

        let mut state = self.state.lock();
        if state.clock < target {
            state.clock = target;
        }

        ran
    }

    /// Runs the next job due at the current instant, if any.
    pub fn tick_one(&self) -> bool {
        let now = self.state.lock().clock;

        match self.pop_due(now) {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Returns `true` while non-cancelled jobs remain queued.
    pub fn has_tasks_left(&self) -> bool {
        self.pending_tasks() > 0
    }

    /// Number of non-cancelled queued jobs.
    pub fn pending_tasks(&self) -> usize {
        let state = self.state.lock();
        state.timers.iter().filter(|e| !e.is_cancelled()).count()
    }

    /// Failures reported to this scheduler, oldest first.
    pub fn reported_failures(&self) -> Vec<TaskError> {
        self.state.lock().failures.clone()
    }

    /// Pops the earliest live job due at or before `limit`, moving the
    /// clock to its deadline. The lock is released before the job runs.
    fn pop_due(&self, limit: Duration) -> Option<Job> {
        let mut state = self.state.lock();

        loop {
            let top = state.timers.peek()?;

            if top.is_cancelled() {
                state.timers.pop();
                continue;
            }

            if top.deadline > limit {
                return None;
            }

            let entry = state.timers.pop()?;
            if entry.deadline > state.clock {
                state.clock = entry.deadline;
            }

            return Some(entry.job);
        }
    }

    fn push(&self, delay: Duration, job: Job) -> Arc<BooleanCancelable> {
        let cancelled = Arc::new(BooleanCancelable::new());
        let mut state = self.state.lock();

        let seq = state.seq;
        state.seq += 1;

        let deadline = state.clock + delay;
        state.timers.push(TimerEntry {
            deadline,
            seq,
            job,
            cancelled: cancelled.clone(),
        });

        cancelled
    }
}

impl Scheduler for TestScheduler {
    fn execute(&self, job: Job) {
        self.push(Duration::ZERO, job);
    }

    fn schedule_once(&self, delay: Duration, job: Job) -> CancelableRef {
        self.push(delay, job)
    }

    fn now(&self) -> Duration {
        self.state.lock().clock
    }

    fn report_failure(&self, error: &TaskError) {
        tracing::debug!(%error, "failure reported to test scheduler");
        self.state.lock().failures.push(error.clone());

        if let Some(sink) = &self.sink {
            sink(error);
        }
    }
}
