use super::timer::TimerEntry;
use super::{FailureSink, Job, Scheduler};
use crate::cancel::{BooleanCancelable, CancelableRef};
use crate::error::TaskError;

use parking_lot::{Condvar, Mutex, MutexGuard};

use std::collections::{BinaryHeap, VecDeque};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A real-time scheduler backed by operating system threads.
///
/// `ThreadScheduler` owns:
/// - a pool of worker threads draining a FIFO run queue,
/// - a timer thread owning a deadline min-heap, which moves due jobs onto
///   the run queue.
///
/// Dropping the scheduler stops intake, wakes every parked thread and joins
/// them. Jobs still queued at that point are dropped without running.
///
/// Created through [`SchedulerBuilder`](super::SchedulerBuilder).
pub struct ThreadScheduler {
    shared: Arc<Shared>,

    /// Join handles for worker threads and the timer thread.
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// State shared between the scheduler handle and its threads.
struct Shared {
    /// Jobs ready to run.
    queue: Mutex<VecDeque<Job>>,

    /// Signalled when the run queue grows or on shutdown.
    available: Condvar,

    /// Delayed jobs.
    timers: Mutex<Timers>,

    /// Signalled when an earlier deadline is registered or on shutdown.
    timers_changed: Condvar,

    /// Shutdown flag shared with all threads.
    shutdown: AtomicBool,

    /// Origin of [`Scheduler::now`].
    started: Instant,

    /// Unhandled-failure sink.
    sink: FailureSink,
}

struct Timers {
    heap: BinaryHeap<TimerEntry<Instant>>,
    seq: u64,
}

impl ThreadScheduler {
    /// Spawns the worker threads and the timer thread.
    pub(crate) fn start(
        worker_threads: usize,
        thread_name: String,
        sink: FailureSink,
    ) -> io::Result<Arc<Self>> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            timers: Mutex::new(Timers {
                heap: BinaryHeap::new(),
                seq: 0,
            }),
            timers_changed: Condvar::new(),
            shutdown: AtomicBool::new(false),
            started: Instant::now(),
            sink,
        });

        let scheduler = Arc::new(Self {
            shared: shared.clone(),
            handles: Mutex::new(Vec::with_capacity(worker_threads + 1)),
        });

        for id in 0..worker_threads {
            let shared = shared.clone();
            let handle = thread::Builder::new()
                .name(format!("{thread_name}-{id}"))
                .spawn(move || shared.run_worker())?;

            scheduler.handles.lock().push(handle);
        }

        let timer = thread::Builder::new()
            .name(format!("{thread_name}-timer"))
            .spawn(move || shared.run_timer())?;
        scheduler.handles.lock().push(timer);

        tracing::debug!(worker_threads, "thread scheduler started");

        Ok(scheduler)
    }

    /// Signals every thread to stop.
    fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);

        // Taking each lock orders the store above before a waiter re-checks.
        drop(self.shared.queue.lock());
        self.shared.available.notify_all();

        drop(self.shared.timers.lock());
        self.shared.timers_changed.notify_all();
    }
}

impl Shared {
    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn push(&self, job: Job) {
        self.queue.lock().push_back(job);
        self.available.notify_one();
    }

    /// Worker loop: pop a job, run it, park while the queue is empty.
    fn run_worker(&self) {
        loop {
            let job = {
                let mut queue = self.queue.lock();

                loop {
                    if self.is_shutdown() {
                        return;
                    }

                    if let Some(job) = queue.pop_front() {
                        break job;
                    }

                    self.available.wait(&mut queue);
                }
            };

            job();
        }
    }

    /// Timer loop: move due jobs to the run queue, then sleep until the
    /// earliest remaining deadline.
    fn run_timer(&self) {
        let mut timers = self.timers.lock();

        loop {
            if self.is_shutdown() {
                return;
            }

            let now = Instant::now();
            let mut cancelled = Vec::new();

            while let Some(top) = timers.heap.peek() {
                if top.is_cancelled() {
                    cancelled.extend(timers.heap.pop());
                    continue;
                }

                if top.deadline > now {
                    break;
                }

                if let Some(entry) = timers.heap.pop() {
                    self.push(entry.job);
                }
            }

            // A dropped job may own the last scheduler handle, whose drop
            // takes this lock.
            if !cancelled.is_empty() {
                MutexGuard::unlocked(&mut timers, || drop(cancelled));
                continue;
            }

            match timers.heap.peek().map(|e| e.deadline) {
                Some(deadline) => {
                    self.timers_changed.wait_until(&mut timers, deadline);
                }
                None => self.timers_changed.wait(&mut timers),
            }
        }
    }
}

impl Scheduler for ThreadScheduler {
    fn execute(&self, job: Job) {
        if self.shared.is_shutdown() {
            return;
        }

        self.shared.push(job);
    }

    fn schedule_once(&self, delay: Duration, job: Job) -> CancelableRef {
        let cancelled = Arc::new(BooleanCancelable::new());

        if self.shared.is_shutdown() {
            return cancelled;
        }

        let deadline = Instant::now() + delay;
        let mut timers = self.shared.timers.lock();

        let seq = timers.seq;
        timers.seq += 1;

        let earliest = timers
            .heap
            .peek()
            .is_none_or(|top| deadline < top.deadline);

        timers.heap.push(TimerEntry {
            deadline,
            seq,
            job,
            cancelled: cancelled.clone(),
        });

        if earliest {
            self.shared.timers_changed.notify_one();
        }

        cancelled
    }

    fn now(&self) -> Duration {
        self.shared.started.elapsed()
    }

    fn report_failure(&self, error: &TaskError) {
        (self.shared.sink)(error);
    }
}

impl Drop for ThreadScheduler {
    /// Shuts the scheduler down.
    ///
    /// The last handle may be released by a job running on one of the
    /// scheduler's own threads; that thread is detached instead of joined.
    fn drop(&mut self) {
        self.shutdown();

        let current = thread::current().id();
        for handle in self.handles.lock().drain(..) {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }

        tracing::debug!("thread scheduler stopped");
    }
}
