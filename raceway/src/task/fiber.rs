use super::Task;
use crate::cancel::{self, Cancelable, CancelableRef};
use crate::error::Outcome;
use crate::scheduler::{Job, SchedulerRef};
use crate::utils::Slab;

use parking_lot::Mutex;

use std::fmt;
use std::sync::Arc;

/// Turns the outcome into a delivery job.
///
/// Invoked under the state lock, so it only copies the outcome; the
/// returned job runs after the lock is released.
type Listener<A> = Box<dyn FnOnce(&Outcome<A>) -> Job + Send>;

/// A handle to a started unit of work.
///
/// A `Fiber` allows observing the outcome of work that runs independently
/// of whoever started it. [`join`](Self::join) and [`cancel`](Self::cancel)
/// are independent: joining never cancels, canceling does not require
/// joining, and neither is required at all.
///
/// If the work fails while nobody is joined, the failure is reported to the
/// scheduler's failure sink. It is still mirrored to any later joiner.
pub struct Fiber<A> {
    state: Arc<FiberState<A>>,
    cancelable: CancelableRef,
}

/// Completion state shared between a running unit of work and its fiber.
pub(crate) struct FiberState<A> {
    inner: Mutex<Inner<A>>,

    /// Receives failures nobody is joined to.
    scheduler: SchedulerRef,
}

enum Inner<A> {
    /// Still running; listeners of current joiners.
    Running(Slab<Listener<A>>),

    /// Finished with this outcome.
    Done(Outcome<A>),
}

impl<A> FiberState<A> {
    pub(crate) fn new(scheduler: SchedulerRef) -> Self {
        Self {
            inner: Mutex::new(Inner::Running(Slab::new())),
            scheduler,
        }
    }

    /// Records the outcome and notifies current joiners.
    ///
    /// Only the first call has an effect.
    pub(crate) fn complete(&self, outcome: Outcome<A>) {
        let (jobs, orphan) = {
            let mut inner = self.inner.lock();

            match &mut *inner {
                Inner::Running(listeners) => {
                    let jobs: Vec<Job> = listeners.drain().map(|l| l(&outcome)).collect();

                    let orphan = match &outcome {
                        Err(error) if jobs.is_empty() => Some(error.clone()),
                        _ => None,
                    };

                    *inner = Inner::Done(outcome);
                    (jobs, orphan)
                }
                Inner::Done(_) => return,
            }
        };

        if let Some(error) = orphan {
            tracing::debug!(%error, "fiber failed with no joiner");
            self.scheduler.report_failure(&error);
        }

        for job in jobs {
            job();
        }
    }

    /// Registers a listener, returning its key while the work is running.
    ///
    /// If the outcome is already known, the listener's job runs immediately
    /// and `None` is returned.
    fn subscribe(&self, listener: Listener<A>) -> Option<usize> {
        let job = {
            let mut inner = self.inner.lock();

            match &mut *inner {
                Inner::Running(listeners) => return Some(listeners.insert(listener)),
                Inner::Done(outcome) => listener(outcome),
            }
        };

        job();
        None
    }

    fn unsubscribe(&self, key: usize) {
        if let Inner::Running(listeners) = &mut *self.inner.lock() {
            listeners.remove(key);
        }
    }

    fn is_done(&self) -> bool {
        matches!(&*self.inner.lock(), Inner::Done(_))
    }
}

impl<A> Fiber<A> {
    pub(crate) fn new(state: Arc<FiberState<A>>, cancelable: CancelableRef) -> Self {
        Self { state, cancelable }
    }

    /// Requests termination of the underlying work.
    ///
    /// Canceled work never completes, so pending joiners stay pending.
    pub fn cancel(&self) {
        self.cancelable.cancel();
    }

    /// Returns `true` once the underlying work reached its outcome.
    pub fn is_completed(&self) -> bool {
        self.state.is_done()
    }
}

impl<A: Clone + Send + 'static> Fiber<A> {
    /// Returns a task mirroring the fiber's outcome.
    ///
    /// The returned task can be started any number of times, before or
    /// after the fiber completed. Canceling a started join only detaches
    /// that joiner; the fiber keeps running.
    pub fn join(&self) -> Task<A> {
        let state = self.state.clone();

        Task::create(move |_, callback| {
            let listener: Listener<A> = Box::new(move |outcome: &Outcome<A>| {
                let outcome = outcome.clone();
                let job: Job = Box::new(move || callback(outcome));
                job
            });

            match state.subscribe(listener) {
                Some(key) => {
                    let state = state.clone();
                    cancel::from_fn(move || state.unsubscribe(key))
                }
                None => cancel::empty(),
            }
        })
    }
}

impl<A> Clone for Fiber<A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            cancelable: self.cancelable.clone(),
        }
    }
}

impl<A> fmt::Debug for Fiber<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("completed", &self.is_completed())
            .finish()
    }
}
