//! Units of work and the handles produced by starting them.
//!
//! A [`Task`] is a description of asynchronous work: nothing happens until
//! it is started on a [`Scheduler`](crate::scheduler::Scheduler). Starting
//! a task registers a completion callback, which is invoked at most once
//! with the task's [`Outcome`], and returns a cancelable for the in-flight
//! execution.
//!
//! Starting produces one of:
//! - a [`CancelableFuture`], an inspectable result slot that can also be
//!   awaited,
//! - a [`Fiber`], a detachable handle that can be joined or canceled
//!   independently of whoever started it.

mod block_on;
mod fiber;
mod future;
mod teardown;

pub(crate) use fiber::FiberState;

pub use block_on::block_on;
pub use fiber::Fiber;
pub use future::CancelableFuture;

use crate::cancel::{self, CancelableRef, CompositeCancelable};
use crate::error::{Outcome, TaskError};
use crate::scheduler::SchedulerRef;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Completion callback of a started task.
///
/// Being `FnOnce`, a callback can deliver at most one outcome.
pub type Callback<A> = Box<dyn FnOnce(Outcome<A>) + Send>;

type Register<A> = dyn Fn(&SchedulerRef, Callback<A>) -> CancelableRef + Send + Sync;

/// A startable, cancelable unit of asynchronous work.
///
/// Tasks are cheap to clone and can be started any number of times; every
/// start is an independent execution.
///
/// Dropping the last handle of a deeply composed task, such as a fold of
/// thousands of races, does not recurse per level.
pub struct Task<A: 'static> {
    node: Arc<Node<A>>,
}

struct Node<A: 'static> {
    register: Box<Register<A>>,
}

impl<A: 'static> Drop for Node<A> {
    fn drop(&mut self) {
        // The captured tasks are released through the teardown queue.
        let register = std::mem::replace(&mut self.register, Box::new(detached::<A>));
        teardown::release(Box::new(register));
    }
}

fn detached<A>(_: &SchedulerRef, _: Callback<A>) -> CancelableRef {
    cancel::empty()
}

impl<A: 'static> Clone for Task<A> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<A: 'static> fmt::Debug for Task<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Task { .. }")
    }
}

impl<A: Send + 'static> Task<A> {
    /// Creates a task from a registration function.
    ///
    /// `register` receives the scheduler and the completion callback, starts
    /// the work and returns the cancelable for it. The work may complete
    /// synchronously by invoking the callback before returning.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let task = Task::create(|scheduler, callback| {
    ///     scheduler.schedule_once(Duration::from_secs(1), Box::new(move || callback(Ok(42))))
    /// });
    /// ```
    pub fn create<F>(register: F) -> Self
    where
        F: Fn(&SchedulerRef, Callback<A>) -> CancelableRef + Send + Sync + 'static,
    {
        Self {
            node: Arc::new(Node {
                register: Box::new(register),
            }),
        }
    }

    /// A task completing immediately with `value`.
    pub fn now(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Self::create(move |_, callback| {
            callback(Ok(value.clone()));
            cancel::empty()
        })
    }

    /// A task failing immediately with `error`.
    pub fn raise(error: TaskError) -> Self {
        Self::create(move |_, callback| {
            callback(Err(error.clone()));
            cancel::empty()
        })
    }

    /// A task evaluating `f` synchronously each time it is started.
    pub fn eval<F>(f: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self::create(move |_, callback| {
            callback(Ok(f()));
            cancel::empty()
        })
    }

    /// A task that never completes.
    pub fn never() -> Self {
        Self::create(|_, callback| {
            drop(callback);
            cancel::empty()
        })
    }

    /// Delays the start of this task by `delay`.
    ///
    /// Canceling before the delay elapsed removes the timer, so no
    /// scheduled work remains; canceling afterwards cancels the task.
    pub fn delay_execution(self, delay: Duration) -> Self {
        Self::create(move |scheduler, callback| {
            let conn = Arc::new(CompositeCancelable::new());

            let task = self.clone();
            let s = scheduler.clone();
            let c = conn.clone();

            let timer = scheduler.schedule_once(
                delay,
                Box::new(move || {
                    c.add(task.run(&s, callback));
                }),
            );

            conn.add(timer);
            conn as CancelableRef
        })
    }

    /// Transforms the successful result of this task.
    pub fn map<B, F>(self, f: F) -> Task<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let f = Arc::new(f);

        Task::create(move |scheduler, callback: Callback<B>| {
            let f = f.clone();
            self.run(
                scheduler,
                Box::new(move |outcome: Outcome<A>| callback(outcome.map(|a| f(a)))),
            )
        })
    }

    /// Marks this task as uncancelable.
    ///
    /// The wrapped work is started normally but its cancelable is dropped
    /// at start, so no cancellation request ever reaches it: it always runs
    /// to its natural completion.
    pub fn uncancelable(self) -> Self {
        Self::create(move |scheduler, callback| {
            let _ = self.run(scheduler, callback);
            cancel::empty()
        })
    }

    /// Starts the task with an explicit completion callback.
    pub fn run(&self, scheduler: &SchedulerRef, callback: Callback<A>) -> CancelableRef {
        (self.node.register)(scheduler, callback)
    }

    /// Starts the task, returning its result slot.
    pub fn run_async(&self, scheduler: &SchedulerRef) -> CancelableFuture<A> {
        CancelableFuture::start(self, scheduler)
    }

    /// Starts the task as a detached [`Fiber`].
    pub fn start(&self, scheduler: &SchedulerRef) -> Fiber<A> {
        let state = Arc::new(FiberState::new(scheduler.clone()));

        let s = state.clone();
        let cancelable = self.run(scheduler, Box::new(move |outcome| s.complete(outcome)));

        Fiber::new(state, cancelable)
    }
}
