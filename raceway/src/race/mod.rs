//! Racing combinators.
//!
//! A race starts several [`Task`]s concurrently and resolves with the first
//! one to reach a terminal state, success or failure alike. The winner is
//! decided by a single atomic resolution gate, so branches completing in
//! the same scheduling turn can never both win; ties go to whichever
//! completion the scheduler runs first.
//!
//! This module provides:
//! - [`race2`], racing two tasks and canceling the loser,
//! - [`race_pair`], racing two tasks and handing the loser back as a
//!   [`Fiber`],
//! - [`race_many`], racing any number of tasks and canceling all losers.
//!
//! Canceling a race before it resolves cancels every branch and leaves the
//! race pending forever. Failures that arrive after resolution, or from a
//! canceled race, are reported to the scheduler's failure sink.

mod gate;
mod many;
mod pair;

#[doc(inline)]
pub use many::race_many;

#[doc(inline)]
pub use pair::{race2, race_pair};

use crate::cancel::{Cancelable, CancelableRef, CompositeCancelable, SerialCancelable};
use crate::error::Outcome;
use crate::scheduler::SchedulerRef;
use crate::task::{Callback, Fiber, Task};

use gate::Gate;
use parking_lot::Mutex;

use std::sync::Arc;

/// The result of [`race2`]: the value of whichever task won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Either<A, B> {
    Left(A),
    Right(B),
}

impl<A, B> Either<A, B> {
    /// Returns `true` if the first task won.
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    /// Returns `true` if the second task won.
    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }

    /// Converts into the first task's value, if it won.
    pub fn left(self) -> Option<A> {
        match self {
            Either::Left(a) => Some(a),
            Either::Right(_) => None,
        }
    }

    /// Converts into the second task's value, if it won.
    pub fn right(self) -> Option<B> {
        match self {
            Either::Left(_) => None,
            Either::Right(b) => Some(b),
        }
    }
}

/// The result of [`race_pair`]: the winner's value and a live handle to
/// the loser.
///
/// The loser was not canceled. Its fate is up to the receiver, who may
/// [`join`](Fiber::join) it, [`cancel`](Fiber::cancel) it, or ignore it.
#[derive(Debug, Clone)]
pub enum RaceResult<A, B> {
    Left(A, Fiber<B>),
    Right(Fiber<A>, B),
}

impl<A, B> RaceResult<A, B> {
    /// Returns `true` if the first task won, leaving the second as the
    /// fiber.
    pub fn is_left(&self) -> bool {
        matches!(self, RaceResult::Left(..))
    }

    /// Drops the loser's handle, keeping the winner's value.
    ///
    /// The loser keeps running unless it was canceled elsewhere.
    pub fn into_either(self) -> Either<A, B> {
        match self {
            RaceResult::Left(a, _) => Either::Left(a),
            RaceResult::Right(_, b) => Either::Right(b),
        }
    }
}

impl<A: Send + 'static> Task<A> {
    /// Races this task against `other`, canceling the loser.
    ///
    /// Same as [`race2`]`(self, other)`.
    pub fn race_with<B: Send + 'static>(self, other: Task<B>) -> Task<Either<A, B>> {
        race2(self, other)
    }
}

/// Shared state of one started race.
///
/// Owns the resolution gate, the pending delivery to the race's own
/// callback, and the connections of every branch. A `Race` is also the
/// race's cancelable: canceling it closes the gate, drops the pending
/// delivery and cancels all branches, unless a branch already won.
pub(crate) struct Race<A> {
    gate: Gate,
    callback: Mutex<Option<Callback<A>>>,
    branches: CompositeCancelable,
    scheduler: SchedulerRef,
}

impl<A: Send + 'static> Race<A> {
    pub(crate) fn new(scheduler: &SchedulerRef, callback: Callback<A>) -> Arc<Self> {
        Arc::new(Self {
            gate: Gate::new(),
            callback: Mutex::new(Some(callback)),
            branches: CompositeCancelable::new(),
            scheduler: scheduler.clone(),
        })
    }

    /// Registers a new branch connection.
    ///
    /// The connection is canceled along with the race, even if the race was
    /// already canceled when the branch is added.
    pub(crate) fn add_branch(&self) -> Arc<SerialCancelable> {
        let conn = Arc::new(SerialCancelable::new());
        self.branches.add(conn.clone());
        conn
    }

    /// Claims the race for `branch`.
    ///
    /// Returns `true` for exactly one branch, and never once the race was
    /// canceled. The winner releases the race's hold on every branch
    /// connection, so a resolved chain of races is torn down level by level
    /// instead of all at once.
    pub(crate) fn try_resolve(&self, branch: usize) -> bool {
        if !self.gate.try_resolve(branch) {
            return false;
        }

        tracing::trace!(branch, "race resolved");
        self.branches.clear();

        true
    }

    /// Hands the winning outcome to the race's callback.
    ///
    /// The callback runs on a later scheduler turn, so a chain of races
    /// resolving into each other never grows the call stack.
    pub(crate) fn deliver(&self, outcome: Outcome<A>) {
        let callback = self.callback.lock().take();

        if let Some(callback) = callback {
            self.scheduler.execute(Box::new(move || callback(outcome)));
        }
    }

    pub(crate) fn scheduler(&self) -> &SchedulerRef {
        &self.scheduler
    }
}

impl<A: Send + 'static> Cancelable for Race<A> {
    fn cancel_step(&self, pending: &mut Vec<CancelableRef>) {
        if !self.gate.close() {
            return;
        }

        tracing::debug!(branches = self.branches.len(), "race canceled before resolution");

        drop(self.callback.lock().take());
        self.branches.cancel_step(pending);
    }
}

/// Starts `task` on a later scheduler turn, wiring its cancelable into
/// `conn`.
///
/// Nothing is started if `conn` was canceled in the meantime.
pub(crate) fn start_branch<A: Send + 'static>(
    scheduler: &SchedulerRef,
    task: &Task<A>,
    conn: Arc<SerialCancelable>,
    callback: Callback<A>,
) {
    let task = task.clone();
    let s = scheduler.clone();

    scheduler.execute(Box::new(move || {
        if conn.is_canceled() {
            return;
        }

        tracing::trace!("race branch started");
        conn.set(task.run(&s, callback));
    }));
}
