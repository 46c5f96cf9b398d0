use super::Job;
use crate::cancel::BooleanCancelable;

use std::cmp::Ordering;
use std::sync::Arc;

/// An entry in a scheduler timer queue.
///
/// `TimerEntry` represents a job due at a specific deadline. It is stored
/// in a `BinaryHeap` ordered by deadline, then by registration sequence, so
/// entries sharing a deadline fire first-registered-first-fired.
///
/// The entry may be cancelled before it fires; cancelled entries are
/// skipped when popped.
pub(crate) struct TimerEntry<T> {
    /// The time at which the job should run.
    pub(crate) deadline: T,

    /// Registration order, used as a tie-break between equal deadlines.
    pub(crate) seq: u64,

    /// The job to run.
    pub(crate) job: Job,

    /// Cancellation flag handed out to the caller of `schedule_once`.
    pub(crate) cancelled: Arc<BooleanCancelable>,
}

impl<T: Ord> TimerEntry<T> {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.is_canceled()
    }
}

impl<T: Ord> Eq for TimerEntry<T> {}

impl<T: Ord> PartialEq for TimerEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<T: Ord> Ord for TimerEntry<T> {
    /// Orders timer entries by deadline, then sequence.
    ///
    /// The comparison is **reversed** so that a `BinaryHeap<TimerEntry<T>>`
    /// behaves as a min-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T: Ord> PartialOrd for TimerEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
