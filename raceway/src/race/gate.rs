use std::sync::atomic::{AtomicUsize, Ordering};

/// No branch has resolved the race yet.
///
/// Any value other than `PENDING` and `CANCELED` is the index of the
/// winning branch.
pub(crate) const PENDING: usize = usize::MAX;

/// The race was canceled before any branch resolved it.
pub(crate) const CANCELED: usize = usize::MAX - 1;

/// The single-writer resolution state of one race.
///
/// The gate leaves `PENDING` exactly once, either to a branch index or to
/// `CANCELED`. Every transition is a compare-and-set from `PENDING`, so two
/// branches completing in the same turn, or a branch completing while the
/// race is canceled, can never both win.
#[derive(Debug)]
pub(crate) struct Gate {
    state: AtomicUsize,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicUsize::new(PENDING),
        }
    }

    /// Attempts to resolve the race in favor of `branch`.
    ///
    /// Returns `true` for the single caller that moved the gate out of
    /// `PENDING`.
    pub(crate) fn try_resolve(&self, branch: usize) -> bool {
        debug_assert!(branch < CANCELED, "branch index out of range");

        self.transition(branch)
    }

    /// Closes the race without a winner.
    ///
    /// Returns `true` if the race was still pending.
    pub(crate) fn close(&self) -> bool {
        self.transition(CANCELED)
    }

    fn transition(&self, to: usize) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
