use super::{Cancelable, CancelableRef};

use parking_lot::Mutex;

enum State {
    Active(Option<CancelableRef>),
    Canceled,
}

/// An assignable cancelable holding at most one child.
///
/// Used when the cancelable of some work only becomes known after the work
/// was started, e.g. a branch started later on the scheduler. Assigning a
/// child after cancellation cancels that child immediately.
pub struct SerialCancelable {
    state: Mutex<State>,
}

impl SerialCancelable {
    /// Creates an empty, active slot.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Active(None)),
        }
    }

    /// Replaces the current child.
    ///
    /// The previous child is dropped without being canceled.
    pub fn set(&self, child: CancelableRef) {
        {
            let mut state = self.state.lock();
            if let State::Active(slot) = &mut *state {
                *slot = Some(child);
                return;
            }
        }

        child.cancel();
    }

    /// Returns `true` once the slot was canceled.
    ///
    /// Branches check this before starting, so that work is never started
    /// into a canceled connection.
    pub fn is_canceled(&self) -> bool {
        matches!(&*self.state.lock(), State::Canceled)
    }
}

impl Default for SerialCancelable {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancelable for SerialCancelable {
    fn cancel_step(&self, pending: &mut Vec<CancelableRef>) {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Canceled);

        if let State::Active(Some(child)) = previous {
            pending.push(child);
        }
    }
}
