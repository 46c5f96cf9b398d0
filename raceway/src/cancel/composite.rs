use super::{Cancelable, CancelableRef};

use parking_lot::Mutex;

/// Lifecycle of a [`CompositeCancelable`].
enum State {
    /// Children are collected and will be canceled together.
    Open(Vec<CancelableRef>),

    /// Cancellation happened; late children are canceled on arrival.
    Canceled,
}

/// A cancelable owning a dynamic set of children.
///
/// The transition from open to canceled happens exactly once, under the
/// same lock that guards [`add`](Self::add). As a consequence:
/// - a child added before the transition is canceled by it,
/// - a child added after the transition is canceled immediately by `add`,
/// - no child is canceled twice by the composite.
pub struct CompositeCancelable {
    state: Mutex<State>,
}

impl CompositeCancelable {
    /// Creates an open composite with no children.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Open(Vec::new())),
        }
    }

    /// Adds a child.
    ///
    /// If the composite was already canceled, the child is canceled before
    /// this method returns.
    pub fn add(&self, child: CancelableRef) {
        {
            let mut state = self.state.lock();
            if let State::Open(children) = &mut *state {
                children.push(child);
                return;
            }
        }

        child.cancel();
    }

    /// Drops every child without canceling it.
    ///
    /// The composite stays open: children added later are kept, and a later
    /// cancellation only reaches those.
    pub fn clear(&self) {
        let children = match &mut *self.state.lock() {
            State::Open(children) => std::mem::take(children),
            State::Canceled => return,
        };

        drop(children);
    }

    /// Number of children still owned by an open composite.
    pub fn len(&self) -> usize {
        match &*self.state.lock() {
            State::Open(children) => children.len(),
            State::Canceled => 0,
        }
    }

    /// Returns `true` if the composite owns no children, either because
    /// none were added or because it was canceled or cleared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once the composite was canceled.
    pub fn is_canceled(&self) -> bool {
        matches!(&*self.state.lock(), State::Canceled)
    }
}

impl Default for CompositeCancelable {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancelable for CompositeCancelable {
    fn cancel_step(&self, pending: &mut Vec<CancelableRef>) {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Canceled);

        if let State::Open(children) = previous {
            // Reversed so the worklist cancels children in insertion order.
            pending.extend(children.into_iter().rev());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{BooleanCancelable, CallbackCancelable};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn counting(counter: &Arc<AtomicUsize>) -> CancelableRef {
        let c = counter.clone();
        Arc::new(CallbackCancelable::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn cancels_all_children() {
        let composite = CompositeCancelable::new();
        let a = Arc::new(BooleanCancelable::new());
        let b = Arc::new(BooleanCancelable::new());

        composite.add(a.clone());
        composite.add(b.clone());
        assert_eq!(composite.len(), 2);

        composite.cancel();

        assert!(a.is_canceled());
        assert!(b.is_canceled());
        assert!(composite.is_canceled());
        assert!(composite.is_empty());
    }

    #[test]
    fn add_after_cancel_is_immediate() {
        let composite = CompositeCancelable::new();
        composite.cancel();

        let late = Arc::new(BooleanCancelable::new());
        composite.add(late.clone());

        assert!(late.is_canceled());
    }

    #[test]
    fn cleared_children_are_not_canceled() {
        let composite = CompositeCancelable::new();
        let dropped = Arc::new(BooleanCancelable::new());
        let late = Arc::new(BooleanCancelable::new());

        composite.add(dropped.clone());
        composite.clear();
        assert!(composite.is_empty());
        assert_eq!(Arc::strong_count(&dropped), 1);

        composite.add(late.clone());
        composite.cancel();

        assert!(!dropped.is_canceled());
        assert!(late.is_canceled());
    }

    #[test]
    fn repeated_cancel_reaches_children_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let composite = CompositeCancelable::new();
        composite.add(counting(&counter));

        composite.cancel();
        composite.cancel();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deep_nesting_does_not_overflow() {
        let flag = Arc::new(BooleanCancelable::new());
        let mut current: Arc<CompositeCancelable> = Arc::new(CompositeCancelable::new());
        current.add(flag.clone());

        for _ in 0..200_000 {
            let parent = Arc::new(CompositeCancelable::new());
            parent.add(current);
            current = parent;
        }

        current.cancel();
        assert!(flag.is_canceled());

        // Canceling moved every child out, so the drop below is shallow.
        assert!(current.is_empty());
    }

    #[test]
    fn concurrent_add_and_cancel_lose_nothing() {
        for _ in 0..50 {
            let composite = Arc::new(CompositeCancelable::new());
            let counter = Arc::new(AtomicUsize::new(0));

            let adders: Vec<_> = (0..4)
                .map(|_| {
                    let composite = composite.clone();
                    let counter = counter.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            composite.add(counting(&counter));
                        }
                    })
                })
                .collect();

            let canceler = {
                let composite = composite.clone();
                thread::spawn(move || composite.cancel())
            };

            for handle in adders {
                handle.join().unwrap();
            }
            canceler.join().unwrap();

            assert_eq!(counter.load(Ordering::SeqCst), 400);
        }
    }
}
