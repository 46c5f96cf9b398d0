//! Iterative teardown of nested task descriptions.
//!
//! Combinators capture the tasks they wrap, so a folded chain of races is a
//! tree as deep as the chain. Dropping it naively recurses once per level.
//! Instead, the outermost release on a thread owns a queue: nested releases
//! push their payload onto it and return, and the outermost call drains the
//! queue in a loop.

use std::cell::RefCell;

type Deferred = Box<dyn Send>;

thread_local! {
    static QUEUE: RefCell<Option<Vec<Deferred>>> = const { RefCell::new(None) };
}

/// Drops `value` without recursing into nested releases.
pub(super) fn release(value: Deferred) {
    let outermost = QUEUE.try_with(|queue| match queue.borrow_mut().as_mut() {
        Some(pending) => {
            pending.push(value);
            None
        }
        None => Some(value),
    });

    // Thread-local storage is gone during thread exit: dropped in place.
    let Ok(Some(value)) = outermost else {
        return;
    };

    let _ = QUEUE.try_with(|queue| *queue.borrow_mut() = Some(Vec::new()));
    drop(value);

    while let Some(next) = pop() {
        drop(next);
    }

    let _ = QUEUE.try_with(|queue| queue.borrow_mut().take());
}

fn pop() -> Option<Deferred> {
    QUEUE
        .try_with(|queue| queue.borrow_mut().as_mut().and_then(Vec::pop))
        .ok()
        .flatten()
}
