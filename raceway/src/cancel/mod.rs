//! Cancellation primitives.
//!
//! Cancellation is cooperative: calling [`Cancelable::cancel`] only requests
//! that the underlying work stops. Every cancelable in this module is
//! idempotent, so repeated calls after the first are no-ops.
//!
//! Cancelables can nest (a race owns a composite of branch connections,
//! each branch may itself be a race, and so on). To keep deeply nested
//! chains stack-safe, cancellation walks the tree with an explicit worklist:
//! each node performs its own step through [`Cancelable::cancel_step`] and
//! pushes its children instead of recursing into them.
//!
//! This module provides:
//! - [`BooleanCancelable`], a plain flag,
//! - [`CallbackCancelable`], running a closure at most once,
//! - [`CompositeCancelable`], fanning out to a dynamic set of children,
//! - [`SerialCancelable`], an assignable slot for a single child.

mod composite;
mod serial;

pub use composite::CompositeCancelable;
pub use serial::SerialCancelable;

use parking_lot::Mutex;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, type-erased cancelable.
pub type CancelableRef = Arc<dyn Cancelable>;

/// A capability to request that some in-flight work stops.
pub trait Cancelable: Send + Sync {
    /// Performs this node's own cancellation.
    ///
    /// Implementations that own child cancelables must push them onto
    /// `pending` rather than canceling them directly, so that arbitrarily
    /// deep trees are canceled without growing the call stack.
    fn cancel_step(&self, pending: &mut Vec<CancelableRef>);

    /// Requests cancellation of this node and everything it owns.
    fn cancel(&self) {
        let mut pending = Vec::new();
        self.cancel_step(&mut pending);

        while let Some(next) = pending.pop() {
            next.cancel_step(&mut pending);
        }
    }
}

/// Returns a cancelable that does nothing.
///
/// Used for work that cannot be interrupted, such as already completed or
/// uncancelable units of work.
pub fn empty() -> CancelableRef {
    Arc::new(EmptyCancelable)
}

/// Returns a cancelable that runs `f` the first time it is canceled.
pub fn from_fn<F>(f: F) -> CancelableRef
where
    F: FnOnce() + Send + 'static,
{
    Arc::new(CallbackCancelable::new(f))
}

struct EmptyCancelable;

impl Cancelable for EmptyCancelable {
    fn cancel_step(&self, _pending: &mut Vec<CancelableRef>) {}
}

/// A cancelable backed by a single flag.
#[derive(Debug, Default)]
pub struct BooleanCancelable {
    canceled: AtomicBool,
}

impl BooleanCancelable {
    /// Creates a flag that is not canceled.
    pub fn new() -> Self {
        Self {
            canceled: AtomicBool::new(false),
        }
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

impl Cancelable for BooleanCancelable {
    fn cancel_step(&self, _pending: &mut Vec<CancelableRef>) {
        self.canceled.store(true, Ordering::Release);
    }
}

/// A cancelable that runs a closure on the first cancellation.
pub struct CallbackCancelable {
    callback: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl CallbackCancelable {
    /// Creates a cancelable running `f` on its first cancellation.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let timer = scheduler.schedule_once(delay, job);
    /// let conn = CallbackCancelable::new(move || timer.cancel());
    /// ```
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            callback: Mutex::new(Some(Box::new(f))),
        }
    }

    /// Returns `true` once the callback was taken by a cancellation.
    pub fn is_canceled(&self) -> bool {
        self.callback.lock().is_none()
    }
}

impl Cancelable for CallbackCancelable {
    fn cancel_step(&self, _pending: &mut Vec<CancelableRef>) {
        // Released before running the callback so it may touch this cancelable.
        let callback = self.callback.lock().take();

        if let Some(callback) = callback {
            callback();
        }
    }
}

impl fmt::Debug for CallbackCancelable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackCancelable")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}
