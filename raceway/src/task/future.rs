use super::Task;
use crate::cancel::{Cancelable, CancelableRef};
use crate::error::Outcome;
use crate::scheduler::SchedulerRef;

use parking_lot::Mutex;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// The result slot of a started task.
///
/// A `CancelableFuture` starts empty and transitions at most once, to the
/// task's [`Outcome`]. It can be inspected with [`value`](Self::value) or
/// awaited as a regular [`Future`].
///
/// Canceling does not close the slot. Work that was canceled before it
/// decided its outcome never delivers one, so the future stays pending and
/// awaiting it never resolves. Work that already decided, such as a race
/// whose winner is being handed over, still completes the future.
pub struct CancelableFuture<A> {
    slot: Arc<Slot<A>>,
    cancelable: CancelableRef,
}

struct Slot<A> {
    state: Mutex<SlotState<A>>,
}

enum SlotState<A> {
    /// No outcome yet.
    Pending {
        /// Wakers of tasks awaiting the future.
        wakers: Vec<Waker>,

        /// Whether cancellation was requested.
        canceled: bool,
    },

    /// The outcome is available.
    Completed(Outcome<A>),

    /// The outcome was moved out by awaiting the future.
    Taken,
}

impl<A> Slot<A> {
    fn complete(&self, outcome: Outcome<A>) {
        let previous = std::mem::replace(&mut *self.state.lock(), SlotState::Completed(outcome));

        // Callbacks are `FnOnce`, so the slot was still pending.
        if let SlotState::Pending { wakers, .. } = previous {
            for waker in wakers {
                waker.wake();
            }
        }
    }

    fn mark_canceled(&self) {
        if let SlotState::Pending { canceled, .. } = &mut *self.state.lock() {
            *canceled = true;
        }
    }
}

impl<A: Send + 'static> CancelableFuture<A> {
    pub(crate) fn start(task: &Task<A>, scheduler: &SchedulerRef) -> Self {
        let slot = Arc::new(Slot {
            state: Mutex::new(SlotState::Pending {
                wakers: Vec::new(),
                canceled: false,
            }),
        });

        let s = slot.clone();
        let cancelable = task.run(scheduler, Box::new(move |outcome| s.complete(outcome)));

        Self { slot, cancelable }
    }
}

impl<A> CancelableFuture<A> {
    /// Requests cancellation of the running task.
    ///
    /// Has no effect once the outcome is known, or once the task decided
    /// it and only its delivery is outstanding.
    pub fn cancel(&self) {
        self.slot.mark_canceled();
        self.cancelable.cancel();
    }

    /// Returns `true` while the outcome is unknown, including after a
    /// cancellation.
    pub fn is_pending(&self) -> bool {
        matches!(&*self.slot.state.lock(), SlotState::Pending { .. })
    }

    /// Returns `true` if cancellation was requested and no outcome arrived.
    pub fn is_canceled(&self) -> bool {
        matches!(
            &*self.slot.state.lock(),
            SlotState::Pending { canceled: true, .. }
        )
    }

    /// Returns a copy of the outcome, if the task completed.
    ///
    /// Returns `None` while pending, after a cancellation, and once the
    /// outcome was moved out by awaiting the future.
    pub fn value(&self) -> Option<Outcome<A>>
    where
        A: Clone,
    {
        match &*self.slot.state.lock() {
            SlotState::Completed(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }
}

impl<A> Future for CancelableFuture<A> {
    type Output = Outcome<A>;

    /// Polls the result slot.
    ///
    /// # Panics
    ///
    /// Panics if polled again after returning `Poll::Ready`.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome<A>> {
        let mut state = self.slot.state.lock();

        match std::mem::replace(&mut *state, SlotState::Taken) {
            SlotState::Completed(outcome) => Poll::Ready(outcome),
            SlotState::Pending {
                mut wakers,
                canceled,
            } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                *state = SlotState::Pending { wakers, canceled };
                Poll::Pending
            }
            SlotState::Taken => panic!("CancelableFuture polled after completion"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::race::{Either, race2};
    use crate::scheduler::TestScheduler;
    use std::task::Wake;
    use std::time::Duration;

    struct CountingWaker(std::sync::atomic::AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    fn setup() -> (Arc<TestScheduler>, SchedulerRef) {
        let scheduler = TestScheduler::new();
        let handle: SchedulerRef = scheduler.clone();
        (scheduler, handle)
    }

    #[test]
    fn awaiting_wakes_on_completion() {
        let (scheduler, s) = setup();
        let mut future = Task::now(9).delay_execution(Duration::from_secs(1)).run_async(&s);

        let counter = Arc::new(CountingWaker(Default::default()));
        let waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);

        assert!(Pin::new(&mut future).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut future).poll(&mut cx).is_pending());

        scheduler.tick(Duration::from_secs(1));
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 1);

        match Pin::new(&mut future).poll(&mut cx) {
            Poll::Ready(Ok(v)) => assert_eq!(v, 9),
            other => panic!("unexpected poll result: {other:?}"),
        }
        assert!(future.value().is_none());
    }

    #[test]
    fn canceled_future_never_transitions() {
        let (scheduler, s) = setup();
        let mut future = Task::now(1).delay_execution(Duration::from_secs(1)).run_async(&s);

        future.cancel();
        scheduler.tick(Duration::from_secs(1));

        assert!(future.is_canceled());
        assert!(future.is_pending());
        assert!(future.value().is_none());

        let counter = Arc::new(CountingWaker(Default::default()));
        let waker = Waker::from(counter);
        let mut cx = Context::from_waker(&waker);
        assert!(Pin::new(&mut future).poll(&mut cx).is_pending());
    }

    #[test]
    fn uncancelable_work_completes_despite_cancel() {
        let (scheduler, s) = setup();
        let future = Task::<u8>::raise(TaskError::msg("late"))
            .delay_execution(Duration::from_secs(1))
            .uncancelable()
            .run_async(&s);

        future.cancel();
        assert!(future.is_canceled());

        scheduler.tick(Duration::from_secs(1));

        assert!(!future.is_canceled());
        assert_eq!(future.value().unwrap().unwrap_err().to_string(), "late");
        assert!(scheduler.reported_failures().is_empty());
    }

    #[test]
    fn decided_race_survives_cancel_before_delivery() {
        let (scheduler, s) = setup();
        let future = race2(Task::now(1), Task::<u8>::never()).run_async(&s);

        // Starts the first branch, which wins; its delivery is still queued.
        assert!(scheduler.tick_one());
        assert!(future.is_pending());

        future.cancel();
        scheduler.tick(Duration::ZERO);

        assert!(!future.is_canceled());
        assert_eq!(future.value().unwrap().unwrap(), Either::Left(1));
    }

    #[test]
    fn cancel_after_completion_keeps_value() {
        let (_, s) = setup();
        let future = Task::now(4).run_async(&s);

        future.cancel();

        assert!(!future.is_canceled());
        assert_eq!(future.value().unwrap().unwrap(), 4);
    }
}
