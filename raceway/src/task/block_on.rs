use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, Thread};

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

/// Blocks the current thread until `future` resolves.
///
/// Meant for driving a [`CancelableFuture`](super::CancelableFuture)
/// started on a [`ThreadScheduler`](crate::scheduler::ThreadScheduler)
/// from synchronous code. Calling it with a future that is driven by the
/// current thread, or with a canceled future, blocks forever.
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler: SchedulerRef = SchedulerBuilder::new().build()?;
/// let value = block_on(Task::now(1).run_async(&scheduler))?;
/// ```
pub fn block_on<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);

    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut cx = Context::from_waker(&waker);

    loop {
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(output) => return output,
            Poll::Pending => thread::park(),
        }
    }
}
