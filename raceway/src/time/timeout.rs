use super::{raise_after, sleep};
use crate::cancel::{CancelableRef, CompositeCancelable, SerialCancelable};
use crate::error::{Outcome, TaskError};
use crate::race::{Either, race2};
use crate::task::Task;

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

impl<A: Send + 'static> Task<A> {
    /// Fails with [`TaskError::Timeout`] if this task does not finish within
    /// `after`.
    ///
    /// When the timer fires first, this task is canceled. Otherwise the
    /// timer is canceled and this task's outcome is mirrored, failures
    /// included.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let bounded = fetch().timeout(Duration::from_secs(1));
    /// ```
    pub fn timeout(self, after: Duration) -> Task<A> {
        let timer = raise_after::<Infallible>(after, TaskError::Timeout(after));

        race2(self, timer).map(|winner| match winner {
            Either::Left(value) => value,
            Either::Right(never) => match never {},
        })
    }

    /// Switches to `backup` if this task does not finish within `after`.
    ///
    /// When the timer fires first, this task is canceled and `backup` is
    /// started; its outcome becomes the result. `backup` is never started
    /// before that point. Canceling the returned task after the switch
    /// cancels `backup`.
    pub fn timeout_to(self, after: Duration, backup: Task<A>) -> Task<A> {
        let first = race2(self, sleep(after));

        Task::create(move |scheduler, callback| {
            let conn = Arc::new(CompositeCancelable::new());
            let fallback = Arc::new(SerialCancelable::new());
            conn.add(fallback.clone());

            let backup = backup.clone();
            let s = scheduler.clone();
            let f = fallback.clone();

            let race = first.run(
                scheduler,
                Box::new(move |outcome: Outcome<Either<A, ()>>| match outcome {
                    Ok(Either::Left(value)) => callback(Ok(value)),
                    Err(error) => callback(Err(error)),
                    Ok(Either::Right(())) => {
                        if f.is_canceled() {
                            return;
                        }

                        tracing::debug!(?after, "timed out, starting backup");
                        f.set(backup.run(&s, callback));
                    }
                }),
            );

            conn.add(race);
            conn as CancelableRef
        })
    }
}
