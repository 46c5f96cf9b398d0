use crate::error::TaskError;
use crate::task::Task;

use std::time::Duration;

/// Creates a task that completes with `()` once `duration` has elapsed.
///
/// # Examples
///
/// ```rust,ignore
/// let delayed = race2(sleep(Duration::from_secs(1)), work);
/// ```
pub fn sleep(duration: Duration) -> Task<()> {
    Task::create(move |scheduler, callback| {
        scheduler.schedule_once(duration, Box::new(move || callback(Ok(()))))
    })
}

/// Creates a task that fails with `error` once `duration` has elapsed.
pub fn raise_after<A: Send + 'static>(duration: Duration, error: TaskError) -> Task<A> {
    Task::create(move |scheduler, callback| {
        let error = error.clone();
        scheduler.schedule_once(duration, Box::new(move || callback(Err(error))))
    })
}

impl Task<()> {
    /// Same as [`sleep`].
    pub fn sleep(duration: Duration) -> Self {
        sleep(duration)
    }
}
