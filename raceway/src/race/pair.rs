use super::{Either, Race, RaceResult, start_branch};
use crate::cancel::{Cancelable, CancelableRef, SerialCancelable};
use crate::error::Outcome;
use crate::task::{Callback, Fiber, FiberState, Task};

use std::sync::Arc;

/// What happens to the losing branch once a branch wins with a success.
///
/// A branch winning with a failure always cancels the other one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoserPolicy {
    /// Cancel the loser immediately.
    Cancel,

    /// Leave the loser running and hand it over as a [`Fiber`].
    Detach,
}

/// Races two tasks, canceling the loser.
///
/// The first task to reach a terminal state decides the race: its success
/// becomes the result, its failure becomes the race's failure. Either way
/// the other task is canceled immediately.
///
/// If the loser cannot be canceled and later fails, the failure is reported
/// to the scheduler's failure sink. A late success is dropped.
///
/// # Examples
///
/// ```rust,ignore
/// let fast = Task::now(1).delay_execution(Duration::from_secs(1));
/// let slow = Task::now("slow").delay_execution(Duration::from_secs(10));
///
/// let future = race2(slow, fast).run_async(&scheduler);
/// ```
pub fn race2<A, B>(fa: Task<A>, fb: Task<B>) -> Task<Either<A, B>>
where
    A: Send + 'static,
    B: Send + 'static,
{
    race_pair_with(fa, fb, LoserPolicy::Cancel).map(RaceResult::into_either)
}

/// Races two tasks, handing the loser back as a running [`Fiber`].
///
/// Unlike [`race2`], a successful winner does not cancel the loser. The
/// result carries the winner's value together with the loser's fiber,
/// which may be joined, canceled, or ignored. An ignored loser that fails
/// reports its failure to the scheduler's failure sink.
///
/// If the first task to finish fails, the other task is canceled and the
/// race fails with that error; no fiber is handed out.
///
/// Canceling the race before it resolves cancels both tasks. Canceling it
/// afterwards has no effect on the handed out fiber.
pub fn race_pair<A, B>(fa: Task<A>, fb: Task<B>) -> Task<RaceResult<A, B>>
where
    A: Send + 'static,
    B: Send + 'static,
{
    race_pair_with(fa, fb, LoserPolicy::Detach)
}

fn race_pair_with<A, B>(fa: Task<A>, fb: Task<B>, policy: LoserPolicy) -> Task<RaceResult<A, B>>
where
    A: Send + 'static,
    B: Send + 'static,
{
    Task::create(move |scheduler, callback| {
        let race = Race::new(scheduler, callback);

        let conn_a = race.add_branch();
        let conn_b = race.add_branch();

        let state_a = Arc::new(FiberState::new(scheduler.clone()));
        let state_b = Arc::new(FiberState::new(scheduler.clone()));

        let on_a = on_complete(
            0,
            &race,
            state_a.clone(),
            (state_b.clone(), conn_b.clone()),
            policy,
            RaceResult::Left,
        );

        let on_b = on_complete(
            1,
            &race,
            state_b,
            (state_a, conn_a.clone()),
            policy,
            |b, fiber_a| RaceResult::Right(fiber_a, b),
        );

        start_branch(scheduler, &fa, conn_a, on_a);
        start_branch(scheduler, &fb, conn_b, on_b);

        race as CancelableRef
    })
}

/// Builds the completion callback of one branch.
///
/// `own` collects the branch's outcome if it loses, so that a fiber handed
/// out for it can still be joined. `other` is the state and connection of
/// the opposite branch.
fn on_complete<W, L, A, B>(
    index: usize,
    race: &Arc<Race<RaceResult<A, B>>>,
    own: Arc<FiberState<W>>,
    other: (Arc<FiberState<L>>, Arc<SerialCancelable>),
    policy: LoserPolicy,
    wrap: fn(W, Fiber<L>) -> RaceResult<A, B>,
) -> Callback<W>
where
    W: Send + 'static,
    L: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
{
    let race = race.clone();

    Box::new(move |outcome: Outcome<W>| {
        if !race.try_resolve(index) {
            own.complete(outcome);
            return;
        }

        let (state, conn) = other;

        match outcome {
            Ok(value) => {
                if policy == LoserPolicy::Cancel {
                    tracing::debug!(loser = 1 - index, "canceling race loser");
                    conn.cancel();
                }

                let loser = Fiber::new(state, conn as CancelableRef);
                race.deliver(Ok(wrap(value, loser)));
            }
            Err(error) => {
                tracing::debug!(loser = 1 - index, %error, "race decided by failure");
                conn.cancel();
                race.deliver(Err(error));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel;
    use crate::error::TaskError;
    use crate::scheduler::{SchedulerRef, TestScheduler};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn setup() -> (Arc<TestScheduler>, SchedulerRef) {
        let scheduler = TestScheduler::new();
        let handle: SchedulerRef = scheduler.clone();
        (scheduler, handle)
    }

    fn counted<A: Clone + Send + Sync + 'static>(
        value: A,
        delay: Duration,
        cancels: &Arc<AtomicUsize>,
    ) -> Task<A> {
        let cancels = cancels.clone();

        Task::create(move |scheduler: &SchedulerRef, callback| {
            let value = value.clone();
            let timer = scheduler.schedule_once(delay, Box::new(move || callback(Ok(value))));
            let cancels = cancels.clone();

            cancel::from_fn(move || {
                cancels.fetch_add(1, Ordering::SeqCst);
                timer.cancel();
            })
        })
    }

    #[test]
    fn race2_cancels_loser_once() {
        let (scheduler, s) = setup();
        let cancels = Arc::new(AtomicUsize::new(0));

        let future = race2(
            counted(1, Duration::from_secs(2), &cancels),
            counted("b", Duration::from_secs(1), &cancels),
        )
        .run_async(&s);

        scheduler.tick(Duration::from_secs(1));

        assert_eq!(future.value().unwrap().unwrap(), Either::Right("b"));
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(!scheduler.has_tasks_left());
    }

    #[test]
    fn race2_same_deadline_prefers_first_scheduled() {
        let (scheduler, s) = setup();

        let future = race2(
            Task::now(1).delay_execution(Duration::from_secs(1)),
            Task::now(2).delay_execution(Duration::from_secs(1)),
        )
        .run_async(&s);

        scheduler.tick(Duration::from_secs(1));
        assert_eq!(future.value().unwrap().unwrap(), Either::Left(1));
    }

    #[test]
    fn race_pair_leaves_loser_running() {
        let (scheduler, s) = setup();
        let cancels = Arc::new(AtomicUsize::new(0));

        let future = race_pair(
            counted(1, Duration::from_secs(1), &cancels),
            counted(2, Duration::from_secs(2), &cancels),
        )
        .run_async(&s);

        scheduler.tick(Duration::from_secs(1));

        let fiber = match future.value().unwrap().unwrap() {
            RaceResult::Left(a, fiber) => {
                assert_eq!(a, 1);
                fiber
            }
            RaceResult::Right(..) => panic!("expected the first task to win"),
        };

        assert_eq!(cancels.load(Ordering::SeqCst), 0);

        let joined = fiber.join().run_async(&s);
        scheduler.tick(Duration::from_secs(1));
        assert_eq!(joined.value().unwrap().unwrap(), 2);
    }

    #[test]
    fn race_pair_failure_cancels_other() {
        let (scheduler, s) = setup();
        let cancels = Arc::new(AtomicUsize::new(0));

        let future = race_pair(
            counted(1, Duration::from_secs(5), &cancels),
            Task::<u8>::raise(TaskError::msg("first")).delay_execution(Duration::from_secs(1)),
        )
        .run_async(&s);

        scheduler.tick(Duration::from_secs(1));

        let err = future.value().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "first");
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(!scheduler.has_tasks_left());
    }

    #[test]
    fn canceled_before_start_runs_nothing() {
        let (scheduler, s) = setup();
        let starts = Arc::new(AtomicUsize::new(0));

        let st = starts.clone();
        let starter = Task::create(move |_: &SchedulerRef, _: Callback<u8>| {
            st.fetch_add(1, Ordering::SeqCst);
            cancel::empty()
        });

        let future = race2(starter.clone(), starter).run_async(&s);
        future.cancel();
        scheduler.tick(Duration::ZERO);

        assert_eq!(starts.load(Ordering::SeqCst), 0);
        assert!(future.is_pending());
    }
}
