use raceway::cancel::{self, Cancelable};
use raceway::scheduler::{Scheduler, SchedulerRef, TestScheduler};
use raceway::{Fiber, RaceResult, Task, TaskError, race_pair};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn setup() -> (Arc<TestScheduler>, SchedulerRef) {
    let scheduler = TestScheduler::new();
    let handle: SchedulerRef = scheduler.clone();
    (scheduler, handle)
}

fn tracked<A>(value: A, delay: Duration, cancels: &Arc<AtomicUsize>) -> Task<A>
where
    A: Clone + Send + Sync + 'static,
{
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

fn expect_left<A, B>(result: RaceResult<A, B>) -> (A, Fiber<B>) {
    match result {
        RaceResult::Left(a, fiber) => (a, fiber),
        RaceResult::Right(..) => panic!("expected the left branch to win"),
    }
}

#[test]
fn cancel_after_resolution_leaves_loser_running() {
    let (scheduler, s) = setup();
    let cancels = Arc::new(AtomicUsize::new(0));

    let future = race_pair(
        tracked("a", Duration::from_secs(1), &cancels),
        tracked("b", Duration::from_secs(2), &cancels),
    )
    .run_async(&s);

    scheduler.tick(Duration::from_secs(1));
    future.cancel();

    let (a, fiber_b) = expect_left(future.value().unwrap().unwrap());
    assert_eq!(a, "a");
    assert_eq!(cancels.load(Ordering::SeqCst), 0);

    let joined = fiber_b.join().run_async(&s);
    assert!(joined.is_pending());

    scheduler.tick(Duration::from_secs(1));

    assert_eq!(scheduler.now(), Duration::from_secs(2));
    assert_eq!(joined.value().unwrap().unwrap(), "b");
    assert_eq!(cancels.load(Ordering::SeqCst), 0);
}

#[test]
fn cancel_between_resolution_and_delivery_keeps_result() {
    let (scheduler, s) = setup();

    let future = race_pair(Task::now("a"), Task::<u8>::never()).run_async(&s);

    // The first branch starts and wins; the result is not delivered yet.
    assert!(scheduler.tick_one());
    assert!(future.is_pending());

    future.cancel();
    scheduler.tick(Duration::from_secs(5));

    assert!(!future.is_canceled());

    let (a, fiber) = expect_left(future.value().unwrap().unwrap());
    assert_eq!(a, "a");
    assert!(!fiber.is_completed());
}

#[test]
fn join_long_after_resolution_mirrors_loser() {
    let (scheduler, s) = setup();

    let future = race_pair(
        Task::now(1).delay_execution(Duration::from_secs(1)),
        Task::now(2).delay_execution(Duration::from_secs(2)),
    )
    .run_async(&s);

    scheduler.tick(Duration::from_secs(60));

    let (_, fiber) = expect_left(future.value().unwrap().unwrap());
    assert!(fiber.is_completed());

    let joined = fiber.join().run_async(&s);
    assert_eq!(joined.value().unwrap().unwrap(), 2);
}

#[test]
fn cancel_before_resolution_cancels_both() {
    let (scheduler, s) = setup();
    let left = Arc::new(AtomicUsize::new(0));
    let right = Arc::new(AtomicUsize::new(0));

    let future = race_pair(
        tracked(1, Duration::from_secs(1), &left),
        tracked(2, Duration::from_secs(2), &right),
    )
    .run_async(&s);

    scheduler.tick(Duration::ZERO);
    future.cancel();

    assert_eq!(left.load(Ordering::SeqCst), 1);
    assert_eq!(right.load(Ordering::SeqCst), 1);

    scheduler.tick(Duration::from_secs(5));
    assert!(future.is_pending());
    assert!(!scheduler.has_tasks_left());
}

#[test]
fn loser_fiber_can_be_canceled() {
    let (scheduler, s) = setup();
    let cancels = Arc::new(AtomicUsize::new(0));

    let future = race_pair(
        Task::now(1).delay_execution(Duration::from_secs(1)),
        tracked(2, Duration::from_secs(2), &cancels),
    )
    .run_async(&s);

    scheduler.tick(Duration::from_secs(1));

    let (_, fiber) = expect_left(future.value().unwrap().unwrap());
    let joined = fiber.join().run_async(&s);

    fiber.cancel();
    fiber.cancel();
    scheduler.tick(Duration::from_secs(5));

    assert_eq!(cancels.load(Ordering::SeqCst), 1);
    assert!(joined.is_pending());
    assert!(!fiber.is_completed());
}

#[test]
fn first_failure_fails_the_race() {
    let (scheduler, s) = setup();
    let cancels = Arc::new(AtomicUsize::new(0));

    let future = race_pair(
        tracked(1u8, Duration::from_secs(3), &cancels),
        Task::<u8>::raise(TaskError::msg("right failed")).delay_execution(Duration::from_secs(1)),
    )
    .run_async(&s);

    scheduler.tick(Duration::from_secs(1));

    let err = future.value().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "right failed");
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
    assert!(!scheduler.has_tasks_left());
}

#[test]
fn unjoined_loser_failure_goes_to_sink() {
    let (scheduler, s) = setup();

    let future = race_pair(
        Task::now(1u8).delay_execution(Duration::from_secs(1)),
        Task::<u8>::raise(TaskError::msg("ignored loser")).delay_execution(Duration::from_secs(2)),
    )
    .run_async(&s);

    scheduler.tick(Duration::from_secs(2));

    assert!(future.value().unwrap().unwrap().is_left());

    let failures = scheduler.reported_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].to_string(), "ignored loser");
}

#[test]
fn joined_loser_failure_is_delivered_not_reported() {
    let (scheduler, s) = setup();

    let future = race_pair(
        Task::now(1u8).delay_execution(Duration::from_secs(1)),
        Task::<u8>::raise(TaskError::msg("joined loser")).delay_execution(Duration::from_secs(2)),
    )
    .run_async(&s);

    scheduler.tick(Duration::from_secs(1));
    let (_, fiber) = expect_left(future.value().unwrap().unwrap());
    let joined = fiber.join().run_async(&s);

    scheduler.tick(Duration::from_secs(1));

    assert_eq!(joined.value().unwrap().unwrap_err().to_string(), "joined loser");
    assert!(scheduler.reported_failures().is_empty());
}
