use super::{Race, start_branch};
use crate::cancel::{Cancelable, CancelableRef, SerialCancelable};
use crate::error::Outcome;
use crate::task::Task;

use std::sync::Arc;

/// Races any number of tasks, canceling every loser.
///
/// All tasks are started, and the first one to reach a terminal state
/// decides the result. The remaining tasks are then canceled. Late
/// failures from losers that ignore cancellation are reported to the
/// scheduler's failure sink.
///
/// The race is built over one shared resolution gate and a flat list of
/// branch connections, so neither starting nor canceling it recurses per
/// task. It handles hundreds of thousands of tasks.
///
/// # Panics
///
/// Panics if `tasks` is empty.
///
/// # Examples
///
/// ```rust,ignore
/// let mirrors = urls.iter().map(|url| fetch(url));
/// let fastest = race_many(mirrors).run_async(&scheduler);
/// ```
pub fn race_many<A, I>(tasks: I) -> Task<A>
where
    A: Send + 'static,
    I: IntoIterator<Item = Task<A>>,
{
    let tasks: Arc<[Task<A>]> = tasks.into_iter().collect();
    assert!(!tasks.is_empty(), "race_many requires at least one task");

    Task::create(move |scheduler, callback| {
        let race = Race::new(scheduler, callback);

        let conns: Arc<[Arc<SerialCancelable>]> =
            tasks.iter().map(|_| race.add_branch()).collect();

        tracing::trace!(branches = conns.len(), "starting race");

        for (index, task) in tasks.iter().enumerate() {
            let race = race.clone();
            let conns = conns.clone();

            start_branch(
                scheduler,
                task,
                conns[index].clone(),
                Box::new(move |outcome: Outcome<A>| {
                    if !race.try_resolve(index) {
                        if let Err(error) = &outcome {
                            race.scheduler().report_failure(error);
                        }
                        return;
                    }

                    tracing::debug!(losers = conns.len() - 1, "canceling race losers");

                    for (i, conn) in conns.iter().enumerate() {
                        if i != index {
                            conn.cancel();
                        }
                    }

                    race.deliver(outcome);
                }),
            );
        }

        race as CancelableRef
    })
}
