//! Timer tasks and timeouts.
//!
//! This module provides:
//! - [`sleep`], a task completing after a duration,
//! - [`raise_after`], a task failing after a duration,
//! - [`Task::timeout`] and [`Task::timeout_to`], bounding the execution
//!   time of a task by racing it against a timer.
//!
//! All timing goes through [`Scheduler::schedule_once`], so timers follow
//! the virtual clock of a [`TestScheduler`] as well as the real clock of a
//! [`ThreadScheduler`]. Canceling a timer task removes its scheduled job.
//!
//! [`Task::timeout`]: crate::task::Task::timeout
//! [`Task::timeout_to`]: crate::task::Task::timeout_to
//! [`Scheduler::schedule_once`]: crate::scheduler::Scheduler::schedule_once
//! [`TestScheduler`]: crate::scheduler::TestScheduler
//! [`ThreadScheduler`]: crate::scheduler::ThreadScheduler

mod sleep;
mod timeout;

#[doc(inline)]
pub use sleep::{raise_after, sleep};
