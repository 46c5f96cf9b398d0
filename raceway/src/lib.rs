//! # Raceway
//!
//! **Raceway** is the racing and cancellation core of a callback-driven async
//! task runtime, built for the **Nebula** ecosystem.
//!
//! It runs several independently suspended units of work concurrently, picks
//! a winner by completion order, and disposes of the losers deterministically.
//! The engine holds no threads of its own: every start, timer and delivery
//! goes through a [`Scheduler`](scheduler::Scheduler), and every combinator
//! returns immediately.
//!
//! Raceway offers:
//!
//! - **Exactly-once resolution**: a single atomic gate per race, so branches
//!   finishing in the same turn never both win
//! - **Cooperative cancellation** through composable, idempotent cancelables
//! - **Stack safety**: `race_many` over 10^5 tasks and long chains of
//!   `race2` never recurse per element
//! - **No lost failures**: failures that cannot reach a result are reported
//!   to the scheduler's failure sink
//! - **Virtual time** through [`TestScheduler`](scheduler::TestScheduler) for
//!   deterministic tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use raceway::race::race2;
//! use raceway::scheduler::{SchedulerBuilder, SchedulerRef};
//! use raceway::task::{Task, block_on};
//! use std::time::Duration;
//!
//! fn main() -> std::io::Result<()> {
//!     let scheduler: SchedulerRef = SchedulerBuilder::new().build()?;
//!
//!     let slow = Task::now("slow").delay_execution(Duration::from_secs(10));
//!     let fast = Task::now("fast").delay_execution(Duration::from_millis(10));
//!
//!     // The slow branch is canceled as soon as the fast one completes.
//!     let winner = block_on(race2(slow, fast).run_async(&scheduler));
//!     println!("{winner:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`cancel`]: Cancelables and their composition
//! - [`error`]: Task failures and outcomes
//! - [`race`]: `race2`, `race_pair` and `race_many`
//! - [`scheduler`]: The scheduling service, virtual and threaded
//! - [`task`]: Units of work, futures and fibers
//! - [`time`]: Timer tasks and timeouts

mod utils;

pub mod cancel;
pub mod error;
pub mod race;
pub mod scheduler;
pub mod task;
pub mod time;

pub use error::{Outcome, TaskError};
pub use race::{Either, RaceResult, race_many, race_pair, race2};
pub use task::{CancelableFuture, Fiber, Task};
