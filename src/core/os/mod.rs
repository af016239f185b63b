//! Execution model: service units hosted on OS-thread execution lanes.
//!
//! ## Architecture
//!
//! A [`ServiceUnit`] is a schedulable piece of application logic with a
//! three-stage lifecycle: one-time `init`, a cross-unit `post_init` barrier,
//! and a run body. An [`ExecutionLane`] hosts one or more units on a single
//! OS thread with a name, a priority, and a stack budget. The [`Scheduler`]
//! is the process-wide registry of lanes: it starts them together and, in
//! test and simulation harnesses, stops and joins them together.
//!
//! ## Lifecycle ordering
//!
//! `Scheduler::start` runs every unit's `init` (in attachment order, per
//! lane), then holds all lanes at a barrier, then runs every unit's
//! `post_init`, then enters the run bodies. The barrier is what makes
//! "resolved in `init`, read in `post_init`" safe across lanes.
//!
//! ## Pacing
//!
//! A lane hosting exactly one unit runs that unit's body directly - the body
//! may block and is expected to run forever. A lane hosting several units
//! requires every body to be a cooperative non-blocking single pass; the
//! lane loops over them. Mixing the two styles on one lane is a
//! configuration error, detected and reported at start rather than silently
//! tolerated.

mod lane;
mod scheduler;
mod stats;
mod unit;

pub use lane::{ConfigError, ExecutionLane};
pub use scheduler::{LaneStartError, Scheduler, SchedulerError, StartSummary};
pub use stats::LaneStats;
pub use unit::{Pacing, ServiceUnit, ShutdownToken, UnitError};
