//! Service units: schedulable logic with an init / post-init / run lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// A unit's one-time or post-init setup failed. The owning lane logs the
/// error and never enters its run body; other lanes are unaffected.
#[derive(Debug, Error)]
pub enum UnitError {
    /// A required device or resource was unavailable.
    #[error("{0} unavailable")]
    Unavailable(&'static str),
    /// Setup failed for a unit-specific reason.
    #[error("{0}")]
    Failed(String),
    /// Setup failed on an I/O operation (socket bind, volume open, ...).
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Cooperative shutdown flag shared by a scheduler and its lanes.
///
/// Production lanes run forever and never see the flag raised; test and
/// simulation harnesses raise it through [`Scheduler::stop`] so run bodies
/// unwind and threads can be joined.
///
/// [`Scheduler::stop`]: super::Scheduler::stop
#[derive(Clone, Debug, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once shutdown has been requested.
    pub fn is_signaled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Requests shutdown. Idempotent.
    pub fn signal(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// How a unit's `service` body behaves on its lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// `service` is the run-forever body. It may block (channel receives,
    /// socket reads) and returns only once shutdown is signaled.
    Blocking,
    /// `service` performs one non-blocking pass per call; the lane loops
    /// over its cooperative units each scheduling slice.
    Cooperative,
}

/// A schedulable piece of application logic.
///
/// Units are constructed by the composition root, attached to exactly one
/// [`ExecutionLane`](super::ExecutionLane), and immutable in shape from then
/// on. The lane drives the lifecycle: `init` once, `post_init` once after
/// every unit on every lane finished `init`, then `service`.
pub trait ServiceUnit: Send {
    /// Human-readable name, used in reporting only - never as a key.
    fn name(&self) -> &str;

    /// One-time setup. Runs before any unit's `post_init` anywhere in the
    /// process, so shared state published here may be read there.
    fn init(&mut self) -> Result<(), UnitError> {
        Ok(())
    }

    /// Cross-unit setup. Runs after every unit's `init`; safe to read what
    /// other units published during theirs.
    fn post_init(&mut self) -> Result<(), UnitError> {
        Ok(())
    }

    /// Declares how `service` behaves; see [`Pacing`]. Defaults to blocking,
    /// the single-unit-per-lane common case.
    fn pacing(&self) -> Pacing {
        Pacing::Blocking
    }

    /// The run body. Blocking units loop here until `shutdown.is_signaled()`;
    /// cooperative units perform a single non-blocking pass per call.
    /// Errors inside the body are the unit's own responsibility - the lane
    /// does not supervise or restart.
    fn service(&mut self, shutdown: &ShutdownToken);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NopUnit;

    impl ServiceUnit for NopUnit {
        fn name(&self) -> &str {
            "nop"
        }

        fn service(&mut self, _shutdown: &ShutdownToken) {}
    }

    #[test]
    fn lifecycle_defaults_are_ok() {
        let mut unit = NopUnit;
        assert!(unit.init().is_ok());
        assert!(unit.post_init().is_ok());
        assert_eq!(unit.pacing(), Pacing::Blocking);
    }

    #[test]
    fn shutdown_token_clones_share_the_flag() {
        let token = ShutdownToken::new();
        let seen_by_lane = token.clone();
        assert!(!seen_by_lane.is_signaled());

        token.signal();
        assert!(seen_by_lane.is_signaled());
    }
}
