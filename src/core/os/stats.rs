//! Per-lane service statistics.
//!
//! Cooperative lanes record the duration of each service pass; the scheduler
//! exposes snapshots for monitoring and pre-flight checks. Blocking lanes
//! own their thread outright and record nothing here.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Snapshot of one lane's cooperative service-pass statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LaneStats {
    /// Completed service passes.
    pub passes: u64,
    /// Duration of the most recent pass, microseconds.
    pub last_pass_us: u32,
    /// Longest pass observed, microseconds.
    pub max_pass_us: u32,
    /// Passes that exceeded the lane's configured budget.
    pub budget_overruns: u32,
}

/// Shared cell a lane thread records into.
#[derive(Debug)]
pub(crate) struct StatsCell {
    budget_us: Option<u32>,
    stats: Mutex<LaneStats>,
}

impl StatsCell {
    pub(crate) fn new(budget: Option<Duration>) -> Self {
        Self {
            budget_us: budget.map(|b| b.as_micros().min(u32::MAX as u128) as u32),
            stats: Mutex::new(LaneStats::default()),
        }
    }

    pub(crate) fn record_pass(&self, elapsed: Duration) {
        let elapsed_us = elapsed.as_micros().min(u32::MAX as u128) as u32;
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.passes += 1;
        stats.last_pass_us = elapsed_us;
        if elapsed_us > stats.max_pass_us {
            stats.max_pass_us = elapsed_us;
        }
        if matches!(self.budget_us, Some(budget) if elapsed_us > budget) {
            stats.budget_overruns += 1;
        }
    }

    pub(crate) fn snapshot(&self) -> LaneStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
