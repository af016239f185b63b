//! Execution lanes: OS-thread hosts for service units.

use std::time::Duration;

use thiserror::Error;

use super::unit::{Pacing, ServiceUnit};

/// Lane configuration problems, detected when the scheduler starts.
///
/// A configuration error aborts startup of the affected lane only; the rest
/// of the vehicle keeps running. On the ground this must fail loud - see
/// [`StartSummary`](super::StartSummary).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A lane with zero attached units has nothing to run.
    #[error("lane has no attached units")]
    EmptyLane,
    /// A multi-unit lane mixes a blocking run-forever body with siblings
    /// that would never get the thread back.
    #[error("lane mixes blocking and cooperative units")]
    MixedPacing,
}

/// An OS-thread host for one or more service units.
///
/// Priority follows the lower-is-sooner convention of the flight targets and
/// is recorded for the deployment environment and diagnostics; the host OS
/// supplies the preemption itself. The stack budget is applied to the thread
/// at spawn (0 keeps the host default).
pub struct ExecutionLane {
    name: String,
    priority: i32,
    stack_size: usize,
    pass_budget: Option<Duration>,
    units: Vec<Box<dyn ServiceUnit>>,
}

impl ExecutionLane {
    pub fn new(name: &str, priority: i32, stack_size: usize) -> Self {
        Self {
            name: name.to_string(),
            priority,
            stack_size,
            pass_budget: None,
            units: Vec::new(),
        }
    }

    /// Attaches a unit. Attachment order is lifecycle order: `init`,
    /// `post_init`, and cooperative passes all walk units in this order.
    pub fn add_unit(&mut self, unit: impl ServiceUnit + 'static) {
        self.units.push(Box::new(unit));
    }

    /// Budget for one cooperative service pass; passes exceeding it count as
    /// overruns in the lane's [`LaneStats`](super::LaneStats).
    pub fn set_pass_budget(&mut self, budget: Duration) {
        self.pass_budget = Some(budget);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Checks the lane's unit configuration and resolves the lane's pacing:
    /// a single unit runs with its own pacing, several units must all be
    /// cooperative.
    pub(crate) fn validate(&self) -> Result<Pacing, ConfigError> {
        match self.units.as_slice() {
            [] => Err(ConfigError::EmptyLane),
            [only] => Ok(only.pacing()),
            several => {
                if several.iter().all(|u| u.pacing() == Pacing::Cooperative) {
                    Ok(Pacing::Cooperative)
                } else {
                    Err(ConfigError::MixedPacing)
                }
            }
        }
    }

    pub(crate) fn into_parts(self) -> LaneParts {
        LaneParts {
            name: self.name,
            priority: self.priority,
            stack_size: self.stack_size,
            pass_budget: self.pass_budget,
            units: self.units,
        }
    }
}

pub(crate) struct LaneParts {
    pub(crate) name: String,
    pub(crate) priority: i32,
    pub(crate) stack_size: usize,
    pub(crate) pass_budget: Option<Duration>,
    pub(crate) units: Vec<Box<dyn ServiceUnit>>,
}
