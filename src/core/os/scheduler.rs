//! Process-wide scheduler registry.
//!
//! The scheduler is an explicitly constructed object, not a global: module
//! images build one in their composition root, register lanes, and start
//! them together; a test harness builds an independent scheduler per test.
//!
//! Startup runs in three stages across every lane thread: all units' `init`
//! in attachment order, a cross-lane rendezvous, all units' `post_init`,
//! a second rendezvous, then the run bodies. A lane whose setup fails still
//! participates in the rendezvous (then parks) so healthy lanes are never
//! stranded, but it does not enter its run body.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use thiserror::Error;

use super::lane::{ConfigError, ExecutionLane, LaneParts};
use super::stats::{LaneStats, StatsCell};
use super::unit::{Pacing, ServiceUnit, ShutdownToken};
use crate::{log_error, log_info, log_warn};

/// Misuse of the scheduler itself (as opposed to per-lane configuration
/// problems, which are reported in the [`StartSummary`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The lane list is immutable once started.
    #[error("scheduler already started")]
    AlreadyStarted,
}

/// Why a lane did not start.
#[derive(Debug, Error)]
pub enum LaneStartError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("thread spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Outcome of [`Scheduler::start`].
///
/// Ground software checks [`all_started`](Self::all_started) as part of
/// flight readiness: a lane that failed configuration must fail loud before
/// launch, while the lanes that did start keep running regardless.
#[derive(Debug, Default)]
pub struct StartSummary {
    /// Names of lanes now running, in registration order.
    pub started: Vec<String>,
    /// Lanes that did not start, with the reason.
    pub failed: Vec<(String, LaneStartError)>,
}

impl StartSummary {
    pub fn all_started(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Process-wide registry of execution lanes.
pub struct Scheduler {
    pending: Vec<ExecutionLane>,
    running: Vec<RunningLane>,
    shutdown: ShutdownToken,
    started: bool,
}

struct RunningLane {
    name: String,
    priority: i32,
    stats: Arc<StatsCell>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            running: Vec::new(),
            shutdown: ShutdownToken::new(),
            started: false,
        }
    }

    /// Appends a lane to the registry. Lanes can only be registered before
    /// [`start`](Self::start).
    pub fn register_lane(&mut self, lane: ExecutionLane) -> Result<(), SchedulerError> {
        if self.started {
            return Err(SchedulerError::AlreadyStarted);
        }
        self.pending.push(lane);
        Ok(())
    }

    /// Launches every registered lane's thread and drives the three-stage
    /// lifecycle. Per-lane configuration errors abort that lane only and are
    /// reported in the summary.
    pub fn start(&mut self) -> Result<StartSummary, SchedulerError> {
        if self.started {
            return Err(SchedulerError::AlreadyStarted);
        }
        self.started = true;

        let mut summary = StartSummary::default();
        let gate = Arc::new(Gate::new());

        for lane in std::mem::take(&mut self.pending) {
            let pacing = match lane.validate() {
                Ok(pacing) => pacing,
                Err(err) => {
                    let name = lane.name().to_string();
                    log_error!("lane '{}' not started: {}", name, err);
                    summary.failed.push((name, err.into()));
                    continue;
                }
            };

            let LaneParts {
                name,
                priority,
                stack_size,
                pass_budget,
                units,
            } = lane.into_parts();

            let stats = Arc::new(StatsCell::new(pass_budget));
            let mut builder = thread::Builder::new().name(name.clone());
            if stack_size > 0 {
                builder = builder.stack_size(stack_size);
            }

            let spawned = builder.spawn({
                let gate = Arc::clone(&gate);
                let shutdown = self.shutdown.clone();
                let stats = Arc::clone(&stats);
                let thread_name = name.clone();
                move || run_lane(thread_name, units, pacing, gate, shutdown, stats)
            });

            match spawned {
                Ok(handle) => {
                    self.running.push(RunningLane {
                        name: name.clone(),
                        priority,
                        stats,
                        handle,
                    });
                    summary.started.push(name);
                }
                Err(err) => {
                    log_error!("lane '{}' thread spawn failed: {}", name, err);
                    summary.failed.push((name, LaneStartError::Spawn(err)));
                }
            }
        }

        // Membership is fixed only now that every spawn attempt resolved, so
        // a failed spawn can never strand the surviving lanes at the gate.
        gate.set_expected(summary.started.len());
        log_info!(
            "scheduler started {} lane(s), {} failed",
            summary.started.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Signals shutdown and joins every lane thread. Test and simulation
    /// harnesses only; production lanes run until power-off.
    pub fn stop(&mut self) {
        self.shutdown.signal();
        for lane in self.running.drain(..) {
            if lane.handle.join().is_err() {
                log_error!("lane '{}' panicked", lane.name);
            }
        }
    }

    /// The token lanes watch for shutdown; handy for harness-driven units.
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Names and priorities of the running lanes, in start order.
    pub fn running_lanes(&self) -> Vec<(String, i32)> {
        self.running
            .iter()
            .map(|lane| (lane.name.clone(), lane.priority))
            .collect()
    }

    /// Service-pass statistics per running lane.
    pub fn lane_stats(&self) -> Vec<(String, LaneStats)> {
        self.running
            .iter()
            .map(|lane| (lane.name.clone(), lane.stats.snapshot()))
            .collect()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn run_lane(
    lane_name: String,
    mut units: Vec<Box<dyn ServiceUnit>>,
    pacing: Pacing,
    gate: Arc<Gate>,
    shutdown: ShutdownToken,
    stats: Arc<StatsCell>,
) {
    let mut healthy = true;
    for unit in units.iter_mut() {
        if let Err(err) = unit.init() {
            log_error!("{}: init failed for unit '{}': {}", lane_name, unit.name(), err);
            healthy = false;
            break;
        }
    }

    gate.wait();

    if healthy {
        for unit in units.iter_mut() {
            if let Err(err) = unit.post_init() {
                log_error!(
                    "{}: post-init failed for unit '{}': {}",
                    lane_name,
                    unit.name(),
                    err
                );
                healthy = false;
                break;
            }
        }
    }

    gate.wait();

    if !healthy {
        log_warn!("{}: not entering run body after failed setup", lane_name);
        return;
    }

    match pacing {
        Pacing::Blocking => {
            if let Some(unit) = units.first_mut() {
                unit.service(&shutdown);
                if !shutdown.is_signaled() {
                    log_warn!(
                        "{}: unit '{}' returned from its run body",
                        lane_name,
                        unit.name()
                    );
                }
            }
        }
        Pacing::Cooperative => {
            while !shutdown.is_signaled() {
                let pass_started = Instant::now();
                for unit in units.iter_mut() {
                    unit.service(&shutdown);
                }
                stats.record_pass(pass_started.elapsed());
                thread::yield_now();
            }
        }
    }
}

/// Rendezvous point between lifecycle stages. Unlike a fixed-size barrier,
/// the participant count is set after every lane spawn has resolved.
struct Gate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

#[derive(Default)]
struct GateState {
    expected: Option<usize>,
    arrived: usize,
    generation: u64,
}

impl Gate {
    fn new() -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            condvar: Condvar::new(),
        }
    }

    /// Called by lane threads; blocks until all expected participants have
    /// arrived at this stage.
    fn wait(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.arrived += 1;
        if state.expected == Some(state.arrived) {
            state.arrived = 0;
            state.generation += 1;
            drop(state);
            self.condvar.notify_all();
            return;
        }
        let generation = state.generation;
        while state.generation == generation {
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Called once by the scheduler thread after spawning; releases the
    /// stage if everyone already arrived.
    fn set_expected(&self, count: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.expected = Some(count);
        if state.arrived == count && count > 0 {
            state.arrived = 0;
            state.generation += 1;
            drop(state);
            self.condvar.notify_all();
        }
    }
}
