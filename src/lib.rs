//! flightcore - shared coordination substrate for rocket avionics modules
//!
//! Every hardware module (sensing, power, radio, deployment, recovery) wires
//! sensors, network links, and storage into a small set of concurrent workers.
//! This crate provides the pieces those workers are built from:
//!
//! - [`crate::core::os`]: service units with an init / post-init / run
//!   lifecycle, hosted on named, prioritized execution lanes under a
//!   process-wide scheduler
//! - [`crate::core::channel`]: bounded typed channels with timeout-visible
//!   backpressure between producers and consumers
//! - [`crate::core::detection`]: edge-triggered threshold detectors (rolling
//!   average and per-tick delta) for boost/apogee style events
//! - [`crate::core::phase`]: the generic mission-phase controller that turns
//!   events, source crossings, and timer expiry into phase transitions and
//!   observer notifications
//! - [`storage`]: fixed-width sample logs with stop-at-capacity, circular,
//!   and growing policies
//! - [`telemetry`]: the worker units that drain telemetry channels onto the
//!   network and into storage
//!
//! The host OS supplies the preemptive threads; flightcore supplies the
//! cooperation layer on top of them.

pub mod core;
pub mod storage;
pub mod telemetry;

pub use crate::core::channel::{Channel, RecvTimeoutError, SendTimeoutError, TrySendError};
pub use crate::core::detection::{DeltaThreshold, RollingThreshold};
pub use crate::core::os::{
    ConfigError, ExecutionLane, Pacing, Scheduler, ServiceUnit, ShutdownToken, UnitError,
};
pub use crate::core::phase::{PhaseChange, PhaseController, PhaseObserver, Trigger};
pub use crate::core::traits::{MockTime, MonotonicTime, TimeSource};
pub use crate::storage::{LogMode, Record, SampleLog, StorageError};
