//! Telemetry boundary workers and record types.
//!
//! Sensor-facing units push fixed-width frames into typed channels; the
//! units here drain them. [`UdpBroadcastUnit`] serializes records onto a UDP
//! broadcast socket, [`LogSinkUnit`] writes them into sample logs and
//! retargets between the pre-launch circular log and the fill-once flight
//! log when the mission phase says so. The channel's element type and
//! capacity are the whole contract between the two sides.

mod broadcast;
mod frame;
mod log_sink;

pub use broadcast::UdpBroadcastUnit;
pub use frame::{FastFrame, SlowFrame};
pub use log_sink::{FlightModeSwitch, FlightSwitch, LogSinkUnit};

use std::time::Duration;

/// Default capacity for high-rate telemetry channels (IMU-class sources).
pub const FAST_CHANNEL_CAPACITY: usize = 150;

/// Default capacity for low-rate channels (environment, power).
pub const SLOW_CHANNEL_CAPACITY: usize = 16;

/// Default send timeout for sensing units. Long enough to ride out a slow
/// consumer pass, short enough that a stuck consumer shows up as timeouts at
/// the producer instead of an unbounded stall.
pub const SEND_TIMEOUT: Duration = Duration::from_millis(5);
