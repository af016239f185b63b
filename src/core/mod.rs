//! Core coordination substrate shared by every module image.
//!
//! The pieces here are deliberately free of device knowledge: sensor-facing
//! units push plain numeric samples, network and storage units drain typed
//! channels, and the phase controller only ever sees phase identities and
//! trigger values.

pub mod channel;
pub mod detection;
pub mod logging;
pub mod os;
pub mod phase;
pub mod traits;
