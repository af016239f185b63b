//! Edge-triggered threshold detection.
//!
//! Flight software must act once on "boost started", not continuously while
//! acceleration stays high, so both detectors here latch after their first
//! crossing and stay quiet until explicitly reset. Reset happens when the
//! phase controller (re)enters a phase that waits on the detector - see
//! [`crate::core::phase`].
//!
//! Two variants share the one-shot contract and differ only in how the
//! monitored quantity is computed:
//!
//! - [`RollingThreshold`]: rolling average of the last K raw samples crossing
//!   a fixed threshold (launch detection from accelerometer magnitude)
//! - [`DeltaThreshold`]: change since the previous tick crossing a fixed
//!   threshold (altitude jump between timer ticks)

mod delta;
mod rolling;

pub use delta::DeltaThreshold;
pub use rolling::RollingThreshold;
