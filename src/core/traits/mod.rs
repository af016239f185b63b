//! Support traits shared across the substrate.

pub mod time;

pub use time::{MockTime, MonotonicTime, TimeSource};
