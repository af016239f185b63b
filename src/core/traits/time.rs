//! Time abstraction for timing-dependent components.
//!
//! Phase timers and detection cadences never read the clock directly; they
//! take a `TimeSource` so the same logic runs against the monotonic host
//! clock in flight and against a controllable clock in tests.

use core::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic time provider for timers and cadence checks.
///
/// Implementations:
/// - [`MonotonicTime`] for flight and integration use, backed by the host's
///   monotonic clock
/// - [`MockTime`] for host testing with controllable time
pub trait TimeSource: Clone {
    /// Returns current time in microseconds since an arbitrary fixed origin.
    fn now_us(&self) -> u64;

    /// Returns current time in milliseconds since the same origin.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }

    /// Returns elapsed time in microseconds since a reference point.
    ///
    /// Uses saturating subtraction so a stale reference never underflows.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

/// Host monotonic clock. Clones share the same origin, so timestamps taken
/// through different clones are directly comparable.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    /// Creates a time source with its origin at the moment of the call.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros().min(u64::MAX as u128) as u64
    }
}

/// Mock time source for testing with controllable time advancement.
///
/// Clones share the underlying clock, so a test can hold one handle while a
/// component under test holds another. Single-threaded by construction; use
/// [`MonotonicTime`] when a component crosses threads.
///
/// # Example
///
/// ```
/// use flightcore::core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// assert_eq!(time.now_us(), 0);
///
/// time.advance(1000);
/// assert_eq!(time.now_us(), 1000);
/// assert_eq!(time.now_ms(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockTime {
    current_us: Rc<Cell<u64>>,
}

impl MockTime {
    /// Creates a new `MockTime` starting at time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time to an absolute value.
    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    /// Advances the current time by the specified amount.
    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }
}

impl TimeSource for MockTime {
    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}
