//! Per-tick delta crossing detector.

/// One-shot detector comparing `current - previous` against a threshold on a
/// fixed observation cadence.
///
/// The caller drives `observe` from a timer tick (e.g. once per second with
/// the latest altitude). The first observation only primes the baseline.
/// While the quantity moves less than the threshold per tick, the baseline
/// follows it, so slow drift (barometric pressure, GPS wander) never fires;
/// a jump of at least the threshold within one tick does.
#[derive(Clone, Debug)]
pub struct DeltaThreshold {
    previous: Option<f32>,
    threshold: f32,
    latched: bool,
}

impl DeltaThreshold {
    /// Creates a detector that fires when the per-tick increase first reaches
    /// `threshold`.
    pub fn new(threshold: f32) -> Self {
        Self {
            previous: None,
            threshold,
            latched: false,
        }
    }

    /// Feeds the current value for this tick and reports whether this call
    /// caused the first crossing since the last [`reset`](Self::reset).
    pub fn observe(&mut self, current: f32) -> bool {
        let Some(previous) = self.previous else {
            self.previous = Some(current);
            return false;
        };

        if !self.latched && current - previous >= self.threshold {
            self.latched = true;
            return true;
        }
        self.previous = Some(current);
        false
    }

    /// True once the detector has fired and not been reset.
    pub fn fired(&self) -> bool {
        self.latched
    }

    /// Configured per-tick crossing threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Clears the latch and drops the baseline, so the next observation
    /// re-primes instead of comparing against a stale value from before the
    /// detector was disarmed.
    pub fn reset(&mut self) {
        self.latched = false;
        self.previous = None;
    }
}
