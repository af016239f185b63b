//! Rolling-average crossing detector.

/// One-shot detector over the rolling average of the last `K` raw samples.
///
/// Each sample evicts the oldest buffer slot and updates the running sum
/// incrementally (`sum += raw - evicted`), so the cost per sample is O(1)
/// and the sum always equals the exact sum of the buffer. The buffer starts
/// zeroed, matching a vehicle at rest on the pad.
#[derive(Clone, Debug)]
pub struct RollingThreshold<const K: usize> {
    samples: [f32; K],
    sum: f32,
    index: usize,
    threshold: f32,
    latched: bool,
}

impl<const K: usize> RollingThreshold<K> {
    /// Creates a detector that fires when the rolling average first exceeds
    /// `threshold`.
    pub fn new(threshold: f32) -> Self {
        const { assert!(K > 0, "rolling window must hold at least one sample") }
        Self {
            samples: [0.0; K],
            sum: 0.0,
            index: 0,
            threshold,
            latched: false,
        }
    }

    /// Records `raw` into the next slot and reports whether this call caused
    /// the first crossing of the average above the threshold since the last
    /// [`reset`](Self::reset).
    pub fn add_sample(&mut self, raw: f32) -> bool {
        let evicted = self.samples[self.index];
        self.samples[self.index] = raw;
        self.index = (self.index + 1) % K;
        self.sum += raw - evicted;

        if !self.latched && self.average() > self.threshold {
            self.latched = true;
            return true;
        }
        false
    }

    /// Current rolling average over the window.
    pub fn average(&self) -> f32 {
        self.sum / K as f32
    }

    /// True once the detector has fired and not been reset.
    pub fn fired(&self) -> bool {
        self.latched
    }

    /// Configured crossing threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Clears the latch. The sample window is retained: the recent history is
    /// still valid, and if the average sits above the threshold the next
    /// sample fires again.
    pub fn reset(&mut self) {
        self.latched = false;
    }
}
