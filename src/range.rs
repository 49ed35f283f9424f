//! Spatial anomaly detection on the range of observed values.
//!
//! Human labelers tend to flag values larger (or smaller) than anything seen
//! before, whether or not a temporal model would find them surprising. The
//! tracker catches those, and does not depend on any learning state.

use tracing::debug;

/// Range of the values observed so far. Only ever widens.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunningRange {
    min: Option<f64>,
    max: Option<f64>,
}

impl RunningRange {
    /// Smallest value seen, if any.
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Largest value seen, if any.
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Widen the range to include `value`. `NaN` is ignored.
    fn absorb(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        if self.max.map_or(true, |max| value > max) {
            self.max = Some(value);
        }
        if self.min.map_or(true, |min| value < min) {
            self.min = Some(value);
        }
    }
}

/// Flags values falling outside of the observed range by more than a
/// fraction of its width.
#[derive(Debug, Clone)]
pub struct SpatialRangeTracker {
    range: RunningRange,
    tolerance: f64,
}

impl SpatialRangeTracker {
    /// Create a tracker tolerating `tolerance` times the range width on each
    /// side of it.
    ///
    /// An example value would be `0.05`.
    pub fn new(tolerance: f64) -> SpatialRangeTracker {
        SpatialRangeTracker {
            range: RunningRange::default(),
            tolerance,
        }
    }

    /// Check `value` against the range, then widen the range with it.
    ///
    /// Returns `false` as long as fewer than two distinct values were seen.
    /// `NaN` compares false against every bound, so it is never flagged.
    pub fn observe(&mut self, value: f64) -> bool {
        let anomaly = match (self.range.min, self.range.max) {
            (Some(min), Some(max)) if min != max => {
                let tolerance = (max - min) * self.tolerance;
                value > max + tolerance || value < min - tolerance
            }
            _ => false,
        };
        if anomaly {
            debug!(value, min = ?self.range.min, max = ?self.range.max, "spatial anomaly");
        }
        self.range.absorb(value);
        anomaly
    }

    /// The range seen so far.
    pub fn range(&self) -> RunningRange {
        self.range
    }

    /// Fraction of the range width tolerated on each side.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}
