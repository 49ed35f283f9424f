//! Streaming anomaly scoring with Hierarchical Temporal Memory.
//!
//! A detector consumes timestamped scalar observations one at a time, in
//! arrival order, and scores each of them before the next one is read. The
//! score fuses two channels:
//!
//! - a spatial channel, flagging values that fall well outside the range seen
//!   so far;
//! - a temporal channel, the anomaly of an HTM model (encoder, pattern memory
//!   and transition memory), optionally calibrated by an anomaly likelihood
//!   estimator.
//!
//! The collaborators are reached through the `Encoder`, `Pooling`,
//! `SequenceMemory` and `LikelihoodEstimator` traits, and the crate ships a
//! default implementation of each.

#![warn(missing_docs)]

pub mod adapter;
pub mod cla;
pub mod config;
pub mod detector;
pub mod encoder;
pub mod error;
pub mod fusion;
pub mod likelihood;
pub mod range;
pub mod record;
pub mod sdr;
pub mod topology;

pub use crate::adapter::ModelAdapter;
pub use crate::config::{ColumnActivation, ParameterSet, ProbationarySchedule};
pub use crate::detector::{
    score_stream, AnomalyDetector, DetectorOptions, DetectorState, HtmDetector, InputProfile,
    ResultSink, SpatialDetector,
};
pub use crate::error::{DetectorError, Result};
pub use crate::record::{AnomalyResult, Observation};
pub use crate::sdr::Sdr;

/// Pooling interface
///
/// Generic interface for poolers, mapping an input pattern onto a fixed
/// number of columns.
pub trait Pooling {
    /// Proceed to a pool
    ///
    /// As input, a pattern of width `input_width()`. The output is the pattern
    /// of active columns, of width `column_dimensions()`. It is thus
    /// appropriate to be fed into a `SequenceMemory`.
    ///
    /// When `learn` is set, the layer is also trained on this input.
    fn pool(&mut self, input: &Sdr, learn: bool) -> Sdr;

    /// Width of the accepted inputs.
    fn input_width(&self) -> usize;

    /// Number of columns of the output.
    fn column_dimensions(&self) -> usize;
}

/// Sequence learning interface
///
/// A state-full layer linking each pattern of active columns to the
/// previously seen ones.
pub trait SequenceMemory {
    /// Process the next pattern of active columns, training on it when
    /// `learn` is set.
    fn compute(&mut self, active_columns: &Sdr, learn: bool);

    /// Anomaly of the last processed input.
    ///
    /// Gets the anomaly of the last input that was processed, as a floating number between
    /// `0.0` (100% expected) to `1.0` (100% unexpected).
    fn anomaly(&self) -> f64;

    /// Number of columns of the accepted inputs.
    fn column_count(&self) -> usize;

    /// Cells active after the last input.
    fn active_cells(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Cells selected for learning on the last input.
    fn winner_cells(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Cells predicting to be active on the next input.
    fn predictive_cells(&self) -> Vec<usize> {
        Vec::new()
    }
}
