//! Records flowing in and out of a detector.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One timestamped scalar observation of the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Time of the observation, records are expected in increasing order.
    pub timestamp: NaiveDateTime,
    /// Observed value.
    pub value: f64,
}

impl Observation {
    /// Create a new observation
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Observation {
        Observation { timestamp, value }
    }
}

/// Scores of one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// The final anomaly score, spatial and temporal evidences combined.
    pub score: f64,
    /// The raw anomaly of the sequence memory, for diagnostics only.
    pub raw_score: f64,
}

impl AnomalyResult {
    /// Create a new result
    pub fn new(score: f64, raw_score: f64) -> AnomalyResult {
        AnomalyResult { score, raw_score }
    }
}
