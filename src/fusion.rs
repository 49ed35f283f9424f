//! Combination of the spatial and temporal anomaly evidences.

/// Fuse the spatial flag with the temporal score.
///
/// A spatial anomaly overrides the temporal model and scores exactly `1.0`.
/// Otherwise the score is `max(0.0, temporal)`: a temporal score below zero
/// is floored, one above `1.0` goes through.
pub fn fuse(spatial_anomaly: bool, temporal_score: f64) -> f64 {
    if spatial_anomaly {
        1.0
    } else {
        temporal_score.max(0.0)
    }
}
