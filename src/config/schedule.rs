//! Probationary period bookkeeping.

/// Split of the probationary period between the learning of the likelihood
/// estimator and the gathering of its first estimation samples.
///
/// Computed once when a detector is built, never changed afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbationarySchedule {
    probationary_period: usize,
    learning_period: usize,
    estimation_samples: usize,
    reestimation_period: usize,
}

impl ProbationarySchedule {
    /// Schedule for an explicit probationary period, in records.
    pub fn new(probationary_period: usize, reestimation_period: usize) -> ProbationarySchedule {
        let learning_period = probationary_period / 2;
        ProbationarySchedule {
            probationary_period,
            learning_period,
            estimation_samples: probationary_period - learning_period,
            reestimation_period,
        }
    }

    /// Schedule for a data set of `record_count` records.
    ///
    /// The probationary period is `probationary_pct` of the records, capped to
    /// the same fraction of 5000 records.
    pub fn for_records(
        record_count: usize,
        probationary_pct: f64,
        reestimation_period: usize,
    ) -> ProbationarySchedule {
        let period = (probationary_pct * record_count as f64)
            .floor()
            .min((probationary_pct * 5000.0).floor())
            .max(0.0);
        ProbationarySchedule::new(period as usize, reestimation_period)
    }

    /// Number of leading records scored with the probationary likelihood.
    pub fn probationary_period(&self) -> usize {
        self.probationary_period
    }

    /// Number of leading records ignored by the estimator.
    pub fn learning_period(&self) -> usize {
        self.learning_period
    }

    /// Number of raw scores gathered after the learning period before the
    /// first fit of the distribution.
    pub fn estimation_samples(&self) -> usize {
        self.estimation_samples
    }

    /// Number of records between two fits of the distribution.
    pub fn reestimation_period(&self) -> usize {
        self.reestimation_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        let s = ProbationarySchedule::new(200, 100);
        assert_eq!(s.learning_period(), 100);
        assert_eq!(s.estimation_samples(), 100);
    }

    #[test]
    fn test_odd_split_favours_estimation() {
        let s = ProbationarySchedule::new(201, 100);
        assert_eq!(s.learning_period(), 100);
        assert_eq!(s.estimation_samples(), 101);
    }

    #[test]
    fn test_for_records_uses_percentage() {
        let s = ProbationarySchedule::for_records(4032, 0.15, 100);
        assert_eq!(s.probationary_period(), 604);
    }

    #[test]
    fn test_for_records_is_capped() {
        let s = ProbationarySchedule::for_records(22695, 0.15, 100);
        assert_eq!(s.probationary_period(), 750);
        assert_eq!(s.learning_period(), 375);
        assert_eq!(s.estimation_samples(), 375);
    }

    #[test]
    fn test_empty_data_set() {
        let s = ProbationarySchedule::for_records(0, 0.1, 100);
        assert_eq!(s.probationary_period(), 0);
        assert_eq!(s.learning_period(), 0);
        assert_eq!(s.estimation_samples(), 0);
    }
}
