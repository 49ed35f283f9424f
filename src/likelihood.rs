//! Anomaly likelihood.
//!
//! Raw anomaly scores are noisy: a perfectly predictable stream still shows
//! spikes of raw anomaly. The likelihood estimator models the distribution
//! of recent raw scores and reports how unusual the current one is in regard
//! of that distribution.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;
use tracing::debug;

use crate::config::ProbationarySchedule;
use crate::record::Observation;

/// Number of raw scores averaged before being compared to the distribution.
pub const AVERAGING_WINDOW: usize = 10;

/// Likelihood reported while the estimator is still on probation.
pub const PROBATIONARY_LIKELIHOOD: f64 = 0.5;

/// Default number of raw scores kept in the history, a month of records at
/// a five minutes period.
pub const HISTORIC_WINDOW_SIZE: usize = 8640;

/// Interface of an anomaly likelihood estimator.
pub trait LikelihoodEstimator {
    /// Probability that `raw_score` is anomalous, given the history.
    ///
    /// Also records the score in the history.
    fn anomaly_probability(&mut self, value: f64, raw_score: f64, timestamp: NaiveDateTime)
        -> f64;

    /// Log scale version of a probability, close to `0.0` for usual scores and
    /// to `1.0` for very unlikely ones.
    fn compute_log_likelihood(&self, probability: f64) -> f64 {
        log_likelihood(probability)
    }
}

/// Log scale of an anomaly probability.
pub fn log_likelihood(probability: f64) -> f64 {
    (1.0000000001 - probability).ln() / (1.0 - 0.9999999999f64).ln()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Distribution {
    mean: f64,
    stdev: f64,
}

impl Distribution {
    /// Distribution of an empty history: nothing is ever unlikely.
    fn null() -> Distribution {
        Distribution {
            mean: 0.5,
            stdev: 1e6,
        }
    }

    /// Fit a normal distribution, with lower bounds on the mean and variance
    /// so that a flat history does not make every bump a certain anomaly.
    fn estimate(samples: &[f64]) -> Distribution {
        if samples.is_empty() {
            return Distribution::null();
        }
        let mean = samples.iter().mean().max(0.03);
        let variance = samples.iter().population_variance().max(0.0003);
        Distribution {
            mean,
            stdev: variance.sqrt(),
        }
    }

    /// Probability of a value at least as far from the mean as `x`.
    fn tail_probability(&self, x: f64) -> f64 {
        let x = if x < self.mean { 2.0 * self.mean - x } else { x };
        match Normal::new(self.mean, self.stdev) {
            Ok(normal) => normal.sf(x),
            // a fit on non finite scores makes nothing unlikely
            Err(_) => 0.5,
        }
    }
}

/// Moving average over a fixed window.
#[derive(Debug, Clone)]
struct MovingAverage {
    window: VecDeque<f64>,
    size: usize,
    total: f64,
}

impl MovingAverage {
    fn new(size: usize) -> MovingAverage {
        MovingAverage {
            window: VecDeque::with_capacity(size),
            size,
            total: 0.0,
        }
    }

    fn push(&mut self, x: f64) -> f64 {
        self.window.push_back(x);
        self.total += x;
        if self.window.len() > self.size {
            if let Some(old) = self.window.pop_front() {
                self.total -= old;
            }
        }
        self.total / self.window.len() as f64
    }
}

/// The default likelihood estimator.
///
/// For the first `learning_period + estimation_samples` records it only
/// gathers raw scores and reports `0.5`. After that a normal distribution is
/// fitted on the moving averages of the raw scores of the history, and
/// refitted every `reestimation_period` records. The history keeps the last
/// `HISTORIC_WINDOW_SIZE` raw scores, and the ones of the learning period are
/// left out of the fits for as long as they stay in it.
#[derive(Debug, Clone)]
pub struct AnomalyLikelihood {
    schedule: ProbationarySchedule,
    window: usize,
    iteration: usize,
    history: VecDeque<f64>,
    distribution: Option<Distribution>,
    average: MovingAverage,
}

impl AnomalyLikelihood {
    /// Create an estimator following `schedule`, with the default history
    /// window.
    pub fn new(schedule: ProbationarySchedule) -> AnomalyLikelihood {
        AnomalyLikelihood::with_window(schedule, HISTORIC_WINDOW_SIZE)
    }

    /// Create an estimator keeping the last `window` raw scores.
    ///
    /// The window never gets shorter than the probationary period.
    pub fn with_window(schedule: ProbationarySchedule, window: usize) -> AnomalyLikelihood {
        let window = window.max(schedule.learning_period() + schedule.estimation_samples());
        AnomalyLikelihood {
            schedule,
            window,
            iteration: 0,
            history: VecDeque::new(),
            distribution: None,
            average: MovingAverage::new(AVERAGING_WINDOW),
        }
    }

    /// Records seen so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Whether the estimator still reports the probationary likelihood.
    pub fn in_probation(&self) -> bool {
        self.iteration < self.probationary_period()
    }

    fn probationary_period(&self) -> usize {
        self.schedule.learning_period() + self.schedule.estimation_samples()
    }

    /// Number of oldest samples of the history that still belong to the
    /// learning period.
    fn skip_records(&self) -> usize {
        let shifted_out = self.iteration.saturating_sub(self.window);
        self.schedule
            .learning_period()
            .saturating_sub(shifted_out)
            .min(self.iteration)
    }

    fn reestimate(&mut self) {
        let skip = self.skip_records();
        let mut average = MovingAverage::new(AVERAGING_WINDOW);
        let averaged: Vec<f64> = self
            .history
            .iter()
            .skip(skip)
            .map(|&raw| average.push(raw))
            .collect();
        let distribution = Distribution::estimate(&averaged);
        debug!(
            iteration = self.iteration,
            skipped = skip,
            samples = averaged.len(),
            mean = distribution.mean,
            stdev = distribution.stdev,
            "reestimated anomaly likelihood distribution"
        );
        self.distribution = Some(distribution);
        self.average = average;
    }
}

impl LikelihoodEstimator for AnomalyLikelihood {
    fn anomaly_probability(
        &mut self,
        _value: f64,
        raw_score: f64,
        _timestamp: NaiveDateTime,
    ) -> f64 {
        let likelihood = if self.in_probation() {
            PROBATIONARY_LIKELIHOOD
        } else {
            let period = self.schedule.reestimation_period().max(1);
            if self.distribution.is_none() || self.iteration % period == 0 {
                self.reestimate();
            }
            let distribution = self.distribution.unwrap_or_else(Distribution::null);
            let averaged = self.average.push(raw_score);
            1.0 - distribution.tail_probability(averaged)
        };

        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(raw_score);
        self.iteration += 1;
        likelihood
    }
}

/// Turns raw anomalies into temporal scores, through the likelihood
/// estimator when one is set.
#[derive(Debug, Clone)]
pub struct LikelihoodGate<L> {
    estimator: Option<L>,
}

impl<L: LikelihoodEstimator> LikelihoodGate<L> {
    /// A gate scoring through `estimator`.
    pub fn enabled(estimator: L) -> LikelihoodGate<L> {
        LikelihoodGate {
            estimator: Some(estimator),
        }
    }

    /// A gate passing raw anomalies through.
    pub fn disabled() -> LikelihoodGate<L> {
        LikelihoodGate { estimator: None }
    }

    /// Whether raw anomalies go through the estimator.
    pub fn is_enabled(&self) -> bool {
        self.estimator.is_some()
    }

    /// The estimator, if any.
    pub fn estimator(&self) -> Option<&L> {
        self.estimator.as_ref()
    }

    /// Temporal anomaly score of `observation`, given its raw anomaly.
    pub fn score(&mut self, observation: &Observation, raw_score: f64) -> f64 {
        match self.estimator {
            Some(ref mut estimator) => {
                let probability = estimator.anomaly_probability(
                    observation.value,
                    raw_score,
                    observation.timestamp,
                );
                estimator.compute_log_likelihood(probability)
            }
            None => raw_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    use super::*;

    fn timestamp(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2014, 4, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
            + Duration::minutes(5 * i)
    }

    #[test]
    fn test_tail_probability() {
        let standard = Distribution {
            mean: 0.0,
            stdev: 1.0,
        };
        assert_relative_eq!(standard.tail_probability(0.0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(standard.tail_probability(1.0), 0.158_655_254, epsilon = 1e-9);
        assert_relative_eq!(
            standard.tail_probability(-1.0),
            standard.tail_probability(1.0),
            epsilon = 1e-12
        );
        assert!(standard.tail_probability(9.0) < 1e-15);
    }

    #[test]
    fn test_estimate_has_floors() {
        let flat = Distribution::estimate(&[0.0; 12]);
        assert_relative_eq!(flat.mean, 0.03);
        assert_relative_eq!(flat.stdev, 0.0003f64.sqrt());

        let spread = Distribution::estimate(&[0.2, 0.4, 0.6, 0.8]);
        assert_relative_eq!(spread.mean, 0.5, epsilon = 1e-12);
        assert_relative_eq!(spread.stdev, 0.05f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_log_likelihood_scale() {
        assert_relative_eq!(log_likelihood(0.5), 0.030_1, epsilon = 1e-4);
        assert_relative_eq!(log_likelihood(1.0), 1.0, epsilon = 1e-6);
        assert!(log_likelihood(0.0) < 1e-9);
    }

    #[test]
    fn test_probation_reports_one_half() {
        let mut estimator = AnomalyLikelihood::new(ProbationarySchedule::new(20, 10));
        for i in 0..20 {
            assert!(estimator.in_probation());
            let p = estimator.anomaly_probability(1.0, 0.3, timestamp(i));
            assert_eq!(p, PROBATIONARY_LIKELIHOOD);
        }
        assert!(!estimator.in_probation());
    }

    #[test]
    fn test_learning_records_are_skipped() {
        let schedule = ProbationarySchedule::new(20, 10);
        let mut quiet = AnomalyLikelihood::new(schedule);
        let mut noisy = AnomalyLikelihood::new(schedule);
        for i in 0..10 {
            quiet.anomaly_probability(0.0, 0.0, timestamp(i));
            noisy.anomaly_probability(0.0, 1.0, timestamp(i));
        }
        for i in 10..20 {
            quiet.anomaly_probability(0.0, 0.2, timestamp(i));
            noisy.anomaly_probability(0.0, 0.2, timestamp(i));
        }
        assert_eq!(quiet.skip_records(), 10);
        assert_eq!(noisy.skip_records(), 10);

        let p = quiet.anomaly_probability(0.0, 0.2, timestamp(20));
        let q = noisy.anomaly_probability(0.0, 0.2, timestamp(20));
        assert_eq!(p, q);
        assert_eq!(quiet.distribution, noisy.distribution);
        let fitted = noisy.distribution.unwrap();
        assert_relative_eq!(fitted.mean, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_learning_records_shift_out_of_the_window() {
        let mut estimator = AnomalyLikelihood::with_window(ProbationarySchedule::new(20, 10), 25);
        for i in 0..30 {
            estimator.anomaly_probability(0.0, 0.1, timestamp(i));
        }
        assert_eq!(estimator.history.len(), 25);
        assert_eq!(estimator.skip_records(), 5);
        for i in 30..40 {
            estimator.anomaly_probability(0.0, 0.1, timestamp(i));
        }
        assert_eq!(estimator.skip_records(), 0);
    }

    #[test]
    fn test_window_covers_the_probationary_period() {
        let estimator = AnomalyLikelihood::with_window(ProbationarySchedule::new(50, 10), 10);
        assert_eq!(estimator.window, 50);
    }

    #[test]
    fn test_unusual_score_is_likely_anomalous() {
        let mut estimator = AnomalyLikelihood::new(ProbationarySchedule::new(200, 100));
        for i in 0..300 {
            let raw = if i % 2 == 0 { 0.0 } else { 0.05 };
            estimator.anomaly_probability(1.0, raw, timestamp(i));
        }
        let usual = estimator.clone().anomaly_probability(1.0, 0.05, timestamp(300));
        let mut spiking = estimator;
        let mut spike = 0.0;
        for i in 0..5 {
            spike = spiking.anomaly_probability(1.0, 1.0, timestamp(300 + i));
        }
        assert!(usual < 0.9, "usual score got {}", usual);
        assert!(spike > 0.99, "spike got {}", spike);
    }

    #[test]
    fn test_empty_schedule_never_panics() {
        let mut estimator = AnomalyLikelihood::new(ProbationarySchedule::new(0, 100));
        let p = estimator.anomaly_probability(1.0, 0.7, timestamp(0));
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_disabled_gate_passes_raw_through() {
        let mut gate: LikelihoodGate<AnomalyLikelihood> = LikelihoodGate::disabled();
        for (i, raw) in [0.0, 0.25, 1.0, 0.6].iter().enumerate() {
            let observation = Observation::new(timestamp(i as i64), 3.0);
            assert_eq!(gate.score(&observation, *raw), *raw);
        }
        assert!(!gate.is_enabled());
    }

    #[test]
    fn test_enabled_gate_reports_log_likelihood() {
        let estimator = AnomalyLikelihood::new(ProbationarySchedule::new(10, 100));
        let mut gate = LikelihoodGate::enabled(estimator);
        let observation = Observation::new(timestamp(0), 3.0);
        let score = gate.score(&observation, 1.0);
        assert_relative_eq!(score, log_likelihood(PROBATIONARY_LIKELIHOOD));
        assert_eq!(gate.estimator().map(|e| e.iteration()), Some(1));
    }
}
