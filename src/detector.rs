//! Streaming anomaly detectors.
//!
//! A detector is fed the records of one data set, in order, and scores each of
//! them before the next one is read.

use chrono::NaiveDateTime;
use tracing::{info, trace, warn};

use crate::adapter::{HtmModel, ModelAdapter};
use crate::cla::{PatternMemory, TransitionMemory};
use crate::config::{ParameterSet, ParameterSource, ProbationarySchedule};
use crate::encoder::{Encoder, NabEncoder};
use crate::error::{DetectorError, Result};
use crate::fusion::fuse;
use crate::likelihood::{AnomalyLikelihood, LikelihoodEstimator, LikelihoodGate};
use crate::range::{RunningRange, SpatialRangeTracker};
use crate::record::{AnomalyResult, Observation};
use crate::topology::OneDimension;
use crate::{Pooling, SequenceMemory};

/// Tolerance of the spatial-only detector.
pub const SPATIAL_TOLERANCE: f64 = 0.05;

/// Interface of the detectors, as seen by the benchmarking harness.
pub trait AnomalyDetector {
    /// Score the next record of the stream.
    fn handle_record(&mut self, observation: &Observation) -> Result<AnomalyResult>;

    /// Names of the columns reported besides the anomaly score.
    fn additional_headers(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Feed `records` to `detector` in order, stopping at the first error.
pub fn score_stream<D, I>(detector: &mut D, records: I) -> Result<Vec<AnomalyResult>>
where
    D: AnomalyDetector + ?Sized,
    I: IntoIterator<Item = Observation>,
{
    records
        .into_iter()
        .map(|observation| detector.handle_record(&observation))
        .collect()
}

/// Optional behaviours of an `HtmDetector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorOptions {
    /// Calibrate the raw anomaly with the likelihood estimator. Otherwise the
    /// raw anomaly is the temporal score.
    pub use_likelihood: bool,
    /// Flag values outside of the observed range.
    pub use_spatial_anomaly: bool,
    /// Reject records older than the previous one.
    pub check_timestamps: bool,
}

impl Default for DetectorOptions {
    fn default() -> DetectorOptions {
        DetectorOptions {
            use_likelihood: true,
            use_spatial_anomaly: true,
            check_timestamps: false,
        }
    }
}

/// What is known of the data set before streaming it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputProfile {
    /// Smallest value of the data set.
    pub input_min: f64,
    /// Largest value of the data set.
    pub input_max: f64,
    /// Number of records of the data set, sizing the probationary period.
    pub record_count: usize,
}

impl InputProfile {
    /// Profile of a data set held in memory.
    pub fn from_observations(observations: &[Observation]) -> InputProfile {
        let (input_min, input_max) = observations
            .iter()
            .map(|o| o.value)
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
            .unwrap_or((0.0, 0.0));
        InputProfile {
            input_min,
            input_max,
            record_count: observations.len(),
        }
    }
}

impl Default for InputProfile {
    /// Unit range, and as many records as it takes to reach the largest
    /// probationary period.
    fn default() -> InputProfile {
        InputProfile {
            input_min: 0.0,
            input_max: 1.0,
            record_count: 5000,
        }
    }
}

/// Lifecycle of a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Built, no record seen yet.
    Initialized,
    /// At least one record was scored.
    Streaming,
}

/// Observer notified of every scored record.
pub trait ResultSink {
    /// Called once the record is scored.
    fn on_result(&mut self, observation: &Observation, result: &AnomalyResult);
}

impl<F: FnMut(&Observation, &AnomalyResult)> ResultSink for F {
    fn on_result(&mut self, observation: &Observation, result: &AnomalyResult) {
        self(observation, result)
    }
}

/// The HTM anomaly detector.
///
/// Each record goes through the model, then the spatial range check, then the
/// likelihood gate. A spatial anomaly sets the score to `1.0`, otherwise the
/// temporal score is reported. The raw anomaly is reported alongside as a
/// diagnostic.
pub struct HtmDetector<
    E = NabEncoder,
    P = PatternMemory<OneDimension>,
    S = TransitionMemory,
    L = AnomalyLikelihood,
> {
    params: ParameterSet,
    schedule: ProbationarySchedule,
    options: DetectorOptions,
    model: ModelAdapter<E, P, S>,
    spatial: SpatialRangeTracker,
    likelihood: LikelihoodGate<L>,
    state: DetectorState,
    last_timestamp: Option<NaiveDateTime>,
    sink: Option<Box<dyn ResultSink + Send>>,
}

impl HtmDetector {
    /// Build a detector with the default collaborators.
    ///
    /// The parameters come from a preset name or a document, and are resolved
    /// against the profile of the data set.
    pub fn new(
        source: impl Into<ParameterSource>,
        profile: &InputProfile,
        options: DetectorOptions,
    ) -> Result<HtmDetector> {
        let source = source.into();
        info!(
            parameters = source.name(),
            input_min = profile.input_min,
            input_max = profile.input_max,
            records = profile.record_count,
            "resolving detector parameters"
        );
        let params = ParameterSet::resolve(source, profile.input_min, profile.input_max)?;
        let schedule = ProbationarySchedule::for_records(
            profile.record_count,
            params.likelihood.probationary_pct,
            params.likelihood.reestimation_period,
        );
        let model = HtmModel::from_params(&params)?;
        let estimator = AnomalyLikelihood::new(schedule);
        Ok(HtmDetector::with_models(
            params, schedule, model, estimator, options,
        ))
    }
}

impl<E, P, S, L> HtmDetector<E, P, S, L>
where
    E: Encoder,
    P: Pooling,
    S: SequenceMemory,
    L: LikelihoodEstimator,
{
    /// Build a detector around already assembled collaborators.
    ///
    /// The estimator is dropped when `options.use_likelihood` is not set.
    pub fn with_models(
        params: ParameterSet,
        schedule: ProbationarySchedule,
        model: ModelAdapter<E, P, S>,
        estimator: L,
        options: DetectorOptions,
    ) -> HtmDetector<E, P, S, L> {
        info!(
            encoding_width = model.encoder().width(),
            columns = model.pooler().column_dimensions(),
            probationary_period = schedule.probationary_period(),
            learning_period = schedule.learning_period(),
            estimation_samples = schedule.estimation_samples(),
            use_likelihood = options.use_likelihood,
            use_spatial_anomaly = options.use_spatial_anomaly,
            "created HTM detector"
        );
        let likelihood = if options.use_likelihood {
            LikelihoodGate::enabled(estimator)
        } else {
            LikelihoodGate::disabled()
        };
        HtmDetector {
            spatial: SpatialRangeTracker::new(params.spatial_tolerance),
            params,
            schedule,
            options,
            model,
            likelihood,
            state: DetectorState::Initialized,
            last_timestamp: None,
            sink: None,
        }
    }

    /// Score one observation.
    pub fn step(&mut self, observation: &Observation) -> Result<AnomalyResult> {
        if let Some(previous) = self.last_timestamp {
            if self.options.check_timestamps && observation.timestamp < previous {
                warn!(
                    %previous,
                    current = %observation.timestamp,
                    "rejected record older than its predecessor"
                );
                return Err(DetectorError::NonMonotonicTimestamp {
                    previous,
                    current: observation.timestamp,
                });
            }
        }
        let (active_columns, raw_score) = self.model.step(observation)?;
        self.last_timestamp = Some(observation.timestamp);

        let spatial_anomaly =
            self.options.use_spatial_anomaly && self.spatial.observe(observation.value);
        let temporal_score = self.likelihood.score(observation, raw_score);
        let result = AnomalyResult::new(fuse(spatial_anomaly, temporal_score), raw_score);
        self.state = DetectorState::Streaming;

        trace!(
            timestamp = %observation.timestamp,
            value = observation.value,
            active_columns = active_columns.count(),
            raw_score,
            spatial_anomaly,
            score = result.score,
            "scored record"
        );
        if let Some(sink) = self.sink.as_mut() {
            sink.on_result(observation, &result);
        }
        Ok(result)
    }

    /// Lifecycle state.
    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// The probationary schedule of the likelihood estimation.
    pub fn schedule(&self) -> &ProbationarySchedule {
        &self.schedule
    }

    /// The resolved parameters.
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// The options the detector was built with.
    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Range of the values seen by the spatial channel.
    pub fn range(&self) -> RunningRange {
        self.spatial.range()
    }

    /// The HTM model
    pub fn model(&self) -> &ModelAdapter<E, P, S> {
        &self.model
    }

    /// The likelihood estimator, when enabled.
    pub fn estimator(&self) -> Option<&L> {
        self.likelihood.estimator()
    }

    /// Notify `sink` of every record scored from now on.
    pub fn set_sink<K: ResultSink + Send + 'static>(&mut self, sink: K) {
        self.sink = Some(Box::new(sink));
    }
}

impl<E, P, S, L> AnomalyDetector for HtmDetector<E, P, S, L>
where
    E: Encoder,
    P: Pooling,
    S: SequenceMemory,
    L: LikelihoodEstimator,
{
    fn handle_record(&mut self, observation: &Observation) -> Result<AnomalyResult> {
        self.step(observation)
    }

    fn additional_headers(&self) -> &'static [&'static str] {
        &["raw_score"]
    }
}

/// The spatial anomaly channel alone.
///
/// Scores `1.0` for values outside of the observed range, `0.0` otherwise. It
/// has no model and no additional column, its raw score mirrors its score.
#[derive(Debug, Clone)]
pub struct SpatialDetector {
    tracker: SpatialRangeTracker,
}

impl SpatialDetector {
    /// A detector tolerating `tolerance` times the range width.
    pub fn new(tolerance: f64) -> SpatialDetector {
        SpatialDetector {
            tracker: SpatialRangeTracker::new(tolerance),
        }
    }

    /// Range of the values seen so far.
    pub fn range(&self) -> RunningRange {
        self.tracker.range()
    }
}

impl Default for SpatialDetector {
    fn default() -> SpatialDetector {
        SpatialDetector::new(SPATIAL_TOLERANCE)
    }
}

impl AnomalyDetector for SpatialDetector {
    fn handle_record(&mut self, observation: &Observation) -> Result<AnomalyResult> {
        let score = fuse(self.tracker.observe(observation.value), 0.0);
        Ok(AnomalyResult::new(score, score))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{Duration, NaiveDate};

    use super::*;

    fn at(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 9, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
            + Duration::minutes(minute)
    }

    fn profile() -> InputProfile {
        InputProfile {
            input_min: 0.0,
            input_max: 100.0,
            record_count: 200,
        }
    }

    #[test]
    fn test_default_options() {
        let options = DetectorOptions::default();
        assert!(options.use_likelihood);
        assert!(options.use_spatial_anomaly);
        assert!(!options.check_timestamps);
    }

    #[test]
    fn test_profile_from_observations() {
        let records = [
            Observation::new(at(0), 3.0),
            Observation::new(at(1), f64::NAN),
            Observation::new(at(2), -2.0),
            Observation::new(at(3), 8.5),
        ];
        let profile = InputProfile::from_observations(&records);
        assert_eq!(profile.input_min, -2.0);
        assert_eq!(profile.input_max, 8.5);
        assert_eq!(profile.record_count, 4);
    }

    #[test]
    fn test_lifecycle() {
        let mut detector =
            HtmDetector::new("compact", &profile(), DetectorOptions::default()).unwrap();
        assert_eq!(detector.state(), DetectorState::Initialized);
        assert_eq!(detector.range(), RunningRange::default());
        detector.step(&Observation::new(at(0), 5.0)).unwrap();
        assert_eq!(detector.state(), DetectorState::Streaming);
        assert_eq!(detector.range().max(), Some(5.0));
    }

    #[test]
    fn test_schedule_from_profile() {
        let detector =
            HtmDetector::new("compact", &profile(), DetectorOptions::default()).unwrap();
        let expected = (detector.params().likelihood.probationary_pct * 200.0).floor() as usize;
        assert_eq!(detector.schedule().probationary_period(), expected);
        assert!(detector.estimator().is_some());
    }

    #[test]
    fn test_likelihood_disabled_passes_raw_through() {
        let options = DetectorOptions {
            use_likelihood: false,
            use_spatial_anomaly: false,
            ..DetectorOptions::default()
        };
        let mut detector = HtmDetector::new("compact", &profile(), options).unwrap();
        assert!(detector.estimator().is_none());
        for i in 0..30 {
            let value = 50.0 + 40.0 * ((i as f64) / 3.0).sin();
            let result = detector.step(&Observation::new(at(i), value)).unwrap();
            assert_eq!(result.score, result.raw_score);
        }
    }

    /// Calibrates every raw anomaly slightly below zero.
    struct Undershoot;

    impl LikelihoodEstimator for Undershoot {
        fn anomaly_probability(&mut self, _: f64, _: f64, _: NaiveDateTime) -> f64 {
            0.0
        }

        fn compute_log_likelihood(&self, _: f64) -> f64 {
            -0.2
        }
    }

    #[test]
    fn test_negative_temporal_score_is_floored() {
        let params = ParameterSet::resolve("compact", 0.0, 100.0).unwrap();
        let schedule = ProbationarySchedule::new(0, 100);
        let model = HtmModel::from_params(&params).unwrap();
        let options = DetectorOptions {
            use_spatial_anomaly: false,
            ..DetectorOptions::default()
        };
        let mut detector = HtmDetector::with_models(params, schedule, model, Undershoot, options);
        for i in 0..5 {
            let result = detector.step(&Observation::new(at(i), 10.0 * i as f64)).unwrap();
            assert_eq!(result.score, 0.0);
            assert!((0.0..=1.0).contains(&result.raw_score));
        }
    }

    #[test]
    fn test_spatial_channel_disabled_keeps_no_range() {
        let options = DetectorOptions {
            use_spatial_anomaly: false,
            ..DetectorOptions::default()
        };
        let mut detector = HtmDetector::new("compact", &profile(), options).unwrap();
        detector.step(&Observation::new(at(0), 1.0)).unwrap();
        detector.step(&Observation::new(at(1), 90.0)).unwrap();
        assert_eq!(detector.range(), RunningRange::default());
    }

    #[test]
    fn test_non_monotonic_timestamp() {
        let options = DetectorOptions {
            check_timestamps: true,
            ..DetectorOptions::default()
        };
        let mut detector = HtmDetector::new("compact", &profile(), options).unwrap();
        detector.step(&Observation::new(at(5), 1.0)).unwrap();
        detector.step(&Observation::new(at(5), 2.0)).unwrap();
        match detector.step(&Observation::new(at(4), 3.0)) {
            Err(DetectorError::NonMonotonicTimestamp { previous, current }) => {
                assert_eq!(previous, at(5));
                assert_eq!(current, at(4));
            }
            other => panic!("unexpected {:?}", other),
        }
        // the rejected record left no trace
        assert_eq!(detector.range().max(), Some(2.0));
    }

    #[test]
    fn test_unchecked_timestamps_are_accepted() {
        let mut detector =
            HtmDetector::new("compact", &profile(), DetectorOptions::default()).unwrap();
        detector.step(&Observation::new(at(5), 1.0)).unwrap();
        assert!(detector.step(&Observation::new(at(4), 3.0)).is_ok());
    }

    #[test]
    fn test_sink_sees_every_result() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut detector =
            HtmDetector::new("compact", &profile(), DetectorOptions::default()).unwrap();
        let shared = seen.clone();
        detector.set_sink(move |o: &Observation, r: &AnomalyResult| {
            shared.lock().unwrap().push((o.value, r.score));
        });
        let results = score_stream(
            &mut detector,
            (0..5).map(|i| Observation::new(at(i), i as f64)),
        )
        .unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        for (i, ((value, score), result)) in seen.iter().zip(&results).enumerate() {
            assert_eq!(*value, i as f64);
            assert_eq!(*score, result.score);
        }
    }

    #[test]
    fn test_headers() {
        let detector =
            HtmDetector::new("compact", &profile(), DetectorOptions::default()).unwrap();
        assert_eq!(detector.additional_headers(), &["raw_score"]);
        assert!(SpatialDetector::default().additional_headers().is_empty());
    }

    #[test]
    fn test_unknown_preset() {
        let result = HtmDetector::new("nope", &profile(), DetectorOptions::default());
        assert!(matches!(result, Err(DetectorError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_spatial_detector() {
        let mut detector = SpatialDetector::default();
        let scores = score_stream(
            &mut detector,
            [0.0, 10.0, 10.4, 12.0, 11.0, -5.0]
                .iter()
                .enumerate()
                .map(|(i, &v)| Observation::new(at(i as i64), v)),
        )
        .unwrap()
        .into_iter()
        .map(|r| r.score)
        .collect::<Vec<_>>();
        // the range is widened by every record, 10.4 included
        assert_eq!(scores, vec![0.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
        assert_eq!(detector.range().min(), Some(-5.0));
        assert_eq!(detector.range().max(), Some(12.0));
    }

    #[test]
    fn test_detector_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<HtmDetector>();
        assert_send::<SpatialDetector>();
    }
}
