//! Streams a sine wave with an injected spike through an HTM detector and
//! prints the scores as CSV.
//!
//! Run with `RUST_LOG=htm_anomaly=debug` to see the detector logs.

use chrono::{Duration, NaiveDate};
use tracing_subscriber::EnvFilter;

use htm_anomaly::{DetectorOptions, HtmDetector, InputProfile, Observation, Result};

const RECORDS: usize = 1500;
const PERIOD: f64 = 48.0;
const SPIKE_AT: usize = 1200;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let start = NaiveDate::from_ymd_opt(2015, 9, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let records: Vec<Observation> = (0..RECORDS)
        .map(|i| {
            let phase = i as f64 * std::f64::consts::TAU / PERIOD;
            let value = if i == SPIKE_AT {
                180.0
            } else {
                100.0 + 50.0 * phase.sin()
            };
            Observation::new(start + Duration::minutes(5 * i as i64), value)
        })
        .collect();

    let profile = InputProfile::from_observations(&records);
    let mut detector = HtmDetector::new("compact", &profile, DetectorOptions::default())?;

    println!("timestamp,value,anomaly_score,raw_score");
    for observation in &records {
        let result = detector.step(observation)?;
        println!(
            "{},{:.3},{:.5},{:.5}",
            observation.timestamp, observation.value, result.score, result.raw_score
        );
    }
    Ok(())
}
