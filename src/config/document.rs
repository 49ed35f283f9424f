//! Raw parameter documents.
//!
//! Mirrors the `params.json` layout used by the NAB htm.core detector, so
//! existing parameter files can be fed as-is once read by the caller. Nothing
//! here is validated: see `ParameterSet::resolve`.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A parameter document, as written by hand or by an optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDocument {
    /// The encoders
    pub enc: EncoderDocument,
    /// The pooler
    pub sp: PoolerDocument,
    /// The sequence memory
    pub tm: SequenceDocument,
    /// Fraction of the observed range tolerated outside of it, `0.05` when
    /// absent.
    #[serde(default = "default_spatial_tolerance")]
    pub spatial_tolerance: f64,
    /// The likelihood estimation
    #[serde(default)]
    pub anomaly: AnomalyDocument,
}

impl ParameterDocument {
    /// Parse a document from its JSON text.
    pub fn from_json(text: &str) -> Result<ParameterDocument> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize the document back to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn default_spatial_tolerance() -> f64 {
    0.05
}

/// Parameters of the encoders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderDocument {
    /// The value encoder
    pub value: ValueEncoderDocument,
    /// The timestamp encoder
    pub time: TimeEncoderDocument,
}

/// Parameters of the random distributed scalar encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueEncoderDocument {
    /// Total number of bits, an example value would be `400`
    pub size: i64,
    /// Number of active bits, exclusive with `sparsity`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_bits: Option<i64>,
    /// Fraction of active bits, exclusive with `activeBits`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparsity: Option<f64>,
    /// Derived from the input range when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<f64>,
    /// Seed of the bucket hashing
    #[serde(default)]
    pub seed: u64,
}

/// Parameters of the date encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEncoderDocument {
    /// Active bits and radius in hours.
    pub time_of_day: (i64, f64),
    /// Active bits of the weekend flag, absent or `0` to disable it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekend: Option<i64>,
}

/// Parameters of the pooler, named after the htm.core spatial pooler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolerDocument {
    /// Number of columns, an example value would be `2048`
    pub column_dimensions: i64,
    /// Fraction of the inputs within the potential radius each column may
    /// connect to
    pub potential_pct: f64,
    /// Fraction of the columns active for each input, `0.0` when
    /// `numActiveColumnsPerInhArea` is used instead
    #[serde(default)]
    pub local_area_density: f64,
    /// Number of columns active for each input, `0` when `localAreaDensity`
    /// is used instead
    #[serde(default)]
    pub num_active_columns_per_inh_area: i64,
    /// Minimum overlap of a column to be considered
    #[serde(default)]
    pub stimulus_threshold: i64,
    /// An example value would be `0.0005`
    pub syn_perm_inactive_dec: f64,
    /// An example value would be `0.003`
    pub syn_perm_active_inc: f64,
    /// An example value would be `0.2`
    pub syn_perm_connected: f64,
    /// `0.0` disables boosting
    #[serde(default)]
    pub boost_strength: f64,
    /// Reach of the potential pools around the column centers, the whole
    /// encoding when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_radius: Option<i64>,
    /// Whether potential pools wrap around the edges of the input, defaults
    /// to `true`
    #[serde(default = "default_true")]
    pub wrap_around: bool,
    /// Defaults to `0.001`
    #[serde(default = "default_min_pct_overlap_duty_cycle")]
    pub min_pct_overlap_duty_cycle: f64,
    /// Defaults to `1000`
    #[serde(default = "default_duty_cycle_period")]
    pub duty_cycle_period: i64,
    /// Seed of the potential pools and initial permanences
    #[serde(default)]
    pub seed: u64,
}

fn default_true() -> bool {
    true
}

fn default_min_pct_overlap_duty_cycle() -> f64 {
    0.001
}

fn default_duty_cycle_period() -> i64 {
    1000
}

/// Parameters of the sequence memory, named after the htm.core temporal
/// memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceDocument {
    /// An example value would be `32`
    pub cells_per_column: i64,
    /// Connected synapses to active cells for a segment to become active
    pub activation_threshold: i64,
    /// Permanence of the newly grown synapses
    pub initial_permanence: f64,
    /// Permanence from which a synapse is connected
    pub connected_permanence: f64,
    /// Potential synapses to active cells for a segment to be matching
    pub min_threshold: i64,
    /// Synapses grown at most on each learning step
    pub max_new_synapse_count: i64,
    /// An example value would be `0.1`
    pub permanence_increment: f64,
    /// An example value would be `0.1`
    pub permanence_decrement: f64,
    /// Punishment of the segments whose prediction failed, `0.0` by default
    #[serde(default)]
    pub predicted_segment_decrement: f64,
    /// Defaults to `255`
    #[serde(default = "default_max_per_cell")]
    pub max_segments_per_cell: i64,
    /// Defaults to `255`
    #[serde(default = "default_max_per_cell")]
    pub max_synapses_per_segment: i64,
    /// Seed of the winner cell and synapse sampling
    #[serde(default)]
    pub seed: u64,
}

fn default_max_per_cell() -> i64 {
    255
}

/// Anomaly scoring section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnomalyDocument {
    /// The likelihood estimation
    #[serde(default)]
    pub likelihood: LikelihoodDocument,
}

/// Parameters of the likelihood estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikelihoodDocument {
    /// Fraction of the data set making the probationary period
    pub probationary_pct: f64,
    /// Records between two fits of the distribution
    pub reestimation_period: i64,
}

impl Default for LikelihoodDocument {
    fn default() -> Self {
        LikelihoodDocument {
            probationary_pct: 0.1,
            reestimation_period: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &str = r#"{
        "enc": {
            "value": {"size": 400, "activeBits": 21, "seed": 5},
            "time": {"timeOfDay": [21, 9.49]}
        },
        "sp": {
            "columnDimensions": 2048,
            "potentialPct": 0.8,
            "localAreaDensity": 0.025,
            "numActiveColumnsPerInhArea": 0,
            "stimulusThreshold": 0,
            "synPermInactiveDec": 0.0005,
            "synPermActiveInc": 0.003,
            "synPermConnected": 0.2,
            "boostStrength": 0.0,
            "minPctOverlapDutyCycle": 0.001,
            "dutyCyclePeriod": 1000,
            "seed": 5
        },
        "tm": {
            "cellsPerColumn": 32,
            "activationThreshold": 20,
            "initialPermanence": 0.24,
            "connectedPermanence": 0.5,
            "minThreshold": 13,
            "maxNewSynapseCount": 31,
            "permanenceIncrement": 0.04,
            "permanenceDecrement": 0.008,
            "predictedSegmentDecrement": 0.001,
            "maxSegmentsPerCell": 128,
            "maxSynapsesPerSegment": 128,
            "seed": 5
        },
        "spatial_tolerance": 0.05,
        "anomaly": {"likelihood": {"probationaryPct": 0.1, "reestimationPeriod": 100}}
    }"#;

    #[test]
    fn test_parses_nab_params_file() {
        let doc = ParameterDocument::from_json(PARAMS).unwrap();
        assert_eq!(doc.enc.value.size, 400);
        assert_eq!(doc.enc.value.active_bits, Some(21));
        assert_eq!(doc.enc.value.resolution, None);
        assert_eq!(doc.enc.time.time_of_day, (21, 9.49));
        assert_eq!(doc.sp.local_area_density, 0.025);
        assert!(doc.sp.wrap_around);
        assert_eq!(doc.sp.potential_radius, None);
        assert_eq!(doc.tm.max_segments_per_cell, 128);
        assert_eq!(doc.anomaly.likelihood.reestimation_period, 100);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let mut value: serde_json::Value = serde_json::from_str(PARAMS).unwrap();
        let object = value.as_object_mut().unwrap();
        object.remove("anomaly");
        object.remove("spatial_tolerance");
        let doc: ParameterDocument = serde_json::from_value(value).unwrap();
        assert_eq!(doc.spatial_tolerance, 0.05);
        assert_eq!(doc.anomaly.likelihood, LikelihoodDocument::default());
    }

    #[test]
    fn test_json_round_trip_keeps_keys() {
        let doc = ParameterDocument::from_json(PARAMS).unwrap();
        let text = doc.to_json().unwrap();
        assert!(text.contains("\"numActiveColumnsPerInhArea\""));
        assert!(text.contains("\"timeOfDay\""));
        assert_eq!(ParameterDocument::from_json(&text).unwrap(), doc);
    }

    #[test]
    fn test_potential_radius_key() {
        let text = PARAMS.replace("\"potentialPct\"", "\"potentialRadius\": 12, \"potentialPct\"");
        let doc = ParameterDocument::from_json(&text).unwrap();
        assert_eq!(doc.sp.potential_radius, Some(12));
        assert!(doc.to_json().unwrap().contains("\"potentialRadius\": 12"));
    }

    #[test]
    fn test_malformed_document() {
        assert!(ParameterDocument::from_json("{\"enc\": 3}").is_err());
    }
}
