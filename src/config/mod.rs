//! Detector configuration.
//!
//! A `ParameterDocument` is the loose, serializable form of the parameters,
//! either taken from the built-in catalog or supplied by the caller. It is
//! resolved once against the known input range into a `ParameterSet`, where
//! every field is set and checked.

mod document;
pub mod presets;
mod schedule;

use tracing::debug;

use crate::error::{DetectorError, Result};

pub use self::document::{
    AnomalyDocument, EncoderDocument, LikelihoodDocument, ParameterDocument, PoolerDocument,
    SequenceDocument, TimeEncoderDocument, ValueEncoderDocument,
};
pub use self::schedule::ProbationarySchedule;

/// Number of buckets the input range is split into when the value encoder
/// resolution is derived.
pub const RESOLUTION_BUCKETS: f64 = 130.0;

/// Lower bound of a derived value encoder resolution.
pub const MIN_RESOLUTION: f64 = 0.001;

/// Where the parameters of a detector come from.
#[derive(Debug, Clone)]
pub enum ParameterSource {
    /// A preset of the built-in catalog.
    Preset(String),
    /// A document loaded by the caller.
    Document(ParameterDocument),
}

impl ParameterSource {
    /// Name of the preset, or `"document"`.
    pub fn name(&self) -> &str {
        match *self {
            ParameterSource::Preset(ref name) => name,
            ParameterSource::Document(_) => "document",
        }
    }
}

impl From<String> for ParameterSource {
    fn from(name: String) -> ParameterSource {
        ParameterSource::Preset(name)
    }
}

impl From<&str> for ParameterSource {
    fn from(name: &str) -> ParameterSource {
        ParameterSource::Preset(name.to_string())
    }
}

impl From<ParameterDocument> for ParameterSource {
    fn from(doc: ParameterDocument) -> ParameterSource {
        ParameterSource::Document(doc)
    }
}

/// How the pooler decides how many columns become active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnActivation {
    /// A fraction of the columns.
    Density(f64),
    /// A fixed number of columns.
    FixedCount(usize),
}

impl ColumnActivation {
    /// Number of columns activated on each input among `columns`.
    pub fn active_columns(&self, columns: usize) -> usize {
        match *self {
            ColumnActivation::Density(d) => ((d * columns as f64).round() as usize).max(1),
            ColumnActivation::FixedCount(n) => n,
        }
    }
}

/// Parameters of the value encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderParams {
    /// Total number of bits of the value encoding.
    pub size: usize,
    /// Number of active bits for each value.
    pub active_bits: usize,
    /// Width of the value buckets, values closer than this share all bits.
    pub resolution: f64,
    /// Seed of the bucket hashing.
    pub seed: u64,
}

/// Parameters of the timestamp encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeParams {
    /// Active bits of the time of day encoding.
    pub time_of_day_width: usize,
    /// Radius of the time of day encoding, in hours.
    pub time_of_day_radius: f64,
    /// Active bits of the weekend encoding, if enabled.
    pub weekend_width: Option<usize>,
}

/// Parameters of the pooler.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolerParams {
    /// Number of columns of the output.
    pub column_count: usize,
    /// Fraction of the inputs each column may connect to.
    pub potential_pct: f64,
    /// How many columns win the inhibition.
    pub activation: ColumnActivation,
    /// Minimum overlap for a column to be considered at all.
    pub stimulus_threshold: usize,
    /// The amplitude of increase when reinforcing a synapse
    ///
    /// An example value would be `0.003`
    pub syn_perm_active_inc: f64,
    /// The amplitude of decrease when weakening a synapse
    ///
    /// An example value would be `0.0005`
    pub syn_perm_inactive_dec: f64,
    /// The thresold in permanence for a synapse to be considered as connected
    ///
    /// Between `0.0` and `1.0`, an example value would be `0.2`
    pub syn_perm_connected: f64,
    /// `0.0` disables boosting.
    pub boost_strength: f64,
    /// Distance, in inputs, from the center of a column to its farthest
    /// potential input. `None` covers the whole input.
    pub potential_radius: Option<usize>,
    /// Whether the input topology wraps around its edges, so that the
    /// potential pools of the edge columns continue on the other side.
    pub wrap_around: bool,
    /// Columns overlapping their input less often than this fraction of the
    /// busiest column get their permanences bumped.
    pub min_pct_overlap_duty_cycle: f64,
    /// Period of the duty cycle moving averages, in records.
    pub duty_cycle_period: usize,
    /// Seed of the potential pools and initial permanences.
    pub seed: u64,
}

/// Parameters of the sequence memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceParams {
    /// The depth of each column
    pub cells_per_column: usize,
    /// The thresold of activation for a segment to be activated, in number of
    /// connected synapses to active cells
    pub activation_threshold: usize,
    /// The initial permanence value of newly created synapses
    ///
    /// An example value would be `0.21`
    pub initial_permanence: f64,
    /// The thresold in permanence for a synapse to be considered as connected
    ///
    /// Between `0.0` and `1.0`, an example value would be `0.5`
    pub connected_permanence: f64,
    /// The thresold of raw activity on a segment for it to be picked for learning
    pub min_threshold: usize,
    /// The maximum number of synapses to create when growing a segment
    pub max_new_synapse_count: usize,
    /// The amplitude of increase when reinforcing a synapse
    ///
    /// An example value would be `0.1`
    pub permanence_increment: f64,
    /// The amplitude of decrease when weakening a synapse
    ///
    /// An example value would be `0.1`
    pub permanence_decrement: f64,
    /// The amplitude of decrease of the synapses of a segment whose
    /// prediction did not come true. `0.0` disables it.
    pub predicted_segment_decrement: f64,
    /// Segments of a cell beyond this number replace the least recently used.
    pub max_segments_per_cell: usize,
    /// Synapses of a segment beyond this number replace the weakest.
    pub max_synapses_per_segment: usize,
    /// Seed of the winner cell and synapse sampling.
    pub seed: u64,
}

/// Parameters of the likelihood estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct LikelihoodParams {
    /// Fraction of the data set making the probationary period.
    pub probationary_pct: f64,
    /// Number of records between two fits of the distribution.
    pub reestimation_period: usize,
}

/// A fully resolved and validated set of parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    /// The value encoder
    pub encoder: EncoderParams,
    /// The timestamp encoder
    pub time: TimeParams,
    /// The pooler
    pub pooler: PoolerParams,
    /// The sequence memory
    pub sequence: SequenceParams,
    /// The likelihood estimation
    pub likelihood: LikelihoodParams,
    /// Fraction of the observed range tolerated outside of it.
    pub spatial_tolerance: f64,
}

impl ParameterSet {
    /// Resolve parameters from a preset name or a document.
    ///
    /// `input_min` and `input_max` are the bounds of the values of the data
    /// set, used to derive the value encoder resolution when the source does
    /// not fix it.
    pub fn resolve<S: Into<ParameterSource>>(
        source: S,
        input_min: f64,
        input_max: f64,
    ) -> Result<ParameterSet> {
        let doc = match source.into() {
            ParameterSource::Preset(name) => presets::preset(&name)?,
            ParameterSource::Document(doc) => doc,
        };
        ParameterSet::from_document(&doc, input_min, input_max)
    }

    /// Resolve a document against the input range.
    pub fn from_document(
        doc: &ParameterDocument,
        input_min: f64,
        input_max: f64,
    ) -> Result<ParameterSet> {
        if !input_min.is_finite() || !input_max.is_finite() || input_min > input_max {
            return Err(DetectorError::invalid(
                "inputRange",
                format!("[{}, {}] is not a finite range", input_min, input_max),
            ));
        }

        let params = ParameterSet {
            encoder: resolve_encoder(&doc.enc.value, input_min, input_max)?,
            time: resolve_time(&doc.enc.time)?,
            pooler: resolve_pooler(&doc.sp)?,
            sequence: resolve_sequence(&doc.tm)?,
            likelihood: LikelihoodParams {
                probationary_pct: fraction(
                    "probationaryPct",
                    doc.anomaly.likelihood.probationary_pct,
                )?,
                reestimation_period: count(
                    "reestimationPeriod",
                    doc.anomaly.likelihood.reestimation_period,
                )?,
            },
            spatial_tolerance: non_negative("spatial_tolerance", doc.spatial_tolerance)?,
        };
        debug!(
            resolution = params.encoder.resolution,
            columns = params.pooler.column_count,
            active_columns = params
                .pooler
                .activation
                .active_columns(params.pooler.column_count),
            "resolved parameters"
        );
        Ok(params)
    }
}

fn resolve_encoder(
    doc: &ValueEncoderDocument,
    input_min: f64,
    input_max: f64,
) -> Result<EncoderParams> {
    let size = count("enc.value.size", doc.size)?;
    let bits = doc.active_bits.unwrap_or(0);
    let sparsity = doc.sparsity.unwrap_or(0.0);
    let active_bits = match (bits != 0, sparsity != 0.0) {
        (true, true) => {
            return Err(DetectorError::ConfigConflict {
                first: "activeBits",
                second: "sparsity",
            })
        }
        (true, false) => count("enc.value.activeBits", bits)?,
        (false, true) => {
            let sparsity = fraction("enc.value.sparsity", sparsity)?;
            ((size as f64 * sparsity).round() as usize).max(1)
        }
        (false, false) => {
            return Err(DetectorError::invalid(
                "enc.value.activeBits",
                "one of activeBits or sparsity is required",
            ))
        }
    };
    if active_bits > size {
        return Err(DetectorError::invalid(
            "enc.value.activeBits",
            format!("{} active bits exceed size {}", active_bits, size),
        ));
    }
    let resolution = match doc.resolution {
        Some(r) if r.is_finite() && r > 0.0 => r,
        Some(r) => {
            return Err(DetectorError::invalid(
                "enc.value.resolution",
                format!("{} is not strictly positive", r),
            ))
        }
        None => ((input_max - input_min) / RESOLUTION_BUCKETS).max(MIN_RESOLUTION),
    };
    Ok(EncoderParams {
        size,
        active_bits,
        resolution,
        seed: doc.seed,
    })
}

fn resolve_time(doc: &TimeEncoderDocument) -> Result<TimeParams> {
    let (width, radius) = doc.time_of_day;
    let time_of_day_width = count("enc.time.timeOfDay", width)?;
    if !radius.is_finite() || radius <= 0.0 || radius > 24.0 {
        return Err(DetectorError::invalid(
            "enc.time.timeOfDay",
            format!("radius {} must be in (0, 24] hours", radius),
        ));
    }
    let weekend_width = match doc.weekend {
        None | Some(0) => None,
        Some(w) => Some(count("enc.time.weekend", w)?),
    };
    Ok(TimeParams {
        time_of_day_width,
        time_of_day_radius: radius,
        weekend_width,
    })
}

fn resolve_pooler(doc: &PoolerDocument) -> Result<PoolerParams> {
    let column_count = count("sp.columnDimensions", doc.column_dimensions)?;
    let density = doc.local_area_density;
    let fixed = doc.num_active_columns_per_inh_area;
    let activation = match (density != 0.0, fixed != 0) {
        (true, true) => {
            return Err(DetectorError::ConfigConflict {
                first: "localAreaDensity",
                second: "numActiveColumnsPerInhArea",
            })
        }
        (true, false) => ColumnActivation::Density(fraction("sp.localAreaDensity", density)?),
        (false, true) => {
            let n = count("sp.numActiveColumnsPerInhArea", fixed)?;
            if n > column_count {
                return Err(DetectorError::invalid(
                    "sp.numActiveColumnsPerInhArea",
                    format!("{} active columns exceed {} columns", n, column_count),
                ));
            }
            ColumnActivation::FixedCount(n)
        }
        (false, false) => {
            return Err(DetectorError::invalid(
                "sp.localAreaDensity",
                "one of localAreaDensity or numActiveColumnsPerInhArea must be set",
            ))
        }
    };
    Ok(PoolerParams {
        column_count,
        potential_pct: fraction("sp.potentialPct", doc.potential_pct)?,
        activation,
        stimulus_threshold: non_negative_count("sp.stimulusThreshold", doc.stimulus_threshold)?,
        syn_perm_active_inc: unit("sp.synPermActiveInc", doc.syn_perm_active_inc)?,
        syn_perm_inactive_dec: unit("sp.synPermInactiveDec", doc.syn_perm_inactive_dec)?,
        syn_perm_connected: unit("sp.synPermConnected", doc.syn_perm_connected)?,
        boost_strength: non_negative("sp.boostStrength", doc.boost_strength)?,
        potential_radius: match doc.potential_radius {
            None => None,
            Some(radius) => Some(count("sp.potentialRadius", radius)?),
        },
        wrap_around: doc.wrap_around,
        min_pct_overlap_duty_cycle: unit(
            "sp.minPctOverlapDutyCycle",
            doc.min_pct_overlap_duty_cycle,
        )?,
        duty_cycle_period: count("sp.dutyCyclePeriod", doc.duty_cycle_period)?,
        seed: doc.seed,
    })
}

fn resolve_sequence(doc: &SequenceDocument) -> Result<SequenceParams> {
    let activation_threshold = count("tm.activationThreshold", doc.activation_threshold)?;
    let min_threshold = count("tm.minThreshold", doc.min_threshold)?;
    if min_threshold > activation_threshold {
        return Err(DetectorError::invalid(
            "tm.minThreshold",
            format!(
                "{} is above the activation threshold {}",
                min_threshold, activation_threshold
            ),
        ));
    }
    Ok(SequenceParams {
        cells_per_column: count("tm.cellsPerColumn", doc.cells_per_column)?,
        activation_threshold,
        initial_permanence: unit("tm.initialPermanence", doc.initial_permanence)?,
        connected_permanence: unit("tm.connectedPermanence", doc.connected_permanence)?,
        min_threshold,
        max_new_synapse_count: count("tm.maxNewSynapseCount", doc.max_new_synapse_count)?,
        permanence_increment: unit("tm.permanenceIncrement", doc.permanence_increment)?,
        permanence_decrement: unit("tm.permanenceDecrement", doc.permanence_decrement)?,
        predicted_segment_decrement: unit(
            "tm.predictedSegmentDecrement",
            doc.predicted_segment_decrement,
        )?,
        max_segments_per_cell: count("tm.maxSegmentsPerCell", doc.max_segments_per_cell)?,
        max_synapses_per_segment: count(
            "tm.maxSynapsesPerSegment",
            doc.max_synapses_per_segment,
        )?,
        seed: doc.seed,
    })
}

/*
 * Field checks
 */

fn count(name: &'static str, value: i64) -> Result<usize> {
    if value <= 0 {
        return Err(DetectorError::invalid(
            name,
            format!("{} must be strictly positive", value),
        ));
    }
    Ok(value as usize)
}

fn non_negative_count(name: &'static str, value: i64) -> Result<usize> {
    if value < 0 {
        return Err(DetectorError::invalid(
            name,
            format!("{} must not be negative", value),
        ));
    }
    Ok(value as usize)
}

fn unit(name: &'static str, value: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&value) {
        return Err(DetectorError::invalid(
            name,
            format!("{} must be in [0, 1]", value),
        ));
    }
    Ok(value)
}

fn fraction(name: &'static str, value: f64) -> Result<f64> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(DetectorError::invalid(
            name,
            format!("{} must be in (0, 1]", value),
        ));
    }
    Ok(value)
}

fn non_negative(name: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(DetectorError::invalid(
            name,
            format!("{} must be a finite, non negative number", value),
        ));
    }
    Ok(value)
}
