//! Encoders, turning the observations into sparse patterns.

mod date;
mod scalar;

use chrono::NaiveDateTime;

use crate::config::{EncoderParams, TimeParams};
use crate::sdr::Sdr;

pub use self::date::DateEncoder;
pub use self::scalar::RandomDistributedScalarEncoder;

/// Encoding interface
///
/// Values and timestamps are encoded separately, each encoding having a fixed
/// width that must not change over the lifetime of the encoder. Encodings of
/// another width than `value_width()` or `time_width()` are rejected by the
/// model with a `CollaboratorWidthMismatch`.
pub trait Encoder {
    /// Encode the value of an observation.
    fn encode_value(&mut self, value: f64) -> Sdr;

    /// Encode the timestamp of an observation.
    fn encode_time(&mut self, timestamp: NaiveDateTime) -> Sdr;

    /// Width of the value encodings.
    fn value_width(&self) -> usize;

    /// Width of the timestamp encodings.
    fn time_width(&self) -> usize;

    /// Width of the concatenated encodings.
    fn width(&self) -> usize {
        self.value_width() + self.time_width()
    }
}

/// The encoder of the NAB HTM detector: a random distributed scalar encoding
/// of the value, and a date encoding of the timestamp.
#[derive(Debug, Clone)]
pub struct NabEncoder {
    value: RandomDistributedScalarEncoder,
    time: DateEncoder,
}

impl NabEncoder {
    /// Build both encoders from their parameters.
    pub fn new(value: &EncoderParams, time: &TimeParams) -> NabEncoder {
        NabEncoder {
            value: RandomDistributedScalarEncoder::new(value),
            time: DateEncoder::new(time),
        }
    }
}

impl Encoder for NabEncoder {
    fn encode_value(&mut self, value: f64) -> Sdr {
        self.value.encode(value)
    }

    fn encode_time(&mut self, timestamp: NaiveDateTime) -> Sdr {
        self.time.encode(timestamp)
    }

    fn value_width(&self) -> usize {
        self.value.size()
    }

    fn time_width(&self) -> usize {
        self.time.size()
    }
}
