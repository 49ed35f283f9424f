//! Glue between the encoder, the pooler and the sequence memory.

use crate::cla::{PatternMemory, TransitionMemory};
use crate::config::ParameterSet;
use crate::encoder::{Encoder, NabEncoder};
use crate::error::{DetectorError, Result};
use crate::record::Observation;
use crate::sdr::Sdr;
use crate::topology::OneDimension;
use crate::{Pooling, SequenceMemory};

/// The HTM model of a detector.
///
/// It includes an encoder, a pooler and a sequence memory, and applies them
/// sequentially to every observation you provide it, learning all along.
pub struct ModelAdapter<E, P, S> {
    encoder: E,
    pooler: P,
    sequence: S,
}

/// The model built from the default collaborators.
pub type HtmModel = ModelAdapter<NabEncoder, PatternMemory<OneDimension>, TransitionMemory>;

impl<E: Encoder, P: Pooling, S: SequenceMemory> ModelAdapter<E, P, S> {
    /// Assemble a model, checking that the collaborators agree on the widths
    /// of the patterns they exchange.
    pub fn new(encoder: E, pooler: P, sequence: S) -> Result<ModelAdapter<E, P, S>> {
        if encoder.width() != pooler.input_width() {
            return Err(DetectorError::CollaboratorWidthMismatch {
                producer: "encoder",
                produced: encoder.width(),
                consumer: "pooler",
                expected: pooler.input_width(),
            });
        }
        if pooler.column_dimensions() != sequence.column_count() {
            return Err(DetectorError::CollaboratorWidthMismatch {
                producer: "pooler",
                produced: pooler.column_dimensions(),
                consumer: "sequence memory",
                expected: sequence.column_count(),
            });
        }
        Ok(ModelAdapter {
            encoder,
            pooler,
            sequence,
        })
    }

    /// Feed one observation through the model.
    ///
    /// Returns the active columns and the raw anomaly of the sequence memory.
    /// Patterns whose width differs from the one announced by their producer
    /// are rejected before reaching the next collaborator.
    pub fn step(&mut self, observation: &Observation) -> Result<(Sdr, f64)> {
        let value = self.encoder.encode_value(observation.value);
        check_width("value encoder", &value, self.encoder.value_width(), "pooler")?;
        let time = self.encoder.encode_time(observation.timestamp);
        check_width("time encoder", &time, self.encoder.time_width(), "pooler")?;
        let encoding = value.concat(&time);
        let active_columns = self.pooler.pool(&encoding, true);
        check_width(
            "pooler",
            &active_columns,
            self.sequence.column_count(),
            "sequence memory",
        )?;
        self.sequence.compute(&active_columns, true);
        Ok((active_columns, self.sequence.anomaly()))
    }

    /// The encoder
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// The pooler
    pub fn pooler(&self) -> &P {
        &self.pooler
    }

    /// The sequence memory
    pub fn sequence(&self) -> &S {
        &self.sequence
    }
}

fn check_width(
    producer: &'static str,
    pattern: &Sdr,
    expected: usize,
    consumer: &'static str,
) -> Result<()> {
    if pattern.width() != expected {
        return Err(DetectorError::CollaboratorWidthMismatch {
            producer,
            produced: pattern.width(),
            consumer,
            expected,
        });
    }
    Ok(())
}

impl HtmModel {
    /// Build the default collaborators from resolved parameters.
    pub fn from_params(params: &ParameterSet) -> Result<HtmModel> {
        let encoder = NabEncoder::new(&params.encoder, &params.time);
        let topology = OneDimension::new(encoder.width(), params.pooler.wrap_around);
        let pooler = PatternMemory::new(topology, params.pooler.clone());
        let sequence = TransitionMemory::new(params.pooler.column_count, params.sequence.clone());
        ModelAdapter::new(encoder, pooler, sequence)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    struct Constant;

    impl Encoder for Constant {
        fn encode_value(&mut self, _: f64) -> Sdr {
            Sdr::from_active(4, vec![0, 1])
        }

        fn encode_time(&mut self, _: NaiveDateTime) -> Sdr {
            Sdr::from_active(2, vec![1])
        }

        fn value_width(&self) -> usize {
            4
        }

        fn time_width(&self) -> usize {
            2
        }
    }

    /// Remembers its last input, activates its first column.
    struct Recorder {
        width: usize,
        columns: usize,
        last: Option<Sdr>,
    }

    impl Pooling for Recorder {
        fn pool(&mut self, input: &Sdr, _: bool) -> Sdr {
            self.last = Some(input.clone());
            Sdr::from_active(self.columns, vec![0])
        }

        fn input_width(&self) -> usize {
            self.width
        }

        fn column_dimensions(&self) -> usize {
            self.columns
        }
    }

    struct Fixed {
        columns: usize,
        seen: usize,
    }

    impl SequenceMemory for Fixed {
        fn compute(&mut self, active_columns: &Sdr, _: bool) {
            self.seen = active_columns.count();
        }

        fn anomaly(&self) -> f64 {
            0.25
        }

        fn column_count(&self) -> usize {
            self.columns
        }
    }

    fn recorder(width: usize, columns: usize) -> Recorder {
        Recorder {
            width,
            columns,
            last: None,
        }
    }

    fn observation() -> Observation {
        let timestamp = NaiveDate::from_ymd_opt(2015, 9, 1)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap();
        Observation::new(timestamp, 12.0)
    }

    #[test]
    fn test_value_bits_come_first() {
        let fixed = Fixed {
            columns: 8,
            seen: 0,
        };
        let mut model = ModelAdapter::new(Constant, recorder(6, 8), fixed).unwrap();
        let (columns, raw) = model.step(&observation()).unwrap();
        assert_eq!(columns.active(), &[0]);
        assert_eq!(raw, 0.25);
        assert_eq!(model.sequence().seen, 1);
        let encoding = model.pooler().last.clone().unwrap();
        assert_eq!(encoding.width(), 6);
        assert_eq!(encoding.active(), &[0, 1, 5]);
    }

    #[test]
    fn test_encoder_width_mismatch() {
        let fixed = Fixed {
            columns: 8,
            seen: 0,
        };
        match ModelAdapter::new(Constant, recorder(7, 8), fixed) {
            Err(DetectorError::CollaboratorWidthMismatch {
                producer,
                produced,
                expected,
                ..
            }) => {
                assert_eq!(producer, "encoder");
                assert_eq!(produced, 6);
                assert_eq!(expected, 7);
            }
            _ => panic!("expected a width mismatch"),
        }
    }

    #[test]
    fn test_column_mismatch() {
        let fixed = Fixed {
            columns: 9,
            seen: 0,
        };
        let result = ModelAdapter::new(Constant, recorder(6, 8), fixed);
        assert!(matches!(
            result,
            Err(DetectorError::CollaboratorWidthMismatch {
                producer: "pooler",
                ..
            })
        ));
    }

    /// Announces a narrower value encoding than it produces.
    struct Liar;

    impl Encoder for Liar {
        fn encode_value(&mut self, _: f64) -> Sdr {
            Sdr::from_active(5, vec![4])
        }

        fn encode_time(&mut self, _: NaiveDateTime) -> Sdr {
            Sdr::from_active(2, vec![1])
        }

        fn value_width(&self) -> usize {
            4
        }

        fn time_width(&self) -> usize {
            2
        }
    }

    #[test]
    fn test_encoding_wider_than_announced() {
        let fixed = Fixed {
            columns: 8,
            seen: 0,
        };
        let mut model = ModelAdapter::new(Liar, recorder(6, 8), fixed).unwrap();
        match model.step(&observation()) {
            Err(DetectorError::CollaboratorWidthMismatch {
                producer,
                produced,
                expected,
                ..
            }) => {
                assert_eq!(producer, "value encoder");
                assert_eq!(produced, 5);
                assert_eq!(expected, 4);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(model.pooler().last.is_none());
        assert_eq!(model.sequence().seen, 0);
    }

    #[test]
    fn test_pooler_output_wider_than_announced() {
        let fixed = Fixed {
            columns: 8,
            seen: 0,
        };
        let mut pooler = recorder(6, 8);
        let mut model = ModelAdapter::new(Constant, recorder(6, 8), fixed).unwrap();
        // the pooler now produces more columns than the sequence memory holds
        pooler.columns = 9;
        model.pooler = pooler;
        assert!(matches!(
            model.step(&observation()),
            Err(DetectorError::CollaboratorWidthMismatch {
                producer: "pooler",
                produced: 9,
                expected: 8,
                ..
            })
        ));
        assert_eq!(model.sequence().seen, 0);
    }

    #[test]
    fn test_default_model_widths() {
        let params = ParameterSet::resolve("compact", 0.0, 100.0).unwrap();
        let mut model = HtmModel::from_params(&params).unwrap();
        assert_eq!(model.pooler().input_width(), model.encoder().width());
        let (columns, raw) = model.step(&observation()).unwrap();
        assert_eq!(columns.width(), params.pooler.column_count);
        assert!(columns.count() <= params.pooler.activation.active_columns(columns.width()));
        assert_eq!(raw, 1.0);
    }
}
