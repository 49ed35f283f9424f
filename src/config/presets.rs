//! Built-in catalog of parameter presets.

use super::document::{
    AnomalyDocument, EncoderDocument, LikelihoodDocument, ParameterDocument, PoolerDocument,
    SequenceDocument, TimeEncoderDocument, ValueEncoderDocument,
};
use crate::error::{DetectorError, Result};

/// Names of the presets of the catalog.
pub const PRESET_NAMES: &[&str] = &["htmcore", "numenta", "compact"];

/// Fetch a preset document by name.
pub fn preset(name: &str) -> Result<ParameterDocument> {
    match name {
        "htmcore" => Ok(htmcore()),
        "numenta" => Ok(numenta()),
        "compact" => Ok(compact()),
        _ => Err(DetectorError::ConfigNotFound {
            name: name.to_string(),
        }),
    }
}

/// The tuned htm.core NAB parameters, with density based inhibition.
pub fn htmcore() -> ParameterDocument {
    ParameterDocument {
        enc: EncoderDocument {
            value: ValueEncoderDocument {
                size: 400,
                active_bits: Some(21),
                sparsity: None,
                resolution: None,
                seed: 5,
            },
            time: TimeEncoderDocument {
                time_of_day: (21, 9.49),
                weekend: None,
            },
        },
        sp: PoolerDocument {
            column_dimensions: 2048,
            potential_pct: 0.8,
            local_area_density: 0.025,
            num_active_columns_per_inh_area: 0,
            stimulus_threshold: 0,
            syn_perm_inactive_dec: 0.0005,
            syn_perm_active_inc: 0.003,
            syn_perm_connected: 0.2,
            boost_strength: 0.0,
            potential_radius: None,
            wrap_around: true,
            min_pct_overlap_duty_cycle: 0.001,
            duty_cycle_period: 1000,
            seed: 5,
        },
        tm: SequenceDocument {
            cells_per_column: 32,
            activation_threshold: 20,
            initial_permanence: 0.24,
            connected_permanence: 0.5,
            min_threshold: 13,
            max_new_synapse_count: 31,
            permanence_increment: 0.04,
            permanence_decrement: 0.008,
            predicted_segment_decrement: 0.001,
            max_segments_per_cell: 128,
            max_synapses_per_segment: 128,
            seed: 5,
        },
        spatial_tolerance: 0.05,
        anomaly: AnomalyDocument {
            likelihood: LikelihoodDocument {
                probationary_pct: 0.1,
                reestimation_period: 100,
            },
        },
    }
}

/// NuPIC-style parameters, with a fixed count of active columns.
pub fn numenta() -> ParameterDocument {
    ParameterDocument {
        enc: EncoderDocument {
            value: ValueEncoderDocument {
                size: 400,
                active_bits: Some(21),
                sparsity: None,
                resolution: None,
                seed: 42,
            },
            time: TimeEncoderDocument {
                time_of_day: (21, 9.49),
                weekend: None,
            },
        },
        sp: PoolerDocument {
            column_dimensions: 2048,
            potential_pct: 0.8,
            local_area_density: 0.0,
            num_active_columns_per_inh_area: 40,
            stimulus_threshold: 0,
            syn_perm_inactive_dec: 0.0005,
            syn_perm_active_inc: 0.003,
            syn_perm_connected: 0.2,
            boost_strength: 0.0,
            potential_radius: None,
            wrap_around: true,
            min_pct_overlap_duty_cycle: 0.001,
            duty_cycle_period: 1000,
            seed: 1956,
        },
        tm: SequenceDocument {
            cells_per_column: 32,
            activation_threshold: 13,
            initial_permanence: 0.21,
            connected_permanence: 0.5,
            min_threshold: 10,
            max_new_synapse_count: 20,
            permanence_increment: 0.1,
            permanence_decrement: 0.1,
            predicted_segment_decrement: 0.0,
            max_segments_per_cell: 128,
            max_synapses_per_segment: 32,
            seed: 1960,
        },
        spatial_tolerance: 0.05,
        anomaly: AnomalyDocument {
            likelihood: LikelihoodDocument {
                probationary_pct: 0.15,
                reestimation_period: 100,
            },
        },
    }
}

/// A small and fast model, good enough for short streams and demos.
pub fn compact() -> ParameterDocument {
    ParameterDocument {
        enc: EncoderDocument {
            value: ValueEncoderDocument {
                size: 128,
                active_bits: Some(9),
                sparsity: None,
                resolution: None,
                seed: 7,
            },
            time: TimeEncoderDocument {
                time_of_day: (9, 9.49),
                weekend: Some(4),
            },
        },
        sp: PoolerDocument {
            column_dimensions: 256,
            potential_pct: 0.85,
            local_area_density: 0.04,
            num_active_columns_per_inh_area: 0,
            stimulus_threshold: 1,
            syn_perm_inactive_dec: 0.002,
            syn_perm_active_inc: 0.01,
            syn_perm_connected: 0.2,
            boost_strength: 0.0,
            potential_radius: None,
            wrap_around: true,
            min_pct_overlap_duty_cycle: 0.001,
            duty_cycle_period: 1000,
            seed: 7,
        },
        tm: SequenceDocument {
            cells_per_column: 8,
            activation_threshold: 6,
            initial_permanence: 0.21,
            connected_permanence: 0.5,
            min_threshold: 4,
            max_new_synapse_count: 10,
            permanence_increment: 0.1,
            permanence_decrement: 0.05,
            predicted_segment_decrement: 0.002,
            max_segments_per_cell: 32,
            max_synapses_per_segment: 32,
            seed: 7,
        },
        spatial_tolerance: 0.05,
        anomaly: AnomalyDocument {
            likelihood: LikelihoodDocument {
                probationary_pct: 0.1,
                reestimation_period: 100,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_preset_exists() {
        for name in PRESET_NAMES {
            assert!(preset(name).is_ok(), "missing preset {}", name);
        }
    }

    #[test]
    fn test_unknown_preset() {
        match preset("nupic-2014") {
            Err(DetectorError::ConfigNotFound { name }) => assert_eq!(name, "nupic-2014"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_presets_pick_a_single_inhibition_mode() {
        for name in PRESET_NAMES {
            let sp = preset(name).unwrap().sp;
            let density = sp.local_area_density > 0.0;
            let count = sp.num_active_columns_per_inh_area > 0;
            assert!(density ^ count, "preset {} mixes inhibition modes", name);
        }
    }
}
