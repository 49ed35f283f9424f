//! The Pattern Memory layer

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::config::PoolerParams;
use crate::sdr::Sdr;
use crate::topology::Topology;
use crate::Pooling;

/// Deviation of the initial permanences around the connection threshold.
const INITIAL_PERMANENCE_DEV: f64 = 0.1;

struct Synapse {
    source: usize,
    permanence: f64,
}

struct Column {
    inputs: Vec<Synapse>,
    boost: f64,
    active_duty_cycle: f64,
    overlap_duty_cycle: f64,
}

/// A layer recognising spatial patterns.
///
/// Formerly known as Spatial Pooling, this layer maps its input onto a fixed
/// number of columns, a small set of them being active for each input. Similar
/// inputs activate similar sets of columns.
///
/// Inhibition is global: the columns with the highest boosted overlap win,
/// as many of them as the activation mode of the parameters asks for.
pub struct PatternMemory<T: Topology> {
    columns: Vec<Column>,
    // for each input, the (column, synapse) pairs it feeds
    inputs: Vec<Vec<(usize, usize)>>,
    topology: T,
    config: PoolerParams,
    active_columns: usize,
    iteration: usize,
}

/*
 * Preparation
 */

impl<T: Topology> PatternMemory<T> {
    /// Create a new Pattern Memory
    ///
    /// The topology describes the inputs, its length is the input width. Each
    /// column draws `potential_pct` of the inputs within `potential_radius` of
    /// its center as potential synapses, with permanences spread around the
    /// connection threshold.
    pub fn new(topology: T, config: PoolerParams) -> PatternMemory<T> {
        let mut rng = StdRng::seed_from_u64(config.seed);

        let input_size = topology.len();
        let column_count = config.column_count;
        let radius = config.potential_radius.unwrap_or(input_size);

        let mut inputs = vec![Vec::new(); input_size];
        let columns = (0..column_count)
            .map(|c| {
                let center = topology.map_center(c, column_count);
                let pool: Vec<usize> = topology.neighbors(center, radius).collect();
                let amount = ((pool.len() as f64 * config.potential_pct).round() as usize)
                    .clamp(pool.len().min(1), pool.len());
                let synapses = rand::seq::index::sample(&mut rng, pool.len(), amount)
                    .into_iter()
                    .map(|k| {
                        let deviation: f64 = rng.sample(StandardNormal);
                        Synapse {
                            source: pool[k],
                            permanence: (config.syn_perm_connected
                                + INITIAL_PERMANENCE_DEV * deviation)
                                .clamp(0.0, 1.0),
                        }
                    })
                    .collect::<Vec<_>>();
                for (s, synapse) in synapses.iter().enumerate() {
                    inputs[synapse.source].push((c, s));
                }
                Column {
                    inputs: synapses,
                    boost: 1.0,
                    active_duty_cycle: 0.0,
                    overlap_duty_cycle: 0.0,
                }
            })
            .collect();

        PatternMemory {
            columns,
            inputs,
            topology,
            active_columns: config.activation.active_columns(column_count),
            config,
            iteration: 0,
        }
    }

    /// Number of columns active for each input.
    pub fn active_columns_per_input(&self) -> usize {
        self.active_columns
    }

    /// Current boost factor of each column.
    pub fn boosts(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.boost).collect()
    }
}

/*
 * Cortical Learning impl
 */

impl<T: Topology> Pooling for PatternMemory<T> {
    fn pool(&mut self, inputs: &Sdr, learn: bool) -> Sdr {
        debug_assert_eq!(inputs.width(), self.topology.len());
        // phase 1: Overlaps
        let overlaps = self.cortical_spatial_phase_1(inputs);
        // phase 2: Inhibition
        let actives = self.cortical_spatial_phase_2(&overlaps);
        // phase 3: Learning
        if learn {
            self.cortical_spatial_phase_3(inputs, &overlaps, &actives);
        }
        Sdr::from_active(self.columns.len(), actives)
    }

    fn input_width(&self) -> usize {
        self.topology.len()
    }

    fn column_dimensions(&self) -> usize {
        self.columns.len()
    }
}

/*
 * Spatial Pooling
 */

impl<T: Topology> PatternMemory<T> {
    fn cortical_spatial_phase_1(&self, inputs: &Sdr) -> Vec<usize> {
        let mut overlaps = vec![0usize; self.columns.len()];
        for &i in inputs.active() {
            for &(c, s) in &self.inputs[i] {
                if self.columns[c].inputs[s].permanence >= self.config.syn_perm_connected {
                    overlaps[c] += 1;
                }
            }
        }
        overlaps
    }

    fn cortical_spatial_phase_2(&self, overlaps: &[usize]) -> Vec<usize> {
        let threshold = self.config.stimulus_threshold.max(1);
        let mut cols: Vec<(usize, f64)> = overlaps
            .iter()
            .zip(self.columns.iter())
            .enumerate()
            .filter(|&(_, (&o, _))| o >= threshold)
            .map(|(i, (&o, c))| (i, o as f64 * c.boost))
            .collect();
        cols.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Less));
        cols.into_iter()
            .take(self.active_columns)
            .map(|(i, _)| i)
            .collect()
    }

    fn cortical_spatial_phase_3(&mut self, inputs: &Sdr, overlaps: &[usize], actives: &[usize]) {
        let dense = inputs.dense();
        let inc = self.config.syn_perm_active_inc;
        let dec = self.config.syn_perm_inactive_dec;
        for &i in actives {
            for s in &mut self.columns[i].inputs {
                s.permanence = if dense[s.source] {
                    (s.permanence + inc).min(1.0)
                } else {
                    (s.permanence - dec).max(0.0)
                };
            }
        }

        self.iteration += 1;
        let period = self.config.duty_cycle_period.min(self.iteration) as f64;
        let mut active = vec![false; self.columns.len()];
        for &i in actives {
            active[i] = true;
        }
        for ((c, &overlap), &is_active) in self.columns.iter_mut().zip(overlaps).zip(&active) {
            c.overlap_duty_cycle =
                (c.overlap_duty_cycle * (period - 1.0) + (overlap > 0) as u8 as f64) / period;
            c.active_duty_cycle =
                (c.active_duty_cycle * (period - 1.0) + is_active as u8 as f64) / period;
        }

        if self.config.boost_strength > 0.0 {
            let target = self.active_columns as f64 / self.columns.len() as f64;
            let strength = self.config.boost_strength;
            for c in &mut self.columns {
                c.boost = ((target - c.active_duty_cycle) * strength).exp();
            }
        }

        // columns that almost never overlap their input get all their
        // permanences bumped, until they do
        let min_overlap_duty_cycle = self.config.min_pct_overlap_duty_cycle
            * self
                .columns
                .iter()
                .map(|c| c.overlap_duty_cycle)
                .fold(0.0, f64::max);
        let bump = 0.1 * self.config.syn_perm_connected;
        for c in &mut self.columns {
            if c.overlap_duty_cycle < min_overlap_duty_cycle {
                for s in &mut c.inputs {
                    s.permanence = (s.permanence + bump).min(1.0);
                }
            }
        }
    }
}
