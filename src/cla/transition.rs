//! The Transition Memory layer

use std::cmp::Ordering;

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::SequenceParams;
use crate::sdr::Sdr;
use crate::SequenceMemory;

struct Synapse {
    source: usize,
    permanence: f64,
}

struct Segment {
    cell: usize,
    synapses: Vec<Synapse>,
    last_used: usize,
}

impl Segment {
    /// Number of connected synapses and of all synapses to active cells.
    fn activity(&self, actives: &[bool], connected: f64) -> (usize, usize) {
        self.synapses
            .iter()
            .filter(|s| actives[s.source])
            .fold((0, 0), |(c, p), s| {
                (c + (s.permanence >= connected) as usize, p + 1)
            })
    }
}

/// A layer recognising temporal patterns.
///
/// Formerly known as Temporal Pooling, this layer is state-full, and will
/// link each input to the previously seen ones.
///
/// Each column holds `cells_per_column` cells, and each cell grows distal
/// segments connecting it to the cells that were active just before it. A
/// column whose cells were predicted by an active segment activates only
/// those cells. Otherwise the column bursts: all its cells become active.
/// The anomaly is the fraction of active columns that were not predicted.
pub struct TransitionMemory {
    column_count: usize,
    depth: usize,
    config: SequenceParams,
    segments: Vec<Segment>,
    cell_segments: Vec<Vec<usize>>,
    // state of each segment after the last dendrite activation
    segment_active: Vec<bool>,
    segment_matching: Vec<bool>,
    segment_potential: Vec<usize>,
    active_cells: Vec<usize>,
    winner_cells: Vec<usize>,
    iteration: usize,
    last_anomaly: f64,
    rng: StdRng,
}

/*
 * Preparation
 */

impl TransitionMemory {
    /// Create a new Transition Memory
    ///
    /// Using given number of columns and given parameters, the depth of the
    /// columns being `cells_per_column`.
    pub fn new(column_count: usize, config: SequenceParams) -> TransitionMemory {
        let depth = config.cells_per_column.max(1);
        TransitionMemory {
            column_count,
            depth,
            segments: Vec::new(),
            cell_segments: (0..column_count * depth).map(|_| Vec::new()).collect(),
            segment_active: Vec::new(),
            segment_matching: Vec::new(),
            segment_potential: Vec::new(),
            active_cells: Vec::new(),
            winner_cells: Vec::new(),
            iteration: 0,
            last_anomaly: 1.0,
            rng: StdRng::seed_from_u64(config.seed),
            config,
        }
    }

    /// Number of cells in each column.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of distal segments grown so far.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn cell_count(&self) -> usize {
        self.column_count * self.depth
    }

    fn column_segments(&self, column: usize) -> impl Iterator<Item = usize> + '_ {
        (column * self.depth..(column + 1) * self.depth)
            .flat_map(move |cell| self.cell_segments[cell].iter().cloned())
    }
}

/*
 * Cortical Learning impl
 */

impl SequenceMemory for TransitionMemory {
    fn compute(&mut self, active_columns: &Sdr, learn: bool) {
        debug_assert_eq!(active_columns.width(), self.column_count);
        let previous_active = std::mem::take(&mut self.active_cells);
        let previous_winners = std::mem::take(&mut self.winner_cells);
        let mut previous = vec![false; self.cell_count()];
        for &cell in &previous_active {
            previous[cell] = true;
        }

        self.update_anomaly(active_columns);
        self.cortical_temporal_phase_1(active_columns, &previous, &previous_winners, learn);
        self.cortical_temporal_phase_2();
        self.iteration += 1;
    }

    fn anomaly(&self) -> f64 {
        self.last_anomaly
    }

    fn column_count(&self) -> usize {
        self.column_count
    }

    fn active_cells(&self) -> Vec<usize> {
        self.active_cells.clone()
    }

    fn winner_cells(&self) -> Vec<usize> {
        self.winner_cells.clone()
    }

    fn predictive_cells(&self) -> Vec<usize> {
        self.segments
            .iter()
            .zip(&self.segment_active)
            .filter(|&(_, &active)| active)
            .map(|(s, _)| s.cell)
            .sorted()
            .dedup()
            .collect()
    }
}

/*
 * Temporal Pooling
 */

impl TransitionMemory {
    fn update_anomaly(&mut self, active_columns: &Sdr) {
        self.last_anomaly = if active_columns.is_empty() {
            0.0
        } else {
            let predicted = active_columns
                .active()
                .iter()
                .filter(|&&c| self.column_segments(c).any(|s| self.segment_active[s]))
                .count();
            (active_columns.count() - predicted) as f64 / active_columns.count() as f64
        };
    }

    fn cortical_temporal_phase_1(
        &mut self,
        active_columns: &Sdr,
        previous: &[bool],
        previous_winners: &[usize],
        learn: bool,
    ) {
        let mut active = vec![false; self.column_count];
        for &column in active_columns.active() {
            active[column] = true;
            let predicted = self
                .column_segments(column)
                .filter(|&s| self.segment_active[s])
                .collect::<Vec<_>>();
            if predicted.is_empty() {
                self.burst_column(column, previous, previous_winners, learn);
            } else {
                self.activate_predicted_column(&predicted, previous, previous_winners, learn);
            }
        }

        // segments that predicted a column which did not show up
        let decrement = self.config.predicted_segment_decrement;
        if learn && decrement > 0.0 {
            let punished = (0..self.segments.len())
                .filter(|&s| self.segment_matching[s] && !active[self.segments[s].cell / self.depth])
                .collect::<Vec<_>>();
            for s in punished {
                self.adapt_segment(s, previous, -decrement, 0.0);
            }
        }
    }

    fn activate_predicted_column(
        &mut self,
        predicted: &[usize],
        previous: &[bool],
        previous_winners: &[usize],
        learn: bool,
    ) {
        let cells = predicted
            .iter()
            .map(|&s| self.segments[s].cell)
            .dedup()
            .collect::<Vec<_>>();
        self.active_cells.extend(&cells);
        self.winner_cells.extend(&cells);
        if learn {
            for &s in predicted {
                self.reinforce_segment(s, previous, previous_winners);
            }
        }
    }

    fn burst_column(
        &mut self,
        column: usize,
        previous: &[bool],
        previous_winners: &[usize],
        learn: bool,
    ) {
        self.active_cells
            .extend(column * self.depth..(column + 1) * self.depth);
        let best = self
            .column_segments(column)
            .filter(|&s| self.segment_matching[s])
            .max_by_key(|&s| self.segment_potential[s]);
        let winner = match best {
            Some(s) => self.segments[s].cell,
            None => self.least_used_cell(column),
        };
        self.winner_cells.push(winner);

        if !learn {
            return;
        }
        match best {
            Some(s) => self.reinforce_segment(s, previous, previous_winners),
            None if !previous_winners.is_empty() => {
                let count = self.config.max_new_synapse_count.min(previous_winners.len());
                let s = self.create_segment(winner);
                self.grow_synapses(s, previous_winners, count);
            }
            None => {}
        }
    }

    fn least_used_cell(&mut self, column: usize) -> usize {
        let candidates = (column * self.depth..(column + 1) * self.depth)
            .min_set_by_key(|&cell| self.cell_segments[cell].len());
        candidates[self.rng.gen_range(0..candidates.len())]
    }

    fn reinforce_segment(&mut self, s: usize, previous: &[bool], previous_winners: &[usize]) {
        let inc = self.config.permanence_increment;
        let dec = self.config.permanence_decrement;
        self.adapt_segment(s, previous, inc, -dec);
        let missing = self
            .config
            .max_new_synapse_count
            .saturating_sub(self.segment_potential[s]);
        if missing > 0 {
            self.grow_synapses(s, previous_winners, missing);
        }
    }

    fn adapt_segment(&mut self, s: usize, previous: &[bool], active_delta: f64, inactive_delta: f64) {
        let segment = &mut self.segments[s];
        for syn in &mut segment.synapses {
            let delta = if previous[syn.source] {
                active_delta
            } else {
                inactive_delta
            };
            syn.permanence = (syn.permanence + delta).clamp(0.0, 1.0);
        }
        segment.synapses.retain(|syn| syn.permanence > 0.0);
        segment.last_used = self.iteration;
    }

    fn create_segment(&mut self, cell: usize) -> usize {
        if self.cell_segments[cell].len() >= self.config.max_segments_per_cell.max(1) {
            let oldest = self.cell_segments[cell]
                .iter()
                .cloned()
                .min_by_key(|&s| self.segments[s].last_used);
            if let Some(s) = oldest {
                let segment = &mut self.segments[s];
                segment.synapses.clear();
                segment.last_used = self.iteration;
                self.segment_active[s] = false;
                self.segment_matching[s] = false;
                self.segment_potential[s] = 0;
                return s;
            }
        }
        let s = self.segments.len();
        self.segments.push(Segment {
            cell,
            synapses: Vec::new(),
            last_used: self.iteration,
        });
        self.segment_active.push(false);
        self.segment_matching.push(false);
        self.segment_potential.push(0);
        self.cell_segments[cell].push(s);
        s
    }

    fn grow_synapses(&mut self, s: usize, candidates: &[usize], count: usize) {
        let fresh = {
            let segment = &self.segments[s];
            candidates
                .iter()
                .cloned()
                .filter(|&c| segment.synapses.iter().all(|syn| syn.source != c))
                .collect::<Vec<_>>()
        };
        let picked = fresh
            .choose_multiple(&mut self.rng, count.min(fresh.len()))
            .cloned()
            .collect::<Vec<_>>();

        let max = self.config.max_synapses_per_segment.max(1);
        let initial = self.config.initial_permanence;
        let segment = &mut self.segments[s];
        // make room by dropping the weakest synapses
        let overflow = (segment.synapses.len() + picked.len())
            .saturating_sub(max)
            .min(segment.synapses.len());
        if overflow > 0 {
            segment.synapses.sort_by(|a, b| {
                a.permanence
                    .partial_cmp(&b.permanence)
                    .unwrap_or(Ordering::Equal)
            });
            segment.synapses.drain(..overflow);
        }
        let room = max.saturating_sub(segment.synapses.len());
        segment
            .synapses
            .extend(picked.into_iter().take(room).map(|source| Synapse {
                source,
                permanence: initial,
            }));
    }

    fn cortical_temporal_phase_2(&mut self) {
        let mut active = vec![false; self.cell_count()];
        for &cell in &self.active_cells {
            active[cell] = true;
        }
        let connected = self.config.connected_permanence;
        let activation_threshold = self.config.activation_threshold;
        let min_threshold = self.config.min_threshold;
        for (s, segment) in self.segments.iter().enumerate() {
            let (connected_count, potential) = segment.activity(&active, connected);
            let grown = !segment.synapses.is_empty();
            self.segment_active[s] = grown && connected_count >= activation_threshold;
            self.segment_matching[s] = grown && potential >= min_threshold;
            self.segment_potential[s] = potential;
        }
    }
}
