//! Sparse binary patterns exchanged between the encoders, the pooler and the
//! sequence memory.

use itertools::Itertools;

/// A sparse distributed representation.
///
/// Stores the indexes of the active bits, sorted and without duplicates,
/// together with the total width of the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sdr {
    width: usize,
    active: Vec<usize>,
}

impl Sdr {
    /// An empty pattern of given width.
    pub fn new(width: usize) -> Sdr {
        Sdr {
            width,
            active: Vec::new(),
        }
    }

    /// Build a pattern from active bit indexes.
    ///
    /// Indexes are sorted and deduplicated, indexes outside of `0..width` are
    /// dropped.
    pub fn from_active<I: IntoIterator<Item = usize>>(width: usize, active: I) -> Sdr {
        let active = active
            .into_iter()
            .filter(|&i| i < width)
            .sorted_unstable()
            .dedup()
            .collect();
        Sdr { width, active }
    }

    /// Total number of bits of the pattern.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Sorted indexes of the active bits.
    pub fn active(&self) -> &[usize] {
        &self.active
    }

    /// Number of active bits.
    pub fn count(&self) -> usize {
        self.active.len()
    }

    /// Whether no bit is active.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Fraction of active bits.
    pub fn sparsity(&self) -> f64 {
        if self.width == 0 {
            0.0
        } else {
            self.active.len() as f64 / self.width as f64
        }
    }

    /// Dense boolean view of the pattern.
    pub fn dense(&self) -> Vec<bool> {
        let mut dense = vec![false; self.width];
        for &i in &self.active {
            dense[i] = true;
        }
        dense
    }

    /// Number of active bits shared with `other`.
    pub fn overlap(&self, other: &Sdr) -> usize {
        self.active
            .iter()
            .merge_join_by(other.active.iter(), |a, b| a.cmp(b))
            .filter(|pair| pair.is_both())
            .count()
    }

    /// Concatenate `self` and `other`, the bits of `other` being shifted after
    /// those of `self`.
    pub fn concat(&self, other: &Sdr) -> Sdr {
        Sdr {
            width: self.width + other.width,
            active: self
                .active
                .iter()
                .cloned()
                .chain(other.active.iter().map(|&i| i + self.width))
                .collect(),
        }
    }
}
