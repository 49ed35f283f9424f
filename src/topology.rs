//! Types and traits for handling the layers topology.

/// Common interface for topology of input organizations.
///
/// This trait is used by the pooler to pick the potential inputs of each
/// column, as the neighborhood of the column's center in the input space.
pub trait Topology {
    /// Type of the iterator over neighbors returned by `.neighbors(...)`.
    type NeighborsIter: Iterator<Item = usize>;

    /// Number of nodes in the topology.
    fn len(&self) -> usize;

    /// Neighbors of node `i` within a given radius, `i` included.
    ///
    /// Returns an iterator over the neighbors indexes, without duplicates.
    fn neighbors(&self, i: usize, radius: usize) -> Self::NeighborsIter;

    /// Map the index of an output among `outputs` onto the node at the
    /// same relative position of this topology.
    fn map_center(&self, output: usize, outputs: usize) -> usize {
        if outputs == 0 {
            return 0;
        }
        let ratio = self.len() as f64 / outputs as f64;
        (((output as f64 + 0.5) * ratio) as usize).min(self.len().saturating_sub(1))
    }
}

/// Single dimension topology
///
/// All inputs are organized as a single line, the simplest topology. When
/// `wrap_around` is set, the line is closed into a ring and neighborhoods
/// crossing one end continue on the other.
#[derive(Debug, Clone, Copy)]
pub struct OneDimension {
    length: usize,
    wrap_around: bool,
}

impl OneDimension {
    /// Create a new `OneDimension` topology.
    ///
    /// It represents a line of `length` inputs, with indexes
    /// ranging from `0` to `length-1` included.
    pub fn new(length: usize, wrap_around: bool) -> OneDimension {
        OneDimension {
            length,
            wrap_around,
        }
    }
}

impl Topology for OneDimension {
    type NeighborsIter = std::vec::IntoIter<usize>;

    fn len(&self) -> usize {
        self.length
    }

    fn neighbors(&self, i: usize, radius: usize) -> std::vec::IntoIter<usize> {
        if self.length == 0 {
            return Vec::new().into_iter();
        }
        // the whole line is covered, whatever the center
        if radius >= self.length / 2 {
            return (0..self.length).collect::<Vec<_>>().into_iter();
        }
        let nodes: Vec<usize> = if self.wrap_around {
            (0..=2 * radius)
                .map(|k| (i + self.length + k - radius) % self.length)
                .collect()
        } else {
            (i.saturating_sub(radius)..(i + radius + 1).min(self.length)).collect()
        };
        nodes.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_clamped_without_wrap() {
        let t = OneDimension::new(10, false);
        assert_eq!(t.neighbors(1, 2).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(t.neighbors(9, 2).collect::<Vec<_>>(), vec![7, 8, 9]);
    }

    #[test]
    fn test_neighbors_wrap_around() {
        let t = OneDimension::new(10, true);
        assert_eq!(t.neighbors(1, 2).collect::<Vec<_>>(), vec![9, 0, 1, 2, 3]);
        assert_eq!(t.neighbors(9, 1).collect::<Vec<_>>(), vec![8, 9, 0]);
    }

    #[test]
    fn test_large_radius_covers_everything() {
        let t = OneDimension::new(5, true);
        assert_eq!(t.neighbors(3, 5).count(), 5);
    }

    #[test]
    fn test_map_center() {
        let t = OneDimension::new(100, false);
        assert_eq!(t.map_center(0, 10), 5);
        assert_eq!(t.map_center(9, 10), 95);
    }
}
