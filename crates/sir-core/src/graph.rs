use crate::aligned::AlignedBuf;
use crate::error::SirError;
use serde::{Deserialize, Serialize};

/// Static contact network in compressed adjacency (CSR) form.
///
/// Node `i`'s neighbors occupy `neighbors[offsets[i]..offsets[i + 1]]`.
/// Adjacency is directed exactly as given: an undirected network lists both
/// directions (see [`ContactGraph::from_undirected_edges`]). Self-loops and
/// repeated entries are kept as they are.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactGraph {
    offsets: AlignedBuf,
    neighbors: AlignedBuf,
}

/// Degree statistics of a graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub min_degree: usize,
    pub max_degree: usize,
    pub mean_degree: f64,
    pub isolated: usize,
}

impl ContactGraph {
    /// Builds a graph from raw CSR arrays.
    ///
    /// Only the buffer shape is checked here: `offsets` must be non-empty and
    /// its last entry must equal `neighbors.len()`. Monotonicity and neighbor
    /// range are the caller's contract; [`ContactGraph::validate`] checks them.
    pub fn new(offsets: &[i32], neighbors: &[i32]) -> Result<Self, SirError> {
        let last = *offsets.last().ok_or(SirError::OffsetsLength {
            expected: 1,
            actual: 0,
        })?;
        if usize::try_from(last).ok() != Some(neighbors.len()) {
            return Err(SirError::NeighborsLength {
                expected: last as i64,
                actual: neighbors.len(),
            });
        }
        if offsets.len() - 1 > i32::MAX as usize {
            return Err(SirError::IndexOverflow {
                value: (offsets.len() - 1) as u64,
            });
        }

        Ok(Self {
            offsets: AlignedBuf::from_slice(offsets),
            neighbors: AlignedBuf::from_slice(neighbors),
        })
    }

    /// Builds a graph from per-node neighbor lists.
    pub fn from_adjacency(adjacency: &[Vec<usize>]) -> Result<Self, SirError> {
        let n = adjacency.len();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut neighbors = Vec::with_capacity(adjacency.iter().map(Vec::len).sum());
        offsets.push(0);

        for list in adjacency {
            for &v in list {
                if v >= n {
                    return Err(SirError::NeighborOutOfRange {
                        position: neighbors.len(),
                        neighbor: v as i64,
                        node_count: n,
                    });
                }
                neighbors.push(to_lane(v)?);
            }
            offsets.push(to_lane(neighbors.len())?);
        }

        Self::new(&offsets, &neighbors)
    }

    /// Builds a graph with both directions of every `(u, v)` pair.
    ///
    /// A self-loop `(u, u)` is stored once.
    pub fn from_undirected_edges(n: usize, edges: &[(usize, usize)]) -> Result<Self, SirError> {
        let mut adjacency = vec![Vec::new(); n];
        for (position, &(u, v)) in edges.iter().enumerate() {
            if u >= n || v >= n {
                return Err(SirError::NeighborOutOfRange {
                    position,
                    neighbor: u.max(v) as i64,
                    node_count: n,
                });
            }
            adjacency[u].push(v);
            if u != v {
                adjacency[v].push(u);
            }
        }
        Self::from_adjacency(&adjacency)
    }

    pub fn node_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of directed neighbor entries.
    pub fn edge_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Half-open range of `node`'s entries in [`ContactGraph::neighbors`].
    #[inline]
    pub fn neighbor_slice(&self, node: usize) -> (usize, usize) {
        (
            self.offsets[node] as usize,
            self.offsets[node + 1] as usize,
        )
    }

    #[inline]
    pub fn neighbors_of(&self, node: usize) -> &[i32] {
        let (start, end) = self.neighbor_slice(node);
        &self.neighbors[start..end]
    }

    pub fn degree(&self, node: usize) -> usize {
        let (start, end) = self.neighbor_slice(node);
        end - start
    }

    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    pub fn neighbors(&self) -> &[i32] {
        &self.neighbors
    }

    /// Full structural check: offsets start at or above zero and never
    /// decrease, and every neighbor names an existing node.
    pub fn validate(&self) -> Result<(), SirError> {
        if self.offsets[0] < 0 {
            return Err(SirError::NonMonotonicOffsets { node: 0 });
        }
        if let Some(node) = self.offsets.windows(2).position(|w| w[1] < w[0]) {
            return Err(SirError::NonMonotonicOffsets { node });
        }

        let n = self.node_count();
        if let Some(position) = self
            .neighbors
            .iter()
            .position(|&v| v < 0 || v as usize >= n)
        {
            return Err(SirError::NeighborOutOfRange {
                position,
                neighbor: self.neighbors[position] as i64,
                node_count: n,
            });
        }
        Ok(())
    }

    pub fn summary(&self) -> GraphSummary {
        let n = self.node_count();
        let degrees = (0..n).map(|i| self.degree(i));
        let (min_degree, max_degree, isolated) = degrees.fold(
            (usize::MAX, 0, 0),
            |(lo, hi, iso), d| (lo.min(d), hi.max(d), iso + usize::from(d == 0)),
        );

        GraphSummary {
            nodes: n,
            edges: self.edge_count(),
            min_degree: if n == 0 { 0 } else { min_degree },
            max_degree,
            mean_degree: if n == 0 {
                0.0
            } else {
                self.edge_count() as f64 / n as f64
            },
            isolated,
        }
    }
}

fn to_lane(value: usize) -> Result<i32, SirError> {
    i32::try_from(value).map_err(|_| SirError::IndexOverflow {
        value: value as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path4() -> ContactGraph {
        ContactGraph::from_undirected_edges(4, &[(0, 1), (1, 2), (2, 3)]).unwrap()
    }

    #[test]
    fn test_path_layout() {
        let g = path4();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 6);
        assert_eq!(g.offsets(), &[0, 1, 3, 5, 6]);
        assert_eq!(g.neighbors_of(1), &[0, 2]);
        assert_eq!(g.neighbor_slice(3), (5, 6));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            ContactGraph::new(&[], &[]),
            Err(SirError::OffsetsLength { .. })
        ));
        assert!(matches!(
            ContactGraph::new(&[0, 2], &[0]),
            Err(SirError::NeighborsLength { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_validate_catches_bad_csr() {
        // Shape is fine, slices are inverted.
        let g = ContactGraph::new(&[0, 2, 1, 3], &[1, 2, 0]).unwrap();
        assert_eq!(g.validate(), Err(SirError::NonMonotonicOffsets { node: 1 }));

        let g = ContactGraph::new(&[0, 1, 2], &[1, 5]).unwrap();
        assert!(matches!(
            g.validate(),
            Err(SirError::NeighborOutOfRange { position: 1, neighbor: 5, .. })
        ));
    }

    #[test]
    fn test_self_loop_stored_once() {
        let g = ContactGraph::from_undirected_edges(2, &[(0, 0), (0, 1)]).unwrap();
        assert_eq!(g.neighbors_of(0), &[0, 1]);
        assert_eq!(g.neighbors_of(1), &[0]);
    }

    #[test]
    fn test_summary() {
        let g = ContactGraph::from_adjacency(&[vec![1, 2], vec![0], vec![0], vec![]]).unwrap();
        let s = g.summary();
        assert_eq!(s.nodes, 4);
        assert_eq!(s.edges, 4);
        assert_eq!(s.min_degree, 0);
        assert_eq!(s.max_degree, 2);
        assert_eq!(s.isolated, 1);
        assert!((s.mean_degree - 1.0).abs() < 1e-12);
    }
}
