use thiserror::Error;

/// Errors raised while building graphs, states and parameters.
///
/// The step engines themselves are infallible; everything that can go wrong
/// is caught before the first step runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SirError {
    /// A probability parameter is NaN or outside `[0, 1]`.
    #[error("probability `{name}` must lie in [0, 1], got {value}")]
    ProbabilityOutOfRange {
        /// Parameter name (`p` or `q`).
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// A simulation needs at least the seed node.
    #[error("contact graph has no nodes")]
    EmptyGraph,

    /// The offset array does not have `node_count + 1` entries.
    #[error("offset array has {actual} entries, expected {expected}")]
    OffsetsLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The neighbor array length disagrees with the final offset.
    #[error("neighbor array has {actual} entries, final offset says {expected}")]
    NeighborsLength {
        /// Value of the final offset.
        expected: i64,
        /// Actual length.
        actual: usize,
    },

    /// Offsets decrease (or start below zero) at `node`.
    #[error("offsets are not monotonic at node {node}")]
    NonMonotonicOffsets {
        /// First node whose slice is inverted.
        node: usize,
    },

    /// A neighbor entry does not name a node of the graph.
    #[error("neighbor entry {position} refers to node {neighbor}, graph has {node_count} nodes")]
    NeighborOutOfRange {
        /// Position in the neighbor array.
        position: usize,
        /// Offending value.
        neighbor: i64,
        /// Number of nodes.
        node_count: usize,
    },

    /// The declared edge count agrees with neither the number of neighbor
    /// entries nor half of it.
    #[error("declared {declared} edges, neighbor array has {entries} entries")]
    EdgeCountMismatch {
        /// Declared count.
        declared: usize,
        /// Neighbor entries.
        entries: usize,
    },

    /// Level and immunity arrays of different lengths.
    #[error("state has {levels} levels but {immune} immunity flags")]
    StateShape {
        /// Number of levels.
        levels: usize,
        /// Number of immunity flags.
        immune: usize,
    },

    /// A node index or step does not fit the 32-bit lane representation.
    #[error("value {value} does not fit a 32-bit lane")]
    IndexOverflow {
        /// Offending value.
        value: u64,
    },
}
