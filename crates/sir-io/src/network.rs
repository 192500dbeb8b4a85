//! JSON contact networks.
//!
//! A network file holds the CSR arrays under their short names:
//!
//! ```json
//! { "num_nodes": 4, "num_edges": 3, "N": [0, 1, 3, 5, 6], "L": [1, 0, 2, 1, 3, 2] }
//! ```
//!
//! `num_edges` may count either directed entries (`L.len()`) or undirected
//! edges (`L.len() / 2`).

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sir_core::{ContactGraph, SirError};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFile {
    pub num_nodes: usize,
    pub num_edges: usize,
    #[serde(rename = "N")]
    pub offsets: Vec<i64>,
    #[serde(rename = "L")]
    pub neighbors: Vec<i64>,
}

impl NetworkFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading network file {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("parsing network file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing network file {}", path.display()))
    }

    /// Checks every declared size and index, then builds the graph.
    pub fn into_graph(self) -> Result<ContactGraph, SirError> {
        if self.num_nodes == 0 {
            return Err(SirError::EmptyGraph);
        }
        if self.offsets.len() != self.num_nodes + 1 {
            return Err(SirError::OffsetsLength {
                expected: self.num_nodes + 1,
                actual: self.offsets.len(),
            });
        }
        let entries = self.neighbors.len();
        if self.num_edges != entries && self.num_edges * 2 != entries {
            return Err(SirError::EdgeCountMismatch {
                declared: self.num_edges,
                entries,
            });
        }

        let offsets = to_lanes(&self.offsets)?;
        let neighbors = to_lanes(&self.neighbors)?;
        let graph = ContactGraph::new(&offsets, &neighbors)?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn from_graph(graph: &ContactGraph) -> Self {
        Self {
            num_nodes: graph.node_count(),
            num_edges: graph.edge_count(),
            offsets: graph.offsets().iter().map(|&o| i64::from(o)).collect(),
            neighbors: graph.neighbors().iter().map(|&v| i64::from(v)).collect(),
        }
    }
}

fn to_lanes(values: &[i64]) -> Result<Vec<i32>, SirError> {
    values
        .iter()
        .map(|&v| {
            i32::try_from(v).map_err(|_| SirError::IndexOverflow {
                value: v.unsigned_abs(),
            })
        })
        .collect()
}

/// Loads and validates a network file.
pub fn load_network(path: &Path) -> anyhow::Result<ContactGraph> {
    let started = Instant::now();
    let file = NetworkFile::load(path)?;
    debug!(
        num_nodes = file.num_nodes,
        num_edges = file.num_edges,
        "parsed network file"
    );
    let graph = file
        .into_graph()
        .with_context(|| format!("invalid network {}", path.display()))?;
    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        entries = graph.edge_count(),
        elapsed = ?started.elapsed(),
        "network imported"
    );
    Ok(graph)
}
