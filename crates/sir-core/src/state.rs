use crate::aligned::AlignedBuf;
use crate::error::SirError;
use crate::graph::ContactGraph;
use crate::Step;
use serde::{Deserialize, Serialize};

/// Raw level value of a node that has never been infected.
pub const SUSCEPTIBLE: i32 = -1;
/// Raw immunity flags, all bits set for true so they work as lane masks.
pub const IMMUNE: i32 = -1;
pub const NOT_IMMUNE: i32 = 0;

/// Infection level of a node.
///
/// Stored as an `i32` per node: [`SUSCEPTIBLE`] (`-1`) or the step at which
/// the node is infectious.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Susceptible,
    InfectedAtStep(Step),
}

impl Level {
    #[inline]
    pub fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            Level::Susceptible
        } else {
            Level::InfectedAtStep(raw as Step)
        }
    }

    #[inline]
    pub fn to_raw(self) -> i32 {
        match self {
            Level::Susceptible => SUSCEPTIBLE,
            Level::InfectedAtStep(step) => raw_step(step),
        }
    }

    pub fn is_susceptible(self) -> bool {
        matches!(self, Level::Susceptible)
    }
}

#[inline]
fn raw_step(step: Step) -> i32 {
    debug_assert!(step <= i32::MAX as Step, "step {step} overflows a lane");
    step as i32
}

/// Per-node infection level and immunity.
///
/// Node 0 starts infectious at step 0, every other node susceptible. Levels
/// only move forward and immunity is never cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpidemicState {
    levels: AlignedBuf,
    immune: AlignedBuf,
}

impl EpidemicState {
    pub fn new(node_count: usize) -> Result<Self, SirError> {
        if node_count == 0 {
            return Err(SirError::EmptyGraph);
        }
        if node_count > i32::MAX as usize {
            return Err(SirError::IndexOverflow {
                value: node_count as u64,
            });
        }

        let mut levels = AlignedBuf::filled(node_count, SUSCEPTIBLE);
        levels[0] = 0;
        Ok(Self {
            levels,
            immune: AlignedBuf::filled(node_count, NOT_IMMUNE),
        })
    }

    pub fn for_graph(graph: &ContactGraph) -> Result<Self, SirError> {
        Self::new(graph.node_count())
    }

    /// Builds a state from explicit per-node levels and immunity flags.
    pub fn from_parts(levels: &[Level], immune: &[bool]) -> Result<Self, SirError> {
        if levels.len() != immune.len() {
            return Err(SirError::StateShape {
                levels: levels.len(),
                immune: immune.len(),
            });
        }
        let mut state = Self::new(levels.len())?;
        for (node, (level, &flag)) in levels.iter().zip(immune).enumerate() {
            state.levels[node] = level.to_raw();
            state.immune[node] = if flag { IMMUNE } else { NOT_IMMUNE };
        }
        Ok(state)
    }

    /// Puts every node back into its initial condition.
    pub fn reset(&mut self) {
        self.levels.fill(SUSCEPTIBLE);
        self.levels[0] = 0;
        self.immune.fill(NOT_IMMUNE);
    }

    pub fn node_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, node: usize) -> Level {
        Level::from_raw(self.levels[node])
    }

    /// Never infected.
    #[inline]
    pub fn is_susceptible(&self, node: usize) -> bool {
        self.levels[node] == SUSCEPTIBLE
    }

    #[inline]
    pub fn is_immune(&self, node: usize) -> bool {
        self.immune[node] != NOT_IMMUNE
    }

    /// Infectious during `step` and not yet recovered.
    #[inline]
    pub fn is_infectious_at(&self, node: usize, step: Step) -> bool {
        self.levels[node] == raw_step(step) && !self.is_immune(node)
    }

    /// Infects a susceptible, non-immune node at `step`.
    ///
    /// Returns whether the node changed; already infected or immune nodes
    /// are left alone.
    #[inline]
    pub fn mark_infected(&mut self, node: usize, step: Step) -> bool {
        if self.is_susceptible(node) && !self.is_immune(node) {
            self.levels[node] = raw_step(step);
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn mark_immune(&mut self, node: usize) {
        self.immune[node] = IMMUNE;
    }

    /// Keeps a node infectious for `step + 1`. Only acts on nodes infectious
    /// at `step`, so repeated calls are harmless.
    #[inline]
    pub fn advance_infectious(&mut self, node: usize, step: Step) {
        if self.is_infectious_at(node, step) {
            self.levels[node] = raw_step(step + 1);
        }
    }

    /// Nodes infectious during `step`.
    pub fn infectious_count(&self, step: Step) -> usize {
        let raw = raw_step(step);
        self.levels
            .iter()
            .zip(self.immune.iter())
            .filter(|&(&level, &immune)| level == raw && immune == NOT_IMMUNE)
            .count()
    }

    /// Nodes that left the susceptible class at some point.
    pub fn ever_infected(&self) -> usize {
        self.levels.iter().filter(|&&l| l != SUSCEPTIBLE).count()
    }

    pub fn immune_count(&self) -> usize {
        self.immune.iter().filter(|&&f| f != NOT_IMMUNE).count()
    }

    pub fn levels(&self) -> impl Iterator<Item = Level> + '_ {
        self.levels.iter().map(|&raw| Level::from_raw(raw))
    }

    /// Raw level lanes, indexed by node.
    pub fn levels_raw(&self) -> &[i32] {
        &self.levels
    }

    /// Raw immunity lanes, indexed by node.
    pub fn immune_raw(&self) -> &[i32] {
        &self.immune
    }
}
