pub mod scalar;
pub mod vector;

use crate::graph::ContactGraph;
use crate::params::Probabilities;
use crate::rng::UniformSource;
use crate::state::EpidemicState;
use crate::Step;

pub use scalar::ScalarEngine;
pub use vector::VectorEngine;

/// Infections and recoveries produced by one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepDelta {
    pub infected: usize,
    pub recovered: usize,
}

impl StepDelta {
    /// Active-infection count after this step, given the count before it.
    #[inline]
    pub fn apply(&self, active: usize) -> usize {
        active + self.infected - self.recovered
    }
}

/// One level-synchronous SIR step.
///
/// Every node infectious at `step` is visited in index order. Its neighbors
/// are tried in adjacency order: a susceptible, non-immune neighbor is
/// infected at `step + 1` when a draw falls below `p`. Then the node draws
/// once for recovery: below `q` it becomes immune, otherwise it stays
/// infectious at `step + 1`.
pub trait StepEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn step<R: UniformSource>(
        &self,
        graph: &ContactGraph,
        state: &mut EpidemicState,
        step: Step,
        params: &Probabilities,
        rng: &mut R,
    ) -> StepDelta;
}

/// Recovery trial shared by both engines.
#[inline]
pub(crate) fn recovery_trial<R: UniformSource>(
    state: &mut EpidemicState,
    node: usize,
    step: Step,
    q: f32,
    rng: &mut R,
    delta: &mut StepDelta,
) {
    if rng.next_uniform() < q {
        state.mark_immune(node);
        delta.recovered += 1;
    } else {
        state.advance_infectious(node, step);
    }
}
