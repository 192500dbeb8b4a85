use super::{recovery_trial, StepDelta, StepEngine};
use crate::graph::ContactGraph;
use crate::params::Probabilities;
use crate::rng::UniformSource;
use crate::state::EpidemicState;
use crate::Step;

/// Reference engine: one neighbor, one draw at a time.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarEngine;

impl StepEngine for ScalarEngine {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn step<R: UniformSource>(
        &self,
        graph: &ContactGraph,
        state: &mut EpidemicState,
        step: Step,
        params: &Probabilities,
        rng: &mut R,
    ) -> StepDelta {
        let mut delta = StepDelta::default();
        let next = step + 1;

        for node in 0..graph.node_count() {
            if !state.is_infectious_at(node, step) {
                continue;
            }

            for &neighbor in graph.neighbors_of(node) {
                let neighbor = neighbor as usize;
                if state.is_susceptible(neighbor)
                    && !state.is_immune(neighbor)
                    && rng.next_uniform() < params.p()
                {
                    state.mark_infected(neighbor, next);
                    delta.infected += 1;
                }
            }

            recovery_trial(state, node, step, params.q(), rng, &mut delta);
        }

        delta
    }
}
