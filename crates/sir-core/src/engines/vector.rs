use super::{recovery_trial, StepDelta, StepEngine};
use crate::batch::{
    draw_lanes, BatchKernel, GatheredState, IndexBatch, LaneMask, WideKernel, LANES,
};
use crate::graph::ContactGraph;
use crate::params::Probabilities;
use crate::rng::UniformSource;
use crate::state::EpidemicState;
use crate::Step;

/// Batched engine: each infectious node's neighbor slice is processed
/// [`LANES`] entries at a time.
///
/// Per batch the neighbor indices are loaded (the tail batch with a lane
/// mask), level and immunity are gathered through them, the kernel selects
/// susceptible non-immune lanes, those lanes draw in lane order and are
/// compared against `p`, and every lane of the combined mask is written back
/// as infected at `step + 1`.
///
/// Draws are only taken for eligible lanes, in lane order. A batch in which
/// the same node sits in two eligible lanes is tried lane by lane instead, a
/// later copy drawing only while the node is still susceptible. Either way
/// the sequence of draws is the one [`ScalarEngine`](super::ScalarEngine)
/// consumes.
#[derive(Clone, Copy, Debug, Default)]
pub struct VectorEngine<K = WideKernel> {
    kernel: K,
}

impl VectorEngine<WideKernel> {
    pub fn new() -> Self {
        Self { kernel: WideKernel }
    }
}

impl<K: BatchKernel> VectorEngine<K> {
    pub fn with_kernel(kernel: K) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Applies one batch and returns how many nodes it infected.
    #[inline]
    fn infect_batch<R: UniformSource>(
        &self,
        batch: &IndexBatch,
        state: &mut EpidemicState,
        next: Step,
        p: f32,
        rng: &mut R,
    ) -> usize {
        let gathered = GatheredState::gather(batch, state.levels_raw(), state.immune_raw());
        let eligible = self.kernel.eligible(&gathered) & batch.mask();
        if eligible.is_empty() {
            return 0;
        }

        if !(eligible & batch.repeated()).is_empty() {
            return Self::infect_lanes(batch, eligible, state, next, p, rng);
        }

        let draws = draw_lanes(rng, eligible);
        let hits = eligible & self.kernel.below(&draws, p);
        hits.iter()
            .filter(|&lane| state.mark_infected(batch.index(lane), next))
            .count()
    }

    /// Lane-ordered fallback for batches with repeated nodes.
    fn infect_lanes<R: UniformSource>(
        batch: &IndexBatch,
        eligible: LaneMask,
        state: &mut EpidemicState,
        next: Step,
        p: f32,
        rng: &mut R,
    ) -> usize {
        eligible
            .iter()
            .filter(|&lane| {
                let node = batch.index(lane);
                state.is_susceptible(node)
                    && !state.is_immune(node)
                    && rng.next_uniform() < p
                    && state.mark_infected(node, next)
            })
            .count()
    }
}

impl<K: BatchKernel> StepEngine for VectorEngine<K> {
    fn name(&self) -> &'static str {
        "vector"
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
        let neighbors = graph.neighbors();

        for node in 0..graph.node_count() {
            if !state.is_infectious_at(node, step) {
                continue;
            }

            let (start, end) = graph.neighbor_slice(node);
            for cursor in (start..end).step_by(LANES) {
                let batch = IndexBatch::load(neighbors, cursor, end - cursor);
                delta.infected += self.infect_batch(&batch, state, next, params.p(), rng);
            }

            recovery_trial(state, node, step, params.q(), rng, &mut delta);
        }

        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::LaneKernel;
    use crate::engines::ScalarEngine;
    use crate::rng::{ReplayStream, SeededStream, XorShift32};
    use crate::state::Level;

    #[test]
    fn test_node_zero_infected_through_batch() {
        // Node 1 is infectious and lists node 0 in lane 0.
        let g = ContactGraph::from_adjacency(&[vec![], vec![0, 2], vec![]]).unwrap();
        let mut s = EpidemicState::from_parts(
            &[Level::Susceptible, Level::InfectedAtStep(0), Level::Susceptible],
            &[false, false, false],
        )
        .unwrap();

        let mut rng = ReplayStream::constant(0.0);
        let params = Probabilities::breadth_first();
        let delta = VectorEngine::new().step(&g, &mut s, 0, &params, &mut rng);
        assert_eq!(delta, StepDelta { infected: 2, recovered: 1 });
        assert_eq!(s.level(0), Level::InfectedAtStep(1));
        assert_eq!(s.level(2), Level::InfectedAtStep(1));
        assert!(s.is_immune(1));
    }

    #[test]
    fn test_repeated_neighbor_in_one_batch() {
        // Node 0 lists node 1 twice. The first try fails, so the second copy
        // draws again; once it succeeds no further draw is taken.
        let g = ContactGraph::new(&[0, 3, 4, 5], &[1, 1, 2, 0, 0]).unwrap();
        let params = Probabilities::new(0.5, 0.5).unwrap();
        for kernel_lanes in [false, true] {
            let mut s = EpidemicState::for_graph(&g).unwrap();
            let mut rng = ReplayStream::new(vec![0.9, 0.1, 0.9, 0.9]);
            let delta = if kernel_lanes {
                VectorEngine::with_kernel(LaneKernel).step(&g, &mut s, 0, &params, &mut rng)
            } else {
                VectorEngine::new().step(&g, &mut s, 0, &params, &mut rng)
            };
            assert_eq!(delta, StepDelta { infected: 1, recovered: 0 });
            assert_eq!(s.level(1), Level::InfectedAtStep(1));
            assert_eq!(s.level(2), Level::Susceptible);
            assert_eq!(rng.consumed(), 4);
        }
    }

    #[test]
    fn test_matches_scalar_with_repeated_neighbors() {
        let g = ContactGraph::new(&[0, 3, 4, 5], &[1, 1, 2, 0, 0]).unwrap();
        g.validate().unwrap();
        let params = Probabilities::new(0.5, 0.5).unwrap();

        for seed in 0..200 {
            let mut scalar_state = EpidemicState::for_graph(&g).unwrap();
            let mut wide_state = scalar_state.clone();
            let mut lane_state = scalar_state.clone();
            let mut r1 = XorShift32::from_seed(seed);
            let mut r2 = r1.clone();
            let mut r3 = r1.clone();

            for step in 0..20 {
                let a = ScalarEngine.step(&g, &mut scalar_state, step, &params, &mut r1);
                let b = VectorEngine::new().step(&g, &mut wide_state, step, &params, &mut r2);
                let c = VectorEngine::with_kernel(LaneKernel)
                    .step(&g, &mut lane_state, step, &params, &mut r3);
                assert_eq!(a, b, "seed {seed} step {step}");
                assert_eq!(a, c, "seed {seed} step {step}");
            }
            assert_eq!(scalar_state, wide_state, "seed {seed}");
            assert_eq!(scalar_state, lane_state, "seed {seed}");
            assert_eq!(r1, r2, "seed {seed}");
            assert_eq!(r1, r3, "seed {seed}");
        }
    }

    #[test]
    fn test_matches_scalar_on_seeded_stream() {
        let edges: Vec<(usize, usize)> = (0..40)
            .flat_map(|i| [(i, (i + 1) % 40), (i, (i + 7) % 40), (i, (i + 13) % 40)])
            .collect();
        let g = ContactGraph::from_undirected_edges(40, &edges).unwrap();
        let params = Probabilities::new(0.4, 0.3).unwrap();

        let mut scalar_state = EpidemicState::for_graph(&g).unwrap();
        let mut wide_state = scalar_state.clone();
        let mut lane_state = scalar_state.clone();
        let mut r1 = XorShift32::from_seed(11);
        let mut r2 = r1.clone();
        let mut r3 = r1.clone();

        for step in 0..30 {
            ScalarEngine.step(&g, &mut scalar_state, step, &params, &mut r1);
            VectorEngine::new().step(&g, &mut wide_state, step, &params, &mut r2);
            VectorEngine::with_kernel(LaneKernel).step(&g, &mut lane_state, step, &params, &mut r3);
            assert_eq!(scalar_state, wide_state, "step {step}");
            assert_eq!(scalar_state, lane_state, "step {step}");
        }
        assert_eq!(r1, r2);
        assert_eq!(r1, r3);
    }
}
