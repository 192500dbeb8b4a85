#![allow(dead_code)]

use sir_core::{ContactGraph, EpidemicState, Probabilities, Step, StepEngine, UniformSource};
use std::collections::BTreeSet;

/// Steps `engine` until no node is infectious, calling `observe` after each
/// step with the step index, the active count and the state. Returns the
/// number of steps taken.
pub fn run_to_extinction<E, R, F>(
    graph: &ContactGraph,
    engine: &E,
    params: &Probabilities,
    rng: &mut R,
    mut observe: F,
) -> (EpidemicState, Step)
where
    E: StepEngine,
    R: UniformSource,
    F: FnMut(Step, usize, &EpidemicState),
{
    let mut state = EpidemicState::for_graph(graph).unwrap();
    let mut active = 1;
    let mut step = 0;
    loop {
        let delta = engine.step(graph, &mut state, step, params, rng);
        active = delta.apply(active);
        observe(step, active, &state);
        step += 1;
        if active == 0 || step > 100_000 {
            return (state, step);
        }
    }
}

/// Simple undirected graph from arbitrary pairs: self-loops and repeated
/// pairs are dropped so every neighbor list is duplicate-free.
pub fn simple_graph(n: usize, pairs: &[(usize, usize)]) -> ContactGraph {
    let edges: BTreeSet<(usize, usize)> = pairs
        .iter()
        .map(|&(a, b)| (a % n, b % n))
        .filter(|(a, b)| a != b)
        .map(|(a, b)| (a.min(b), a.max(b)))
        .collect();
    let edges: Vec<_> = edges.into_iter().collect();
    ContactGraph::from_undirected_edges(n, &edges).unwrap()
}

/// Star with node 0 at the center and `leaves` leaves.
pub fn star(leaves: usize) -> ContactGraph {
    let edges: Vec<_> = (1..=leaves).map(|leaf| (0, leaf)).collect();
    ContactGraph::from_undirected_edges(leaves + 1, &edges).unwrap()
}

/// Breadth-first distance from node 0, `None` when unreachable.
pub fn bfs_distances(graph: &ContactGraph) -> Vec<Option<Step>> {
    let mut dist = vec![None; graph.node_count()];
    dist[0] = Some(0);
    let mut frontier = vec![0usize];
    let mut depth = 0;
    while !frontier.is_empty() {
        depth += 1;
        let mut next = Vec::new();
        for &u in &frontier {
            for &v in graph.neighbors_of(u) {
                let v = v as usize;
                if dist[v].is_none() {
                    dist[v] = Some(depth);
                    next.push(v);
                }
            }
        }
        frontier = next;
    }
    dist
}
