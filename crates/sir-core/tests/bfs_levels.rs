mod common;

use common::{bfs_distances, run_to_extinction, simple_graph};
use sir_core::{
    ContactGraph, LaneKernel, Level, Probabilities, ReplayStream, ScalarEngine, StepEngine,
    VectorEngine,
};

fn check_path<E: StepEngine>(engine: &E) {
    let graph = ContactGraph::from_undirected_edges(4, &[(0, 1), (1, 2), (2, 3)]).unwrap();
    // With p = q = 1 every draw passes, whatever its value.
    let mut rng = ReplayStream::new(vec![0.3, 0.9, 0.0]);
    let mut series = Vec::new();

    let (state, steps) = run_to_extinction(
        &graph,
        engine,
        &Probabilities::breadth_first(),
        &mut rng,
        |step, active, _| series.push((step, active)),
    );

    let levels: Vec<Level> = state.levels().collect();
    assert_eq!(
        levels,
        (0..4).map(Level::InfectedAtStep).collect::<Vec<_>>(),
        "{}",
        engine.name()
    );
    assert_eq!(state.immune_count(), 4);
    assert_eq!(steps, 4);
    assert_eq!(series, vec![(0, 1), (1, 1), (2, 1), (3, 0)]);
}

#[test]
fn path_graph_scalar() {
    check_path(&ScalarEngine);
}

#[test]
fn path_graph_vector() {
    check_path(&VectorEngine::new());
    check_path(&VectorEngine::with_kernel(LaneKernel));
}

#[test]
fn breadth_first_levels_on_mesh() {
    // 12x12 grid with long-range chords: degrees above one batch width.
    let n = 144;
    let mut pairs = Vec::new();
    for i in 0..n {
        if i % 12 != 11 {
            pairs.push((i, i + 1));
        }
        if i + 12 < n {
            pairs.push((i, i + 12));
        }
        if i % 5 == 0 {
            for k in 1..10 {
                pairs.push((i, (i * 7 + k * 13) % n));
            }
        }
    }
    let graph = simple_graph(n, &pairs);
    let expected = bfs_distances(&graph);

    let scalar = run_to_extinction(
        &graph,
        &ScalarEngine,
        &Probabilities::breadth_first(),
        &mut ReplayStream::constant(0.5),
        |_, _, _| {},
    )
    .0;
    let vector = run_to_extinction(
        &graph,
        &VectorEngine::new(),
        &Probabilities::breadth_first(),
        &mut ReplayStream::constant(0.5),
        |_, _, _| {},
    )
    .0;

    for node in 0..n {
        let want = match expected[node] {
            Some(d) => Level::InfectedAtStep(d),
            None => Level::Susceptible,
        };
        assert_eq!(scalar.level(node), want, "node {node}");
        assert_eq!(vector.level(node), want, "node {node}");
        assert_eq!(scalar.is_immune(node), expected[node].is_some());
    }
    assert_eq!(scalar, vector);
}
