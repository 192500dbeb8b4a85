use approx::assert_relative_eq;
use serde_json::json;
use sir_core::{ContactGraph, Probabilities, ScalarEngine, VectorEngine, XorShift32};
use sir_sampler::{DriverState, Ensemble, Outcome, SimConfig, Simulation};
use std::fs::File;
use std::io::Write;

#[test]
fn observer_sees_every_step() {
    let graph = ContactGraph::from_undirected_edges(5, &[(0, 1), (0, 2), (0, 3), (0, 4)]).unwrap();
    let config = SimConfig::new(Probabilities::breadth_first());
    let mut sim = Simulation::new(&graph, VectorEngine::new(), config).unwrap();
    assert_eq!(sim.driver(), DriverState::Running { step: 0, active: 1 });

    let mut seen = Vec::new();
    let report = sim.run_with(|record, state| {
        seen.push((record.step, record.active, state.immune_count()));
    });

    assert_eq!(seen, vec![(0, 4, 1), (1, 0, 5)]);
    assert_eq!(report.outcome, Outcome::Extinct);
    assert_eq!(report.peak_active, 4);
    assert_eq!(report.peak_step, 1);
    assert_eq!(report.records[0].infected, 4);
    assert_eq!(report.records[1].recovered, 4);
}

#[test]
fn active_matches_state_after_each_step() {
    let edges: Vec<_> = (0..200).map(|i| (i, (i * 13 + 5) % 200)).filter(|(a, b)| a != b).collect();
    let graph = ContactGraph::from_undirected_edges(200, &edges).unwrap();
    let config = SimConfig::new(Probabilities::new(0.6, 0.4).unwrap()).with_seed(5);
    let mut sim = Simulation::new(&graph, ScalarEngine, config).unwrap();

    sim.run_with(|record, state| {
        assert_eq!(record.active, state.infectious_count(record.step + 1));
    });
}

#[test]
fn complete_graph_final_size() {
    // Dense graph with p well above the epidemic threshold.
    let n = 200;
    let edges: Vec<_> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();
    let graph = ContactGraph::from_undirected_edges(n, &edges).unwrap();
    let config = SimConfig::new(Probabilities::new(0.02, 0.5).unwrap()).with_seed(3);

    let ensemble =
        Ensemble::run::<_, XorShift32>(&graph, VectorEngine::new(), &config, 200).unwrap();
    let stats = ensemble.final_statistics(0.1);

    let results = json!({
        "n": n,
        "p": 0.02,
        "q": 0.5,
        "n_runs": stats.n_runs,
        "mean_final_size": stats.mean_final_size,
        "var_final_size": stats.var_final_size,
        "mean_steps": stats.mean_steps,
        "major_outbreak_fraction": stats.major_outbreak_fraction,
    });
    std::fs::create_dir_all("runs").ok();
    let mut file = File::create("runs/complete_graph.json").unwrap();
    write!(file, "{}", serde_json::to_string(&results).unwrap()).unwrap();

    println!("Complete graph ensemble:");
    println!("Mean final size: {:.2}", stats.mean_final_size);
    println!("Major outbreak fraction: {:.3}", stats.major_outbreak_fraction);

    assert_eq!(stats.n_runs, 200);
    assert_eq!(stats.step_limited, 0);
    // R0 = p (n - 1) / q is about 8; most runs take off.
    assert!(stats.major_outbreak_fraction > 0.7);
    assert!(stats.mean_final_size > 0.7 * n as f64);
    assert_relative_eq!(
        stats.mean_final_size,
        ensemble.runs.iter().map(|r| r.final_size as f64).sum::<f64>() / 200.0,
        max_relative = 1e-12
    );
}
