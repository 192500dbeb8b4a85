mod common;

use approx::assert_abs_diff_eq;
use common::{run_to_extinction, star};
use serde_json::json;
use sir_core::{run_seed, ChaChaStream, Probabilities, ScalarEngine, SeededStream, VectorEngine};
use std::fs::File;
use std::io::Write;

#[test]
fn star_attack_rate() {
    // With q = 1 the center is infectious for exactly one step, so every leaf
    // is infected independently with probability p.
    let leaves = 20;
    let p = 0.3;
    let n_runs = 4_000;
    let graph = star(leaves);
    let params = Probabilities::new(p, 1.0).unwrap();

    let mut scalar_sizes = Vec::with_capacity(n_runs);
    let mut vector_sizes = Vec::with_capacity(n_runs);
    for run_id in 0..n_runs as u64 {
        let seed = run_seed(42, run_id);
        let mut rng = ChaChaStream::from_seed(seed);
        let (state, steps) =
            run_to_extinction(&graph, &ScalarEngine, &params, &mut rng, |_, _, _| {});
        assert!(steps <= 2);
        scalar_sizes.push((state.ever_infected() - 1) as f64);

        let mut rng = ChaChaStream::from_seed(seed);
        let engine = VectorEngine::new();
        let (state, _) = run_to_extinction(&graph, &engine, &params, &mut rng, |_, _, _| {});
        vector_sizes.push((state.ever_infected() - 1) as f64);
    }

    let mean = scalar_sizes.iter().sum::<f64>() / n_runs as f64;
    let var = scalar_sizes.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n_runs - 1) as f64;
    let expected_mean = leaves as f64 * p;
    let expected_var = leaves as f64 * p * (1.0 - p);

    let results = json!({
        "leaves": leaves,
        "p": p,
        "n_runs": n_runs,
        "mean_infected": mean,
        "var_infected": var,
        "expected_mean": expected_mean,
        "expected_var": expected_var,
    });
    std::fs::create_dir_all("runs").ok();
    let mut file = File::create("runs/attack_rate.json").unwrap();
    write!(file, "{}", serde_json::to_string(&results).unwrap()).unwrap();

    println!("Star attack rate ({leaves} leaves, p = {p}):");
    println!("Mean infected leaves: {mean:.4} (expected: {expected_mean:.4})");
    println!("Variance: {var:.4} (expected: {expected_var:.4})");

    // Standard error of the mean is about 0.03.
    assert_abs_diff_eq!(mean, expected_mean, epsilon = 0.15);
    assert_abs_diff_eq!(var, expected_var, epsilon = 0.5);
    assert_eq!(scalar_sizes, vector_sizes);
}
