use anyhow::{ensure, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sir_core::{
    ContactGraph, LaneKernel, Probabilities, ScalarEngine, StepEngine, VectorEngine,
};
use sir_sampler::{Report, SimConfig, Simulation};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Runs the scalar engine and both vector kernels on the same random graph
/// with the same seed and checks that they produce the same epidemic.
#[derive(Parser, Debug)]
#[command(author, version, about = "Compare scalar and batched SIR engines")]
struct Args {
    #[arg(long, default_value_t = 50_000)]
    nodes: usize,

    /// Mean degree of the random graph
    #[arg(long, default_value_t = 24.0)]
    degree: f64,

    #[arg(long, default_value_t = 0.05)]
    p: f64,

    #[arg(long, default_value_t = 0.3)]
    q: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Random simple graph with `nodes * degree / 2` distinct undirected edges.
fn random_graph(nodes: usize, degree: f64, seed: u64) -> Result<ContactGraph> {
    let target = (nodes as f64 * degree / 2.0) as usize;
    ensure!(
        target <= nodes * nodes.saturating_sub(1) / 2,
        "mean degree {degree} is too high for {nodes} nodes"
    );
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut edges = BTreeSet::new();
    while edges.len() < target {
        let a = rng.gen_range(0..nodes);
        let b = rng.gen_range(0..nodes);
        if a != b {
            edges.insert((a.min(b), a.max(b)));
        }
    }
    let edges: Vec<_> = edges.into_iter().collect();
    Ok(ContactGraph::from_undirected_edges(nodes, &edges)?)
}

fn timed<E: StepEngine>(
    graph: &ContactGraph,
    engine: E,
    config: &SimConfig,
) -> Result<(Report, f64)> {
    let started = Instant::now();
    let report = Simulation::new(graph, engine, config.clone())?.run();
    Ok((report, started.elapsed().as_secs_f64()))
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let graph = random_graph(args.nodes, args.degree, args.seed)?;
    let summary = graph.summary();
    println!(
        "Graph: {} nodes, {} entries, degree {}..{}",
        summary.nodes, summary.edges, summary.min_degree, summary.max_degree
    );

    let config = SimConfig::new(Probabilities::new(args.p, args.q)?).with_seed(args.seed);
    let (scalar, t_scalar) = timed(&graph, ScalarEngine, &config)?;
    let (wide, t_wide) = timed(&graph, VectorEngine::new(), &config)?;
    let (lanes, t_lanes) = timed(&graph, VectorEngine::with_kernel(LaneKernel), &config)?;

    println!();
    println!("{:<8} {:>8} {:>12} {:>10}", "engine", "steps", "final size", "seconds");
    for (name, report, secs) in [
        ("scalar", &scalar, t_scalar),
        ("wide", &wide, t_wide),
        ("lanes", &lanes, t_lanes),
    ] {
        println!(
            "{:<8} {:>8} {:>12} {:>10.4}",
            name, report.steps, report.final_size, secs
        );
    }

    let series: Vec<_> = scalar.series().collect();
    ensure!(series == wide.series().collect::<Vec<_>>(), "wide kernel diverged from scalar");
    ensure!(series == lanes.series().collect::<Vec<_>>(), "lane kernel diverged from scalar");
    println!();
    println!("All engines produced identical step series");
    Ok(())
}
