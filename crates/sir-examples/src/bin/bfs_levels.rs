use anyhow::{bail, Result};
use clap::Parser;
use sir_core::{ContactGraph, Level, Probabilities, VectorEngine};
use sir_io::NetworkFile;
use sir_sampler::{SimConfig, Simulation};
use std::path::PathBuf;

/// With p = q = 1 the epidemic is a breadth-first search from node 0: every
/// node's level is its hop distance.
#[derive(Parser, Debug)]
#[command(author, version, about = "Show SIR levels on a grid with p = q = 1")]
struct Args {
    #[arg(long, default_value_t = 12)]
    width: usize,

    #[arg(long, default_value_t = 8)]
    height: usize,

    /// Also save the grid as a network file
    #[arg(long)]
    save: Option<PathBuf>,
}

fn grid(width: usize, height: usize) -> Result<ContactGraph> {
    let mut edges = Vec::new();
    for row in 0..height {
        for col in 0..width {
            let node = row * width + col;
            if col + 1 < width {
                edges.push((node, node + 1));
            }
            if row + 1 < height {
                edges.push((node, node + width));
            }
        }
    }
    Ok(ContactGraph::from_undirected_edges(width * height, &edges)?)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let graph = grid(args.width, args.height)?;

    if let Some(path) = &args.save {
        NetworkFile::from_graph(&graph).save(path)?;
        println!("Saved grid to {}", path.display());
    }

    let config = SimConfig::new(Probabilities::breadth_first());
    let mut sim = Simulation::new(&graph, VectorEngine::new(), config)?;
    let report = sim.run();

    println!("Levels on a {}x{} grid:", args.width, args.height);
    for row in 0..args.height {
        let line: Vec<String> = (0..args.width)
            .map(|col| match sim.state().level(row * args.width + col) {
                Level::InfectedAtStep(step) => format!("{step:3}"),
                Level::Susceptible => "  .".to_string(),
            })
            .collect();
        println!("{}", line.join(""));
    }

    for row in 0..args.height {
        for col in 0..args.width {
            let expected = (row + col) as u32;
            if sim.state().level(row * args.width + col) != Level::InfectedAtStep(expected) {
                bail!("node ({row}, {col}) is not at level {expected}");
            }
        }
    }
    println!();
    println!("{} steps, every level equals the hop distance", report.steps);
    Ok(())
}
