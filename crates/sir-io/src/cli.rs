use crate::{
    load_network, write_ensemble_with_manifest, write_report_with_manifest, RunLabels,
    RunManifest,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sir_core::{
    ChaChaStream, ContactGraph, LaneKernel, Probabilities, Reseed, ScalarEngine, SeededStream,
    SirError, StepEngine, VectorEngine, XorShift32,
};
use sir_sampler::{Ensemble, Report, SimConfig, Simulation};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "sir")]
#[command(about = "Stochastic SIR epidemics on contact networks")]
#[command(
    long_about = "Discrete-time SIR propagation from node 0 with scalar and 8-lane batched engines"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one simulation and print the active infections per step
    Simulate {
        #[command(flatten)]
        run: RunArgs,

        /// Also list the infectious nodes after every step
        #[arg(long)]
        list_infected: bool,
    },

    /// Run independent replicates in parallel and summarize them
    Ensemble {
        #[command(flatten)]
        run: RunArgs,

        /// Number of replicates
        #[arg(long)]
        runs: u64,

        /// Final-size fraction above which a run counts as a major outbreak
        #[arg(long, default_value = "0.1")]
        threshold: f64,
    },

    /// Print degree statistics of a network file
    Inspect {
        /// Network JSON file
        #[arg(long)]
        network: PathBuf,

        /// Print every neighbor list
        #[arg(long)]
        adjacency: bool,
    },
}

/// Parameters shared by `simulate` and `ensemble`.
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Network JSON file
    #[arg(long)]
    pub network: PathBuf,

    /// Per-contact infection probability
    #[arg(long, default_value = "1.0")]
    pub p: f64,

    /// Per-step recovery probability
    #[arg(long, default_value = "1.0")]
    pub q: f64,

    #[arg(long, value_enum, default_value = "vector")]
    pub engine: EngineType,

    /// Lane kernel of the vector engine
    #[arg(long, value_enum, default_value = "wide")]
    pub kernel: KernelType,

    #[arg(long, value_enum, default_value = "xorshift")]
    pub rng: RngType,

    #[arg(long, value_enum, default_value = "per-step")]
    pub reseed: ReseedMode,

    /// Random seed
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Stop after this many steps
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Output Parquet file; the manifest is written next to it
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Only print the summary
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EngineType {
    #[value(name = "scalar")]
    Scalar,
    #[value(name = "vector")]
    Vector,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KernelType {
    #[value(name = "wide")]
    Wide,
    #[value(name = "lanes")]
    Lanes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RngType {
    #[value(name = "xorshift")]
    Xorshift,
    #[value(name = "chacha")]
    Chacha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReseedMode {
    #[value(name = "per-step")]
    PerStep,
    #[value(name = "per-run")]
    PerRun,
}

impl From<ReseedMode> for Reseed {
    fn from(mode: ReseedMode) -> Self {
        match mode {
            ReseedMode::PerStep => Reseed::PerStep,
            ReseedMode::PerRun => Reseed::PerRun,
        }
    }
}

impl RunArgs {
    pub fn config(&self) -> anyhow::Result<SimConfig> {
        let mut config = SimConfig::new(Probabilities::new(self.p, self.q)?)
            .with_seed(self.seed)
            .with_reseed(self.reseed.into());
        if let Some(max_steps) = self.max_steps {
            config = config.with_max_steps(max_steps);
        }
        Ok(config)
    }

    pub fn labels(&self) -> RunLabels {
        let engine = match self.engine {
            EngineType::Scalar => "scalar",
            EngineType::Vector => "vector",
        };
        let kernel = match (self.engine, self.kernel) {
            (EngineType::Scalar, _) => None,
            (EngineType::Vector, KernelType::Wide) => Some("wide"),
            (EngineType::Vector, KernelType::Lanes) => Some("lanes"),
        };
        let rng = match self.rng {
            RngType::Xorshift => "xorshift",
            RngType::Chacha => "chacha",
        };
        RunLabels {
            engine: engine.to_string(),
            kernel: kernel.map(str::to_string),
            rng: rng.to_string(),
        }
    }
}

/// Work that needs a concrete engine and stream type.
pub trait EngineTask {
    type Output;

    fn run<E, R>(self, engine: E) -> Self::Output
    where
        E: StepEngine + Clone,
        R: SeededStream;
}

/// Picks the engine, kernel and stream named in `args` and hands them to `task`.
pub fn dispatch<T: EngineTask>(args: &RunArgs, task: T) -> T::Output {
    match (args.engine, args.kernel, args.rng) {
        (EngineType::Scalar, _, RngType::Xorshift) => task.run::<_, XorShift32>(ScalarEngine),
        (EngineType::Scalar, _, RngType::Chacha) => task.run::<_, ChaChaStream>(ScalarEngine),
        (EngineType::Vector, KernelType::Wide, RngType::Xorshift) => {
            task.run::<_, XorShift32>(VectorEngine::new())
        }
        (EngineType::Vector, KernelType::Wide, RngType::Chacha) => {
            task.run::<_, ChaChaStream>(VectorEngine::new())
        }
        (EngineType::Vector, KernelType::Lanes, RngType::Xorshift) => {
            task.run::<_, XorShift32>(VectorEngine::with_kernel(LaneKernel))
        }
        (EngineType::Vector, KernelType::Lanes, RngType::Chacha) => {
            task.run::<_, ChaChaStream>(VectorEngine::with_kernel(LaneKernel))
        }
    }
}

struct SimulateTask<'a> {
    graph: &'a ContactGraph,
    config: SimConfig,
    quiet: bool,
    list_infected: bool,
}

impl EngineTask for SimulateTask<'_> {
    type Output = Result<Report, SirError>;

    fn run<E, R>(self, engine: E) -> Self::Output
    where
        E: StepEngine + Clone,
        R: SeededStream,
    {
        let mut sim = Simulation::<_, R>::seeded(self.graph, engine, self.config)?;
        let report = sim.run_with(|record, state| {
            if self.quiet {
                return;
            }
            println!(
                "Step {}: {} active infections ({:.6}s)",
                record.step,
                record.active,
                record.elapsed.as_secs_f64()
            );
            if self.list_infected && record.active > 0 {
                let infected: Vec<String> = (0..state.node_count())
                    .filter(|&node| state.is_infectious_at(node, record.step + 1))
                    .map(|node| node.to_string())
                    .collect();
                println!("Infected nodes: {}", infected.join(" "));
            }
        });
        Ok(report)
    }
}

struct EnsembleTask<'a> {
    graph: &'a ContactGraph,
    config: SimConfig,
    runs: u64,
}

impl EngineTask for EnsembleTask<'_> {
    type Output = Result<Ensemble, SirError>;

    fn run<E, R>(self, engine: E) -> Self::Output
    where
        E: StepEngine + Clone,
        R: SeededStream,
    {
        Ensemble::run::<E, R>(self.graph, engine, &self.config, self.runs)
    }
}

pub fn run_simulate_command(args: &RunArgs, list_infected: bool) -> anyhow::Result<Report> {
    let graph = load_network(&args.network)?;
    let config = args.config()?;
    let labels = args.labels();

    if !args.quiet {
        println!("SIR Simulation");
        println!("==============");
        println!(
            "Network: {} ({} nodes, {} entries)",
            args.network.display(),
            graph.node_count(),
            graph.edge_count()
        );
        println!("p: {}  q: {}", args.p, args.q);
        println!("Engine: {} {}", labels.engine, labels.kernel.as_deref().unwrap_or(""));
        println!("RNG: {} (seed {}, {})", labels.rng, config.seed, config.reseed);
        println!();
    }

    let task = SimulateTask {
        graph: &graph,
        config: config.clone(),
        quiet: args.quiet,
        list_infected,
    };
    let report = dispatch(args, task)?;

    println!();
    println!("Outcome: {}", report.outcome);
    println!("Steps: {}", report.steps);
    println!("Final size: {} / {}", report.final_size, graph.node_count());
    println!("Peak: {} active at step {}", report.peak_active, report.peak_step);
    println!("Elapsed time: {:.6} seconds", report.elapsed.as_secs_f64());

    if let Some(out) = &args.out {
        let manifest = RunManifest::new(&config, &labels, &args.network, &graph.summary());
        let manifest_path = write_report_with_manifest(&report, &manifest, out)?;
        println!("Wrote {} steps to {}", report.records.len(), out.display());
        println!("Wrote manifest to {}", manifest_path.display());
    }

    Ok(report)
}

pub fn run_ensemble_command(args: &RunArgs, runs: u64, threshold: f64) -> anyhow::Result<Ensemble> {
    let graph = load_network(&args.network)?;
    let config = args.config()?;
    let labels = args.labels();

    let task = EnsembleTask {
        graph: &graph,
        config: config.clone(),
        runs,
    };
    let ensemble = dispatch(args, task)?;
    let stats = ensemble.final_statistics(threshold);

    println!("Ensemble Statistics");
    println!("===================");
    println!("Runs: {}", stats.n_runs);
    println!(
        "Final size: {:.3} (sd {:.3})",
        stats.mean_final_size,
        stats.var_final_size.sqrt()
    );
    println!("Duration: {:.3} steps", stats.mean_steps);
    println!("Peak active: {:.3}", stats.mean_peak);
    println!(
        "Major outbreaks (> {:.1}% of nodes): {:.1}%",
        threshold * 100.0,
        stats.major_outbreak_fraction * 100.0
    );
    if stats.step_limited > 0 {
        println!("Stopped by step limit: {}", stats.step_limited);
    }

    if let Some(out) = &args.out {
        let manifest = RunManifest::new(&config, &labels, &args.network, &graph.summary());
        let manifest_path = write_ensemble_with_manifest(&ensemble, &manifest, threshold, out)?;
        println!("Wrote {} replicates to {}", ensemble.n_runs(), out.display());
        println!("Wrote manifest to {}", manifest_path.display());
    }

    Ok(ensemble)
}

pub fn run_inspect_command(network: &Path, adjacency: bool) -> anyhow::Result<()> {
    let graph = load_network(network)?;
    let summary = graph.summary();

    println!("Nodes: {}", summary.nodes);
    println!("Neighbor entries: {}", summary.edges);
    println!(
        "Degree: min {} / mean {:.3} / max {}",
        summary.min_degree, summary.mean_degree, summary.max_degree
    );
    println!("Isolated nodes: {}", summary.isolated);

    if adjacency {
        println!();
        println!("Network:");
        for node in 0..graph.node_count() {
            let neighbors: Vec<String> =
                graph.neighbors_of(node).iter().map(i32::to_string).collect();
            println!("{}: {}", node, neighbors.join(" "));
        }
    }
    Ok(())
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Simulate { run, list_infected } => {
            run_simulate_command(&run, list_infected)?;
        }
        Commands::Ensemble {
            run,
            runs,
            threshold,
        } => {
            run_ensemble_command(&run, runs, threshold)?;
        }
        Commands::Inspect { network, adjacency } => {
            run_inspect_command(&network, adjacency)?;
        }
    }
    Ok(())
}
