//! Drives [`sir_core`] engines through whole runs.
//!
//! [`Simulation`] owns the state and random stream of one run and steps the
//! engine until extinction (or an optional step limit). [`Sampler`] runs
//! independent replicates in parallel and summarizes them.

use serde::{Deserialize, Serialize};
use sir_core::{
    step_seed, ContactGraph, EpidemicState, Probabilities, Reseed, SeededStream, SirError, Step,
    StepEngine, XorShift32,
};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

pub mod ensemble;

pub use ensemble::{Ensemble, EnsembleStats, RunSummary, Sampler};

/// Parameters of a single run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub probabilities: Probabilities,
    pub seed: u64,
    pub reseed: Reseed,
    /// Stop after this many steps even if nodes are still infectious.
    pub max_steps: Option<Step>,
}

impl SimConfig {
    pub const DEFAULT_SEED: u64 = 42;

    pub fn new(probabilities: Probabilities) -> Self {
        Self {
            probabilities,
            seed: Self::DEFAULT_SEED,
            reseed: Reseed::default(),
            max_steps: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_reseed(mut self, reseed: Reseed) -> Self {
        self.reseed = reseed;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Step) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// What one step did.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: Step,
    /// Nodes infectious in the next step.
    pub active: usize,
    pub infected: usize,
    pub recovered: usize,
    /// Wall time spent in the engine.
    pub elapsed: Duration,
}

/// Why a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// No infectious node left.
    Extinct,
    /// `max_steps` reached first.
    StepLimit,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Extinct => "extinct",
            Outcome::StepLimit => "step-limit",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Running { step: Step, active: usize },
    Terminated(Outcome),
}

/// Result of a finished run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub records: Vec<StepRecord>,
    pub outcome: Outcome,
    pub steps: Step,
    /// Nodes ever infected, the seed included.
    pub final_size: usize,
    pub peak_active: usize,
    pub peak_step: Step,
    pub elapsed: Duration,
}

impl Report {
    /// `(step, active)` pairs in step order.
    pub fn series(&self) -> impl Iterator<Item = (Step, usize)> + '_ {
        self.records.iter().map(|r| (r.step, r.active))
    }
}

/// One run of an engine over a graph.
///
/// The random stream is rebuilt from the configured seed: once at
/// construction for [`Reseed::PerRun`], before every step (seeded with
/// [`step_seed`]) for [`Reseed::PerStep`].
pub struct Simulation<'g, E, R = XorShift32> {
    graph: &'g ContactGraph,
    engine: E,
    config: SimConfig,
    state: EpidemicState,
    rng: R,
    driver: DriverState,
    records: Vec<StepRecord>,
}

impl<'g, E: StepEngine> Simulation<'g, E, XorShift32> {
    /// Run driven by the reference xorshift stream.
    pub fn new(graph: &'g ContactGraph, engine: E, config: SimConfig) -> Result<Self, SirError> {
        Self::seeded(graph, engine, config)
    }
}

impl<'g, E: StepEngine, R: SeededStream> Simulation<'g, E, R> {
    /// Run driven by any seeded stream type.
    pub fn seeded(graph: &'g ContactGraph, engine: E, config: SimConfig) -> Result<Self, SirError> {
        let state = EpidemicState::for_graph(graph)?;
        let rng = match config.reseed {
            Reseed::PerRun => R::from_seed(config.seed),
            Reseed::PerStep => R::from_seed(step_seed(config.seed, 0)),
        };
        let driver = if config.max_steps == Some(0) {
            DriverState::Terminated(Outcome::StepLimit)
        } else {
            DriverState::Running { step: 0, active: 1 }
        };

        Ok(Self {
            graph,
            engine,
            config,
            state,
            rng,
            driver,
            records: Vec::new(),
        })
    }

    pub fn driver(&self) -> DriverState {
        self.driver
    }

    pub fn is_running(&self) -> bool {
        matches!(self.driver, DriverState::Running { .. })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &EpidemicState {
        &self.state
    }

    pub fn into_state(self) -> EpidemicState {
        self.state
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Advances one step. Returns `None` once the run has terminated, in
    /// which case nothing changes.
    pub fn step_once(&mut self) -> Option<StepRecord> {
        let DriverState::Running { step, active } = self.driver else {
            return None;
        };

        if self.config.reseed == Reseed::PerStep {
            self.rng = R::from_seed(step_seed(self.config.seed, step));
        }

        let started = Instant::now();
        let delta = self.engine.step(
            self.graph,
            &mut self.state,
            step,
            &self.config.probabilities,
            &mut self.rng,
        );
        let record = StepRecord {
            step,
            active: delta.apply(active),
            infected: delta.infected,
            recovered: delta.recovered,
            elapsed: started.elapsed(),
        };
        self.records.push(record);
        debug!(
            step,
            active = record.active,
            infected = record.infected,
            recovered = record.recovered,
            "step"
        );

        self.driver = if record.active == 0 {
            DriverState::Terminated(Outcome::Extinct)
        } else if self.config.max_steps.is_some_and(|max| step + 1 >= max) {
            DriverState::Terminated(Outcome::StepLimit)
        } else {
            DriverState::Running {
                step: step + 1,
                active: record.active,
            }
        };

        if let DriverState::Terminated(outcome) = self.driver {
            debug!(
                engine = self.engine.name(),
                ?outcome,
                steps = self.records.len(),
                final_size = self.state.ever_infected(),
                "run finished"
            );
        }
        Some(record)
    }

    /// Steps until the run terminates.
    pub fn run(&mut self) -> Report {
        self.run_with(|_, _| {})
    }

    /// Like [`Simulation::run`], calling `observer` after every step.
    pub fn run_with<F>(&mut self, mut observer: F) -> Report
    where
        F: FnMut(&StepRecord, &EpidemicState),
    {
        while let Some(record) = self.step_once() {
            observer(&record, &self.state);
        }
        self.report()
    }

    fn report(&self) -> Report {
        let outcome = match self.driver {
            DriverState::Terminated(outcome) => outcome,
            DriverState::Running { .. } => Outcome::StepLimit,
        };

        let (peak_step, peak_active) = self
            .records
            .iter()
            .fold((0, 1), |(at, peak), r| {
                if r.active > peak {
                    (r.step + 1, r.active)
                } else {
                    (at, peak)
                }
            });

        Report {
            records: self.records.clone(),
            outcome,
            steps: self.records.len() as Step,
            final_size: self.state.ever_infected(),
            peak_active,
            peak_step,
            elapsed: self.records.iter().map(|r| r.elapsed).sum(),
        }
    }
}
