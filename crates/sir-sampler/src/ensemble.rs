use crate::{Outcome, SimConfig, Simulation};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sir_core::{run_seed, ContactGraph, SeededStream, SirError, Step, StepEngine};
use std::time::Instant;
use tracing::info;

/// Condensed result of one replicate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: u64,
    pub seed: u64,
    pub outcome: Outcome,
    pub steps: Step,
    pub final_size: usize,
    pub peak_active: usize,
}

/// Collection of replicate runs over one graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ensemble {
    pub runs: Vec<RunSummary>,
    pub config: SimConfig,
    pub node_count: usize,
}

/// Statistical summary of an ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnsembleStats {
    pub n_runs: usize,
    pub mean_final_size: f64,
    pub var_final_size: f64,
    pub mean_steps: f64,
    pub mean_peak: f64,
    /// Share of runs whose final size exceeds the outbreak threshold.
    pub major_outbreak_fraction: f64,
    /// Runs cut off by `max_steps`.
    pub step_limited: usize,
}

/// Runs replicates of one engine in parallel, one independent state and
/// stream per run.
pub struct Sampler<E> {
    pub engine: E,
}

impl<E> Sampler<E>
where
    E: StepEngine + Clone,
{
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Runs `n_runs` replicates. Replicate `run_id` is seeded with
    /// [`run_seed`]`(config.seed, run_id)`, so results do not depend on how
    /// runs are spread over threads.
    pub fn run_replicates<R: SeededStream>(
        &self,
        graph: &ContactGraph,
        config: &SimConfig,
        n_runs: u64,
    ) -> Result<Ensemble, SirError> {
        info!(
            engine = self.engine.name(),
            n_runs,
            threads = rayon::current_num_threads(),
            "starting ensemble"
        );
        let started = Instant::now();

        let runs = (0..n_runs)
            .into_par_iter()
            .map(|run_id| self.run_single::<R>(graph, config, run_id))
            .collect::<Result<Vec<_>, _>>()?;

        info!(n_runs, elapsed = ?started.elapsed(), "ensemble finished");
        Ok(Ensemble {
            runs,
            config: config.clone(),
            node_count: graph.node_count(),
        })
    }

    fn run_single<R: SeededStream>(
        &self,
        graph: &ContactGraph,
        config: &SimConfig,
        run_id: u64,
    ) -> Result<RunSummary, SirError> {
        let seed = run_seed(config.seed, run_id);
        let config = config.clone().with_seed(seed);
        let mut sim = Simulation::<_, R>::seeded(graph, self.engine.clone(), config)?;
        let report = sim.run();

        Ok(RunSummary {
            run_id,
            seed,
            outcome: report.outcome,
            steps: report.steps,
            final_size: report.final_size,
            peak_active: report.peak_active,
        })
    }
}

impl Ensemble {
    /// Shorthand for [`Sampler::run_replicates`].
    pub fn run<E, R>(
        graph: &ContactGraph,
        engine: E,
        config: &SimConfig,
        n_runs: u64,
    ) -> Result<Self, SirError>
    where
        E: StepEngine + Clone,
        R: SeededStream,
    {
        Sampler::new(engine).run_replicates::<R>(graph, config, n_runs)
    }

    pub fn n_runs(&self) -> usize {
        self.runs.len()
    }

    /// Summary statistics; a run counts as a major outbreak when more than
    /// `threshold * node_count` nodes were infected.
    pub fn final_statistics(&self, threshold: f64) -> EnsembleStats {
        let n = self.runs.len();
        if n == 0 {
            return EnsembleStats::empty();
        }
        let nf = n as f64;

        let mean = |f: &dyn Fn(&RunSummary) -> f64| self.runs.iter().map(f).sum::<f64>() / nf;
        let mean_final_size = mean(&|r: &RunSummary| r.final_size as f64);
        let var_final_size = self
            .runs
            .iter()
            .map(|r| (r.final_size as f64 - mean_final_size).powi(2))
            .sum::<f64>()
            / (n - 1).max(1) as f64;

        let cutoff = threshold * self.node_count as f64;
        let major = self
            .runs
            .iter()
            .filter(|r| r.final_size as f64 > cutoff)
            .count();

        EnsembleStats {
            n_runs: n,
            mean_final_size,
            var_final_size,
            mean_steps: mean(&|r: &RunSummary| f64::from(r.steps)),
            mean_peak: mean(&|r: &RunSummary| r.peak_active as f64),
            major_outbreak_fraction: major as f64 / nf,
            step_limited: self
                .runs
                .iter()
                .filter(|r| r.outcome == Outcome::StepLimit)
                .count(),
        }
    }
}

impl EnsembleStats {
    fn empty() -> Self {
        Self {
            n_runs: 0,
            mean_final_size: 0.0,
            var_final_size: 0.0,
            mean_steps: 0.0,
            mean_peak: 0.0,
            major_outbreak_fraction: 0.0,
            step_limited: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sir_core::{Probabilities, ScalarEngine, XorShift32};

    #[test]
    fn test_statistics_by_hand() {
        let run = |run_id, final_size, steps| RunSummary {
            run_id,
            seed: run_id,
            outcome: Outcome::Extinct,
            steps,
            final_size,
            peak_active: 2,
        };
        let ensemble = Ensemble {
            runs: vec![run(0, 1, 1), run(1, 5, 3), run(2, 9, 5)],
            config: SimConfig::new(Probabilities::breadth_first()),
            node_count: 10,
        };
        let stats = ensemble.final_statistics(0.5);
        assert_eq!(stats.n_runs, 3);
        assert_eq!(stats.mean_final_size, 5.0);
        assert_eq!(stats.var_final_size, 16.0);
        assert_eq!(stats.mean_steps, 3.0);
        assert_eq!(stats.mean_peak, 2.0);
        assert_eq!(stats.major_outbreak_fraction, 1.0 / 3.0);
        assert_eq!(stats.step_limited, 0);
    }

    #[test]
    fn test_empty_ensemble() {
        let graph = ContactGraph::from_undirected_edges(2, &[(0, 1)]).unwrap();
        let config = SimConfig::new(Probabilities::breadth_first());
        let ensemble = Ensemble::run::<_, XorShift32>(&graph, ScalarEngine, &config, 0).unwrap();
        assert_eq!(ensemble.n_runs(), 0);
        assert_eq!(ensemble.final_statistics(0.1).n_runs, 0);
    }
}
