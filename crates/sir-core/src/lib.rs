//! Discrete-time stochastic SIR propagation over a static contact network.
//!
//! The graph is stored in compressed (CSR) form, per-node state lives in
//! [`EpidemicState`], and one simulation step is performed by a
//! [`StepEngine`]. Two engines implement the same update rule:
//! [`ScalarEngine`] walks neighbors one at a time, [`VectorEngine`] walks
//! them in batches of [`LANES`] using gathered state and lane masks.

pub mod aligned;
pub mod batch;
pub mod engines;
pub mod error;
pub mod graph;
pub mod params;
pub mod rng;
pub mod state;

/// Index of a simulation step. Step 0 is the step in which node 0 is infectious.
pub type Step = u32;

pub use aligned::AlignedBuf;
pub use error::SirError;
pub use graph::{ContactGraph, GraphSummary};
pub use params::Probabilities;
pub use state::{EpidemicState, Level};

// Randomness
pub use rng::{
    run_seed, step_seed, ChaChaStream, CountingStream, ReplayStream, Reseed, SeededStream,
    UniformSource, XorShift32,
};

// Batch abstraction and engines
pub use batch::{BatchKernel, IndexBatch, LaneKernel, LaneMask, WideKernel, LANES};
pub use engines::{ScalarEngine, StepDelta, StepEngine, VectorEngine};
