use crate::Step;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// Source of uniform draws in `[0, 1)`.
pub trait UniformSource {
    fn next_uniform(&mut self) -> f32;
}

/// A stream that can be rebuilt from an explicit seed.
pub trait SeededStream: UniformSource + Sized {
    fn from_seed(seed: u64) -> Self;
}

impl<R: UniformSource + ?Sized> UniformSource for &mut R {
    #[inline]
    fn next_uniform(&mut self) -> f32 {
        (**self).next_uniform()
    }
}

/// When the driver rebuilds its stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reseed {
    /// Fresh stream at every step, seeded with [`step_seed`].
    #[default]
    PerStep,
    /// One stream for the whole run.
    PerRun,
}

impl fmt::Display for Reseed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reseed::PerStep => "per-step",
            Reseed::PerRun => "per-run",
        })
    }
}

/// Seed of the stream used during `step` of a run seeded with `seed`.
pub fn step_seed(seed: u64, step: Step) -> u64 {
    // splitmix64 finaliser over the combined value
    let mut z = seed ^ (u64::from(step) + 1).wrapping_mul(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seed of replicate `run_id` in an ensemble seeded with `global_seed`.
pub fn run_seed(global_seed: u64, run_id: u64) -> u64 {
    global_seed.wrapping_add(run_id.wrapping_mul(GOLDEN_GAMMA))
}

/// 32-bit xorshift (13, 17, 5) with 24-bit uniform output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    // Zero is a fixed point of xorshift.
    const ZERO_SEED_REPLACEMENT: u32 = 0x9e37_79b9;

    pub fn new(seed: u32) -> Self {
        let state = if seed == 0 {
            Self::ZERO_SEED_REPLACEMENT
        } else {
            seed
        };
        Self { state }
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

impl UniformSource for XorShift32 {
    #[inline]
    fn next_uniform(&mut self) -> f32 {
        (self.next_u32() & 0x00ff_ffff) as f32 / 16_777_216.0
    }
}

impl SeededStream for XorShift32 {
    fn from_seed(seed: u64) -> Self {
        Self::new((seed ^ (seed >> 32)) as u32)
    }
}

/// ChaCha20-backed stream for production runs.
#[derive(Clone, Debug)]
pub struct ChaChaStream {
    rng: ChaCha20Rng,
}

impl UniformSource for ChaChaStream {
    #[inline]
    fn next_uniform(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }
}

impl SeededStream for ChaChaStream {
    fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

/// Replays a fixed sequence of draws, wrapping around at the end.
#[derive(Clone, Debug)]
pub struct ReplayStream {
    values: Vec<f32>,
    cursor: usize,
}

impl ReplayStream {
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn new(values: Vec<f32>) -> Self {
        assert!(!values.is_empty(), "replay stream needs at least one value");
        Self { values, cursor: 0 }
    }

    /// A stream that returns `value` forever.
    pub fn constant(value: f32) -> Self {
        Self::new(vec![value])
    }

    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl UniformSource for ReplayStream {
    fn next_uniform(&mut self) -> f32 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

/// Wraps a stream and counts how many draws were taken from it.
#[derive(Clone, Debug)]
pub struct CountingStream<R> {
    inner: R,
    draws: u64,
}

impl<R: UniformSource> CountingStream<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, draws: 0 }
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: UniformSource> UniformSource for CountingStream<R> {
    #[inline]
    fn next_uniform(&mut self) -> f32 {
        self.draws += 1;
        self.inner.next_uniform()
    }
}

impl<R: SeededStream> SeededStream for CountingStream<R> {
    fn from_seed(seed: u64) -> Self {
        Self::new(R::from_seed(seed))
    }
}
