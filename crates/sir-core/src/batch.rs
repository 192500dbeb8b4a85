//! Fixed-width batches of neighbor indices and lane masks.
//!
//! The batched engine works on [`LANES`] neighbors at a time:
//!
//! 1. [`IndexBatch::load`] reads up to eight neighbor indices, switching off
//!    the lanes past the end of the slice.
//! 2. [`IndexBatch::gather`] fetches per-node state through the indices.
//! 3. A [`BatchKernel`] turns gathered state and random draws into
//!    [`LaneMask`]s.
//!
//! Lane masks are explicit booleans. A lane whose neighbor index is 0 is as
//! valid as any other lane, so "index != 0" is never used as a selection test.

use crate::rng::UniformSource;
use crate::state::{IMMUNE, NOT_IMMUNE, SUSCEPTIBLE};
use std::ops::{BitAnd, BitOr, Not};
use wide::{f32x8, i32x8, CmpEq, CmpLt};

/// Batch width.
pub const LANES: usize = 8;

/// One bit per lane, lane 0 in the least significant bit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LaneMask(u8);

impl LaneMask {
    pub const NONE: LaneMask = LaneMask(0);
    pub const ALL: LaneMask = LaneMask(u8::MAX);

    /// The first `n` lanes (all of them when `n >= LANES`).
    #[inline]
    pub fn first(n: usize) -> Self {
        if n >= LANES {
            Self::ALL
        } else {
            LaneMask(((1u16 << n) - 1) as u8)
        }
    }

    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        LaneMask(bits)
    }

    #[inline]
    pub fn from_lanes(lanes: [bool; LANES]) -> Self {
        LaneMask(
            lanes
                .iter()
                .enumerate()
                .fold(0u8, |bits, (lane, &on)| bits | (u8::from(on) << lane)),
        )
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_set(self, lane: usize) -> bool {
        self.0 & (1 << lane) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Set lanes in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..LANES).filter(move |&lane| self.is_set(lane))
    }
}

impl BitAnd for LaneMask {
    type Output = LaneMask;

    fn bitand(self, rhs: LaneMask) -> LaneMask {
        LaneMask(self.0 & rhs.0)
    }
}

impl BitOr for LaneMask {
    type Output = LaneMask;

    fn bitor(self, rhs: LaneMask) -> LaneMask {
        LaneMask(self.0 | rhs.0)
    }
}

impl Not for LaneMask {
    type Output = LaneMask;

    fn not(self) -> LaneMask {
        LaneMask(!self.0)
    }
}

/// Up to [`LANES`] neighbor indices plus the mask of lanes that hold one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexBatch {
    lanes: [i32; LANES],
    mask: LaneMask,
}

impl IndexBatch {
    /// Masked load of `min(count, LANES)` entries of `src` starting at
    /// `start`. Lanes past the end read as index 0 and are masked off.
    #[inline]
    pub fn load(src: &[i32], start: usize, count: usize) -> Self {
        let n = count.min(LANES);
        let mut lanes = [0; LANES];
        lanes[..n].copy_from_slice(&src[start..start + n]);
        Self {
            lanes,
            mask: LaneMask::first(n),
        }
    }

    #[inline]
    pub fn mask(&self) -> LaneMask {
        self.mask
    }

    #[inline]
    pub fn lanes(&self) -> &[i32; LANES] {
        &self.lanes
    }

    /// Node index held by `lane`.
    #[inline]
    pub fn index(&self, lane: usize) -> usize {
        self.lanes[lane] as usize
    }

    /// Active lanes holding the same index as an earlier active lane.
    #[inline]
    pub fn repeated(&self) -> LaneMask {
        let mut bits = 0u8;
        for lane in self.mask.iter() {
            let index = self.lanes[lane];
            if (0..lane).any(|earlier| self.mask.is_set(earlier) && self.lanes[earlier] == index) {
                bits |= 1 << lane;
            }
        }
        LaneMask::from_bits(bits)
    }

    /// `table[index]` for every active lane, `fill` for masked-off lanes.
    #[inline]
    pub fn gather(&self, table: &[i32], fill: i32) -> [i32; LANES] {
        std::array::from_fn(|lane| {
            if self.mask.is_set(lane) {
                table[self.lanes[lane] as usize]
            } else {
                fill
            }
        })
    }
}

/// Gathered level and immunity lanes of one batch.
///
/// Masked-off lanes hold an infected, immune placeholder so no kernel can
/// ever select them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatheredState {
    pub levels: [i32; LANES],
    pub immune: [i32; LANES],
}

impl GatheredState {
    #[inline]
    pub fn gather(batch: &IndexBatch, levels: &[i32], immune: &[i32]) -> Self {
        Self {
            levels: batch.gather(levels, 0),
            immune: batch.gather(immune, IMMUNE),
        }
    }
}

/// Lane-wise decisions of the batched engine.
pub trait BatchKernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lanes whose node is susceptible and not immune.
    fn eligible(&self, state: &GatheredState) -> LaneMask;

    /// Lanes whose draw is strictly below `threshold`.
    fn below(&self, draws: &[f32; LANES], threshold: f32) -> LaneMask;
}

/// SIMD kernel on `i32x8` / `f32x8` compares.
#[derive(Clone, Copy, Debug, Default)]
pub struct WideKernel;

impl BatchKernel for WideKernel {
    fn name(&self) -> &'static str {
        "wide"
    }

    #[inline]
    fn eligible(&self, state: &GatheredState) -> LaneMask {
        let levels = i32x8::new(state.levels);
        let immune = i32x8::new(state.immune);
        let susceptible = levels.cmp_eq(i32x8::splat(SUSCEPTIBLE));
        let not_immune = immune.cmp_eq(i32x8::splat(NOT_IMMUNE));
        let hits = (susceptible & not_immune).to_array();
        LaneMask::from_lanes(std::array::from_fn(|lane| hits[lane] != 0))
    }

    #[inline]
    fn below(&self, draws: &[f32; LANES], threshold: f32) -> LaneMask {
        let hits = f32x8::new(*draws).cmp_lt(f32x8::splat(threshold));
        LaneMask::from_bits(hits.move_mask() as u8)
    }
}

/// Plain per-lane kernel, for targets without a vector unit.
#[derive(Clone, Copy, Debug, Default)]
pub struct LaneKernel;

impl BatchKernel for LaneKernel {
    fn name(&self) -> &'static str {
        "lanes"
    }

    #[inline]
    fn eligible(&self, state: &GatheredState) -> LaneMask {
        LaneMask::from_lanes(std::array::from_fn(|lane| {
            state.levels[lane] == SUSCEPTIBLE && state.immune[lane] == NOT_IMMUNE
        }))
    }

    #[inline]
    fn below(&self, draws: &[f32; LANES], threshold: f32) -> LaneMask {
        LaneMask::from_lanes(std::array::from_fn(|lane| draws[lane] < threshold))
    }
}

/// One draw per set lane of `mask`, taken in lane order. Unset lanes hold
/// `1.0`, which is never below a probability threshold.
#[inline]
pub fn draw_lanes<R: UniformSource + ?Sized>(rng: &mut R, mask: LaneMask) -> [f32; LANES] {
    let mut draws = [1.0; LANES];
    for lane in mask.iter() {
        draws[lane] = rng.next_uniform();
    }
    draws
}
