use bytemuck::{Pod, Zeroable};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Alignment of every per-node and per-edge buffer, in bytes.
pub const ALIGN: usize = 32;

/// Number of `i32` values in one aligned block.
pub const BLOCK_LANES: usize = ALIGN / std::mem::size_of::<i32>();

#[repr(C, align(32))]
#[derive(Clone, Copy)]
struct Block([i32; BLOCK_LANES]);

// Block is a plain array of i32 with no padding (size == align == 32).
unsafe impl Zeroable for Block {}
unsafe impl Pod for Block {}

/// Fixed-length `i32` buffer whose first element sits on a 32-byte boundary.
///
/// Storage is a vector of 32-byte blocks viewed as a flat slice, so the
/// visible length is exact while the allocation is rounded up to a whole
/// block. The buffer is allocated once and never grows. Padding lanes past
/// the visible length take no part in equality.
#[derive(Clone)]
pub struct AlignedBuf {
    blocks: Vec<Block>,
    len: usize,
}

impl AlignedBuf {
    /// Buffer of `len` copies of `value`.
    pub fn filled(len: usize, value: i32) -> Self {
        let n_blocks = (len + BLOCK_LANES - 1) / BLOCK_LANES;
        Self {
            blocks: vec![Block([value; BLOCK_LANES]); n_blocks],
            len,
        }
    }

    pub fn from_slice(values: &[i32]) -> Self {
        let mut buf = Self::filled(values.len(), 0);
        buf.as_mut_slice().copy_from_slice(values);
        buf
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[i32] {
        let flat: &[i32] = bytemuck::cast_slice(&self.blocks);
        &flat[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [i32] {
        let len = self.len;
        let flat: &mut [i32] = bytemuck::cast_slice_mut(&mut self.blocks);
        &mut flat[..len]
    }

    /// Resets every element to `value` without reallocating.
    pub fn fill(&mut self, value: i32) {
        self.as_mut_slice().fill(value);
    }
}

impl Deref for AlignedBuf {
    type Target = [i32];

    fn deref(&self) -> &[i32] {
        self.as_slice()
    }
}

impl DerefMut for AlignedBuf {
    fn deref_mut(&mut self) -> &mut [i32] {
        self.as_mut_slice()
    }
}

impl PartialEq for AlignedBuf {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for AlignedBuf {}

impl fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl From<&[i32]> for AlignedBuf {
    fn from(values: &[i32]) -> Self {
        Self::from_slice(values)
    }
}
