//! Bit-vector container: a sparse set over the 32-bit index space.
//!
//! Bits live in 65,536-bit blocks behind a two-level directory; each
//! block is absent, FULL, dense, or GAP compressed. The aggregation
//! engine drives this container through its block manager.

mod blocks;

pub use blocks::{Block, BlockManager, BlockPool, SubArray};

use std::fmt;

use crate::core::kernels;
use crate::core::{BitBlock, GapBlock, BITS_PER_BLOCK, DIGEST_FULL, SUB_SIZE};
use crate::ID_MAX;

/// A dense block is re-encoded as GAP by `optimize()` when it has at
/// most this many runs.
pub const OPT_MAX_RUNS: usize = 256;

/// Split an index into `(i, j, block-local bit)`
#[inline]
fn coords(idx: u32) -> (usize, usize, usize) {
    let nblock = (idx >> 16) as usize;
    (nblock / SUB_SIZE, nblock % SUB_SIZE, (idx & 0xFFFF) as usize)
}

/// Sparse/dense set of 32-bit indices
#[derive(Clone)]
pub struct BitVector {
    bman: BlockManager,
    size: u64,
}

impl BitVector {
    /// Empty vector spanning the whole index space
    pub fn new() -> Self {
        Self {
            bman: BlockManager::new(),
            size: ID_MAX,
        }
    }

    /// Build from a list of set indices
    pub fn from_indices(indices: &[u32]) -> Self {
        let mut bv = Self::new();
        for &idx in indices {
            bv.set_bit(idx, true);
        }
        bv
    }

    /// Block manager capability (read)
    #[inline]
    pub fn blocks(&self) -> &BlockManager {
        &self.bman
    }

    /// Block manager capability (write)
    #[inline]
    pub fn blocks_mut(&mut self) -> &mut BlockManager {
        &mut self.bman
    }

    /// Logical size in bits
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Change the logical size. Shrinking clears every bit at or past
    /// the new boundary.
    pub fn resize(&mut self, new_size: u64) {
        debug_assert!(new_size <= ID_MAX);
        if new_size >= self.size {
            self.size = new_size;
            return;
        }
        self.size = new_size;
        if new_size == 0 {
            self.bman.clear();
            return;
        }
        let (li, lj, lbit) = coords((new_size - 1) as u32);
        let top_len = self.bman.top_block_size();
        for i in li..top_len {
            for j in 0..SUB_SIZE {
                if i == li && j < lj {
                    continue;
                }
                if i == li && j == lj {
                    if lbit < BITS_PER_BLOCK - 1 && self.bman.get_block(i, j).is_some() {
                        let blk = self.bman.get_or_alloc_bit_block(i, j);
                        blk.clear_range(lbit + 1, BITS_PER_BLOCK - 1);
                        if blk.is_all_zero() {
                            self.bman.zero_block(i, j);
                        }
                    }
                    continue;
                }
                self.bman.zero_block(i, j);
            }
        }
    }

    /// Set or clear one bit. Setting past the logical size extends it.
    pub fn set_bit(&mut self, idx: u32, value: bool) {
        let (i, j, bit) = coords(idx);
        if value {
            if (idx as u64) >= self.size {
                self.size = idx as u64 + 1;
            }
            if matches!(self.bman.get_block(i, j), Some(Block::Full)) {
                return;
            }
            self.bman.get_or_alloc_bit_block(i, j).set_bit(bit, true);
        } else {
            if self.bman.get_block(i, j).is_none() {
                return;
            }
            self.bman.get_or_alloc_bit_block(i, j).set_bit(bit, false);
        }
    }

    /// Test one bit
    pub fn get_bit(&self, idx: u32) -> bool {
        let (i, j, bit) = coords(idx);
        match self.bman.get_block(i, j) {
            None => false,
            Some(Block::Full) => true,
            Some(Block::Bit(b)) => b.get_bit(bit),
            Some(Block::Gap(g)) => g.test(bit),
        }
    }

    /// Drop every block; the logical size is kept
    pub fn clear(&mut self) {
        self.bman.clear();
    }

    /// Any bit set?
    pub fn any(&self) -> bool {
        for sub in self.bman.top().iter().filter_map(|t| t.as_deref()) {
            for slot in sub.iter().filter_map(|s| s.as_ref()) {
                match slot {
                    Block::Full => return true,
                    Block::Bit(b) => {
                        if !b.is_all_zero() {
                            return true;
                        }
                    }
                    Block::Gap(g) => {
                        if g.any() {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    /// Number of set bits
    pub fn count(&self) -> u64 {
        let mut total = 0u64;
        for sub in self.bman.top().iter().filter_map(|t| t.as_deref()) {
            for slot in sub.iter().filter_map(|s| s.as_ref()) {
                total += match slot {
                    Block::Full => BITS_PER_BLOCK as u64,
                    Block::Bit(b) => b.count() as u64,
                    Block::Gap(g) => g.count() as u64,
                };
            }
        }
        total
    }

    /// Lowest set index
    pub fn find_first(&self) -> Option<u32> {
        for (i, sub) in self.bman.top().iter().enumerate() {
            let Some(sub) = sub.as_deref() else { continue };
            for (j, slot) in sub.iter().enumerate() {
                let base = ((i * SUB_SIZE + j) as u32) << 16;
                let found = match slot {
                    None => None,
                    Some(Block::Full) => Some(0),
                    Some(Block::Bit(b)) => b.find_first(),
                    Some(Block::Gap(g)) => g.find_first(),
                };
                if let Some(pos) = found {
                    return Some(base + pos);
                }
            }
        }
        None
    }

    // === Pairwise operations (the horizontal oracle builds on these) ===

    /// `self |= other`
    pub fn bit_or(&mut self, other: &BitVector) {
        if other.size > self.size {
            self.size = other.size;
        }
        for (i, sub) in other.bman.top().iter().enumerate() {
            let Some(sub) = sub.as_deref() else { continue };
            for (j, slot) in sub.iter().enumerate() {
                let Some(arg) = slot.as_ref() else { continue };
                if matches!(self.bman.get_block(i, j), Some(Block::Full)) {
                    continue;
                }
                match arg {
                    Block::Full => self.bman.set_full(i, j),
                    Block::Bit(b) => {
                        let dst = self.bman.get_or_alloc_bit_block(i, j);
                        if kernels::bit_block_or(dst, b) {
                            self.bman.set_full(i, j);
                        }
                    }
                    Block::Gap(g) => {
                        let dst = self.bman.get_or_alloc_bit_block(i, j);
                        g.add_to_bitset(dst);
                        if dst.is_all_one() {
                            self.bman.set_full(i, j);
                        }
                    }
                }
            }
        }
    }

    /// `self &= other`
    pub fn bit_and(&mut self, other: &BitVector) {
        let top_len = self.bman.top_block_size();
        for i in 0..top_len {
            for j in 0..SUB_SIZE {
                if self.bman.get_block(i, j).is_none() {
                    continue;
                }
                match other.bman.get_block(i, j) {
                    None => self.bman.zero_block(i, j),
                    Some(Block::Full) => {}
                    Some(Block::Bit(b)) => {
                        let dst = self.bman.get_or_alloc_bit_block(i, j);
                        if kernels::bit_block_and(dst, b, DIGEST_FULL) == 0 {
                            self.bman.zero_block(i, j);
                        }
                    }
                    Some(Block::Gap(g)) => {
                        let dst = self.bman.get_or_alloc_bit_block(i, j);
                        g.and_to_bitset(dst);
                        if dst.is_all_zero() {
                            self.bman.zero_block(i, j);
                        }
                    }
                }
            }
        }
    }

    /// `self &= !other`
    pub fn bit_sub(&mut self, other: &BitVector) {
        let top_len = self.bman.top_block_size();
        for i in 0..top_len {
            for j in 0..SUB_SIZE {
                if self.bman.get_block(i, j).is_none() {
                    continue;
                }
                match other.bman.get_block(i, j) {
                    None => {}
                    Some(Block::Full) => self.bman.zero_block(i, j),
                    Some(Block::Bit(b)) => {
                        let dst = self.bman.get_or_alloc_bit_block(i, j);
                        if kernels::bit_block_sub(dst, b, DIGEST_FULL) == 0 {
                            self.bman.zero_block(i, j);
                        }
                    }
                    Some(Block::Gap(g)) => {
                        let dst = self.bman.get_or_alloc_bit_block(i, j);
                        g.sub_to_bitset_digest(dst, DIGEST_FULL);
                        if dst.is_all_zero() {
                            self.bman.zero_block(i, j);
                        }
                    }
                }
            }
        }
    }

    /// Re-encode blocks into their cheapest representation: all-zero →
    /// absent, all-ones → FULL, few runs → GAP.
    pub fn optimize(&mut self) {
        enum Plan {
            Keep,
            Drop,
            Full,
            Gap(GapBlock),
        }
        let top_len = self.bman.top_block_size();
        for i in 0..top_len {
            for j in 0..SUB_SIZE {
                let plan = match self.bman.get_block(i, j) {
                    Some(Block::Bit(b)) => {
                        if b.is_all_zero() {
                            Plan::Drop
                        } else if b.is_all_one() {
                            Plan::Full
                        } else {
                            let gap = GapBlock::from_bit_block(b);
                            if gap.run_count() <= OPT_MAX_RUNS {
                                Plan::Gap(gap)
                            } else {
                                Plan::Keep
                            }
                        }
                    }
                    _ => Plan::Keep,
                };
                match plan {
                    Plan::Keep => {}
                    Plan::Drop => self.bman.zero_block(i, j),
                    Plan::Full => self.bman.set_full(i, j),
                    Plan::Gap(gap) => self.bman.set_gap_block(i, j, gap),
                }
            }
        }
    }
}

impl Default for BitVector {
    fn default() -> Self {
        Self::new()
    }
}

fn block_is_zero(blk: &Block) -> bool {
    match blk {
        Block::Full => false,
        Block::Bit(b) => b.is_all_zero(),
        Block::Gap(g) => !g.any(),
    }
}

fn block_is_one(blk: &Block) -> bool {
    match blk {
        Block::Full => true,
        Block::Bit(b) => b.is_all_one(),
        Block::Gap(g) => g.is_all_one(),
    }
}

fn block_eq(a: Option<&Block>, b: Option<&Block>) -> bool {
    use Block::*;
    match (a, b) {
        (None, None) => true,
        (None, Some(blk)) | (Some(blk), None) => block_is_zero(blk),
        (Some(Full), Some(Full)) => true,
        (Some(Bit(x)), Some(Bit(y))) => x == y,
        (Some(Gap(x)), Some(Gap(y))) => x == y,
        (Some(Full), Some(blk)) | (Some(blk), Some(Full)) => block_is_one(blk),
        (Some(Bit(x)), Some(Gap(g))) | (Some(Gap(g)), Some(Bit(x))) => {
            let mut tmp = BitBlock::zero();
            g.add_to_bitset(&mut tmp);
            **x == tmp
        }
    }
}

/// Logical content comparison; representation (dense vs GAP vs FULL)
/// does not matter.
impl PartialEq for BitVector {
    fn eq(&self, other: &Self) -> bool {
        let tops = self
            .bman
            .top_block_size()
            .max(other.bman.top_block_size());
        for i in 0..tops {
            for j in 0..SUB_SIZE {
                if !block_eq(self.bman.get_block(i, j), other.bman.get_block(i, j)) {
                    return false;
                }
            }
        }
        true
    }
}

impl Eq for BitVector {}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector({} bits set)", self.count())
    }
}
