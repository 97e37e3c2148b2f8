//! Two-level block directory: 1024 top entries × 64 block slots.
//!
//! Each slot is one of four states the rest of the crate dispatches on:
//! absent (`None`, all zeros), FULL marker (all ones, no buffer), a dense
//! bit-block, or a GAP run-length block. The manager also owns a free
//! list of dense blocks so combine loops that churn blocks avoid the
//! allocator.

use crate::core::{BitBlock, GapBlock, SUB_SIZE, TOP_SIZE};
use crate::{Error, Result};

/// One materialized block
#[derive(Clone, Debug)]
pub enum Block {
    /// All ones; no buffer is allocated
    Full,
    /// Dense bits
    Bit(Box<BitBlock>),
    /// Run-length compressed
    Gap(GapBlock),
}

/// One top-level directory entry: 64 block slots
pub type SubArray = [Option<Block>; SUB_SIZE];

#[inline]
fn new_sub_array() -> Box<SubArray> {
    Box::new(std::array::from_fn(|_| None))
}

/// Free list of dense blocks. Returned buffers are dirty; callers fill
/// or overwrite before use.
#[derive(Debug, Default)]
pub struct BlockPool {
    free: Vec<Box<BitBlock>>,
}

impl BlockPool {
    pub fn take(&mut self) -> Box<BitBlock> {
        self.free.pop().unwrap_or_else(|| Box::new(BitBlock::zero()))
    }

    pub fn put(&mut self, blk: Box<BitBlock>) {
        self.free.push(blk);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.free.len()
    }
}

/// Block directory of one bit-vector
#[derive(Debug, Default)]
pub struct BlockManager {
    top: Vec<Option<Box<SubArray>>>,
    pool: BlockPool,
}

impl Clone for BlockManager {
    fn clone(&self) -> Self {
        // the free list is a transient cache, not content
        Self {
            top: self.top.clone(),
            pool: BlockPool::default(),
        }
    }
}

impl BlockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current directory depth (allocated top entries)
    #[inline]
    pub fn top_block_size(&self) -> usize {
        self.top.len()
    }

    /// Read access to the top directory
    #[inline]
    pub fn top(&self) -> &[Option<Box<SubArray>>] {
        &self.top
    }

    /// Has the directory any entries at all?
    #[inline]
    pub fn is_init(&self) -> bool {
        !self.top.is_empty()
    }

    /// Drop every block; directory becomes empty
    pub fn clear(&mut self) {
        self.top.clear();
    }

    /// Grow the directory to at least `n` top entries; returns the new
    /// depth. Fails with `AllocFailure` if the reservation fails.
    pub fn reserve_top_blocks(&mut self, n: usize) -> Result<usize> {
        debug_assert!(n <= TOP_SIZE);
        if n > self.top.len() {
            let grow = n - self.top.len();
            self.top
                .try_reserve(grow)
                .map_err(|_| Error::AllocFailure("top block directory"))?;
            self.top.resize_with(n, || None);
        }
        Ok(self.top.len())
    }

    /// Block at `(i, j)`, if any
    #[inline]
    pub fn get_block(&self, i: usize, j: usize) -> Option<&Block> {
        self.top.get(i)?.as_ref()?[j].as_ref()
    }

    fn slot_mut(&mut self, i: usize, j: usize) -> &mut Option<Block> {
        debug_assert!(i < TOP_SIZE && j < SUB_SIZE);
        if i >= self.top.len() {
            self.top.resize_with(i + 1, || None);
        }
        &mut self.top[i].get_or_insert_with(new_sub_array)[j]
    }

    /// Paste the FULL marker at `(i, j)`
    pub fn set_full(&mut self, i: usize, j: usize) {
        if let Some(Block::Bit(b)) = self.slot_mut(i, j).take() {
            self.pool.put(b);
        }
        *self.slot_mut(i, j) = Some(Block::Full);
    }

    /// Allocate-or-fetch a dense block at `(i, j)`, deoptimizing FULL or
    /// GAP slots in place. Absent slots become zero blocks.
    pub fn get_or_alloc_bit_block(&mut self, i: usize, j: usize) -> &mut BitBlock {
        // split borrow: the pool and the slot live in different fields
        let top = &mut self.top;
        let pool = &mut self.pool;
        if i >= top.len() {
            top.resize_with(i + 1, || None);
        }
        let slot = &mut top[i].get_or_insert_with(new_sub_array)[j];
        match slot {
            Some(Block::Bit(_)) => {}
            Some(Block::Full) => {
                let mut b = pool.take();
                b.fill(u32::MAX);
                *slot = Some(Block::Bit(b));
            }
            Some(Block::Gap(g)) => {
                let mut b = pool.take();
                b.fill(0);
                g.add_to_bitset(&mut b);
                *slot = Some(Block::Bit(b));
            }
            None => {
                let mut b = pool.take();
                b.fill(0);
                *slot = Some(Block::Bit(b));
            }
        }
        let Some(Block::Bit(b)) = slot else {
            unreachable!()
        };
        b
    }

    /// Copy a scratch block into `(i, j)`, reusing the slot's buffer or
    /// one from the pool
    pub fn copy_bit_block(&mut self, i: usize, j: usize, src: &BitBlock) {
        let top = &mut self.top;
        let pool = &mut self.pool;
        if i >= top.len() {
            top.resize_with(i + 1, || None);
        }
        let slot = &mut top[i].get_or_insert_with(new_sub_array)[j];
        if let Some(Block::Bit(b)) = slot {
            b.copy_from(src);
        } else {
            let mut b = pool.take();
            b.copy_from(src);
            *slot = Some(Block::Bit(b));
        }
    }

    /// Store a GAP block at `(i, j)`
    pub fn set_gap_block(&mut self, i: usize, j: usize, gap: GapBlock) {
        if let Some(Block::Bit(b)) = self.slot_mut(i, j).take() {
            self.pool.put(b);
        }
        *self.slot_mut(i, j) = Some(Block::Gap(gap));
    }

    /// Drop `(i, j)` back to absent; dense buffers go to the pool
    pub fn zero_block(&mut self, i: usize, j: usize) {
        let Some(sub) = self.top.get_mut(i).and_then(|t| t.as_mut()) else {
            return;
        };
        if let Some(Block::Bit(b)) = sub[j].take() {
            self.pool.put(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_grows_only() {
        let mut bman = BlockManager::new();
        assert_eq!(bman.top_block_size(), 0);
        assert!(!bman.is_init());
        assert_eq!(bman.reserve_top_blocks(10).unwrap(), 10);
        assert_eq!(bman.reserve_top_blocks(4).unwrap(), 10);
        assert!(bman.is_init());
        assert!(bman.get_block(3, 0).is_none());
    }

    #[test]
    fn test_alloc_deoptimizes_full() {
        let mut bman = BlockManager::new();
        bman.set_full(2, 5);
        assert!(matches!(bman.get_block(2, 5), Some(Block::Full)));
        let blk = bman.get_or_alloc_bit_block(2, 5);
        assert!(blk.is_all_one());
        blk.set_bit(9, false);
        assert!(matches!(bman.get_block(2, 5), Some(Block::Bit(_))));
    }

    #[test]
    fn test_alloc_deoptimizes_gap() {
        let mut bman = BlockManager::new();
        bman.set_gap_block(0, 0, GapBlock::from_ranges(&[(3, 7)]));
        let blk = bman.get_or_alloc_bit_block(0, 0);
        assert_eq!(blk.count(), 5);
        assert!(blk.get_bit(3) && blk.get_bit(7));
    }

    #[test]
    fn test_zero_block_recycles_into_pool() {
        let mut bman = BlockManager::new();
        let blk = bman.get_or_alloc_bit_block(1, 1);
        blk.set_bit(0, true);
        bman.zero_block(1, 1);
        assert!(bman.get_block(1, 1).is_none());
        assert_eq!(bman.pool.len(), 1);
        // reused buffer comes back zeroed through the alloc path
        let blk = bman.get_or_alloc_bit_block(1, 2);
        assert!(blk.is_all_zero());
        assert_eq!(bman.pool.len(), 0);
    }

    #[test]
    fn test_copy_bit_block_overwrites() {
        let mut bman = BlockManager::new();
        let mut src = BitBlock::zero();
        src.set_bit(100, true);
        bman.copy_bit_block(0, 3, &src);
        src.set_bit(200, true);
        bman.copy_bit_block(0, 3, &src);
        let Some(Block::Bit(b)) = bman.get_block(0, 3) else {
            panic!("expected dense block");
        };
        assert_eq!(b.count(), 2);
    }
}
