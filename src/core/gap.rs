//! GAP block: run-length compressed representation of one 65,536-bit block.
//!
//! Runs alternate value starting from `first`; `ends` holds the inclusive
//! end position of each run in strictly increasing order, and the final
//! entry always closes the block at bit 65,535. Fusion kernels fold a GAP
//! block directly into a dense block without decompressing.

use crate::core::{digest_intersects, BitBlock, BITS_PER_BLOCK};

/// Highest block-local bit position
const GAP_MAX: u16 = (BITS_PER_BLOCK - 1) as u16;

/// Run-length encoded block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GapBlock {
    /// Value of the first run
    first: bool,
    /// Inclusive run ends; strictly increasing, last == `GAP_MAX`
    ends: Vec<u16>,
}

impl GapBlock {
    /// Encode a dense block.
    ///
    /// Transitions are found by XOR-ing each word against itself shifted
    /// by one, so uniform words cost one compare.
    pub fn from_bit_block(blk: &BitBlock) -> Self {
        let words = blk.words();
        let first = words[0] & 1 != 0;
        let mut ends = Vec::new();
        let mut prev = first as u32;
        for (wi, &w) in words.iter().enumerate() {
            let mut trans = w ^ ((w << 1) | prev);
            while trans != 0 {
                let b = trans.trailing_zeros();
                trans &= trans - 1;
                ends.push((wi as u32 * 32 + b - 1) as u16);
            }
            prev = w >> 31;
        }
        ends.push(GAP_MAX);
        Self { first, ends }
    }

    /// Build from sorted, disjoint, non-adjacent set ranges (inclusive).
    pub fn from_ranges(ranges: &[(u32, u32)]) -> Self {
        let first = ranges.first().is_some_and(|&(s, _)| s == 0);
        let mut ends = Vec::with_capacity(ranges.len() * 2 + 1);
        let mut pos = 0u32;
        for &(s, e) in ranges {
            debug_assert!(s <= e && (e as usize) < BITS_PER_BLOCK);
            debug_assert!(s == 0 || s > pos);
            if s > pos {
                ends.push((s - 1) as u16);
            }
            ends.push(e as u16);
            pos = e + 1;
        }
        if ends.last() != Some(&GAP_MAX) {
            ends.push(GAP_MAX);
        }
        Self { first, ends }
    }

    /// Test one block-local bit
    #[inline]
    pub fn test(&self, pos: usize) -> bool {
        debug_assert!(pos < BITS_PER_BLOCK);
        let r = self.ends.partition_point(|&e| (e as usize) < pos);
        self.first ^ (r & 1 == 1)
    }

    /// Iterate `(start, end, value)` runs
    pub fn runs(&self) -> impl Iterator<Item = (usize, usize, bool)> + '_ {
        let mut start = 0usize;
        self.ends.iter().enumerate().map(move |(r, &e)| {
            let s = start;
            start = e as usize + 1;
            (s, e as usize, self.first ^ (r & 1 == 1))
        })
    }

    /// Number of runs
    #[inline]
    pub fn run_count(&self) -> usize {
        self.ends.len()
    }

    /// Any bit set?
    #[inline]
    pub fn any(&self) -> bool {
        self.first || self.ends.len() > 1
    }

    /// Every bit set?
    #[inline]
    pub fn is_all_one(&self) -> bool {
        self.first && self.ends.len() == 1
    }

    /// Count set bits
    pub fn count(&self) -> u32 {
        self.runs()
            .filter(|&(_, _, v)| v)
            .map(|(s, e, _)| (e - s + 1) as u32)
            .sum()
    }

    /// Block-local position of the lowest set bit
    pub fn find_first(&self) -> Option<u32> {
        self.runs().find(|&(_, _, v)| v).map(|(s, _, _)| s as u32)
    }

    // === GAP ↔ bit fusion kernels ===

    /// OR this GAP block into a dense block
    pub fn add_to_bitset(&self, blk: &mut BitBlock) {
        for (s, e, v) in self.runs() {
            if v {
                blk.set_range(s, e);
            }
        }
    }

    /// AND this GAP block into a dense block (clears the zero runs)
    pub fn and_to_bitset(&self, blk: &mut BitBlock) {
        for (s, e, v) in self.runs() {
            if !v {
                blk.clear_range(s, e);
            }
        }
    }

    /// AND into a dense block, skipping runs that fall entirely into
    /// drained digest slices
    pub fn and_to_bitset_digest(&self, blk: &mut BitBlock, digest: u64) {
        for (s, e, v) in self.runs() {
            if !v && digest_intersects(digest, s, e) {
                blk.clear_range(s, e);
            }
        }
    }

    /// SUB (AND-NOT) into a dense block, digest-aware
    pub fn sub_to_bitset_digest(&self, blk: &mut BitBlock, digest: u64) {
        for (s, e, v) in self.runs() {
            if v && digest_intersects(digest, s, e) {
                blk.clear_range(s, e);
            }
        }
    }
}
