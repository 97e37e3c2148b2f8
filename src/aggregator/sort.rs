//! Block-list sorter: for one `(i, j)` coordinate, partition the N input
//! blocks into the arena's bit-block and GAP lists, detecting the blocks
//! that short-circuit the whole sub-block.

use crate::core::full_block;
use crate::vector::{BitVector, Block};

use super::Aggregator;

/// Sorter outcome. Short-circuits are an explicit return value, not a
/// side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Sorted {
    /// Lists are filled; combine normally
    Args,
    /// OR sort: some input saturates this coordinate; result is all ones
    Full,
    /// AND sort: some input is zero here; result is zero
    Absent,
}

impl<'a> Aggregator<'a> {
    /// OR-sort: absent inputs are skipped, a FULL input short-circuits.
    /// Stable in input order; bit-blocks and GAP blocks keep separate
    /// lists.
    pub(super) fn sort_input_blocks_or(
        &mut self,
        srcs: &[&'a BitVector],
        i: usize,
        j: usize,
    ) -> Sorted {
        self.bit_args.clear();
        self.gap_args.clear();
        for &bv in srcs {
            match bv.blocks().get_block(i, j) {
                None => {}
                Some(Block::Full) => {
                    self.bit_args.clear();
                    self.gap_args.clear();
                    return Sorted::Full;
                }
                Some(Block::Bit(b)) => self.bit_args.push(b),
                Some(Block::Gap(g)) => self.gap_args.push(g),
            }
        }
        Sorted::Args
    }

    /// AND-sort: an absent input short-circuits, FULL inputs enter the
    /// bit list at the real-full address so the kernels skip them
    /// uniformly.
    pub(super) fn sort_input_blocks_and(
        &mut self,
        srcs: &[&'a BitVector],
        i: usize,
        j: usize,
    ) -> Sorted {
        self.bit_args.clear();
        self.gap_args.clear();
        for &bv in srcs {
            match bv.blocks().get_block(i, j) {
                None => {
                    self.bit_args.clear();
                    self.gap_args.clear();
                    return Sorted::Absent;
                }
                Some(Block::Full) => self.bit_args.push(full_block()),
                Some(Block::Bit(b)) => self.bit_args.push(b),
                Some(Block::Gap(g)) => self.gap_args.push(g),
            }
        }
        Sorted::Args
    }
}
