//! Fused N-way aggregation engine: OR / AND / AND-MINUS / SHIFT-right-AND
//! over groups of bit-vectors.
//!
//! The engine is pointwise but works block-by-block across all N inputs
//! at once: for every sub-block coordinate `(i, j)` the sorter partitions
//! the input blocks by representation, the combiner folds them into one
//! scratch block, and the driver emits the result into the target. FULL
//! and absent inputs short-circuit whole sub-blocks; the AND/SUB folds
//! carry a 64-bit digest so drained slices are never re-read.
//!
//! Two call styles: stateful (attach inputs to argument group 0 or 1 with
//! [`Aggregator::add`], then invoke) and functional (`*_from` methods
//! taking input slices directly).

mod combine;
mod horizontal;
mod sort;

use crate::core::{BitBlock, GapBlock, SUB_SIZE, TOP_SIZE};
use crate::vector::BitVector;
use crate::{Error, Result, MAX_CAP};

/// Aggregation engine. One instance is strictly single-threaded; the
/// scratch arena is allocated at construction and reused across calls.
///
/// Inputs are borrowed for the lifetime `'a` and never mutated. The
/// target of a combine is exclusively borrowed per call.
pub struct Aggregator<'a> {
    /// Argument group 0: AND / OR operands (also the AND side of AND-MINUS)
    group0: Vec<&'a BitVector>,
    /// Argument group 1: SUBtract operands (AND-MINUS only)
    group1: Vec<&'a BitVector>,

    // --- scratch arena, reused across calls ---
    /// Scratch block the combiners fold into
    tb1: Box<BitBlock>,
    /// Per-input carry bits for shift-right-and
    carry_overs: Vec<bool>,
    /// Sorted bit-block inputs for the current `(i, j)`
    bit_args: Vec<&'a BitBlock>,
    /// Sorted GAP inputs for the current `(i, j)`
    gap_args: Vec<&'a GapBlock>,
}

impl<'a> Aggregator<'a> {
    pub fn new() -> Self {
        Self {
            group0: Vec::with_capacity(MAX_CAP),
            group1: Vec::with_capacity(MAX_CAP),
            tb1: Box::new(BitBlock::zero()),
            carry_overs: vec![false; MAX_CAP],
            bit_args: Vec::with_capacity(MAX_CAP),
            gap_args: Vec::with_capacity(MAX_CAP),
        }
    }

    /// Attach an input to argument group 0 or 1. Returns the group's new
    /// size. Fails with `OutOfRange` if `group > 1` or the group is full.
    pub fn add(&mut self, bv: &'a BitVector, group: usize) -> Result<usize> {
        let grp = match group {
            0 => &mut self.group0,
            1 => &mut self.group1,
            _ => return Err(Error::OutOfRange("argument group index")),
        };
        if grp.len() >= MAX_CAP {
            return Err(Error::OutOfRange("argument group is full"));
        }
        grp.push(bv);
        Ok(grp.len())
    }

    /// Forget all attached inputs. The arena is kept.
    pub fn reset(&mut self) {
        self.group0.clear();
        self.group1.clear();
    }

    // === Stateful surface ===

    /// OR over group 0 into `target`
    pub fn combine_or(&mut self, target: &mut BitVector) -> Result<()> {
        let srcs = self.group0.clone();
        self.combine_or_from(target, &srcs)
    }

    /// AND over group 0 into `target`
    pub fn combine_and(&mut self, target: &mut BitVector) -> Result<()> {
        let srcs = self.group0.clone();
        self.combine_and_from(target, &srcs)
    }

    /// AND over group 0 MINUS OR over group 1, into `target`. Returns
    /// whether any bit is set in the result.
    ///
    /// With `any = true` the call returns as soon as one non-empty
    /// sub-block is produced; `target` is then existence-only.
    pub fn combine_and_sub(&mut self, target: &mut BitVector, any: bool) -> Result<bool> {
        let and_srcs = self.group0.clone();
        let sub_srcs = self.group1.clone();
        self.combine_and_sub_from(target, &and_srcs, &sub_srcs, any)
    }

    /// Lowest index of the AND-MINUS result, without materializing it
    pub fn find_first_and_sub(&mut self) -> Result<Option<u32>> {
        let and_srcs = self.group0.clone();
        let sub_srcs = self.group1.clone();
        self.find_first_and_sub_from(&and_srcs, &sub_srcs)
    }

    /// Group 0 as a shift chain: `((g0[0] << 1) & g0[1]) << 1 & g0[2] …`,
    /// the shift happening before each AND
    pub fn combine_shift_right_and(&mut self, target: &mut BitVector) -> Result<()> {
        let srcs = self.group0.clone();
        self.combine_shift_right_and_from(target, &srcs, false)
            .map(|_| ())
    }

    // === Functional surface ===

    /// OR the given inputs into `target`
    pub fn combine_or_from(
        &mut self,
        target: &mut BitVector,
        srcs: &[&'a BitVector],
    ) -> Result<()> {
        if srcs.len() >= MAX_CAP {
            return Err(Error::OutOfRange("input count"));
        }
        if srcs.is_empty() {
            target.clear();
            return Ok(());
        }
        let top_blocks = resize_target(target, srcs, true)?;
        for i in 0..top_blocks {
            let j_max = find_effective_sub_block_size(i, srcs);
            for j in 0..j_max {
                self.combine_or_block(i, j, target, srcs);
            }
        }
        Ok(())
    }

    /// AND the given inputs into `target`
    pub fn combine_and_from(
        &mut self,
        target: &mut BitVector,
        srcs: &[&'a BitVector],
    ) -> Result<()> {
        if srcs.len() >= MAX_CAP {
            return Err(Error::OutOfRange("input count"));
        }
        if srcs.is_empty() {
            target.clear();
            return Ok(());
        }
        let top_blocks = resize_target(target, srcs, true)?;
        for i in 0..top_blocks {
            let j_max = find_effective_sub_block_size(i, srcs);
            for j in 0..j_max {
                self.combine_and_block(i, j, target, srcs);
            }
        }
        Ok(())
    }

    /// Fused AND-MINUS: AND of `and_srcs` minus OR of `sub_srcs`
    pub fn combine_and_sub_from(
        &mut self,
        target: &mut BitVector,
        and_srcs: &[&'a BitVector],
        sub_srcs: &[&'a BitVector],
        any: bool,
    ) -> Result<bool> {
        if and_srcs.len() >= MAX_CAP || sub_srcs.len() >= MAX_CAP {
            return Err(Error::OutOfRange("input count"));
        }
        if and_srcs.is_empty() {
            target.clear();
            return Ok(false);
        }
        let mut top_blocks = resize_target(target, and_srcs, true)?;
        let top_blocks2 = resize_target(target, sub_srcs, false)?;
        if top_blocks2 > top_blocks {
            top_blocks = top_blocks2;
        }

        let mut global_found = false;
        for i in 0..top_blocks {
            let mut j_max = find_effective_sub_block_size(i, and_srcs);
            if !sub_srcs.is_empty() {
                j_max = j_max.max(find_effective_sub_block_size(i, sub_srcs));
            }
            for j in 0..j_max {
                let digest = self.combine_and_sub_block(i, j, and_srcs, sub_srcs);
                if digest != 0 {
                    target.blocks_mut().copy_bit_block(i, j, &self.tb1);
                    if any {
                        return Ok(true);
                    }
                    global_found = true;
                }
            }
        }
        Ok(global_found)
    }

    /// Lowest index of the AND-MINUS result over the given inputs
    pub fn find_first_and_sub_from(
        &mut self,
        and_srcs: &[&'a BitVector],
        sub_srcs: &[&'a BitVector],
    ) -> Result<Option<u32>> {
        if and_srcs.len() >= MAX_CAP || sub_srcs.len() >= MAX_CAP {
            return Err(Error::OutOfRange("input count"));
        }
        if and_srcs.is_empty() {
            return Ok(None);
        }
        let top_blocks = and_srcs
            .iter()
            .chain(sub_srcs)
            .map(|bv| bv.blocks().top_block_size())
            .max()
            .unwrap_or(0);

        for i in 0..top_blocks {
            let mut j_max = find_effective_sub_block_size(i, and_srcs);
            if !sub_srcs.is_empty() {
                j_max = j_max.max(find_effective_sub_block_size(i, sub_srcs));
            }
            for j in 0..j_max {
                let digest = self.combine_and_sub_block(i, j, and_srcs, sub_srcs);
                if digest != 0 {
                    let base = ((i * SUB_SIZE + j) as u32) << 16;
                    debug_assert!(self.tb1.find_first().is_some());
                    if let Some(pos) = self.tb1.find_first() {
                        return Ok(Some(base + pos));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Shift chain over the given inputs. With `any = true`, returns as
    /// soon as one non-empty sub-block is produced.
    pub fn combine_shift_right_and_from(
        &mut self,
        target: &mut BitVector,
        srcs: &[&'a BitVector],
        any: bool,
    ) -> Result<bool> {
        if srcs.len() >= MAX_CAP {
            return Err(Error::OutOfRange("input count"));
        }
        if srcs.is_empty() {
            target.clear();
            return Ok(false);
        }
        let top_blocks = resize_target(target, srcs, true)?;
        self.carry_overs[..srcs.len()].fill(false);

        for i in 0..TOP_SIZE {
            // carries can outlive the deepest input block; quit only once
            // both are exhausted
            if i >= top_blocks && !self.any_carry_overs(srcs.len()) {
                break;
            }
            for j in 0..SUB_SIZE {
                let found = self.combine_shift_right_and_block(i, j, srcs);
                if found {
                    target.blocks_mut().copy_bit_block(i, j, &self.tb1);
                    if any {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(target.any())
    }

    fn any_carry_overs(&self, n: usize) -> bool {
        self.carry_overs[..n].iter().any(|&c| c)
    }
}

impl<'a> Default for Aggregator<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// Harmonize the target with the inputs: directory depth and bit size
/// both grow to the maximum over the inputs. Returns the target's top
/// block depth.
fn resize_target(
    target: &mut BitVector,
    srcs: &[&BitVector],
    init_clear: bool,
) -> Result<usize> {
    if init_clear {
        target.clear();
    }
    let mut top_blocks = target.blocks().top_block_size();
    let mut size = target.size();
    for bv in srcs {
        let arg_top = bv.blocks().top_block_size();
        if arg_top > top_blocks {
            top_blocks = target.blocks_mut().reserve_top_blocks(arg_top)?;
        }
        if bv.size() > size {
            size = bv.size();
            target.resize(size);
        }
    }
    Ok(top_blocks)
}

/// Largest `j` with a non-null block at `(i, j)` in any input, plus one.
/// Trims the inner driver loop when most inputs are narrow.
fn find_effective_sub_block_size(i: usize, srcs: &[&BitVector]) -> usize {
    let mut max_j = 0usize;
    for bv in srcs {
        let Some(sub) = bv.blocks().top().get(i).and_then(|t| t.as_deref()) else {
            continue;
        };
        for j in (max_j + 1..SUB_SIZE).rev() {
            if sub[j].is_some() {
                max_j = j;
                break;
            }
        }
        if max_j == SUB_SIZE - 1 {
            break;
        }
    }
    debug_assert!(max_j < SUB_SIZE);
    max_j + 1
}
