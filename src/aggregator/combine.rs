//! Per-sub-block combiners: fold the sorted input lists into the scratch
//! block and emit FULL / dense copy / absent into the target slot.

use crate::core::kernels::{
    bit_block_and, bit_block_and_2way, bit_block_or, bit_block_or_3way, bit_block_or_5way,
    bit_block_shift_r1, bit_block_shift_r1_and, bit_block_sub,
};
use crate::core::{
    calc_digest0, update_digest0, BLOCK_WORDS, DIGEST_FULL, SUB_SIZE, TOP_SIZE,
};
use crate::vector::{BitVector, Block};
use crate::ID_MAX;

use super::sort::Sorted;
use super::Aggregator;

impl<'a> Aggregator<'a> {
    // === OR ===

    pub(super) fn combine_or_block(
        &mut self,
        i: usize,
        j: usize,
        target: &mut BitVector,
        srcs: &[&'a BitVector],
    ) {
        if self.sort_input_blocks_or(srcs, i, j) == Sorted::Full {
            // golden block: some input saturates this coordinate
            target.blocks_mut().set_full(i, j);
            return;
        }
        if self.bit_args.is_empty() && self.gap_args.is_empty() {
            return;
        }
        let mut all_one = self.process_bit_blocks_or();
        if !all_one && !self.gap_args.is_empty() {
            all_one = self.process_gap_blocks_or();
        }
        if all_one {
            target.blocks_mut().set_full(i, j);
        } else if !self.tb1.is_all_zero() {
            target.blocks_mut().copy_bit_block(i, j, &self.tb1);
        }
    }

    /// Fold the bit-block list into scratch with the widest OR kernel
    /// that fits the remaining count. True means scratch went all ones.
    fn process_bit_blocks_or(&mut self) -> bool {
        let blk = &mut *self.tb1;
        let args = &self.bit_args;
        let mut k = 0;
        if let Some(first) = args.first() {
            blk.copy_from(first);
            k = 1;
        } else {
            blk.fill(0);
        }
        while args.len() - k >= 4 {
            if bit_block_or_5way(blk, args[k], args[k + 1], args[k + 2], args[k + 3]) {
                return true;
            }
            k += 4;
        }
        while args.len() - k >= 2 {
            if bit_block_or_3way(blk, args[k], args[k + 1]) {
                return true;
            }
            k += 2;
        }
        while k < args.len() {
            if bit_block_or(blk, args[k]) {
                return true;
            }
            k += 1;
        }
        false
    }

    fn process_gap_blocks_or(&mut self) -> bool {
        let blk = &mut *self.tb1;
        for gap in &self.gap_args {
            gap.add_to_bitset(blk);
        }
        blk.is_all_one()
    }

    // === AND ===

    pub(super) fn combine_and_block(
        &mut self,
        i: usize,
        j: usize,
        target: &mut BitVector,
        srcs: &[&'a BitVector],
    ) {
        debug_assert!(!srcs.is_empty());
        if self.sort_input_blocks_and(srcs, i, j) == Sorted::Absent {
            // some input is zero here; the target slot stays absent
            return;
        }
        if self.bit_args.is_empty() && self.gap_args.is_empty() {
            return;
        }
        let mut digest = self.process_bit_blocks_and();
        if digest == 0 {
            return;
        }
        if !self.gap_args.is_empty() {
            digest = self.process_gap_blocks_and(digest);
        }
        if digest != 0 {
            target.blocks_mut().copy_bit_block(i, j, &self.tb1);
        }
    }

    /// AND-fold the bit-block list, carrying the digest. Inputs at the
    /// real-full address are identity and skipped.
    fn process_bit_blocks_and(&mut self) -> u64 {
        let blk = &mut *self.tb1;
        let args = &self.bit_args;
        match args.len() {
            0 => {
                // every input was FULL: scratch saturates
                blk.fill(u32::MAX);
                return DIGEST_FULL;
            }
            1 => {
                blk.copy_from(args[0]);
                return calc_digest0(blk);
            }
            _ => {}
        }
        let mut digest = bit_block_and_2way(blk, args[0], args[1], DIGEST_FULL);
        for &arg in &args[2..] {
            if digest == 0 {
                break;
            }
            if arg.is_full_addr() {
                continue;
            }
            digest = bit_block_and(blk, arg, digest);
        }
        digest
    }

    fn process_gap_blocks_and(&mut self, mut digest: u64) -> u64 {
        debug_assert!(digest != 0);
        let blk = &mut *self.tb1;
        for gap in &self.gap_args {
            gap.and_to_bitset_digest(blk, digest);
            digest = update_digest0(blk, digest);
            if digest == 0 {
                debug_assert!(blk.is_all_zero());
                break;
            }
        }
        digest
    }

    // === AND-MINUS ===

    /// AND over `and_srcs`, then subtract the OR side, all in scratch.
    /// Returns the final digest; non-zero means scratch holds a result
    /// block for `(i, j)`.
    pub(super) fn combine_and_sub_block(
        &mut self,
        i: usize,
        j: usize,
        and_srcs: &[&'a BitVector],
        sub_srcs: &[&'a BitVector],
    ) -> u64 {
        debug_assert!(!and_srcs.is_empty());
        if self.sort_input_blocks_and(and_srcs, i, j) == Sorted::Absent {
            return 0;
        }
        if self.bit_args.is_empty() && self.gap_args.is_empty() {
            return 0;
        }
        let mut digest = self.process_bit_blocks_and();
        if digest == 0 {
            return 0;
        }
        if !self.gap_args.is_empty() {
            digest = self.process_gap_blocks_and(digest);
            if digest == 0 {
                return 0;
            }
        }

        if !sub_srcs.is_empty() {
            if self.sort_input_blocks_or(sub_srcs, i, j) == Sorted::Full {
                return 0; // everything subtracted
            }
            if !self.bit_args.is_empty() {
                digest = self.process_bit_blocks_sub(digest);
                if digest == 0 {
                    return 0;
                }
            }
            if !self.gap_args.is_empty() {
                digest = self.process_gap_blocks_sub(digest);
            }
        }
        digest
    }

    fn process_bit_blocks_sub(&mut self, mut digest: u64) -> u64 {
        let blk = &mut *self.tb1;
        for &arg in &self.bit_args {
            if arg.is_full_addr() {
                // golden block: the subtrahend covers everything
                digest = 0;
                break;
            }
            digest = bit_block_sub(blk, arg, digest);
            if digest == 0 {
                break;
            }
        }
        digest
    }

    fn process_gap_blocks_sub(&mut self, mut digest: u64) -> u64 {
        debug_assert!(digest != 0);
        let blk = &mut *self.tb1;
        for gap in &self.gap_args {
            gap.sub_to_bitset_digest(blk, digest);
            digest = update_digest0(blk, digest);
            if digest == 0 {
                debug_assert!(blk.is_all_zero());
                break;
            }
        }
        digest
    }

    // === SHIFT-right-AND ===

    /// One sub-block of the shift chain: seed scratch from input 0, then
    /// shift-and through the remaining inputs, each with its own carry.
    /// True means scratch holds a result block for `(i, j)`.
    pub(super) fn combine_shift_right_and_block(
        &mut self,
        i: usize,
        j: usize,
        srcs: &[&'a BitVector],
    ) -> bool {
        let blk = &mut *self.tb1;

        match srcs[0].blocks().get_block(i, j) {
            None => blk.fill(0),
            Some(Block::Full) => blk.fill(u32::MAX),
            Some(Block::Bit(b)) => blk.copy_from(b),
            Some(Block::Gap(g)) => {
                blk.fill(0);
                g.add_to_bitset(blk);
            }
        }
        let mut acc = !blk.is_all_zero();
        self.carry_overs[0] = false;

        for k in 1..srcs.len() {
            let mut carry = self.carry_overs[k];
            if !acc && !carry {
                // zero block shifted by zero stays zero
                debug_assert!(blk.is_all_zero());
                continue;
            }
            match srcs[k].blocks().get_block(i, j) {
                Some(Block::Gap(g)) => {
                    let (co, any) = bit_block_shift_r1(blk, carry);
                    carry = co;
                    acc = any;
                    if acc {
                        g.and_to_bitset(blk);
                        acc = !blk.is_all_zero();
                    }
                }
                Some(Block::Full) => {
                    // AND with all ones is a no-op: shift only
                    let (co, any) = bit_block_shift_r1(blk, carry);
                    carry = co;
                    acc = any;
                }
                Some(Block::Bit(b)) => {
                    let (co, any) = bit_block_shift_r1_and(blk, b, carry);
                    carry = co;
                    acc = any;
                }
                None => {
                    // the carry-out still leaves; the carry-in still lands
                    let co = blk.words()[BLOCK_WORDS - 1] >> 31 != 0;
                    if acc {
                        blk.fill(0);
                    }
                    blk.words_mut()[0] |= carry as u32;
                    acc = carry;
                    carry = co;
                }
            }
            self.carry_overs[k] = carry;
        }

        if acc && i == TOP_SIZE - 1 && j == SUB_SIZE - 1 {
            // the overflow bit at 2^32 - 1 has nowhere to go
            blk.set_bit(crate::core::BITS_PER_BLOCK - 1, false);
        }
        acc
    }

    /// Single-mask specialization: shift `target` right by one and AND
    /// with `mask`, walking the target's existing blocks in place with
    /// one carry bit. Returns whether any bit survives.
    pub fn shift_right_and(&mut self, target: &mut BitVector, mask: &BitVector) -> bool {
        if !mask.blocks().is_init() {
            target.clear();
            return false;
        }
        if !target.blocks().is_init() {
            return false;
        }
        if target.size() < ID_MAX {
            target.resize(target.size() + 1);
        }

        let mut any = false;
        let mut carry = false;
        let top_blocks = target.blocks().top_block_size();

        for i in 0..TOP_SIZE {
            if i >= top_blocks && !carry {
                break;
            }
            let top_present = i < top_blocks
                && target.blocks().top().get(i).is_some_and(|t| t.is_some());
            if !top_present {
                // a whole absent top group: only the pending carry matters
                if carry {
                    if mask_bit0(mask, i, 0) {
                        let blk = target.blocks_mut().get_or_alloc_bit_block(i, 0);
                        blk.words_mut()[0] = 1;
                        any = true;
                    }
                    carry = false;
                }
                continue;
            }

            for j in 0..SUB_SIZE {
                if target.blocks().get_block(i, j).is_none() {
                    if carry {
                        if mask_bit0(mask, i, j) {
                            let blk = target.blocks_mut().get_or_alloc_bit_block(i, j);
                            blk.words_mut()[0] = 1;
                            any = true;
                        }
                        carry = false;
                    }
                    continue;
                }

                // FULL target blocks can often keep their prediction
                if matches!(target.blocks().get_block(i, j), Some(Block::Full)) {
                    if carry && matches!(mask.blocks().get_block(i, j), Some(Block::Full)) {
                        // ones shifted into ones stay ones; carry stays set
                        continue;
                    }
                    if mask.blocks().get_block(i, j).is_none() {
                        target.blocks_mut().zero_block(i, j);
                        carry = true;
                        continue;
                    }
                }

                // everything else runs dense
                let blk = target.blocks_mut().get_or_alloc_bit_block(i, j);
                let mut acc;
                match mask.blocks().get_block(i, j) {
                    Some(Block::Gap(g)) => {
                        let (co, a) = bit_block_shift_r1(blk, carry);
                        carry = co;
                        acc = a;
                        if acc {
                            g.and_to_bitset(blk);
                            acc = !blk.is_all_zero();
                        }
                    }
                    Some(Block::Full) => {
                        let (co, a) = bit_block_shift_r1(blk, carry);
                        carry = co;
                        acc = a;
                    }
                    Some(Block::Bit(b)) => {
                        let (co, a) = bit_block_shift_r1_and(blk, b, carry);
                        carry = co;
                        acc = a;
                    }
                    None => {
                        // mask is zero here: block dies, carry-out leaves
                        carry = blk.words()[BLOCK_WORDS - 1] >> 31 != 0;
                        target.blocks_mut().zero_block(i, j);
                        continue;
                    }
                }
                any |= acc;

                if i == TOP_SIZE - 1 && j == SUB_SIZE - 1 {
                    // last possible block: discard the overflow bit
                    let blk = target.blocks_mut().get_or_alloc_bit_block(i, j);
                    blk.set_bit(crate::core::BITS_PER_BLOCK - 1, false);
                    if !acc || blk.is_all_zero() {
                        target.blocks_mut().zero_block(i, j);
                    }
                    break;
                }
                if !acc {
                    target.blocks_mut().zero_block(i, j);
                }
            }
        }
        any
    }
}

fn mask_bit0(mask: &BitVector, i: usize, j: usize) -> bool {
    match mask.blocks().get_block(i, j) {
        None => false,
        Some(Block::Full) => true,
        Some(Block::Bit(b)) => b.get_bit(0),
        Some(Block::Gap(g)) => g.test(0),
    }
}
