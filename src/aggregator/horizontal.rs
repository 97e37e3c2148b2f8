//! Horizontal reference implementations: naive pairwise reductions over
//! whole vectors. Slower than the fused combiners, but bit-identical;
//! the tests use them as the oracle.

use crate::vector::BitVector;

use super::Aggregator;

impl<'a> Aggregator<'a> {
    /// Pairwise OR reduction
    pub fn combine_or_horizontal(&self, target: &mut BitVector, srcs: &[&BitVector]) {
        let Some(first) = srcs.first() else {
            target.clear();
            return;
        };
        *target = (*first).clone();
        for bv in &srcs[1..] {
            target.bit_or(bv);
        }
    }

    /// Pairwise AND reduction
    pub fn combine_and_horizontal(&self, target: &mut BitVector, srcs: &[&BitVector]) {
        let Some(first) = srcs.first() else {
            target.clear();
            return;
        };
        *target = (*first).clone();
        for bv in &srcs[1..] {
            target.bit_and(bv);
        }
    }

    /// Pairwise AND reduction minus the OR of the subtrahends
    pub fn combine_and_sub_horizontal(
        &self,
        target: &mut BitVector,
        and_srcs: &[&BitVector],
        sub_srcs: &[&BitVector],
    ) {
        self.combine_and_horizontal(target, and_srcs);
        for bv in sub_srcs {
            target.bit_sub(bv);
        }
    }
}
