//! 64-bit block digest: one bit per 1024-bit slice, set iff the slice
//! holds any set bit.
//!
//! The digest is the central short-circuit of the AND/SUB combiners:
//! kernels only touch slices whose digest bit is set, and clear bits for
//! slices that drain to zero. Digest 0 means the block is known all-zero.

use crate::core::{BitBlock, DIGEST_SLICES, SLICE_BITS, SLICE_WORDS};

/// Digest with every slice marked non-zero
pub const DIGEST_FULL: u64 = !0u64;

/// Compute the digest of a block from scratch
pub fn calc_digest0(blk: &BitBlock) -> u64 {
    let words = blk.words();
    let mut digest = 0u64;
    for b in 0..DIGEST_SLICES {
        let off = b * SLICE_WORDS;
        let mut any = 0u32;
        for &w in &words[off..off + SLICE_WORDS] {
            any |= w;
        }
        digest |= ((any != 0) as u64) << b;
    }
    digest
}

/// Re-scan only the slices set in `digest`, clearing bits whose slice
/// became zero. Slices already clear are trusted to be zero.
pub fn update_digest0(blk: &BitBlock, digest: u64) -> u64 {
    let words = blk.words();
    let mut out = digest;
    let mut rest = digest;
    while rest != 0 {
        let b = rest.trailing_zeros() as usize;
        rest &= rest - 1;
        let off = b * SLICE_WORDS;
        let mut any = 0u32;
        for &w in &words[off..off + SLICE_WORDS] {
            any |= w;
        }
        if any == 0 {
            out &= !(1u64 << b);
        }
    }
    out
}

/// Does any live digest slice overlap the bit range `[from, to]`?
///
/// Used by the GAP fusion kernels to skip runs that fall entirely into
/// drained slices.
#[inline]
pub fn digest_intersects(digest: u64, from: usize, to: usize) -> bool {
    debug_assert!(from <= to);
    let b0 = from / SLICE_BITS;
    let b1 = to / SLICE_BITS;
    let span = b1 - b0 + 1;
    let mask = if span >= 64 {
        DIGEST_FULL
    } else {
        ((1u64 << span) - 1) << b0
    };
    digest & mask != 0
}
