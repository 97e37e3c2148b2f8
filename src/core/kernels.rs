//! Pointwise block kernels: OR / AND / SUB folds and the single-bit shift.
//!
//! OR kernels fold whole blocks and report "became all ones" so the caller
//! can paste a FULL marker instead of materializing. AND/SUB kernels carry
//! the 64-bit digest: only slices whose digest bit is set are touched, and
//! bits are cleared for slices that drain to zero.
//!
//! Hot folds dispatch to an AVX2 path when the target supports it, with a
//! scalar fallback that works everywhere.

use crate::core::{update_digest0, BitBlock, BLOCK_WORDS, SLICE_WORDS};

#[cfg(target_arch = "x86_64")]
#[allow(unused_imports)]
use std::arch::x86_64::*;

// === OR kernels ===

/// `dst |= a`. Returns true if `dst` became all ones.
#[inline]
pub fn bit_block_or(dst: &mut BitBlock, a: &BitBlock) -> bool {
    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    unsafe {
        return or_avx2(dst, a);
    }

    // Scalar fallback
    or_scalar(dst, a)
}

#[inline]
fn or_scalar(dst: &mut BitBlock, a: &BitBlock) -> bool {
    let mut acc = u32::MAX;
    for (d, &s) in dst.words_mut().iter_mut().zip(a.words()) {
        *d |= s;
        acc &= *d;
    }
    acc == u32::MAX
}

/// AVX2 OR fold: 256 bits per lane, all-ones check folded into the pass
#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
#[target_feature(enable = "avx2")]
unsafe fn or_avx2(dst: &mut BitBlock, a: &BitBlock) -> bool {
    let d = dst.words_mut().as_mut_ptr() as *mut __m256i;
    let s = a.words().as_ptr() as *const __m256i;

    let mut acc = _mm256_set1_epi32(-1);
    // 2048 u32 words = 256 lanes of 256 bits
    for i in 0..(BLOCK_WORDS / 8) as isize {
        let v = _mm256_or_si256(_mm256_loadu_si256(d.offset(i)), _mm256_loadu_si256(s.offset(i)));
        _mm256_storeu_si256(d.offset(i), v);
        acc = _mm256_and_si256(acc, v);
    }
    let eq = _mm256_cmpeq_epi32(acc, _mm256_set1_epi32(-1));
    _mm256_movemask_epi8(eq) == -1
}

/// `dst |= a | b`. Returns true if `dst` became all ones.
#[inline]
pub fn bit_block_or_3way(dst: &mut BitBlock, a: &BitBlock, b: &BitBlock) -> bool {
    let mut acc = u32::MAX;
    let dw = dst.words_mut();
    let (aw, bw) = (a.words(), b.words());
    for i in 0..BLOCK_WORDS {
        dw[i] |= aw[i] | bw[i];
        acc &= dw[i];
    }
    acc == u32::MAX
}

/// `dst |= a | b | c | d`. Returns true if `dst` became all ones.
#[inline]
pub fn bit_block_or_5way(
    dst: &mut BitBlock,
    a: &BitBlock,
    b: &BitBlock,
    c: &BitBlock,
    d: &BitBlock,
) -> bool {
    let mut acc = u32::MAX;
    let dw = dst.words_mut();
    let (aw, bw, cw, ew) = (a.words(), b.words(), c.words(), d.words());
    for i in 0..BLOCK_WORDS {
        dw[i] |= (aw[i] | bw[i]) | (cw[i] | ew[i]);
        acc &= dw[i];
    }
    acc == u32::MAX
}

// === AND / SUB kernels (digest-carrying) ===

/// `dst = a & b` over the slices set in `digest`; returns the updated
/// digest. Slices not in `digest` are left untouched (the caller treats
/// them as zero).
pub fn bit_block_and_2way(dst: &mut BitBlock, a: &BitBlock, b: &BitBlock, digest: u64) -> u64 {
    let mut out = digest;
    let mut rest = digest;
    let dw = dst.words_mut();
    let (aw, bw) = (a.words(), b.words());
    while rest != 0 {
        let slice = rest.trailing_zeros() as usize;
        rest &= rest - 1;
        let off = slice * SLICE_WORDS;
        let mut any = 0u32;
        for i in off..off + SLICE_WORDS {
            let v = aw[i] & bw[i];
            dw[i] = v;
            any |= v;
        }
        if any == 0 {
            out &= !(1u64 << slice);
        }
    }
    out
}

/// `dst &= a` over the slices set in `digest`; returns the updated digest.
pub fn bit_block_and(dst: &mut BitBlock, a: &BitBlock, digest: u64) -> u64 {
    let mut out = digest;
    let mut rest = digest;
    let dw = dst.words_mut();
    let aw = a.words();
    while rest != 0 {
        let slice = rest.trailing_zeros() as usize;
        rest &= rest - 1;
        let off = slice * SLICE_WORDS;
        let mut any = 0u32;
        for i in off..off + SLICE_WORDS {
            dw[i] &= aw[i];
            any |= dw[i];
        }
        if any == 0 {
            out &= !(1u64 << slice);
        }
    }
    out
}

/// `dst &= !a` over the slices set in `digest`; returns the updated digest.
pub fn bit_block_sub(dst: &mut BitBlock, a: &BitBlock, digest: u64) -> u64 {
    let mut out = digest;
    let mut rest = digest;
    let dw = dst.words_mut();
    let aw = a.words();
    while rest != 0 {
        let slice = rest.trailing_zeros() as usize;
        rest &= rest - 1;
        let off = slice * SLICE_WORDS;
        let mut any = 0u32;
        for i in off..off + SLICE_WORDS {
            dw[i] &= !aw[i];
            any |= dw[i];
        }
        if any == 0 {
            out &= !(1u64 << slice);
        }
    }
    debug_assert_eq!(out, update_digest0(dst, digest));
    out
}

// === SHIFT kernels ===

/// Shift the block one position toward higher indices: bit `i` moves to
/// `i + 1`, `carry_in` enters at bit 0. Returns `(carry_out, any)` where
/// `carry_out` is the former top bit and `any` reports a non-zero result.
pub fn bit_block_shift_r1(blk: &mut BitBlock, carry_in: bool) -> (bool, bool) {
    let mut co = carry_in as u32;
    let mut any = 0u32;
    for w in blk.words_mut() {
        let next = *w >> 31;
        *w = (*w << 1) | co;
        co = next;
        any |= *w;
    }
    (co != 0, any != 0)
}

/// Fused shift-then-AND: `blk = ((blk << 1) | carry_in) & mask`.
///
/// The carry-out is the pre-mask top bit: the shift of the whole vector
/// happens before any AND, so the bit crossing the block boundary is not
/// masked here.
pub fn bit_block_shift_r1_and(blk: &mut BitBlock, mask: &BitBlock, carry_in: bool) -> (bool, bool) {
    let mut co = carry_in as u32;
    let mut any = 0u32;
    for (w, &m) in blk.words_mut().iter_mut().zip(mask.words()) {
        let next = *w >> 31;
        *w = ((*w << 1) | co) & m;
        co = next;
        any |= *w;
    }
    (co != 0, any != 0)
}
