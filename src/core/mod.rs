//! Core primitives: dense bit-blocks, GAP run-length blocks, digests, kernels.

mod bit_block;
mod digest;
mod gap;
pub mod kernels;

pub use bit_block::{full_block, BitBlock};
pub use digest::{calc_digest0, digest_intersects, update_digest0, DIGEST_FULL};
pub use gap::GapBlock;

/// Number of bits in one block
pub const BITS_PER_BLOCK: usize = 65_536;

/// Block layout: 32-bit words
pub const BLOCK_WORDS: usize = BITS_PER_BLOCK / 32; // 2048

/// Top-level directory entries (2^10)
pub const TOP_SIZE: usize = 1 << 10;

/// Block slots per sub-block array (2^6)
pub const SUB_SIZE: usize = 1 << 6;

/// Digest geometry: 64 slices of 1024 bits each
pub const DIGEST_SLICES: usize = 64;
pub const SLICE_BITS: usize = BITS_PER_BLOCK / DIGEST_SLICES; // 1024
pub const SLICE_WORDS: usize = SLICE_BITS / 32; // 32
