//! # bitfold
//!
//! Compressed bit-vector library with a fused N-way aggregation engine.
//! Vectors represent sparse and dense sets over a 32-bit index space.
//!
//! ## Quick Start
//! ```rust,ignore
//! use bitfold::{Aggregator, BitVector};
//!
//! let a = BitVector::from_indices(&[0, 2]);
//! let b = BitVector::from_indices(&[1, 2]);
//! let c = BitVector::from_indices(&[3]);
//!
//! // Stateful surface: attach inputs, then combine
//! let mut agg = Aggregator::new();
//! agg.add(&a, 0)?;
//! agg.add(&b, 0)?;
//! agg.add(&c, 0)?;
//!
//! let mut target = BitVector::new();
//! agg.combine_or(&mut target)?;      // {0, 1, 2, 3}
//!
//! // Fused AND-MINUS with early exit
//! agg.reset();
//! agg.add(&a, 0)?;
//! agg.add(&b, 1)?;                   // group 1 = subtrahend
//! let found = agg.combine_and_sub(&mut target, false)?;
//! ```
//!
//! ## Architecture
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          BITFOLD                               │
//! ├────────────────────────────────────────────────────────────────┤
//! │                                                                │
//! │   Aggregator → driver loop over (i, j) sub-block coordinates   │
//! │   Sorter     → partition N inputs: absent / bit / GAP / FULL   │
//! │   Combiner   → fold sorted lists into one scratch block,       │
//! │                carrying a 64-bit non-zero-slice digest         │
//! │   Kernels    → pointwise OR/AND/SUB/SHIFT over 65,536-bit      │
//! │                blocks, GAP↔bit fusion, single-bit carry        │
//! │   Container  → two-level block directory (1024 × 64 slots),    │
//! │                blocks: absent | full | dense bits | GAP runs   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

// === Core modules ===
pub mod core;
pub mod vector;
pub mod aggregator;

// === Re-exports for convenience ===

pub use crate::core::{BitBlock, GapBlock};
pub use crate::vector::BitVector;
pub use crate::aggregator::Aggregator;

// === Error types ===

/// Crate-level error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Argument group index > 1, a full argument group, or an input
    /// count at or over [`MAX_CAP`].
    #[error("out of range: {0}")]
    OutOfRange(&'static str),

    /// Directory or arena reservation failure.
    #[error("allocation failure: {0}")]
    AllocFailure(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

// === Constants ===

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Size of the logical index space: indices are drawn from `[0, 2^32)`.
pub const ID_MAX: u64 = 1 << 32;

/// Maximum number of aggregation inputs per pass (per argument group).
pub const MAX_CAP: usize = 256;
