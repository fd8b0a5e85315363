//! Block Allocator Module
//!
//! Tracks which blocks of the fixed-size pool are in use.
//!
//! ## Responsibilities
//! - First-fit allocation of `count` blocks (lowest free indices, not
//!   necessarily adjacent)
//! - All-or-nothing: a request that cannot be met leaves the bitmap untouched
//! - Release of previously allocated blocks
//! - Claiming a known set of indices when a persisted image is loaded
//!
//! ## Bitmap Layout
//! ```text
//! word 0                      word 1                      word N-1
//! ┌──────────────────────────┬──────────────────────────┬─────┬────────────┐
//! │ bit 0 .. bit 63          │ bit 64 .. bit 127        │ ... │ tail | pad │
//! └──────────────────────────┴──────────────────────────┴─────┴────────────┘
//!   1 = used, 0 = free; padding bits past `capacity` are permanently set
//! ```

mod bitmap;

pub use bitmap::BlockAllocator;

/// Index of a block in the pool
pub type BlockIndex = u32;

/// Number of blocks needed to back `size_bytes` at `block_size` bytes per block
///
/// `ceil(size_bytes / block_size)`; zero bytes need zero blocks.
pub fn required_blocks(size_bytes: u64, block_size: u32) -> u64 {
    size_bytes.div_ceil(u64::from(block_size.max(1)))
}
