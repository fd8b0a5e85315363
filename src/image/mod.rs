//! Volume Image Module
//!
//! Serializes the whole namespace to a single flat binary image and back.
//!
//! ## Responsibilities
//! - Deterministic encoding (containers and files in name order)
//! - Exact decoding with bounds checks on every read
//! - CRC32 over the whole image for corruption detection
//! - Atomic replacement of the on-disk image (temp file + rename)
//!
//! ## File Format (V1)
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                                │
//! │   Magic: "FVOL" (4) | Version: u16 (2) | Reserved: u16 (2)       │
//! │   BlockSize: u32 (4) | BlockCount: u32 (4)                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Body                                                             │
//! │   ContainerCount: u32 | Current: str                             │
//! │   per container:                                                 │
//! │     Name: str | HasParent: u8 [| Parent: str]                    │
//! │     ChildCount: u32 | Child: str ...                             │
//! │     FileCount: u32                                               │
//! │     per file:                                                    │
//! │       Name: str | Content: bytes | Permissions: str              │
//! │       DeclaredSize: u64 | BlockCount: u32 | Block: u32 ...       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                                 │
//! │   CRC32 of header + body                                         │
//! └──────────────────────────────────────────────────────────────────┘
//!   str / bytes = Len: u32 + payload; all integers little-endian
//! ```
//!
//! Block indices are persisted with each file, so loading rebuilds the
//! allocator by claiming exactly those blocks rather than re-allocating.

mod decoder;
mod encoder;
mod store;

pub use decoder::{decode, DecodedImage};
pub use encoder::encode;
pub use store::ImageStore;

// =============================================================================
// Shared Constants (used by encoder and decoder)
// =============================================================================

/// Magic bytes identifying a flatvol image
pub(crate) const MAGIC: &[u8; 4] = b"FVOL";

/// Current image format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Reserved (2) + BlockSize (4) + BlockCount (4)
pub(crate) const HEADER_SIZE: usize = 16;

/// Footer size: CRC32 (4)
pub(crate) const FOOTER_SIZE: usize = 4;

/// Block pool shape recorded in the image header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_size: u32,
    pub block_count: u32,
}
