//! # flatvol
//!
//! A small storage volume simulator with:
//! - A fixed pool of fixed-size blocks tracked by a bitmap allocator
//! - A flat namespace of named containers ("directories") holding files
//! - Per-file declared capacity backed by whole blocks
//! - A checksummed single-file image, rewritten atomically after every change
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Shell / Command Parser                     │
//! │                   (flatvol-shell binary)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Command
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     StorageEngine                            │
//! │        (validate → allocate → mutate → save image)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌──────────────┐
//!   │  Namespace  │ │   Block     │   │    Image     │
//!   │ (containers │ │  Allocator  │   │ (codec+store)│
//!   │   + files)  │ │  (bitmap)   │   └──────────────┘
//!   └─────────────┘ └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod allocator;
pub mod namespace;
pub mod image;
pub mod command;
pub mod engine;
pub mod shared;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorKind, Result, VolError};
pub use config::Config;
pub use engine::{StorageEngine, Usage};
pub use shared::SharedEngine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of flatvol
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
