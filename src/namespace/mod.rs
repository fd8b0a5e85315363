//! Namespace Module
//!
//! The flat collection of containers and the files they hold.
//!
//! ## Model
//! Containers live in a single map keyed by a namespace-wide unique name.
//! Hierarchy is logical only: each container records its parent by name and
//! lists its children by name. Those links drive listing and the cycle check
//! on moves; there is no path resolution.
//!
//! ```text
//!   containers: { "/"    -> Container { parent: None,      children: ["docs"] },
//!                 "docs" -> Container { parent: Some("/"), children: [] } }
//!   current:    "/"
//! ```
//!
//! Every file operation acts on the current container. Files are backed by
//! blocks from a [`BlockAllocator`](crate::allocator::BlockAllocator) passed
//! in by the caller; the namespace only stores the indices.

mod container;
mod file;
mod tree;

pub use container::Container;
pub use file::FileRecord;
pub use tree::{Namespace, RenamedEntry};

use crate::config::Config;
use crate::error::{Result, VolError};

/// Name of the container created on first run
pub const ROOT_NAME: &str = "/";

/// Character that may not appear in file or container names
pub const SEPARATOR: char = '/';

/// Ceilings and sizing the namespace enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Max files in one container
    pub max_files_per_container: usize,
    /// Max containers overall
    pub max_containers: usize,
    /// Bytes per block, used to size allocations
    pub block_size: u32,
}

impl From<&Config> for Limits {
    fn from(config: &Config) -> Self {
        Self {
            max_files_per_container: config.max_files_per_container,
            max_containers: config.max_containers,
            block_size: config.block_size,
        }
    }
}

/// A file as shown by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub name: String,
    pub permissions: String,
    /// Bytes of content currently stored
    pub len: u64,
    /// Declared capacity in bytes
    pub declared_size: u64,
}

/// Contents of the current container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Name of the listed container
    pub container: String,
    /// Files, ordered by name
    pub files: Vec<FileSummary>,
    /// Child containers, in the order they were linked
    pub children: Vec<String>,
}

/// Check a user-supplied file or container name
///
/// `what` names the entry kind in the error message ("File", "Directory").
pub(crate) fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VolError::InvalidArgument(format!(
            "{} name cannot be empty!",
            what
        )));
    }
    if name.contains(SEPARATOR) {
        return Err(VolError::InvalidArgument(format!(
            "{} name cannot contain '{}' character!",
            what, SEPARATOR
        )));
    }
    Ok(())
}
