//! File records
//!
//! A named blob with a fixed declared capacity and the blocks backing it.

use crate::allocator::BlockIndex;
use crate::error::{Result, VolError};

/// A single file in a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    name: String,
    content: Vec<u8>,
    permissions: String,
    declared_size: u64,
    blocks: Vec<BlockIndex>,
}

impl FileRecord {
    /// New empty file backed by `blocks`
    pub(crate) fn new(
        name: String,
        permissions: String,
        declared_size: u64,
        blocks: Vec<BlockIndex>,
    ) -> Self {
        Self {
            name,
            content: Vec::new(),
            permissions,
            declared_size,
            blocks,
        }
    }

    /// Rebuild a record read back from an image
    pub(crate) fn from_parts(
        name: String,
        content: Vec<u8>,
        permissions: String,
        declared_size: u64,
        blocks: Vec<BlockIndex>,
    ) -> Self {
        Self {
            name,
            content,
            permissions,
            declared_size,
            blocks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn permissions(&self) -> &str {
        &self.permissions
    }

    /// Capacity reserved at creation, in bytes
    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    /// Blocks backing this file, in allocation order
    pub fn blocks(&self) -> &[BlockIndex] {
        &self.blocks
    }

    /// Bytes of content currently stored
    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Replace the content wholesale
    pub(crate) fn replace(&mut self, content: &[u8]) -> Result<()> {
        self.check_fits(content.len() as u64)?;
        self.content.clear();
        self.content.extend_from_slice(content);
        Ok(())
    }

    /// Append to the existing content
    pub(crate) fn append(&mut self, content: &[u8]) -> Result<()> {
        self.check_fits(self.len() + content.len() as u64)?;
        self.content.extend_from_slice(content);
        Ok(())
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn check_fits(&self, requested: u64) -> Result<()> {
        if requested > self.declared_size {
            return Err(VolError::CapacityExceeded {
                name: self.name.clone(),
                capacity: self.declared_size,
                requested,
            });
        }
        Ok(())
    }
}
