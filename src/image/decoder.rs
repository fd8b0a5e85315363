//! Image Decoder
//!
//! Parses a V1 image back into a namespace. Every read is bounds-checked;
//! any truncation, bad length, checksum mismatch or dangling reference is
//! reported as `Corrupt`.

use std::collections::BTreeMap;

use crate::allocator::{required_blocks, BlockAllocator, BlockIndex};
use crate::error::{Result, VolError};
use crate::namespace::{validate_name, Container, FileRecord, Namespace, ROOT_NAME};

use super::{Geometry, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Smallest encoding of a container: name len + parent flag + child count + file count
const MIN_CONTAINER_SIZE: usize = 4 + 1 + 4 + 4;

/// Smallest encoding of a file: name len + content len + permissions len + size + block count
const MIN_FILE_SIZE: usize = 4 + 4 + 4 + 8 + 4;

/// A fully parsed image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub geometry: Geometry,
    pub namespace: Namespace,
}

impl DecodedImage {
    /// Rebuild the block bitmap by claiming every persisted block index
    pub fn build_allocator(&self) -> Result<BlockAllocator> {
        let mut allocator = BlockAllocator::new(self.geometry.block_count);
        for file in self.namespace.files() {
            allocator.claim(file.blocks()).map_err(|e| match e {
                VolError::Corrupt(msg) => {
                    VolError::Corrupt(format!("file '{}': {}", file.name(), msg))
                }
                other => other,
            })?;
        }
        Ok(allocator)
    }
}

/// Decode a full image
pub fn decode(bytes: &[u8]) -> Result<DecodedImage> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(VolError::Corrupt(format!(
            "image too short: {} bytes",
            bytes.len()
        )));
    }

    // Read and validate header
    if &bytes[0..4] != MAGIC {
        return Err(VolError::Corrupt(format!(
            "invalid magic: expected FVOL, got {:?}",
            &bytes[0..4]
        )));
    }

    let (content, footer) = bytes.split_at(bytes.len() - FOOTER_SIZE);
    let stored_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let computed_crc = crc32fast::hash(content);
    if stored_crc != computed_crc {
        return Err(VolError::Corrupt(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored_crc, computed_crc
        )));
    }

    let mut reader = ByteReader::new(&content[4..]);
    let version = reader.u16()?;
    if version != VERSION {
        return Err(VolError::Corrupt(format!(
            "unsupported image version: {}",
            version
        )));
    }
    let _reserved = reader.u16()?;
    let geometry = Geometry {
        block_size: reader.u32()?,
        block_count: reader.u32()?,
    };
    if geometry.block_size == 0 {
        return Err(VolError::Corrupt("block size of zero".to_string()));
    }

    // Body
    let container_count = reader.count(MIN_CONTAINER_SIZE, "containers")?;
    let current = reader.string()?;

    let mut containers = BTreeMap::new();
    for _ in 0..container_count {
        let (name, container) = read_container(&mut reader, geometry)?;
        if containers.insert(name.clone(), container).is_some() {
            return Err(VolError::Corrupt(format!("duplicate directory '{}'", name)));
        }
    }

    if !reader.is_empty() {
        return Err(VolError::Corrupt(format!(
            "{} trailing bytes after last directory",
            reader.remaining()
        )));
    }

    let namespace = Namespace::from_parts(current, containers)?;
    Ok(DecodedImage {
        geometry,
        namespace,
    })
}

fn read_container(reader: &mut ByteReader<'_>, geometry: Geometry) -> Result<(String, Container)> {
    let name = reader.string()?;
    if name != ROOT_NAME {
        check_name("Directory", &name)?;
    }

    let parent = match reader.u8()? {
        0 => None,
        1 => Some(reader.string()?),
        flag => {
            return Err(VolError::Corrupt(format!(
                "directory '{}': bad parent flag {}",
                name, flag
            )))
        }
    };

    let child_count = reader.count(4, "child names")?;
    let mut children = Vec::with_capacity(child_count);
    for _ in 0..child_count {
        children.push(reader.string()?);
    }

    let file_count = reader.count(MIN_FILE_SIZE, "files")?;
    let mut files = BTreeMap::new();
    for _ in 0..file_count {
        let file = read_file(reader, geometry)?;
        let file_name = file.name().to_string();
        if files.insert(file_name.clone(), file).is_some() {
            return Err(VolError::Corrupt(format!(
                "directory '{}': duplicate file '{}'",
                name, file_name
            )));
        }
    }

    Ok((name, Container::from_parts(parent, files, children)))
}

fn read_file(reader: &mut ByteReader<'_>, geometry: Geometry) -> Result<FileRecord> {
    let name = reader.string()?;
    check_name("File", &name)?;
    let content = reader.bytes()?.to_vec();
    let permissions = reader.string()?;
    let declared_size = reader.u64()?;

    let block_count = reader.count(4, "block indices")?;
    let mut blocks: Vec<BlockIndex> = Vec::with_capacity(block_count);
    for _ in 0..block_count {
        blocks.push(reader.u32()?);
    }

    if declared_size == 0 {
        return Err(VolError::Corrupt(format!("file '{}': declared size of zero", name)));
    }
    if content.len() as u64 > declared_size {
        return Err(VolError::Corrupt(format!(
            "file '{}': {} bytes of content exceed declared size {}",
            name,
            content.len(),
            declared_size
        )));
    }
    let expected = required_blocks(declared_size, geometry.block_size);
    if blocks.len() as u64 != expected {
        return Err(VolError::Corrupt(format!(
            "file '{}': {} blocks recorded, {} required",
            name,
            blocks.len(),
            expected
        )));
    }

    Ok(FileRecord::from_parts(
        name,
        content,
        permissions,
        declared_size,
        blocks,
    ))
}

/// Names in an image must be ones the namespace would have accepted
fn check_name(what: &str, name: &str) -> Result<()> {
    validate_name(what, name).map_err(|e| match e {
        VolError::InvalidArgument(msg) => VolError::Corrupt(format!("bad name {:?}: {}", name, msg)),
        other => other,
    })
}

// =============================================================================
// Byte Reader
// =============================================================================

/// Little-endian cursor that refuses to read past the end
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(VolError::Corrupt(format!(
                "truncated image: need {} bytes at offset {}, {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    /// Length-prefixed payload
    fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn string(&mut self) -> Result<String> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| VolError::Corrupt(format!("invalid UTF-8 in name: {}", e)))
    }

    /// Element count, rejected up front if the rest of the image cannot hold
    /// that many items of at least `min_item_size` bytes
    fn count(&mut self, min_item_size: usize, what: &str) -> Result<usize> {
        let count = self.u32()? as usize;
        if count.saturating_mul(min_item_size) > self.remaining() {
            return Err(VolError::Corrupt(format!(
                "{} {} declared but only {} bytes remain",
                count,
                what,
                self.remaining()
            )));
        }
        Ok(count)
    }
}
