//! Image Encoder
//!
//! Writes a namespace into the V1 image layout.

use crate::namespace::{Container, FileRecord, Namespace};

use super::{Geometry, HEADER_SIZE, MAGIC, VERSION};

/// Encode a full image: header, body and CRC footer
pub fn encode(namespace: &Namespace, geometry: Geometry) -> Vec<u8> {
    let mut writer = ImageWriter::with_capacity(HEADER_SIZE + estimate_body(namespace));

    // Header
    writer.put_raw(MAGIC);
    writer.put_u16(VERSION);
    writer.put_u16(0); // Reserved
    writer.put_u32(geometry.block_size);
    writer.put_u32(geometry.block_count);

    // Body
    writer.put_u32(namespace.container_count() as u32);
    writer.put_str(namespace.current());
    for (name, container) in namespace.containers() {
        write_container(&mut writer, name, container);
    }

    writer.finish()
}

fn write_container(writer: &mut ImageWriter, name: &str, container: &Container) {
    writer.put_str(name);

    match container.parent() {
        Some(parent) => {
            writer.put_u8(1);
            writer.put_str(parent);
        }
        None => writer.put_u8(0),
    }

    writer.put_u32(container.children().len() as u32);
    for child in container.children() {
        writer.put_str(child);
    }

    writer.put_u32(container.file_count() as u32);
    for file in container.files() {
        write_file(writer, file);
    }
}

fn write_file(writer: &mut ImageWriter, file: &FileRecord) {
    writer.put_str(file.name());
    writer.put_bytes(file.content());
    writer.put_str(file.permissions());
    writer.put_u64(file.declared_size());

    writer.put_u32(file.blocks().len() as u32);
    for &block in file.blocks() {
        writer.put_u32(block);
    }
}

/// Rough body size so the buffer is allocated once in the common case
fn estimate_body(namespace: &Namespace) -> usize {
    namespace
        .files()
        .map(|file| 32 + file.name().len() + file.content().len() + file.blocks().len() * 4)
        .sum::<usize>()
        + namespace.container_count() * 32
}

/// Little-endian byte sink with a running CRC
struct ImageWriter {
    buf: Vec<u8>,
    hasher: crc32fast::Hasher,
}

impl ImageWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            hasher: crc32fast::Hasher::new(),
        }
    }

    fn put_raw(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.buf.extend_from_slice(bytes);
    }

    fn put_u8(&mut self, value: u8) {
        self.put_raw(&[value]);
    }

    fn put_u16(&mut self, value: u16) {
        self.put_raw(&value.to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.put_raw(&value.to_le_bytes());
    }

    fn put_u64(&mut self, value: u64) {
        self.put_raw(&value.to_le_bytes());
    }

    /// Length-prefixed payload
    fn put_bytes(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.put_raw(bytes);
    }

    fn put_str(&mut self, value: &str) {
        self.put_bytes(value.as_bytes());
    }

    /// Append the CRC footer and hand back the image
    fn finish(mut self) -> Vec<u8> {
        let crc = self.hasher.finalize();
        self.buf.extend_from_slice(&crc.to_le_bytes());
        self.buf
    }
}
