//! Image Store
//!
//! Owns the backing file of one volume and replaces it atomically.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::Result;

/// Backing store for a single volume image
#[derive(Debug, Clone)]
pub struct ImageStore {
    /// Current image
    path: PathBuf,
    /// In-flight save, renamed over `path` once fully written
    tmp_path: PathBuf,
    /// Where an image that failed to decode is moved aside
    corrupt_path: PathBuf,
    sync_strategy: SyncStrategy,
}

impl ImageStore {
    /// Store for the image at `path`
    pub fn new(path: impl Into<PathBuf>, sync_strategy: SyncStrategy) -> Self {
        let path = path.into();
        let tmp_path = Self::sibling(&path, "tmp");
        let corrupt_path = Self::sibling(&path, "corrupt");
        Self {
            path,
            tmp_path,
            corrupt_path,
            sync_strategy,
        }
    }

    /// Read the whole image, or `None` if there is none yet
    pub fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the image with `bytes`
    ///
    /// Writes a temp file next to the image and renames it into place, so a
    /// failed save never leaves a half-written image behind.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        if let Err(e) = self.write_tmp(bytes) {
            let _ = fs::remove_file(&self.tmp_path);
            return Err(e);
        }
        fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }

    /// Move the current image aside so a fresh one can take its place
    pub fn quarantine(&self) -> Result<PathBuf> {
        fs::rename(&self.path, &self.corrupt_path)?;
        Ok(self.corrupt_path.clone())
    }

    /// Path of the current image
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path an undecodable image is moved to
    pub fn corrupt_path(&self) -> &Path {
        &self.corrupt_path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_tmp(&self, bytes: &[u8]) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.tmp_path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;

        if self.sync_strategy == SyncStrategy::EverySave {
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// "volume.img" + "tmp" → "volume.img.tmp"
    fn sibling(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(suffix);
        path.with_file_name(name)
    }
}
