//! Configuration for flatvol
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, VolError};

/// Number of blocks in the pool unless configured otherwise
pub const DEFAULT_BLOCK_COUNT: u32 = 1024;

/// Bytes per block unless configured otherwise
pub const DEFAULT_BLOCK_SIZE: u32 = 1024;

/// Maximum number of files a single container may hold
pub const DEFAULT_MAX_FILES_PER_CONTAINER: usize = 1000;

/// Maximum number of containers in the namespace (root included)
pub const DEFAULT_MAX_CONTAINERS: usize = 100;

/// Largest pool the image format can describe
///
/// File content is bounded by the pool size and stored with a u32 length
/// prefix, so the pool itself must fit in a u32 byte count.
pub const MAX_POOL_BYTES: u64 = u32::MAX as u64;

/// Main configuration for a flatvol instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the volume image
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── volume.img          (current image)
    ///     ├── volume.img.tmp      (in-flight save, renamed over volume.img)
    ///     └── volume.img.corrupt  (last image that failed to decode)
    pub data_dir: PathBuf,

    /// How hard each save pushes the image to disk
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Block Pool Geometry
    // -------------------------------------------------------------------------
    /// Number of blocks in the pool
    pub block_count: u32,

    /// Size of a single block in bytes
    pub block_size: u32,

    // -------------------------------------------------------------------------
    // Namespace Limits
    // -------------------------------------------------------------------------
    /// Max files in one container
    pub max_files_per_container: usize,

    /// Max containers overall
    pub max_containers: usize,
}

/// Image sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync the temp image before renaming it into place (safest, slowest)
    EverySave,

    /// Leave flushing to the OS page cache
    OsBuffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./flatvol_data"),
            sync_strategy: SyncStrategy::EverySave,
            block_count: DEFAULT_BLOCK_COUNT,
            block_size: DEFAULT_BLOCK_SIZE,
            max_files_per_container: DEFAULT_MAX_FILES_PER_CONTAINER,
            max_containers: DEFAULT_MAX_CONTAINERS,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject geometries and limits the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.block_count == 0 {
            return Err(VolError::Config("block_count must be positive".to_string()));
        }
        if self.block_size == 0 {
            return Err(VolError::Config("block_size must be positive".to_string()));
        }
        let pool_bytes = u64::from(self.block_count) * u64::from(self.block_size);
        if pool_bytes > MAX_POOL_BYTES {
            return Err(VolError::Config(format!(
                "pool of {} blocks x {} bytes exceeds {} bytes",
                self.block_count, self.block_size, MAX_POOL_BYTES
            )));
        }
        if self.max_files_per_container == 0 {
            return Err(VolError::Config(
                "max_files_per_container must be positive".to_string(),
            ));
        }
        if self.max_containers == 0 {
            return Err(VolError::Config("max_containers must be positive".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (holds the volume image)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the image sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the number of blocks in the pool
    pub fn block_count(mut self, count: u32) -> Self {
        self.config.block_count = count;
        self
    }

    /// Set the block size (in bytes)
    pub fn block_size(mut self, size: u32) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the maximum number of files per container
    pub fn max_files_per_container(mut self, count: usize) -> Self {
        self.config.max_files_per_container = count;
        self
    }

    /// Set the maximum number of containers
    pub fn max_containers(mut self, count: usize) -> Self {
        self.config.max_containers = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
