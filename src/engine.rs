//! Engine Module
//!
//! The storage engine facade that coordinates all components.
//!
//! ## Responsibilities
//! - Load the volume image on startup (or initialize a fresh volume)
//! - Validate and apply every namespace operation
//! - Consult the block allocator when files are created or deleted
//! - Save the full image after every successful mutation
//!
//! ## Operation Flow
//! ```text
//! caller ──► StorageEngine ──► Namespace (validate, then mutate)
//!                 │                 │
//!                 │                 └──► BlockAllocator (create/delete only)
//!                 │
//!                 └──► image::encode ──► ImageStore (tmp + rename)
//! ```

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::allocator::BlockAllocator;
use crate::command::{Command, Outcome};
use crate::config::Config;
use crate::error::{Result, VolError};
use crate::image::{self, Geometry, ImageStore};
use crate::namespace::{Limits, Listing, Namespace, RenamedEntry};

/// Block and namespace usage figures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub block_size: u32,
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub containers: usize,
    pub files: usize,
}

impl Usage {
    pub fn used_blocks(&self) -> u32 {
        self.total_blocks - self.free_blocks
    }
}

/// The main storage engine
///
/// ## Concurrency Model: Single Owner
///
/// Every operation takes `&self` or `&mut self` and runs to completion,
/// including the image save, before returning. The allocator and namespace
/// are plain fields; callers that need to share an engine across threads go
/// through [`SharedEngine`](crate::shared::SharedEngine), which holds one lock
/// across each whole operation.
#[derive(Debug)]
pub struct StorageEngine {
    /// Engine configuration
    config: Config,

    /// Namespace ceilings and block sizing derived from `config`
    limits: Limits,

    /// Backing file for the volume image
    store: ImageStore,

    /// Free/used bitmap for the block pool
    allocator: BlockAllocator,

    /// Containers, files and the current-container cursor
    namespace: Namespace,
}

impl StorageEngine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const IMAGE_FILENAME: &'static str = "volume.img";

    /// Open or create a volume with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the data directory
    /// 2. Read the image if one exists
    /// 3. Decode it and rebuild the allocator from the persisted block indices
    /// 4. Missing image → fresh volume; corrupt or unreadable image → moved
    ///    aside, fresh volume (if it cannot be moved, `open` fails instead)
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let store = ImageStore::new(
            config.data_dir.join(Self::IMAGE_FILENAME),
            config.sync_strategy,
        );
        let geometry = Geometry {
            block_size: config.block_size,
            block_count: config.block_count,
        };

        let restored = match store.read() {
            Ok(Some(bytes)) => match Self::restore(&bytes, geometry) {
                Ok(state) => Some(state),
                Err(VolError::Corrupt(reason)) => {
                    let moved_to = store.quarantine()?;
                    warn!(
                        image = %store.path().display(),
                        moved_to = %moved_to.display(),
                        %reason,
                        "volume image is corrupt, starting a fresh volume"
                    );
                    None
                }
                Err(e) => return Err(e),
            },
            Ok(None) => None,
            Err(e) => {
                let moved_to = store.quarantine()?;
                warn!(
                    image = %store.path().display(),
                    moved_to = %moved_to.display(),
                    error = %e,
                    "volume image is unreadable, starting a fresh volume"
                );
                None
            }
        };

        let limits = Limits::from(&config);
        match restored {
            Some((namespace, allocator)) => {
                info!(
                    image = %store.path().display(),
                    containers = namespace.container_count(),
                    files = namespace.file_count(),
                    free_blocks = allocator.free_count(),
                    "volume loaded"
                );
                Ok(Self {
                    config,
                    limits,
                    store,
                    allocator,
                    namespace,
                })
            }
            None => Self::initialize(config, limits, store),
        }
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.data_dir = path.to_path_buf();
        Self::open(config)
    }

    /// Execute a command
    ///
    /// Routes commands to the matching operation
    pub fn execute(&mut self, command: Command) -> Result<Outcome> {
        debug!(command = command.name(), "execute");

        match command {
            Command::ChangeDirectory { name } => {
                self.change_current(&name)?;
                Ok(Outcome::done(format!("Changed directory to: {}", name)))
            }
            Command::CreateFile {
                name,
                permissions,
                size,
            } => {
                self.create_file(&name, &permissions, size)?;
                Ok(Outcome::done("File created successfully."))
            }
            Command::WriteFile { name, content } => {
                self.write_file(&name, &content)?;
                Ok(Outcome::done("File written successfully."))
            }
            Command::ReadFile { name } => Ok(Outcome::Content(self.read_file(&name)?.to_vec())),
            Command::DeleteFile { name } => {
                self.delete_file(&name)?;
                Ok(Outcome::done("File deleted successfully."))
            }
            Command::AppendFile { name, content } => {
                self.append_file(&name, &content)?;
                Ok(Outcome::done("Content appended to file successfully."))
            }
            Command::List => Ok(Outcome::Listing(self.list_current()?)),
            Command::PrintDirectory => Ok(Outcome::Directory(self.current().to_string())),
            Command::Usage => Ok(Outcome::Usage(self.usage())),
            Command::MakeDirectory { name } => {
                self.create_container(&name)?;
                Ok(Outcome::done("Directory created successfully."))
            }
            Command::Move {
                source,
                destination,
            } => {
                self.move_container(&source, &destination)?;
                Ok(Outcome::done("Directory moved successfully."))
            }
            Command::Rename { old_name, new_name } => {
                self.rename_entry(&old_name, &new_name)?;
                Ok(Outcome::done("Entry renamed successfully."))
            }
            Command::Help => Ok(Outcome::Help),
            Command::Exit => Ok(Outcome::Exit),
        }
    }

    // =========================================================================
    // Namespace Operations
    // =========================================================================

    /// Make `name` the current container
    pub fn change_current(&mut self, name: &str) -> Result<()> {
        self.namespace.change_current(name)?;
        self.save()?;
        debug!(current = name, "current directory changed");
        Ok(())
    }

    /// Create an empty file of `declared_size` bytes in the current container
    ///
    /// Steps:
    /// 1. Validate name, size, uniqueness and the per-container file ceiling
    /// 2. Allocate `ceil(declared_size / block_size)` blocks (all or nothing)
    /// 3. Insert the record and save
    pub fn create_file(&mut self, name: &str, permissions: &str, declared_size: u64) -> Result<()> {
        let record = self.namespace.create_file(
            &mut self.allocator,
            &self.limits,
            name,
            permissions,
            declared_size,
        )?;
        let blocks = record.blocks().len();

        self.save()?;
        debug!(
            name,
            declared_size,
            blocks,
            free_blocks = self.allocator.free_count(),
            "file created"
        );
        Ok(())
    }

    /// Replace a file's content
    ///
    /// Fails with `CapacityExceeded` if `content` is longer than the
    /// file's declared size.
    pub fn write_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        self.namespace.write_file(name, content)?;
        self.save()?;
        debug!(name, len = content.len(), "file written");
        Ok(())
    }

    /// Read a file's content
    pub fn read_file(&self, name: &str) -> Result<&[u8]> {
        self.namespace.read_file(name)
    }

    /// Append to a file's content
    ///
    /// Fails with `CapacityExceeded` if the combined length would exceed the
    /// file's declared size.
    pub fn append_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        self.namespace.append_file(name, content)?;
        self.save()?;
        debug!(name, appended = content.len(), "file appended");
        Ok(())
    }

    /// Delete a file and release its blocks
    pub fn delete_file(&mut self, name: &str) -> Result<()> {
        let record = self.namespace.delete_file(&mut self.allocator, name)?;
        self.save()?;
        debug!(
            name,
            released = record.blocks().len(),
            free_blocks = self.allocator.free_count(),
            "file deleted"
        );
        Ok(())
    }

    /// Files and child containers of the current container
    pub fn list_current(&self) -> Result<Listing> {
        self.namespace.list_current()
    }

    /// Create a container linked under the current one
    pub fn create_container(&mut self, name: &str) -> Result<()> {
        self.namespace.create_container(&self.limits, name)?;
        self.save()?;
        debug!(name, parent = self.namespace.current(), "directory created");
        Ok(())
    }

    /// Relink `source` under `destination`
    pub fn move_container(&mut self, source: &str, destination: &str) -> Result<()> {
        self.namespace.move_container(source, destination)?;
        self.save()?;
        debug!(source, destination, "directory moved");
        Ok(())
    }

    /// Rename a file or child container of the current container
    pub fn rename_entry(&mut self, old_name: &str, new_name: &str) -> Result<RenamedEntry> {
        let entry = self.namespace.rename_entry(old_name, new_name)?;
        self.save()?;
        debug!(old_name, new_name, entry = ?entry, "entry renamed");
        Ok(entry)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the full image to the backing store
    pub fn save(&self) -> Result<()> {
        let bytes = image::encode(&self.namespace, self.geometry());
        self.store.write(&bytes)
    }

    /// Close the engine gracefully
    ///
    /// Saves once more so the image reflects the final state
    pub fn close(self) -> Result<()> {
        self.save()?;
        info!(image = %self.store.path().display(), "volume closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Name of the current container
    pub fn current(&self) -> &str {
        self.namespace.current()
    }

    /// Block and namespace usage
    pub fn usage(&self) -> Usage {
        Usage {
            block_size: self.config.block_size,
            total_blocks: self.allocator.capacity(),
            free_blocks: self.allocator.free_count(),
            containers: self.namespace.container_count(),
            files: self.namespace.file_count(),
        }
    }

    /// Number of free blocks
    pub fn free_count(&self) -> u32 {
        self.allocator.free_count()
    }

    /// Total number of blocks
    pub fn capacity(&self) -> u32 {
        self.allocator.capacity()
    }

    /// The namespace as currently held in memory
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The block bitmap as currently held in memory
    pub fn allocator(&self) -> &BlockAllocator {
        &self.allocator
    }

    /// Path of the volume image
    pub fn image_path(&self) -> &Path {
        self.store.path()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn geometry(&self) -> Geometry {
        Geometry {
            block_size: self.config.block_size,
            block_count: self.config.block_count,
        }
    }

    /// Decode an image and rebuild the allocator from it
    fn restore(bytes: &[u8], expected: Geometry) -> Result<(Namespace, BlockAllocator)> {
        let image = image::decode(bytes)?;
        if image.geometry != expected {
            return Err(VolError::Config(format!(
                "image has {} blocks of {} bytes, configuration expects {} blocks of {} bytes",
                image.geometry.block_count,
                image.geometry.block_size,
                expected.block_count,
                expected.block_size
            )));
        }
        let allocator = image.build_allocator()?;
        Ok((image.namespace, allocator))
    }

    /// Start a fresh volume holding only the root container and save it
    fn initialize(config: Config, limits: Limits, store: ImageStore) -> Result<Self> {
        let engine = Self {
            allocator: BlockAllocator::new(config.block_count),
            namespace: Namespace::new(),
            config,
            limits,
            store,
        };
        engine.save()?;
        info!(
            image = %engine.store.path().display(),
            blocks = engine.allocator.capacity(),
            block_size = engine.config.block_size,
            "initialized fresh volume"
        );
        Ok(engine)
    }
}
