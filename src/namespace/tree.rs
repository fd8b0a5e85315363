//! Namespace: the container map and the current-container cursor
//!
//! Every operation validates fully before it mutates anything. The only
//! side effect outside the namespace is block allocation, which happens last
//! in `create_file` and is all-or-nothing.

use std::collections::{BTreeMap, HashSet};

use crate::allocator::{required_blocks, BlockAllocator};
use crate::error::{Result, VolError};

use super::{validate_name, Container, FileRecord, FileSummary, Limits, Listing, ROOT_NAME};

/// What a rename touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenamedEntry {
    File,
    Container,
}

/// All containers plus the one operations act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    containers: BTreeMap<String, Container>,
    current: String,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    /// Fresh namespace holding only the root container
    pub fn new() -> Self {
        let mut containers = BTreeMap::new();
        containers.insert(ROOT_NAME.to_string(), Container::new(None));
        Self {
            containers,
            current: ROOT_NAME.to_string(),
        }
    }

    /// Reassemble a namespace read back from an image
    ///
    /// Structural consistency is checked; the result is `Corrupt` if the
    /// links do not line up.
    pub(crate) fn from_parts(
        current: String,
        containers: BTreeMap<String, Container>,
    ) -> Result<Self> {
        let namespace = Self {
            containers,
            current,
        };
        namespace.check_consistency()?;
        Ok(namespace)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Name of the current container
    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers.get(name)
    }

    /// Containers in name order
    pub fn containers(&self) -> impl Iterator<Item = (&str, &Container)> {
        self.containers
            .iter()
            .map(|(name, container)| (name.as_str(), container))
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Files across every container
    pub fn file_count(&self) -> usize {
        self.containers.values().map(Container::file_count).sum()
    }

    /// Every file record, container by container in name order
    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.containers.values().flat_map(Container::files)
    }

    /// Read a file in the current container
    pub fn read_file(&self, name: &str) -> Result<&[u8]> {
        self.current_container()?
            .file(name)
            .map(FileRecord::content)
            .ok_or_else(|| file_not_found(name))
    }

    /// Files and child containers of the current container
    pub fn list_current(&self) -> Result<Listing> {
        let container = self.current_container()?;

        let files = container
            .files()
            .map(|file| FileSummary {
                name: file.name().to_string(),
                permissions: file.permissions().to_string(),
                len: file.len(),
                declared_size: file.declared_size(),
            })
            .collect();

        Ok(Listing {
            container: self.current.clone(),
            files,
            children: container.children().to_vec(),
        })
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Make `name` the current container
    pub fn change_current(&mut self, name: &str) -> Result<()> {
        if !self.containers.contains_key(name) {
            return Err(VolError::NotFound(format!("Directory '{}' not found!", name)));
        }
        self.current = name.to_string();
        Ok(())
    }

    // =========================================================================
    // File Operations
    // =========================================================================

    /// Create an empty file backed by `ceil(declared_size / block_size)` blocks
    pub fn create_file(
        &mut self,
        allocator: &mut BlockAllocator,
        limits: &Limits,
        name: &str,
        permissions: &str,
        declared_size: u64,
    ) -> Result<&FileRecord> {
        validate_name("File", name)?;
        if declared_size == 0 {
            return Err(VolError::InvalidArgument(
                "File size must be positive!".to_string(),
            ));
        }

        let container = self.current_container()?;
        if container.has_file(name) {
            return Err(VolError::AlreadyExists(format!(
                "File '{}' already exists in the current directory!",
                name
            )));
        }
        if container.file_count() >= limits.max_files_per_container {
            return Err(VolError::CapacityLimitReached(format!(
                "Maximum number of files in the directory reached ({})!",
                limits.max_files_per_container
            )));
        }

        let blocks = allocator.allocate(required_blocks(declared_size, limits.block_size))?;
        let record = FileRecord::new(
            name.to_string(),
            permissions.to_string(),
            declared_size,
            blocks,
        );

        let container = self.current_container_mut()?;
        container.insert_file(record);
        container.file(name).ok_or_else(|| file_not_found(name))
    }

    /// Replace a file's content; must fit within its declared size
    pub fn write_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        self.current_file_mut(name)?.replace(content)
    }

    /// Append to a file's content; the total must fit within its declared size
    pub fn append_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        self.current_file_mut(name)?.append(content)
    }

    /// Delete a file and return its blocks to the allocator
    pub fn delete_file(&mut self, allocator: &mut BlockAllocator, name: &str) -> Result<FileRecord> {
        let container = self.current_container_mut()?;
        let record = container.remove_file(name).ok_or_else(|| file_not_found(name))?;
        allocator.release(record.blocks());
        Ok(record)
    }

    // =========================================================================
    // Container Operations
    // =========================================================================

    /// Create an empty container linked under the current one
    pub fn create_container(&mut self, limits: &Limits, name: &str) -> Result<()> {
        validate_name("Directory", name)?;

        let current = self.current_container()?;
        if current.has_file(name) || self.containers.contains_key(name) {
            return Err(VolError::AlreadyExists(format!(
                "File or directory '{}' already exists!",
                name
            )));
        }
        if self.containers.len() >= limits.max_containers {
            return Err(VolError::CapacityLimitReached(format!(
                "File system reached maximum directory limit ({})!",
                limits.max_containers
            )));
        }

        let parent = self.current.clone();
        self.containers
            .insert(name.to_string(), Container::new(Some(parent)));
        self.current_container_mut()?.push_child(name.to_string());
        Ok(())
    }

    /// Relink `source` under `destination`
    pub fn move_container(&mut self, source: &str, destination: &str) -> Result<()> {
        for name in [source, destination] {
            if !self.containers.contains_key(name) {
                return Err(VolError::NotFound(format!("Directory '{}' not found!", name)));
            }
        }
        if source == destination {
            return Err(VolError::InvalidArgument(
                "Source and destination directories are the same!".to_string(),
            ));
        }
        if self.is_descendant(destination, source) {
            return Err(VolError::CycleDetected {
                source_name: source.to_string(),
                destination: destination.to_string(),
            });
        }

        let old_parent = self
            .containers
            .get(source)
            .and_then(|container| container.parent().map(str::to_string));
        if let Some(parent) = old_parent {
            if let Some(container) = self.containers.get_mut(&parent) {
                container.remove_child(source);
            }
        }

        if let Some(container) = self.containers.get_mut(destination) {
            container.push_child(source.to_string());
        }
        if let Some(container) = self.containers.get_mut(source) {
            container.set_parent(Some(destination.to_string()));
        }
        Ok(())
    }

    /// Rename a file or child container of the current container
    ///
    /// Files win when a file and a child container share `old_name`. The new
    /// name must not be taken by a file here or by any container.
    pub fn rename_entry(&mut self, old_name: &str, new_name: &str) -> Result<RenamedEntry> {
        let current = self.current_container()?;
        let entry = if current.has_file(old_name) {
            RenamedEntry::File
        } else if current.has_child(old_name) && self.containers.contains_key(old_name) {
            RenamedEntry::Container
        } else {
            return Err(VolError::NotFound(format!(
                "File or directory '{}' not found!",
                old_name
            )));
        };

        validate_name("New", new_name)?;

        if current.has_file(new_name) || self.containers.contains_key(new_name) {
            return Err(VolError::AlreadyExists(format!(
                "File or directory '{}' already exists!",
                new_name
            )));
        }

        match entry {
            RenamedEntry::File => {
                let container = self.current_container_mut()?;
                let mut record = container
                    .remove_file(old_name)
                    .ok_or_else(|| file_not_found(old_name))?;
                record.set_name(new_name.to_string());
                container.insert_file(record);
            }
            RenamedEntry::Container => self.rename_container(old_name, new_name)?,
        }

        Ok(entry)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn current_container(&self) -> Result<&Container> {
        self.containers
            .get(&self.current)
            .ok_or_else(missing_current)
    }

    fn current_container_mut(&mut self) -> Result<&mut Container> {
        self.containers
            .get_mut(&self.current)
            .ok_or_else(missing_current)
    }

    fn current_file_mut(&mut self, name: &str) -> Result<&mut FileRecord> {
        self.current_container_mut()?
            .file_mut(name)
            .ok_or_else(|| file_not_found(name))
    }

    /// Whether `target` is reachable from `ancestor` through child links
    fn is_descendant(&self, target: &str, ancestor: &str) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![ancestor];

        while let Some(name) = stack.pop() {
            if !visited.insert(name) {
                continue;
            }
            let Some(container) = self.containers.get(name) else {
                continue;
            };
            for child in container.children() {
                if child == target {
                    return true;
                }
                stack.push(child.as_str());
            }
        }

        false
    }

    fn rename_container(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let container = self.containers.remove(old_name).ok_or_else(|| {
            VolError::NotFound(format!("Directory '{}' not found!", old_name))
        })?;

        if let Some(parent) = container.parent().map(str::to_string) {
            if let Some(parent) = self.containers.get_mut(&parent) {
                parent.rename_child(old_name, new_name);
            }
        }
        for child in container.children() {
            if let Some(child) = self.containers.get_mut(child) {
                child.set_parent(Some(new_name.to_string()));
            }
        }

        self.containers.insert(new_name.to_string(), container);
        if self.current == old_name {
            self.current = new_name.to_string();
        }
        Ok(())
    }

    /// Verify the links between containers line up
    fn check_consistency(&self) -> Result<()> {
        if !self.containers.contains_key(&self.current) {
            return Err(VolError::Corrupt(format!(
                "current directory '{}' is not a container",
                self.current
            )));
        }

        for (name, container) in &self.containers {
            match container.parent() {
                Some(parent) => {
                    let listed = self
                        .containers
                        .get(parent)
                        .is_some_and(|parent| parent.has_child(name));
                    if !listed {
                        return Err(VolError::Corrupt(format!(
                            "directory '{}' is not listed under its parent '{}'",
                            name, parent
                        )));
                    }
                }
                None if name != ROOT_NAME => {
                    return Err(VolError::Corrupt(format!(
                        "directory '{}' has no parent",
                        name
                    )));
                }
                None => {}
            }

            for child in container.children() {
                let linked = self
                    .containers
                    .get(child)
                    .is_some_and(|child| child.parent() == Some(name.as_str()));
                if !linked {
                    return Err(VolError::Corrupt(format!(
                        "child '{}' of '{}' does not link back",
                        child, name
                    )));
                }
            }
        }

        self.check_reachable()
    }

    /// Every container hangs off the root exactly once
    fn check_reachable(&self) -> Result<()> {
        if !self.containers.contains_key(ROOT_NAME) {
            return Err(VolError::Corrupt("root directory is missing".to_string()));
        }

        let mut visited = HashSet::new();
        let mut stack = vec![ROOT_NAME];
        while let Some(name) = stack.pop() {
            if !visited.insert(name) {
                return Err(VolError::Corrupt(format!(
                    "directory '{}' is reachable more than once",
                    name
                )));
            }
            if let Some(container) = self.containers.get(name) {
                stack.extend(container.children().iter().map(String::as_str));
            }
        }

        if let Some(orphan) = self.containers.keys().find(|name| !visited.contains(name.as_str())) {
            return Err(VolError::Corrupt(format!(
                "directory '{}' is not reachable from the root",
                orphan
            )));
        }
        Ok(())
    }
}

fn file_not_found(name: &str) -> VolError {
    VolError::NotFound(format!("File '{}' not found!", name))
}

fn missing_current() -> VolError {
    VolError::NotFound("Current directory does not exist!".to_string())
}
