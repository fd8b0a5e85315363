//! Containers ("directories")

use std::collections::BTreeMap;

use super::FileRecord;

/// A named group of files plus logical links to other containers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    /// Container this one is listed under (None for the root)
    parent: Option<String>,
    /// Files keyed by name
    files: BTreeMap<String, FileRecord>,
    /// Names of child containers, in link order
    children: Vec<String>,
}

impl Container {
    pub(crate) fn new(parent: Option<String>) -> Self {
        Self {
            parent,
            files: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        parent: Option<String>,
        files: BTreeMap<String, FileRecord>,
        children: Vec<String>,
    ) -> Self {
        Self {
            parent,
            files,
            children,
        }
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn file(&self, name: &str) -> Option<&FileRecord> {
        self.files.get(name)
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Files in name order
    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|child| child == name)
    }

    // -------------------------------------------------------------------------
    // Mutation (namespace-internal)
    // -------------------------------------------------------------------------

    pub(crate) fn file_mut(&mut self, name: &str) -> Option<&mut FileRecord> {
        self.files.get_mut(name)
    }

    pub(crate) fn insert_file(&mut self, record: FileRecord) {
        self.files.insert(record.name().to_string(), record);
    }

    pub(crate) fn remove_file(&mut self, name: &str) -> Option<FileRecord> {
        self.files.remove(name)
    }

    pub(crate) fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    pub(crate) fn push_child(&mut self, name: String) {
        self.children.push(name);
    }

    /// Unlink the first child entry equal to `name`
    pub(crate) fn remove_child(&mut self, name: &str) -> bool {
        match self.children.iter().position(|child| child == name) {
            Some(pos) => {
                self.children.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Rewrite the first child entry equal to `old`
    pub(crate) fn rename_child(&mut self, old: &str, new: &str) -> bool {
        match self.children.iter_mut().find(|child| child.as_str() == old) {
            Some(child) => {
                *child = new.to_string();
                true
            }
            None => false,
        }
    }
}
