//! Shared Engine Handle
//!
//! Lets several threads drive one volume. A single coarse lock covers the
//! allocator and the namespace together, so a read-then-mutate sequence
//! (check space, allocate, insert, save) is never interleaved with another.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::command::{Command, Outcome};
use crate::config::Config;
use crate::engine::StorageEngine;
use crate::error::Result;

/// Cloneable, thread-safe handle to a [`StorageEngine`]
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<StorageEngine>>,
}

impl SharedEngine {
    /// Open a volume and wrap it for sharing
    pub fn open(config: Config) -> Result<Self> {
        Ok(Self::new(StorageEngine::open(config)?))
    }

    /// Wrap an already-open engine
    pub fn new(engine: StorageEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` with exclusive access to the engine
    ///
    /// The lock is held for the whole closure; keep multi-step sequences
    /// that must appear atomic inside one call.
    pub fn with<R>(&self, f: impl FnOnce(&mut StorageEngine) -> R) -> R {
        let mut engine = self.inner.lock();
        f(&mut engine)
    }

    /// Execute a single command under the lock
    pub fn execute(&self, command: Command) -> Result<Outcome> {
        self.with(|engine| engine.execute(command))
    }
}
