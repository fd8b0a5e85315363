//! Error types for flatvol
//!
//! Provides a unified error type for all operations, plus the coarse
//! [`ErrorKind`] taxonomy the command layer renders.

use std::fmt;

use thiserror::Error;

/// Result type alias using VolError
pub type Result<T> = std::result::Result<T, VolError>;

/// Unified error type for flatvol operations
#[derive(Debug, Error)]
pub enum VolError {
    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("File size exceeded: '{name}' holds at most {capacity} bytes, {requested} requested")]
    CapacityExceeded {
        name: String,
        capacity: u64,
        requested: u64,
    },

    #[error("Limit reached: {0}")]
    CapacityLimitReached(String),

    #[error("Insufficient storage space: {requested} blocks requested, {available} free")]
    InsufficientSpace { requested: u64, available: u64 },

    // -------------------------------------------------------------------------
    // Namespace Structure Errors
    // -------------------------------------------------------------------------
    #[error("Cannot move '{source_name}' inside its own subdirectory '{destination}'")]
    CycleDetected {
        source_name: String,
        destination: String,
    },

    // -------------------------------------------------------------------------
    // I/O and Image Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt volume image: {0}")]
    Corrupt(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse error classification handed to the command collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    CapacityExceeded,
    CapacityLimitReached,
    InsufficientSpace,
    CycleDetected,
    IoError,
}

impl VolError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            VolError::InvalidArgument(_) | VolError::Config(_) => ErrorKind::InvalidArgument,
            VolError::NotFound(_) => ErrorKind::NotFound,
            VolError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            VolError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            VolError::CapacityLimitReached(_) => ErrorKind::CapacityLimitReached,
            VolError::InsufficientSpace { .. } => ErrorKind::InsufficientSpace,
            VolError::CycleDetected { .. } => ErrorKind::CycleDetected,
            VolError::Io(_) | VolError::Corrupt(_) => ErrorKind::IoError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::CapacityExceeded => "CapacityExceeded",
            ErrorKind::CapacityLimitReached => "CapacityLimitReached",
            ErrorKind::InsufficientSpace => "InsufficientSpace",
            ErrorKind::CycleDetected => "CycleDetected",
            ErrorKind::IoError => "IOError",
        };
        f.write_str(name)
    }
}
