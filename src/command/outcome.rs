//! Outcome definitions
//!
//! What a successfully executed command hands back for rendering.

use crate::engine::Usage;
use crate::namespace::Listing;

/// Result of executing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A mutation succeeded; carries a confirmation message
    Done(String),

    /// File content (readfile)
    Content(Vec<u8>),

    /// Current container listing (ls)
    Listing(Listing),

    /// Block and namespace usage (df)
    Usage(Usage),

    /// Name of the current container (pwd)
    Directory(String),

    /// Show the command list
    Help,

    /// Leave the shell
    Exit,
}

impl Outcome {
    /// Create a Done outcome
    pub fn done(message: impl Into<String>) -> Self {
        Outcome::Done(message.into())
    }
}
