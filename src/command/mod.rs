//! Command Module
//!
//! The textual surface used by the interactive shell.
//!
//! ## Grammar
//! One command per line, whitespace-separated tokens:
//! ```text
//! cd <directory>
//! createfile <name> <permissions> <size>
//! writefile <name> <content...>
//! readfile <name>
//! deletefile <name>
//! appendfile <name> <content...>
//! ls | pwd | df
//! mkdir <name>
//! mv <source> <destination>
//! rename <old name> <new name>
//! help | exit
//! ```
//! Multi-token content is joined back together with single spaces.
//!
//! Parsing only checks shape (arity, integer sizes); all semantic
//! validation happens in the engine.

mod outcome;
mod parser;

pub use outcome::Outcome;
pub use parser::Command;

/// Text printed by `help`
pub const HELP_TEXT: &str = "\
Available commands:
- cd <directory>: Change directory
- createfile <name> <permissions> <size>: Create a new file
- writefile <name> <content>: Write content to a file
- readfile <name>: Read content from a file
- deletefile <name>: Delete a file
- ls: List files and directories in the current directory
- pwd: Show the current directory
- df: Show block usage
- mkdir <name>: Create a new directory
- mv <source> <destination>: Move a directory
- rename <old name> <new name>: Rename a file or directory
- appendfile <name> <content>: Append content to an existing file
- help: Display available commands
- exit: Exit the file system";
