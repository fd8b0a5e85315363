//! Command definitions and line parsing

use crate::error::{Result, VolError};

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Make another container current
    ChangeDirectory { name: String },

    /// Create an empty file with a declared size
    CreateFile {
        name: String,
        permissions: String,
        size: u64,
    },

    /// Replace a file's content
    WriteFile { name: String, content: Vec<u8> },

    /// Print a file's content
    ReadFile { name: String },

    /// Delete a file
    DeleteFile { name: String },

    /// Append to a file's content
    AppendFile { name: String, content: Vec<u8> },

    /// List the current container
    List,

    /// Show the current container's name
    PrintDirectory,

    /// Show block usage
    Usage,

    /// Create a container under the current one
    MakeDirectory { name: String },

    /// Relink a container under another
    Move { source: String, destination: String },

    /// Rename a file or child container
    Rename { old_name: String, new_name: String },

    /// Show the command list
    Help,

    /// Leave the shell
    Exit,
}

impl Command {
    /// Parse one input line
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&keyword, args)) = tokens.split_first() else {
            return Ok(None);
        };

        let command = match keyword {
            "cd" => {
                expect_args(args, 1, "cd <directory>")?;
                Command::ChangeDirectory {
                    name: args[0].to_string(),
                }
            }
            "createfile" => {
                expect_args(args, 3, "createfile <name> <permissions> <size>")?;
                Command::CreateFile {
                    name: args[0].to_string(),
                    permissions: args[1].to_string(),
                    size: parse_size(args[2])?,
                }
            }
            "writefile" => {
                expect_args(args, 2, "writefile <name> <content>")?;
                Command::WriteFile {
                    name: args[0].to_string(),
                    content: join_content(&args[1..]),
                }
            }
            "readfile" => {
                expect_args(args, 1, "readfile <name>")?;
                Command::ReadFile {
                    name: args[0].to_string(),
                }
            }
            "deletefile" => {
                expect_args(args, 1, "deletefile <name>")?;
                Command::DeleteFile {
                    name: args[0].to_string(),
                }
            }
            "appendfile" => {
                expect_args(args, 2, "appendfile <name> <content>")?;
                Command::AppendFile {
                    name: args[0].to_string(),
                    content: join_content(&args[1..]),
                }
            }
            "ls" => Command::List,
            "pwd" => Command::PrintDirectory,
            "df" => Command::Usage,
            "mkdir" => {
                expect_args(args, 1, "mkdir <name>")?;
                Command::MakeDirectory {
                    name: args[0].to_string(),
                }
            }
            "mv" => {
                expect_args(args, 2, "mv <source> <destination>")?;
                Command::Move {
                    source: args[0].to_string(),
                    destination: args[1].to_string(),
                }
            }
            "rename" => {
                expect_args(args, 2, "rename <old name> <new name>")?;
                Command::Rename {
                    old_name: args[0].to_string(),
                    new_name: args[1].to_string(),
                }
            }
            "help" => Command::Help,
            "exit" => Command::Exit,
            _ => {
                return Err(VolError::InvalidArgument(
                    "Invalid command! Type 'help' to see the available commands.".to_string(),
                ))
            }
        };

        Ok(Some(command))
    }

    /// Short name used in log events
    pub fn name(&self) -> &'static str {
        match self {
            Command::ChangeDirectory { .. } => "cd",
            Command::CreateFile { .. } => "createfile",
            Command::WriteFile { .. } => "writefile",
            Command::ReadFile { .. } => "readfile",
            Command::DeleteFile { .. } => "deletefile",
            Command::AppendFile { .. } => "appendfile",
            Command::List => "ls",
            Command::PrintDirectory => "pwd",
            Command::Usage => "df",
            Command::MakeDirectory { .. } => "mkdir",
            Command::Move { .. } => "mv",
            Command::Rename { .. } => "rename",
            Command::Help => "help",
            Command::Exit => "exit",
        }
    }

    /// Whether executing this command changes persisted state
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::ChangeDirectory { .. }
                | Command::CreateFile { .. }
                | Command::WriteFile { .. }
                | Command::DeleteFile { .. }
                | Command::AppendFile { .. }
                | Command::MakeDirectory { .. }
                | Command::Move { .. }
                | Command::Rename { .. }
        )
    }
}

fn expect_args(args: &[&str], min: usize, usage: &str) -> Result<()> {
    if args.len() < min {
        return Err(VolError::InvalidArgument(format!(
            "Invalid command syntax! Usage: {}",
            usage
        )));
    }
    Ok(())
}

fn parse_size(token: &str) -> Result<u64> {
    let size: i64 = token.parse().map_err(|_| {
        VolError::InvalidArgument(format!("Invalid size '{}': must be an integer", token))
    })?;
    if size <= 0 {
        return Err(VolError::InvalidArgument(
            "File size must be positive!".to_string(),
        ));
    }
    Ok(size as u64)
}

fn join_content(tokens: &[&str]) -> Vec<u8> {
    tokens.join(" ").into_bytes()
}
