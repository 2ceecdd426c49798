//! Command-line interface for clusterup.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, MarkArgs, ResetArgs, StatusArgs};
pub use commands::{Command, CommandDispatcher, CommandResult, EXIT_NOT_INITIALIZED};
