//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::state::{StatusRecord, SubstepFileStore};
use crate::ui::UserInterface;

/// Exit code when the state directory has no status record yet.
pub const EXIT_NOT_INITIALIZED: i32 = 2;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, reporting through `ui`.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Load the status record, telling the operator if there is none yet.
///
/// `Ok(None)` means the caller should exit with [`EXIT_NOT_INITIALIZED`].
pub(crate) fn load_record(
    store: &SubstepFileStore,
    ui: &mut dyn UserInterface,
) -> Result<Option<StatusRecord>> {
    match store.load() {
        Ok(record) => Ok(Some(record)),
        Err(e) if e.is_not_found() => {
            ui.error(&format!(
                "No status record at {}. Has initialize been run?",
                store.path().display()
            ));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    state_dir: PathBuf,
}

impl CommandDispatcher {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Route the CLI subcommand to its implementation and execute it.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Commands::Status(args) => {
                let cmd = super::status::StatusCommand::new(&self.state_dir, args.clone());
                cmd.execute(ui)
            }
            Commands::Reset(args) => {
                let cmd = super::reset::ResetCommand::new(&self.state_dir, args.clone());
                cmd.execute(ui)
            }
            Commands::Mark(args) => {
                let cmd = super::mark::MarkCommand::new(&self.state_dir, args.clone());
                cmd.execute(ui)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn command_result_codes() {
        assert_eq!(CommandResult::success().exit_code, 0);
        let failed = CommandResult::failure(EXIT_NOT_INITIALIZED);
        assert!(!failed.success);
        assert_eq!(failed.exit_code, 2);
    }

    #[test]
    fn dispatches_status_on_empty_state_dir() {
        let temp = TempDir::new().unwrap();
        let cli = Cli::parse_from(["clusterup", "status"]);
        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());
        let mut ui = MockUI::new();

        let result = dispatcher.dispatch(&cli, &mut ui).unwrap();

        assert_eq!(result.exit_code, EXIT_NOT_INITIALIZED);
        assert_eq!(ui.errors().len(), 1);
        assert_eq!(dispatcher.state_dir(), temp.path());
    }
}
