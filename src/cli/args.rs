//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::idl::{Status, Step, Substep};

/// clusterup - inspect and repair the substep status record of a cluster upgrade.
#[derive(Debug, Parser)]
#[command(name = "clusterup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// State directory (defaults to $CLUSTERUP_HOME, then ~/.clusterup)
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show recorded substep statuses
    Status(StatusArgs),

    /// Forget a substep's status so the next invocation runs it again
    Reset(ResetArgs),

    /// Force a substep's recorded status
    Mark(MarkArgs),
}

/// Arguments for the `status` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StatusArgs {
    /// Show only this step
    #[arg(long, value_parser = parse_step)]
    pub step: Option<Step>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `reset` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ResetArgs {
    #[arg(long, value_parser = parse_step)]
    pub step: Step,

    #[arg(long, value_parser = parse_substep)]
    pub substep: Substep,
}

/// Arguments for the `mark` command.
#[derive(Debug, Clone, clap::Args)]
pub struct MarkArgs {
    #[arg(long, value_parser = parse_step)]
    pub step: Step,

    #[arg(long, value_parser = parse_substep)]
    pub substep: Substep,

    #[arg(long, value_parser = parse_status)]
    pub status: Status,
}

// Names are accepted in any case and with dashes: `init-target-cluster`.
fn normalize(name: &str) -> String {
    name.trim().replace('-', "_").to_uppercase()
}

fn parse_step(s: &str) -> Result<Step, String> {
    normalize(s).parse().map_err(|e: crate::error::UpgradeError| e.to_string())
}

fn parse_substep(s: &str) -> Result<Substep, String> {
    normalize(s).parse().map_err(|e: crate::error::UpgradeError| e.to_string())
}

fn parse_status(s: &str) -> Result<Status, String> {
    normalize(s).parse().map_err(|e: crate::error::UpgradeError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_names_loosely() {
        let cli = Cli::try_parse_from([
            "clusterup",
            "mark",
            "--step",
            "initialize",
            "--substep",
            "init-target-cluster",
            "--status",
            "Failed",
        ])
        .unwrap();

        match cli.command {
            Commands::Mark(args) => {
                assert_eq!(args.step, Step::Initialize);
                assert_eq!(args.substep, Substep::InitTargetCluster);
                assert_eq!(args.status, Status::Failed);
            }
            other => panic!("expected mark, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_substep() {
        let err = Cli::try_parse_from([
            "clusterup",
            "reset",
            "--step",
            "initialize",
            "--substep",
            "make-coffee",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("MAKE_COFFEE"));
    }

    #[test]
    fn global_state_dir_after_subcommand() {
        let cli = Cli::try_parse_from(["clusterup", "status", "--state-dir", "/tmp/state"]).unwrap();
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/state")));
    }
}
