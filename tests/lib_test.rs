//! Library integration tests.

use clusterup::UpgradeError;

#[test]
fn error_types_are_public() {
    let err = UpgradeError::CommandFailed {
        command: "rsync".into(),
        code: Some(23),
    };
    assert!(err.to_string().contains("rsync"));
}

#[test]
fn result_type_alias_is_public() {
    fn test_fn() -> clusterup::Result<()> {
        Ok(())
    }
    assert!(test_fn().is_ok());
}

#[test]
fn cli_types_are_public() {
    use clap::Parser;
    use clusterup::cli::{Cli, Commands};

    let cli = Cli::parse_from(["clusterup", "status", "--json"]);

    if let Commands::Status(args) = cli.command {
        assert!(args.json);
        assert!(args.step.is_none());
    } else {
        panic!("Expected Status command");
    }
}

#[test]
fn names_parse_back() {
    use clusterup::idl::{Status, Substep};

    assert_eq!("BACKUP_TARGET_MASTER".parse::<Substep>().unwrap(), Substep::BackupTargetMaster);
    assert_eq!("SKIPPED".parse::<Status>().unwrap(), Status::Skipped);
}
