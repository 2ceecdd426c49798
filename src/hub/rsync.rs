use std::path::{Path, MAIN_SEPARATOR};

use crate::error::{Result, UpgradeError};
use crate::exec::{CommandRunner, CommandSpec};
use crate::step::OutStreams;

/// Name of the master data directory backup inside the state directory.
pub const ORIGINAL_MASTER_BACKUP_NAME: &str = "master.bak";

/// Server log files are never worth copying.
pub const MASTER_EXCLUDES: &[&str] = &["pg_log/*"];

/// Make `dest` an exact copy of the contents of `source` with rsync.
pub fn mirror_directory(
    runner: &dyn CommandRunner,
    streams: &mut dyn OutStreams,
    source: &Path,
    dest: &Path,
    excludes: &[&str],
) -> Result<()> {
    // Trailing separator: copy the directory's contents, not the directory.
    let source = source.to_string_lossy();
    let mut from = source.trim_end_matches(MAIN_SEPARATOR).to_string();
    from.push(MAIN_SEPARATOR);

    let spec = CommandSpec::new("rsync")
        .args(["--archive", "--delete"])
        .args(excludes.iter().map(|pattern| format!("--exclude={}", pattern)))
        .arg(from.clone())
        .arg(dest.to_string_lossy());

    runner
        .run(&spec, streams)
        .map_err(|e| UpgradeError::Rsync {
            from,
            to: dest.to_path_buf(),
            source: Box::new(e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{MockResponse, MockRunner};
    use crate::step::BufferedStreams;

    #[cfg(unix)]
    #[test]
    fn builds_rsync_invocation() {
        let runner = MockRunner::new();
        let mut streams = BufferedStreams::new();

        mirror_directory(
            &runner,
            &mut streams,
            Path::new("/data/master/gpseg-1/"),
            Path::new("/state/master.bak"),
            MASTER_EXCLUDES,
        )
        .unwrap();

        let calls = runner.calls_to("rsync");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec![
                "--archive",
                "--delete",
                "--exclude=pg_log/*",
                "/data/master/gpseg-1/",
                "/state/master.bak",
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn failure_names_both_directories() {
        let runner = MockRunner::new();
        runner.respond("rsync", MockResponse::failure(23, ""));
        let mut streams = BufferedStreams::new();

        let err = mirror_directory(
            &runner,
            &mut streams,
            Path::new("/data/master/gpseg-1"),
            Path::new("/state/master.bak"),
            &[],
        )
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.starts_with("rsync \"/data/master/gpseg-1/\" to \"/state/master.bak\": "));
        assert!(msg.contains("23"));
    }
}
