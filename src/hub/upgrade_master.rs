use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cluster::{Cluster, Segment};
use crate::diagnostics::{extract_fatal_block, qualify_file_names};
use crate::error::{Result, UpgradeError, UpgradeMasterError};
use crate::exec::{CommandRunner, CommandSpec};
use crate::step::{OutStreams, TeeStreams};

use super::rsync::{mirror_directory, MASTER_EXCLUDES, ORIGINAL_MASTER_BACKUP_NAME};

/// Remedy shown when the upgrade check of the master fails.
pub const CHECK_NEXT_ACTION: &str = "Ensure the \"pre-initialize\" data migration scripts have been run. \
Consult the documentation for details on the check error.";

/// Upgrade tool run against the master.
pub const UPGRADE_TOOL: &str = "pg_upgrade";

pub struct UpgradeMasterArgs<'a> {
    pub source: &'a Cluster,
    pub intermediate: &'a Cluster,
    pub state_dir: &'a Path,
    pub runner: &'a dyn CommandRunner,
    pub streams: &'a mut dyn OutStreams,
    pub check_only: bool,
    pub use_link_mode: bool,
}

/// Working directory of the upgrade tool for the segment with `content_id`.
pub fn upgrade_work_dir(state_dir: &Path, content_id: i32) -> PathBuf {
    state_dir.join("pg_upgrade").join(format!("seg{}", content_id))
}

fn master_of(cluster: &Cluster) -> Result<&Segment> {
    cluster.master().ok_or(UpgradeError::NotConfigured {
        what: "master segment",
    })
}

/// Restore the intermediate master from its backup and run the upgrade
/// tool (or only its check) against it.
///
/// On failure the tool's report is pulled out of its output, with report
/// file names made absolute.
pub fn upgrade_master(args: UpgradeMasterArgs<'_>) -> Result<()> {
    let UpgradeMasterArgs {
        source,
        intermediate,
        state_dir,
        runner,
        streams,
        check_only,
        use_link_mode,
    } = args;

    let source_master = master_of(source)?;
    let target_master = master_of(intermediate)?;

    let wd = upgrade_work_dir(state_dir, target_master.content_id);
    fs::create_dir_all(&wd)?;

    mirror_directory(
        runner,
        &mut *streams,
        &state_dir.join(ORIGINAL_MASTER_BACKUP_NAME),
        &target_master.data_dir,
        MASTER_EXCLUDES,
    )?;

    let mut spec = CommandSpec::new(intermediate.bin_dir().join(UPGRADE_TOOL))
        .arg(format!("--old-bindir={}", source.bin_dir().display()))
        .arg(format!("--new-bindir={}", intermediate.bin_dir().display()))
        .arg(format!("--old-datadir={}", source_master.data_dir.display()))
        .arg(format!("--new-datadir={}", target_master.data_dir.display()))
        .arg(format!("--old-port={}", source_master.port))
        .arg(format!("--new-port={}", target_master.port))
        .arg(format!("--old-gp-dbid={}", source_master.dbid))
        .arg(format!("--new-gp-dbid={}", target_master.dbid))
        .cwd(&wd);

    if check_only {
        spec = spec.arg("--check");
    }
    if use_link_mode {
        spec = spec.arg("--link");
    }

    // A major-5 master needs its standby's dbid to keep WAL in sync.
    if source.version.major == 5 {
        if let Some(standby) = source.standby() {
            spec = spec.args(["--old-options".to_string(), format!("-x {}", standby.dbid)]);
        }
    }

    debug!("Upgrading master in {}", wd.display());

    let mut tee = TeeStreams::new(streams);
    let Err(mut err) = runner.run(&spec, &mut tee) else {
        return Ok(());
    };
    let output = tee.captured();

    let mut text = extract_fatal_block(&output);
    match qualify_file_names(&text, &wd) {
        Ok(qualified) => text = qualified,
        Err(dir_err) => {
            warn!("Could not list {}: {}", wd.display(), dir_err);
            err = err.append(dir_err);
        }
    }

    let master_err = UpgradeError::from(UpgradeMasterError::new(check_only, text, err));
    if check_only {
        return Err(UpgradeError::NextAction {
            source: Box::new(master_err),
            next_action: CHECK_NEXT_ACTION.to_string(),
        });
    }
    Err(master_err)
}
