//! The `clusterup mark` command: force a substep's recorded status.

use std::path::{Path, PathBuf};

use crate::cli::args::MarkArgs;
use crate::error::Result;
use crate::idl::Status;
use crate::state::{SubstepFileStore, SubstepStore};
use crate::ui::UserInterface;

use super::dispatcher::{load_record, Command, CommandResult, EXIT_NOT_INITIALIZED};

pub struct MarkCommand {
    state_dir: PathBuf,
    args: MarkArgs,
}

impl MarkCommand {
    pub fn new(state_dir: &Path, args: MarkArgs) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            args,
        }
    }
}

impl Command for MarkCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let store = SubstepFileStore::in_state_dir(&self.state_dir);
        if load_record(&store, ui)?.is_none() {
            return Ok(CommandResult::failure(EXIT_NOT_INITIALIZED));
        }

        let MarkArgs {
            step,
            substep,
            status,
        } = self.args;

        if status == Status::Running {
            ui.warning(&format!(
                "{} will be run again; RUNNING is never treated as done",
                substep
            ));
        }

        // UNKNOWN_STATUS is never stored; it is what an absent pair reads as.
        if status == Status::UnknownStatus {
            store.clear(step, substep)?;
            ui.success(&format!(
                "Cleared {} {}; it will run on the next {}",
                step,
                substep,
                step.title().to_lowercase()
            ));
            return Ok(CommandResult::success());
        }

        store.write(step, substep, status)?;
        ui.success(&format!("Marked {} {} as {}", step, substep, status));
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::{Step, Substep};
    use crate::ui::MockUI;
    use tempfile::TempDir;

    fn initialized() -> TempDir {
        let temp = TempDir::new().unwrap();
        SubstepFileStore::in_state_dir(temp.path()).initialize().unwrap();
        temp
    }

    #[test]
    fn records_forced_status() {
        let temp = initialized();
        let mut ui = MockUI::new();
        let args = MarkArgs {
            step: Step::Initialize,
            substep: Substep::CheckUpgrade,
            status: Status::Complete,
        };

        MarkCommand::new(temp.path(), args).execute(&mut ui).unwrap();

        let store = SubstepFileStore::in_state_dir(temp.path());
        assert_eq!(
            store.read(Step::Initialize, Substep::CheckUpgrade).unwrap(),
            Status::Complete
        );
        assert_eq!(
            ui.successes(),
            ["Marked INITIALIZE CHECK_UPGRADE as COMPLETE"]
        );
        assert!(ui.warnings().is_empty());
    }

    #[test]
    fn warns_when_marking_running() {
        let temp = initialized();
        let mut ui = MockUI::new();
        let args = MarkArgs {
            step: Step::Initialize,
            substep: Substep::StartAgents,
            status: Status::Running,
        };

        MarkCommand::new(temp.path(), args).execute(&mut ui).unwrap();

        assert_eq!(ui.warnings().len(), 1);
    }

    #[test]
    fn marking_unknown_clears_instead_of_writing() {
        let temp = initialized();
        let store = SubstepFileStore::in_state_dir(temp.path());
        store
            .write(Step::Initialize, Substep::InitTargetCluster, Status::Failed)
            .unwrap();
        let mut ui = MockUI::new();
        let args = MarkArgs {
            step: Step::Initialize,
            substep: Substep::InitTargetCluster,
            status: Status::UnknownStatus,
        };

        MarkCommand::new(temp.path(), args).execute(&mut ui).unwrap();

        assert_eq!(
            store.read(Step::Initialize, Substep::InitTargetCluster).unwrap(),
            Status::UnknownStatus
        );
        let record = store.load().unwrap();
        assert!(record.is_empty());
        assert!(!record.encode().unwrap().contains("UNKNOWN_STATUS"));
    }
}
