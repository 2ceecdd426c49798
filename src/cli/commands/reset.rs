//! The `clusterup reset` command: make a substep run again.

use std::path::{Path, PathBuf};

use crate::cli::args::ResetArgs;
use crate::error::Result;
use crate::state::{SubstepFileStore, SubstepStore};
use crate::ui::UserInterface;

use super::dispatcher::{load_record, Command, CommandResult, EXIT_NOT_INITIALIZED};

pub struct ResetCommand {
    state_dir: PathBuf,
    args: ResetArgs,
}

impl ResetCommand {
    pub fn new(state_dir: &Path, args: ResetArgs) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            args,
        }
    }
}

impl Command for ResetCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let store = SubstepFileStore::in_state_dir(&self.state_dir);
        let Some(record) = load_record(&store, ui)? else {
            return Ok(CommandResult::failure(EXIT_NOT_INITIALIZED));
        };

        let ResetArgs { step, substep } = self.args;
        let previous = record.get(step, substep);
        store.clear(step, substep)?;

        ui.success(&format!(
            "Reset {} {} (was {}); it will run on the next {}",
            step, substep, previous, step.title().to_lowercase()
        ));
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::{Status, Step, Substep};
    use crate::ui::MockUI;
    use tempfile::TempDir;

    #[test]
    fn clears_only_the_named_substep() {
        let temp = TempDir::new().unwrap();
        let store = SubstepFileStore::in_state_dir(temp.path());
        store
            .write(Step::Initialize, Substep::InitTargetCluster, Status::Complete)
            .unwrap();
        store
            .write(Step::Initialize, Substep::StartAgents, Status::Complete)
            .unwrap();
        let mut ui = MockUI::new();
        let args = ResetArgs {
            step: Step::Initialize,
            substep: Substep::InitTargetCluster,
        };

        let result = ResetCommand::new(temp.path(), args).execute(&mut ui).unwrap();

        assert!(result.success);
        assert_eq!(
            store.read(Step::Initialize, Substep::InitTargetCluster).unwrap(),
            Status::UnknownStatus
        );
        assert_eq!(
            store.read(Step::Initialize, Substep::StartAgents).unwrap(),
            Status::Complete
        );
        assert!(ui.successes()[0].contains("was COMPLETE"));
    }

    #[test]
    fn missing_record_is_not_initialized() {
        let temp = TempDir::new().unwrap();
        let mut ui = MockUI::new();
        let args = ResetArgs {
            step: Step::Initialize,
            substep: Substep::StartAgents,
        };

        let result = ResetCommand::new(temp.path(), args).execute(&mut ui).unwrap();

        assert_eq!(result.exit_code, EXIT_NOT_INITIALIZED);
        assert!(!temp.path().join("substeps.json").exists());
    }
}
