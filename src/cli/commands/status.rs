//! The `clusterup status` command: show the status record.

use std::path::{Path, PathBuf};

use crate::cli::args::StatusArgs;
use crate::error::Result;
use crate::state::{StatusRecord, SubstepFileStore};
use crate::ui::UserInterface;

use super::dispatcher::{load_record, Command, CommandResult, EXIT_NOT_INITIALIZED};

pub struct StatusCommand {
    state_dir: PathBuf,
    args: StatusArgs,
}

impl StatusCommand {
    pub fn new(state_dir: &Path, args: StatusArgs) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            args,
        }
    }
}

impl Command for StatusCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let store = SubstepFileStore::in_state_dir(&self.state_dir);
        let Some(record) = load_record(&store, ui)? else {
            return Ok(CommandResult::failure(EXIT_NOT_INITIALIZED));
        };

        let mut shown = StatusRecord::new();
        for (step, substep, status) in record.iter() {
            if self.args.step.map_or(true, |wanted| wanted == step) {
                shown.set(step, substep, status);
            }
        }

        if self.args.json {
            ui.message(&shown.encode()?);
            return Ok(CommandResult::success());
        }

        if shown.is_empty() {
            ui.message("No substeps recorded.");
            return Ok(CommandResult::success());
        }

        for step in shown.steps() {
            ui.show_header(&step.title());
            for (substep, status) in shown.step(step) {
                ui.show_status(substep.as_str(), status);
            }
        }

        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::{Status, Step, Substep};
    use crate::state::SubstepStore;
    use crate::ui::MockUI;
    use tempfile::TempDir;

    fn recorded() -> TempDir {
        let temp = TempDir::new().unwrap();
        let store = SubstepFileStore::in_state_dir(temp.path());
        store
            .write(Step::Initialize, Substep::StartAgents, Status::Complete)
            .unwrap();
        store
            .write(Step::Initialize, Substep::CheckDiskSpace, Status::Skipped)
            .unwrap();
        store
            .write(Step::Execute, Substep::UpgradeMaster, Status::Failed)
            .unwrap();
        temp
    }

    #[test]
    fn shows_every_step() {
        let temp = recorded();
        let mut ui = MockUI::new();

        let result = StatusCommand::new(temp.path(), StatusArgs::default())
            .execute(&mut ui)
            .unwrap();

        assert!(result.success);
        assert_eq!(ui.headers(), ["Initialize", "Execute"]);
        assert_eq!(ui.statuses().len(), 3);
        assert!(ui
            .statuses()
            .contains(&("UPGRADE_MASTER".to_string(), Status::Failed)));
    }

    #[test]
    fn filters_by_step() {
        let temp = recorded();
        let mut ui = MockUI::new();
        let args = StatusArgs {
            step: Some(Step::Execute),
            json: false,
        };

        StatusCommand::new(temp.path(), args).execute(&mut ui).unwrap();

        assert_eq!(ui.headers(), ["Execute"]);
        assert_eq!(ui.statuses().len(), 1);
    }

    #[test]
    fn json_output_decodes() {
        let temp = recorded();
        let mut ui = MockUI::new();
        let args = StatusArgs {
            step: Some(Step::Initialize),
            json: true,
        };

        StatusCommand::new(temp.path(), args).execute(&mut ui).unwrap();

        let record = StatusRecord::decode(&ui.messages()[0]).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(
            record.get(Step::Initialize, Substep::StartAgents),
            Status::Complete
        );
    }

    #[test]
    fn empty_record() {
        let temp = TempDir::new().unwrap();
        SubstepFileStore::in_state_dir(temp.path()).initialize().unwrap();
        let mut ui = MockUI::new();

        let result = StatusCommand::new(temp.path(), StatusArgs::default())
            .execute(&mut ui)
            .unwrap();

        assert!(result.success);
        assert_eq!(ui.messages(), ["No substeps recorded."]);
    }
}
