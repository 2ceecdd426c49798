//! Integration tests for resumable substep execution against a real state
//! directory.

use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::sync::Arc;

use clusterup::idl::{ChunkKind, Status, Step as StepName, Substep};
use clusterup::state::{SubstepFileStore, SubstepStore};
use clusterup::step::{MockSender, Step};
use clusterup::UpgradeError;
use tempfile::TempDir;

fn fail(msg: &str) -> UpgradeError {
    UpgradeError::Other(anyhow::anyhow!(msg.to_string()))
}

/// Runs the create-cluster sequence, failing at `fail_at` if given.
fn run_phase(
    state_dir: &std::path::Path,
    fail_at: Option<Substep>,
    ran: &RefCell<Vec<Substep>>,
) -> (Arc<MockSender>, clusterup::Result<()>) {
    let sender = Arc::new(MockSender::new());
    let mut st = Step::begin(state_dir, StepName::Initialize, sender.clone(), vec![]).unwrap();

    for substep in [
        Substep::GenerateTargetConfig,
        Substep::InitTargetCluster,
        Substep::ShutdownTargetCluster,
        Substep::BackupTargetMaster,
    ] {
        st.run(substep, |streams| {
            ran.borrow_mut().push(substep);
            writeln!(streams.stdout(), "working on {}", substep)?;
            if fail_at == Some(substep) {
                return Err(fail("disk full"));
            }
            Ok(())
        });
    }
    st.always_run(Substep::CheckUpgrade, |_| {
        ran.borrow_mut().push(Substep::CheckUpgrade);
        Ok(())
    });

    let finished = st.finish();
    assert!(finished.is_ok());
    (sender, st.into_result())
}

#[test]
fn interrupted_phase_resumes_after_last_completed_substep() {
    let temp = TempDir::new().unwrap();
    let ran = RefCell::new(Vec::new());

    let (_, first) = run_phase(temp.path(), Some(Substep::ShutdownTargetCluster), &ran);
    let err = first.unwrap_err();
    assert_eq!(err.substep(), Some(Substep::ShutdownTargetCluster));
    assert_eq!(
        ran.take(),
        vec![
            Substep::GenerateTargetConfig,
            Substep::InitTargetCluster,
            Substep::ShutdownTargetCluster,
            Substep::CheckUpgrade,
        ]
    );

    let (sender, second) = run_phase(temp.path(), None, &ran);
    assert!(second.is_ok());
    assert_eq!(
        ran.take(),
        vec![Substep::ShutdownTargetCluster, Substep::BackupTargetMaster]
    );

    // Completed substeps are replayed to the operator without running.
    let statuses = sender.statuses();
    assert_eq!(statuses[0], (Substep::GenerateTargetConfig, Status::Complete));
    assert_eq!(statuses[1], (Substep::InitTargetCluster, Status::Complete));
    assert_eq!(statuses[2], (Substep::ShutdownTargetCluster, Status::Running));

    let store = SubstepFileStore::in_state_dir(temp.path());
    let section = store.read_step(StepName::Initialize).unwrap().unwrap();
    assert!(section.values().all(|s| *s == Status::Complete));
    assert_eq!(section.len(), 5);
}

#[test]
fn completed_phase_runs_nothing_again() {
    let temp = TempDir::new().unwrap();
    let ran = RefCell::new(Vec::new());

    run_phase(temp.path(), None, &ran).1.unwrap();
    ran.take();

    let (sender, result) = run_phase(temp.path(), None, &ran);
    assert!(result.is_ok());
    assert!(ran.take().is_empty());
    assert!(sender
        .statuses()
        .iter()
        .all(|(_, status)| *status == Status::Complete));
}

#[test]
fn step_log_receives_header_and_output() {
    let temp = TempDir::new().unwrap();
    let ran = RefCell::new(Vec::new());

    let (sender, _) = run_phase(temp.path(), None, &ran);

    let log = fs::read_to_string(temp.path().join("initialize.log")).unwrap();
    assert!(log.contains("Initialize in progress."));
    assert!(log.contains("Starting GENERATE_TARGET_CONFIG..."));
    assert!(log.contains("working on BACKUP_TARGET_MASTER"));

    let streamed = sender.output(ChunkKind::Stdout);
    assert!(streamed.contains("working on INIT_TARGET_CLUSTER"));
}

#[test]
fn log_is_appended_across_invocations() {
    let temp = TempDir::new().unwrap();
    let ran = RefCell::new(Vec::new());

    run_phase(temp.path(), None, &ran);
    run_phase(temp.path(), None, &ran);

    let log = fs::read_to_string(temp.path().join("initialize.log")).unwrap();
    assert_eq!(log.matches("Initialize in progress.").count(), 2);
}

#[test]
fn begin_fails_without_state_dir() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing");
    let sender = Arc::new(MockSender::new());

    assert!(Step::begin(&missing, StepName::Initialize, sender, vec![]).is_err());
}

#[test]
fn skipped_substep_is_recorded_and_stays_skipped_when_condition_holds_false() {
    let temp = TempDir::new().unwrap();

    for _ in 0..2 {
        let sender = Arc::new(MockSender::new());
        let mut st = Step::begin(temp.path(), StepName::Initialize, sender.clone(), vec![]).unwrap();
        st.run_conditionally(Substep::CheckDiskSpace, false, |_| Ok(()));
        st.finish().unwrap();
        assert!(st.err().is_none());
        assert_eq!(sender.statuses(), vec![(Substep::CheckDiskSpace, Status::Skipped)]);
    }

    let store = SubstepFileStore::in_state_dir(temp.path());
    assert_eq!(
        store.read(StepName::Initialize, Substep::CheckDiskSpace).unwrap(),
        Status::Skipped
    );
}
