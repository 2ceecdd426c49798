//! Substep scheduling for one phase invocation.
//!
//! A [`Step`] is created when a phase request arrives and dropped once the
//! response is sent. Callers issue a fixed sequence of scheduling calls:
//!
//! ```no_run
//! use std::sync::Arc;
//! use clusterup::idl::{Step as StepName, Substep};
//! use clusterup::step::{MockSender, Step};
//!
//! # fn demo() -> clusterup::Result<()> {
//! let sender = Arc::new(MockSender::new());
//! let mut st = Step::begin("/var/lib/clusterup".as_ref(), StepName::Initialize, sender, vec![])?;
//!
//! st.run_internal_substep(|| Ok(()));
//! st.run(Substep::StartAgents, |_streams| Ok(()));
//! st.run_conditionally(Substep::CheckDiskSpace, false, |_streams| Ok(()));
//! st.always_run(Substep::CheckUpgrade, |_streams| Ok(()));
//!
//! let finished = st.finish();
//! st.into_result()?;
//! finished
//! # }
//! ```
//!
//! Each managed substep moves through `RUNNING` to `COMPLETE` or `FAILED`
//! (or straight to `SKIPPED`). A substep already recorded `COMPLETE` is never
//! executed again, which is what makes re-invoking an interrupted phase safe.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{self, Result, UpgradeError};
use crate::hosts::AgentConn;
use crate::idl::{self, Message, Status, Substep, SubstepStatus};
use crate::state::{SubstepFileStore, SubstepStore};

use super::{MessageSender, MultiplexedStream, OutStreams, StepStreams};

/// Controller for one phase invocation.
pub struct Step {
    name: idl::Step,
    sender: Arc<dyn MessageSender>,
    store: Box<dyn SubstepStore>,
    streams: Box<dyn StepStreams>,
    agents: Vec<AgentConn>,
    /// Failures of managed substeps and persistence.
    err: Option<UpgradeError>,
    /// Set when an internal substep failed; nothing else runs.
    halted: bool,
    /// Failures forwarding status updates; reported by `finish`.
    delivery: Option<UpgradeError>,
}

impl Step {
    /// Begin a phase against the on-disk state directory.
    ///
    /// Opens (appending) the step log `<state_dir>/<step>.log` and binds the
    /// status record `<state_dir>/substeps.json`.
    pub fn begin(
        state_dir: &Path,
        name: idl::Step,
        sender: Arc<dyn MessageSender>,
        agents: Vec<AgentConn>,
    ) -> Result<Self> {
        let log_path = state_dir.join(format!("{}.log", name.as_str().to_lowercase()));
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        writeln!(
            log,
            "\n{} in progress. ({})",
            name.title(),
            Utc::now().to_rfc3339()
        )?;

        let store = SubstepFileStore::in_state_dir(state_dir);
        let streams = MultiplexedStream::new(Arc::clone(&sender), log);

        Ok(Self::new(
            name,
            sender,
            Box::new(store),
            Box::new(streams),
            agents,
        ))
    }

    /// Build a controller from explicit parts.
    pub fn new(
        name: idl::Step,
        sender: Arc<dyn MessageSender>,
        store: Box<dyn SubstepStore>,
        streams: Box<dyn StepStreams>,
        agents: Vec<AgentConn>,
    ) -> Self {
        Self {
            name,
            sender,
            store,
            streams,
            agents,
            err: None,
            halted: false,
            delivery: None,
        }
    }

    pub fn name(&self) -> idl::Step {
        self.name
    }

    /// Agents known when the phase began.
    pub fn agents(&self) -> &[AgentConn] {
        &self.agents
    }

    /// Run unmanaged setup work.
    ///
    /// Nothing is persisted or streamed. A failure stops every later
    /// scheduling call of this invocation, `always_run` included.
    pub fn run_internal_substep(&mut self, f: impl FnOnce() -> Result<()>) {
        if self.halted || self.err.is_some() {
            return;
        }

        if let Err(e) = f() {
            warn!("{} setup failed: {}", self.name.title(), e);
            self.err = Some(error::append(self.err.take(), e));
            self.halted = true;
        }
    }

    /// Run a managed, resumable substep.
    ///
    /// Not executed if an earlier substep of this invocation failed.
    pub fn run(&mut self, substep: Substep, f: impl FnOnce(&mut dyn OutStreams) -> Result<()>) {
        self.schedule(substep, false, Some(f));
    }

    /// Like [`Step::run`], but records `SKIPPED` without running `f` when
    /// `cond` is false. A skip never fails the step.
    pub fn run_conditionally(
        &mut self,
        substep: Substep,
        cond: bool,
        f: impl FnOnce(&mut dyn OutStreams) -> Result<()>,
    ) {
        self.schedule(substep, false, cond.then_some(f));
    }

    /// Like [`Step::run`], but executed even after an earlier managed
    /// substep of this invocation failed.
    pub fn always_run(
        &mut self,
        substep: Substep,
        f: impl FnOnce(&mut dyn OutStreams) -> Result<()>,
    ) {
        self.schedule(substep, true, Some(f));
    }

    /// Close the output streams.
    ///
    /// Returns failures from closing the streams and from forwarding
    /// progress. Substep failures are reported separately by [`Step::err`].
    pub fn finish(&mut self) -> Result<()> {
        let mut err = self.delivery.take();
        if let Err(e) = self.streams.close() {
            err = Some(error::append(err, e));
        }
        err.map_or(Ok(()), Err)
    }

    /// The recorded failure(s), or `None` if every attempted substep
    /// completed or was skipped.
    pub fn err(&self) -> Option<&UpgradeError> {
        self.err.as_ref()
    }

    /// Consume the controller, yielding the recorded failure(s).
    pub fn into_result(self) -> Result<()> {
        self.err.map_or(Ok(()), Err)
    }

    fn schedule<F>(&mut self, substep: Substep, always: bool, f: Option<F>)
    where
        F: FnOnce(&mut dyn OutStreams) -> Result<()>,
    {
        if self.halted {
            debug!("Not scheduling {}: setup failed", substep);
            return;
        }
        if self.err.is_some() && !always {
            debug!("Not scheduling {}: an earlier substep failed", substep);
            return;
        }

        if let Err(e) = self.execute(substep, f) {
            self.err = Some(error::append(
                self.err.take(),
                UpgradeError::Substep {
                    substep,
                    source: Box::new(e),
                },
            ));
        }
    }

    fn execute<F>(&mut self, substep: Substep, f: Option<F>) -> Result<()>
    where
        F: FnOnce(&mut dyn OutStreams) -> Result<()>,
    {
        let status = match self.store.read(self.name, substep) {
            Ok(status) => status,
            // No record yet means nothing has completed.
            Err(e) if e.is_not_found() => Status::UnknownStatus,
            Err(e) => return Err(e),
        };

        if status.is_done() {
            debug!("{} already complete; not running again", substep);
            self.send_status(substep, Status::Complete);
            return Ok(());
        }

        let Some(f) = f else {
            info!("Skipping {}", substep);
            return self.write_status(substep, Status::Skipped);
        };

        if let Err(e) = write!(self.streams.stdout(), "\nStarting {}...\n\n", substep) {
            warn!("Failed to write to {} log: {}", self.name.title(), e);
        }

        self.write_status(substep, Status::Running)?;

        info!("Running {}", substep);
        let result = f(self.streams.out());

        let status = if result.is_ok() {
            Status::Complete
        } else {
            Status::Failed
        };
        info!("{} finished: {}", substep, status);

        let persisted = self.write_status(substep, status);
        error::append_result(result, persisted)
    }

    /// Persist, then forward. An operator who sees a status has it on disk.
    fn write_status(&mut self, substep: Substep, status: Status) -> Result<()> {
        self.store.write(self.name, substep, status)?;
        self.send_status(substep, status);
        Ok(())
    }

    fn send_status(&mut self, substep: Substep, status: Status) {
        let message = Message::Status(SubstepStatus {
            step: self.name,
            substep,
            status,
        });

        if let Err(e) = self.sender.send(message) {
            warn!("Failed to send {} status for {}: {}", status, substep, e);
            self.delivery = Some(error::append(self.delivery.take(), e));
        }
    }
}
