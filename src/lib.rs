//! clusterup - resumable substep execution for cluster major-version upgrades.
//!
//! An upgrade is split into phases (initialize, execute, finalize, revert),
//! each a fixed sequence of named substeps. The hub runs a phase through a
//! [`step::Step`], which records every substep's status durably so an
//! interrupted phase can be re-invoked and will skip what already completed.
//!
//! # Modules
//!
//! - [`cli`] - Operator CLI for inspecting and repairing the status record
//! - [`cluster`] - Cluster topology and versions
//! - [`config`] - Hub configuration and state directory resolution
//! - [`diagnostics`] - Extracting failure reports from tool output
//! - [`error`] - Error types, result alias and error aggregation
//! - [`exec`] - External command execution
//! - [`hosts`] - Concurrent per-host fan-out
//! - [`hub`] - The upgrade phases
//! - [`idl`] - Step, substep and status identifiers, progress messages
//! - [`state`] - The durable status record
//! - [`step`] - The substep runner and its output streams
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use clusterup::idl::{Status, Step as StepName, Substep};
//! use clusterup::state::MemoryStore;
//! use clusterup::step::{BufferedStreams, MockSender, Step};
//!
//! let sender = Arc::new(MockSender::new());
//! let mut st = Step::new(
//!     StepName::Initialize,
//!     sender.clone(),
//!     Box::new(MemoryStore::new()),
//!     Box::new(BufferedStreams::new()),
//!     vec![],
//! );
//!
//! st.run(Substep::StartAgents, |_streams| Ok(()));
//! assert!(st.finish().is_ok());
//! assert!(st.err().is_none());
//! assert_eq!(
//!     sender.statuses(),
//!     [(Substep::StartAgents, Status::Running), (Substep::StartAgents, Status::Complete)]
//! );
//! ```

pub mod cli;
pub mod cluster;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod hosts;
pub mod hub;
pub mod idl;
pub mod state;
pub mod step;
pub mod ui;

pub use error::{Result, UpgradeError};
