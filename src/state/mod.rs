//! Durable substep status.
//!
//! This module provides the status record that makes a phase resumable:
//! a substep recorded `COMPLETE` is never executed again for that step.

pub mod record;
pub mod store;

pub use record::StatusRecord;
pub use store::{MemoryStore, SubstepFileStore, SubstepStore, SUBSTEPS_FILE_NAME};
