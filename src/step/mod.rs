//! Resumable execution of a phase's substeps.
//!
//! A phase (initialize, execute, finalize, revert) is a fixed sequence of
//! substeps. This module runs them while recording each substep's status
//! durably, streaming progress to the operator, and collecting failures.

mod controller;
mod sender;
mod streams;

pub use controller::Step;
pub use sender::{ChannelSender, MessageSender, MockSender};
pub use streams::{
    BufferedStreams, DevNullStreams, MultiplexedStream, OutStreams, StepStreams, TeeStreams,
};
