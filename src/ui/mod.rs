//! Operator-facing output for the CLI.
//!
//! Commands write through [`UserInterface`] so tests can capture output with
//! [`MockUI`] instead of a terminal.

mod mock;
mod terminal;
mod theme;

pub use mock::MockUI;
pub use terminal::TerminalUI;
pub use theme::{should_use_colors, Theme};

use crate::idl::Status;

pub trait UserInterface {
    /// Show a plain message.
    fn message(&mut self, msg: &str);

    fn success(&mut self, msg: &str);

    fn warning(&mut self, msg: &str);

    /// Show an error. Always shown, on stderr for terminals.
    fn error(&mut self, msg: &str);

    fn show_header(&mut self, title: &str);

    /// Show one line of the status record.
    fn show_status(&mut self, name: &str, status: Status);
}
