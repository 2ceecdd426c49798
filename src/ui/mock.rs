//! Mock UI implementation for testing.
//!
//! `MockUI` captures every interaction for later assertion.
//!
//! ```
//! use clusterup::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.success("Reset START_AGENTS");
//! assert_eq!(ui.successes(), ["Reset START_AGENTS"]);
//! ```

use crate::idl::Status;

use super::UserInterface;

#[derive(Debug, Default)]
pub struct MockUI {
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    statuses: Vec<(String, Status)>,
}

impl MockUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn statuses(&self) -> &[(String, Status)] {
        &self.statuses
    }
}

impl UserInterface for MockUI {
    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn show_status(&mut self, name: &str, status: Status) {
        self.statuses.push((name.to_string(), status));
    }
}
