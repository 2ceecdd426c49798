//! Terminal UI.

use console::Term;
use std::io::Write;

use crate::idl::Status;

use super::{should_use_colors, Theme, UserInterface};

pub struct TerminalUI {
    out: Term,
    err: Term,
    theme: Theme,
}

impl TerminalUI {
    pub fn new(no_color: bool) -> Self {
        let theme = if !no_color && should_use_colors() {
            Theme::new()
        } else {
            Theme::plain()
        };

        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme,
        }
    }
}

impl UserInterface for TerminalUI {
    fn message(&mut self, msg: &str) {
        writeln!(self.out, "{}", msg).ok();
    }

    fn success(&mut self, msg: &str) {
        writeln!(self.out, "{}", self.theme.format_success(msg)).ok();
    }

    fn warning(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_warning(msg)).ok();
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_error(msg)).ok();
    }

    fn show_header(&mut self, title: &str) {
        writeln!(self.out, "\n{}\n", self.theme.format_header(title)).ok();
    }

    fn show_status(&mut self, name: &str, status: Status) {
        writeln!(self.out, "  {}", self.theme.format_status(name, status)).ok();
    }
}
