//! Visual theme and styling.

use console::Style;

use crate::idl::Status;

/// Colors and icons for operator-facing output.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Style for success messages and completed substeps (green).
    pub success: Style,
    /// Style for warnings (orange).
    pub warning: Style,
    /// Style for errors and failed substeps (red bold).
    pub error: Style,
    /// Style for running substeps (magenta).
    pub info: Style,
    /// Style for skipped or never-run substeps.
    pub dim: Style,
    pub highlight: Style,
    pub header: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().magenta(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().magenta(),
        }
    }

    /// A theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    pub fn format_header(&self, title: &str) -> String {
        format!("{}", self.header.apply_to(title))
    }

    /// One status-record line: icon, substep name, status.
    pub fn format_status(&self, name: &str, status: Status) -> String {
        let (icon, style) = match status {
            Status::Complete => ("✓", &self.success),
            Status::Failed => ("✗", &self.error),
            Status::Running => ("◆", &self.info),
            Status::Skipped => ("○", &self.dim),
            Status::UnknownStatus => ("?", &self.dim),
        };
        format!(
            "{} {:<32} {}",
            style.apply_to(icon),
            name,
            style.apply_to(status.as_str())
        )
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // Check NO_COLOR env var (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}
