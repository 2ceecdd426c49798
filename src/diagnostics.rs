//! Turning a failed tool run's output into an operator-facing message.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::Result;

/// Marker that starts the interesting part of the upgrade tool's output.
pub const FATAL_MARKER: &str = "fatal";

/// Everything from the first line mentioning [`FATAL_MARKER`] onward.
///
/// Matching any occurrence is broad and may include unrelated lines, but it
/// never drops the actual failure report.
///
/// ```
/// use clusterup::diagnostics::extract_fatal_block;
///
/// let out = "Checking ok\nChecking tables   fatal\nsee loadable_libraries.txt\n";
/// assert_eq!(extract_fatal_block(out), "Checking tables   fatal\nsee loadable_libraries.txt");
/// ```
pub fn extract_fatal_block(output: &str) -> String {
    let lines: Vec<&str> = output
        .lines()
        .skip_while(|line| !line.contains(FATAL_MARKER))
        .collect();
    lines.join("\n")
}

/// Replace each file name found in `workdir` with its full path.
///
/// The upgrade tool refers to its report files by bare name; the operator
/// needs to know where they are.
pub fn qualify_file_names(text: &str, workdir: &Path) -> Result<String> {
    let mut names = Vec::new();
    for entry in fs::read_dir(workdir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    if names.is_empty() || text.is_empty() {
        return Ok(text.to_string());
    }

    // Longest first so a name is never shadowed by one of its prefixes.
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternation = names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = Regex::new(&alternation).map_err(anyhow::Error::from)?;

    Ok(pattern
        .replace_all(text, |caps: &regex::Captures| {
            workdir.join(&caps[0]).display().to_string()
        })
        .into_owned())
}
