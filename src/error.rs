//! Error types for upgrade coordination.
//!
//! This module defines [`UpgradeError`], the primary error type used throughout
//! the crate, a [`Result`] type alias, and the list-append aggregation used
//! wherever two independently failing operations must both be reported.
//!
//! # Error Handling Strategy
//!
//! - Use `UpgradeError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `UpgradeError::Other`) for collaborator errors
//! - Never overwrite one error with another: combine them with [`append`]

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::idl::Substep;

/// Core error type for upgrade operations.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// The status record has not been created yet.
    #[error("status record not found: {path}")]
    StoreNotFound { path: PathBuf },

    /// The status record exists but could not be decoded.
    #[error("failed to parse status record at {path}: {message}")]
    StoreCorrupt { path: PathBuf, message: String },

    /// A step, substep or status name that is not recognized.
    #[error("unknown {kind} name: {name:?}")]
    UnknownName { kind: &'static str, name: String },

    /// A managed substep failed.
    #[error("substep \"{substep}\": {source}")]
    Substep {
        substep: Substep,
        #[source]
        source: Box<UpgradeError>,
    },

    /// One or more hosts failed during a fan-out.
    #[error("{}", format_host_errors(.0))]
    Hosts(Vec<HostError>),

    /// A host action panicked instead of returning.
    #[error("host action panicked: {message}")]
    HostPanicked { message: String },

    /// Several independent failures.
    #[error("{0}")]
    Multiple(ErrorList),

    /// A failure the operator can act on.
    #[error("{source}")]
    NextAction {
        #[source]
        source: Box<UpgradeError>,
        next_action: String,
    },

    /// The master upgrade or upgrade check failed.
    #[error(transparent)]
    UpgradeMaster(#[from] UpgradeMasterError),

    /// Directory mirroring failed.
    #[error("rsync {from:?} to {to:?}: {source}")]
    Rsync {
        from: String,
        to: PathBuf,
        #[source]
        source: Box<UpgradeError>,
    },

    /// External command failed.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// External command could not be started or waited for.
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A host runs a different version than expected.
    #[error("version mismatch on {host}: expected {expected}, found {found}")]
    VersionMismatch {
        host: String,
        expected: String,
        found: String,
    },

    /// Hub configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse hub configuration.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// A phase ran before the one that records what it needs.
    #[error("{what} is not configured; run initialize first")]
    NotConfigured { what: &'static str },

    /// Delivering a message to the operator session failed.
    #[error("progress stream: {message}")]
    Stream { message: String },

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for upgrade operations.
pub type Result<T> = std::result::Result<T, UpgradeError>;

/// A failure on one host of a fan-out.
#[derive(Debug, Error)]
#[error("{host}: {source}")]
pub struct HostError {
    pub host: String,
    #[source]
    pub source: Box<UpgradeError>,
}

impl HostError {
    pub fn new(host: impl Into<String>, source: UpgradeError) -> Self {
        Self {
            host: host.into(),
            source: Box::new(source),
        }
    }
}

fn format_host_errors(errors: &[HostError]) -> String {
    let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    let noun = if errors.len() == 1 { "host" } else { "hosts" };
    format!("{} {} failed: {}", errors.len(), noun, details.join("; "))
}

/// A flat list of errors. Never nested and never empty once built through
/// [`append`].
#[derive(Debug, Default)]
pub struct ErrorList(Vec<UpgradeError>);

impl ErrorList {
    /// Add an error, flattening it if it is itself a list.
    pub fn push(&mut self, err: UpgradeError) {
        match err {
            UpgradeError::Multiple(inner) => self.0.extend(inner.0),
            other => self.0.push(other),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UpgradeError> {
        self.0.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl IntoIterator for ErrorList {
    type Item = UpgradeError;
    type IntoIter = std::vec::IntoIter<UpgradeError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Combine an optional earlier error with a new one.
///
/// `None` plus an error yields that error unchanged; two errors yield a
/// flattened [`UpgradeError::Multiple`].
pub fn append(err: Option<UpgradeError>, next: UpgradeError) -> UpgradeError {
    match err {
        None => next,
        Some(first) => first.append(next),
    }
}

/// Like [`append`], for `Result`s. Both errors survive.
pub fn append_result(result: Result<()>, next: Result<()>) -> Result<()> {
    match (result, next) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Err(first), Err(second)) => Err(first.append(second)),
    }
}

impl UpgradeError {
    /// Combine two errors into a flat list.
    pub fn append(self, next: UpgradeError) -> UpgradeError {
        let mut list = ErrorList::default();
        list.push(self);
        list.push(next);
        UpgradeError::Multiple(list)
    }

    /// All leaf errors, with lists flattened.
    pub fn errors(&self) -> Vec<&UpgradeError> {
        match self {
            UpgradeError::Multiple(list) => list.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }

    /// Whether this is the "record never initialized" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            UpgradeError::StoreNotFound { .. } | UpgradeError::ConfigNotFound { .. } => true,
            UpgradeError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// The operator remedy attached anywhere inside this error.
    pub fn next_action(&self) -> Option<&str> {
        match self {
            UpgradeError::NextAction { next_action, .. } => Some(next_action),
            UpgradeError::Substep { source, .. } => source.next_action(),
            UpgradeError::Multiple(list) => list.iter().find_map(|e| e.next_action()),
            _ => None,
        }
    }

    /// Names of every host reported failed anywhere inside this error.
    pub fn failed_hosts(&self) -> Vec<&str> {
        match self {
            UpgradeError::Hosts(errors) => errors.iter().map(|e| e.host.as_str()).collect(),
            UpgradeError::Substep { source, .. } | UpgradeError::NextAction { source, .. } => {
                source.failed_hosts()
            }
            UpgradeError::Multiple(list) => list.iter().flat_map(|e| e.failed_hosts()).collect(),
            _ => Vec::new(),
        }
    }

    /// The substep a managed failure was recorded against.
    pub fn substep(&self) -> Option<Substep> {
        match self {
            UpgradeError::Substep { substep, .. } => Some(*substep),
            _ => None,
        }
    }
}

/// Failure of the master upgrade tool, carrying the diagnostic text
/// extracted from its output.
#[derive(Debug)]
pub struct UpgradeMasterError {
    /// `"check"` or `"upgrade"`.
    pub failed_action: &'static str,
    pub error_text: String,
    pub source: Box<UpgradeError>,
}

impl UpgradeMasterError {
    pub fn new(check_only: bool, error_text: String, source: UpgradeError) -> Self {
        Self {
            failed_action: if check_only { "check" } else { "upgrade" },
            error_text,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for UpgradeMasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.error_text.is_empty() {
            write!(f, "{} master: {}", self.failed_action, self.source)
        } else {
            write!(
                f,
                "{} master: {}: {}",
                self.failed_action, self.error_text, self.source
            )
        }
    }
}

impl std::error::Error for UpgradeMasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}
