//! External command execution.
//!
//! Substeps never spawn processes directly; they go through a
//! [`CommandRunner`] held by the hub, so tests can substitute [`MockRunner`].

use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::sync::{Mutex, MutexGuard};
use std::thread;

use tracing::debug;

use crate::error::{Result, UpgradeError};
use crate::step::OutStreams;

/// A program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Final path component of the program, e.g. `rsync`.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Whether `flag` appears among the arguments.
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs commands, streaming their output.
pub trait CommandRunner: Send + Sync {
    /// Run to completion. A non-zero exit is [`UpgradeError::CommandFailed`].
    fn run(&self, spec: &CommandSpec, streams: &mut dyn OutStreams) -> Result<()>;
}

enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Runs real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, streams: &mut dyn OutStreams) -> Result<()> {
        debug!("Executing: {}", spec);

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let failed = |code: Option<i32>| UpgradeError::CommandFailed {
            command: spec.to_string(),
            code,
        };
        let unable = |source: std::io::Error| UpgradeError::Spawn {
            command: spec.to_string(),
            source,
        };

        let mut child = cmd.spawn().map_err(unable)?;
        let stdout = child.stdout.take().ok_or_else(|| failed(None))?;
        let stderr = child.stderr.take().ok_or_else(|| failed(None))?;

        let (tx, rx) = mpsc::channel();
        let tx_stderr = tx.clone();

        let stdout_handle = thread::spawn(move || {
            read_lines(stdout, |line| {
                let _ = tx.send(OutputLine::Stdout(line));
            })
        });
        let stderr_handle = thread::spawn(move || {
            read_lines(stderr, |line| {
                let _ = tx_stderr.send(OutputLine::Stderr(line));
            })
        });

        // Keep draining after a write error so the child never blocks on a
        // full pipe; report the first error afterwards.
        let mut write_err = None;
        for line in rx {
            let written = match line {
                OutputLine::Stdout(line) => writeln!(streams.stdout(), "{}", line),
                OutputLine::Stderr(line) => writeln!(streams.stderr(), "{}", line),
            };
            if let Err(e) = written {
                write_err.get_or_insert(e);
            }
        }

        let _ = stdout_handle.join();
        let _ = stderr_handle.join();

        let status = child.wait().map_err(unable)?;
        if !status.success() {
            return Err(failed(status.code()));
        }
        match write_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// Pass every line of `reader` to `emit` until end of file.
///
/// Bytes that are not UTF-8 are replaced rather than ending the stream: the
/// pipe must stay open until the child is done writing.
fn read_lines(reader: impl Read, mut emit: impl FnMut(String)) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                emit(String::from_utf8_lossy(&buf).into_owned());
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Stopped reading command output: {}", e);
                break;
            }
        }
    }
}

/// Canned result for one program under [`MockRunner`].
#[derive(Debug, Clone, Default)]
pub struct MockResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn failure(exit_code: i32, stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code,
        }
    }
}

/// Recording runner for testing.
///
/// Responses are keyed by program name (`rsync`, `pg_upgrade`); programs
/// without a response succeed silently.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: Mutex<HashMap<String, MockResponse>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to every run of `program` with `response`.
    pub fn respond(&self, program: &str, response: MockResponse) {
        lock(&self.responses).insert(program.to_string(), response);
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        lock(&self.calls).clone()
    }

    /// Runs of one program, in order.
    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        lock(&self.calls)
            .iter()
            .filter(|spec| spec.program_name() == program)
            .cloned()
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CommandRunner for MockRunner {
    fn run(&self, spec: &CommandSpec, streams: &mut dyn OutStreams) -> Result<()> {
        lock(&self.calls).push(spec.clone());

        let response = lock(&self.responses)
            .get(&spec.program_name())
            .cloned()
            .unwrap_or_default();

        streams.stdout().write_all(response.stdout.as_bytes())?;
        streams.stderr().write_all(response.stderr.as_bytes())?;

        if response.exit_code == 0 {
            Ok(())
        } else {
            Err(UpgradeError::CommandFailed {
                command: spec.to_string(),
                code: Some(response.exit_code),
            })
        }
    }
}
