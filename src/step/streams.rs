//! Output destinations handed to substeps.
//!
//! - [`OutStreams`] - what a substep writes its stdout/stderr to
//! - [`MultiplexedStream`] - the per-step sink: operator session plus step log
//! - [`TeeStreams`] - retains stdout in memory for post-failure diagnostics
//! - [`BufferedStreams`] / [`DevNullStreams`] - in-memory and discarding sinks

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::error::{self, Result, UpgradeError};
use crate::idl::{Chunk, ChunkKind, Message};

use super::MessageSender;

/// Write-only destinations for a substep's output.
pub trait OutStreams {
    fn stdout(&mut self) -> &mut dyn Write;
    fn stderr(&mut self) -> &mut dyn Write;
}

/// Streams owned by a step controller for its whole lifetime.
pub trait StepStreams: OutStreams + Send {
    /// View as plain [`OutStreams`] for handing to a substep.
    fn out(&mut self) -> &mut dyn OutStreams;

    /// Flush and release. Reports anything that went wrong delivering output.
    fn close(&mut self) -> Result<()>;
}

struct Shared {
    sender: Arc<dyn MessageSender>,
    log: Box<dyn Write + Send>,
    delivery: Option<UpgradeError>,
}

struct ChunkWriter {
    kind: ChunkKind,
    shared: Arc<Mutex<Shared>>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Write for ChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut shared = lock(&self.shared);
        shared.log.write_all(buf)?;

        // After the first failed send the session is considered gone; output
        // still reaches the log.
        if shared.delivery.is_none() {
            let chunk = Message::Chunk(Chunk {
                buffer: buf.to_vec(),
                kind: self.kind,
            });
            if let Err(e) = shared.sender.send(chunk) {
                warn!("Failed to forward output to operator session: {}", e);
                shared.delivery = Some(e);
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        lock(&self.shared).log.flush()
    }
}

/// Forwards output to the operator session as chunk messages and appends it
/// to the step log.
pub struct MultiplexedStream {
    stdout: ChunkWriter,
    stderr: ChunkWriter,
    shared: Arc<Mutex<Shared>>,
}

impl MultiplexedStream {
    pub fn new(sender: Arc<dyn MessageSender>, log: impl Write + Send + 'static) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            sender,
            log: Box::new(log),
            delivery: None,
        }));

        Self {
            stdout: ChunkWriter {
                kind: ChunkKind::Stdout,
                shared: Arc::clone(&shared),
            },
            stderr: ChunkWriter {
                kind: ChunkKind::Stderr,
                shared: Arc::clone(&shared),
            },
            shared,
        }
    }
}

impl OutStreams for MultiplexedStream {
    fn stdout(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    fn stderr(&mut self) -> &mut dyn Write {
        &mut self.stderr
    }
}

impl StepStreams for MultiplexedStream {
    fn out(&mut self) -> &mut dyn OutStreams {
        self
    }

    fn close(&mut self) -> Result<()> {
        let mut shared = lock(&self.shared);
        let mut err = shared.delivery.take();
        if let Err(e) = shared.log.flush() {
            err = Some(error::append(err, e.into()));
        }
        err.map_or(Ok(()), Err)
    }
}

/// Duplicates stdout into memory while passing everything through.
pub struct TeeStreams<'a> {
    tee: TeeWriter<'a>,
}

struct TeeWriter<'a> {
    inner: &'a mut dyn OutStreams,
    captured: Vec<u8>,
}

impl Write for TeeWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.stdout().write(buf)?;
        self.captured.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.stdout().flush()
    }
}

impl<'a> TeeStreams<'a> {
    pub fn new(inner: &'a mut dyn OutStreams) -> Self {
        Self {
            tee: TeeWriter {
                inner,
                captured: Vec::new(),
            },
        }
    }

    /// Everything written to stdout so far.
    pub fn captured(&self) -> String {
        String::from_utf8_lossy(&self.tee.captured).into_owned()
    }
}

impl OutStreams for TeeStreams<'_> {
    fn stdout(&mut self) -> &mut dyn Write {
        &mut self.tee
    }

    fn stderr(&mut self) -> &mut dyn Write {
        self.tee.inner.stderr()
    }
}

/// Keeps both streams in memory.
#[derive(Debug, Default)]
pub struct BufferedStreams {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl BufferedStreams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

impl OutStreams for BufferedStreams {
    fn stdout(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    fn stderr(&mut self) -> &mut dyn Write {
        &mut self.stderr
    }
}

impl StepStreams for BufferedStreams {
    fn out(&mut self) -> &mut dyn OutStreams {
        self
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug)]
pub struct DevNullStreams {
    stdout: io::Sink,
    stderr: io::Sink,
}

impl Default for DevNullStreams {
    fn default() -> Self {
        Self {
            stdout: io::sink(),
            stderr: io::sink(),
        }
    }
}

impl OutStreams for DevNullStreams {
    fn stdout(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    fn stderr(&mut self) -> &mut dyn Write {
        &mut self.stderr
    }
}

impl StepStreams for DevNullStreams {
    fn out(&mut self) -> &mut dyn OutStreams {
        self
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
