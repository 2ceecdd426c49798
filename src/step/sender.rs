//! The progress stream back to the operator session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex, MutexGuard};

use crate::error::{Result, UpgradeError};
use crate::idl::{ChunkKind, Message, Status, Substep};

/// Destination for progress messages of one phase invocation.
///
/// Implementations must be callable from the step controller and from the
/// output sink at the same time, hence `&self`.
pub trait MessageSender: Send + Sync {
    fn send(&self, message: Message) -> Result<()>;
}

/// Sender backed by a channel; the receiving half is handed to whatever
/// relays messages to the operator.
#[derive(Debug)]
pub struct ChannelSender {
    tx: mpsc::Sender<Message>,
}

impl ChannelSender {
    pub fn new() -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl MessageSender for ChannelSender {
    fn send(&self, message: Message) -> Result<()> {
        self.tx.send(message).map_err(|_| UpgradeError::Stream {
            message: "operator session disconnected".to_string(),
        })
    }
}

/// Recording sender for testing.
///
/// Captures every message; can be switched to fail every send.
#[derive(Debug, Default)]
pub struct MockSender {
    messages: Mutex<Vec<Message>>,
    failing: AtomicBool,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every `send` fails.
    pub fn failing() -> Self {
        let sender = Self::default();
        sender.set_failing(true);
        sender
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Message>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every message received so far.
    pub fn messages(&self) -> Vec<Message> {
        self.guard().clone()
    }

    /// Status updates received so far, in order.
    pub fn statuses(&self) -> Vec<(Substep, Status)> {
        self.guard()
            .iter()
            .filter_map(|m| m.status())
            .map(|s| (s.substep, s.status))
            .collect()
    }

    /// Concatenated output chunks of one kind.
    pub fn output(&self, kind: ChunkKind) -> String {
        let bytes: Vec<u8> = self
            .guard()
            .iter()
            .filter_map(|m| match m {
                Message::Chunk(chunk) if chunk.kind == kind => Some(chunk.buffer.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl MessageSender for MockSender {
    fn send(&self, message: Message) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(UpgradeError::Stream {
                message: "send failed".to_string(),
            });
        }
        self.guard().push(message);
        Ok(())
    }
}
