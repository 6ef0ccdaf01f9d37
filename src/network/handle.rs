//! Outbound side of a connection, shared with plugins.
//!
//! A [`NetworkHandle`] is cheap to clone and travels inside every event so
//! plugins can answer on the network the event came from. Lines handed to it
//! before registration completes are queued or rejected according to the
//! network's `queue_while_disconnected` setting; they are never dropped
//! silently.

use parking_lot::Mutex;
use slirc_proto::Message;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ConnectionError;

struct Outbox {
    /// Writer task input; present while a transport is attached.
    tx: Option<mpsc::UnboundedSender<String>>,
    established: bool,
    pending: VecDeque<Message>,
}

/// Plugin-facing send API for one network.
#[derive(Clone)]
pub struct NetworkHandle {
    name: Arc<str>,
    queue_while_disconnected: bool,
    outbox: Arc<Mutex<Outbox>>,
}

impl fmt::Debug for NetworkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkHandle")
            .field("name", &self.name)
            .field("established", &self.is_established())
            .finish()
    }
}

impl NetworkHandle {
    pub(crate) fn new(name: &str, queue_while_disconnected: bool) -> Self {
        Self {
            name: Arc::from(name),
            queue_while_disconnected,
            outbox: Arc::new(Mutex::new(Outbox {
                tx: None,
                established: false,
                pending: VecDeque::new(),
            })),
        }
    }

    /// Name of the network.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether registration has completed and sends go straight out.
    pub fn is_established(&self) -> bool {
        self.outbox.lock().established
    }

    /// Number of messages waiting for registration to complete.
    pub fn pending(&self) -> usize {
        self.outbox.lock().pending.len()
    }

    /// Send a message. Fire-and-forget: the write happens on the
    /// connection's writer task.
    pub fn send(&self, msg: Message) -> Result<(), ConnectionError> {
        let mut outbox = self.outbox.lock();
        if outbox.established {
            return self.write(&outbox, &msg);
        }
        if self.queue_while_disconnected {
            debug!(network = %self.name, command = %msg.command, "queued until registration completes");
            outbox.pending.push_back(msg);
            return Ok(());
        }
        Err(ConnectionError::NotConnected {
            network: self.name.to_string(),
        })
    }

    /// Build and send a message from a command and its parameters.
    pub fn transmit<I, P>(&self, command: &str, params: I) -> Result<(), ConnectionError>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.send(Message::new(command, params))
    }

    /// Send a PRIVMSG to a channel or nickname.
    pub fn say(&self, target: &str, text: &str) -> Result<(), ConnectionError> {
        self.send(Message::privmsg(target, text))
    }

    /// Send regardless of registration state. Used for the handshake and
    /// protocol housekeeping such as PONG.
    pub(crate) fn send_now(&self, msg: &Message) -> Result<(), ConnectionError> {
        let outbox = self.outbox.lock();
        self.write(&outbox, msg)
    }

    pub(crate) fn attach(&self, tx: mpsc::UnboundedSender<String>) {
        self.outbox.lock().tx = Some(tx);
    }

    /// Drop the writer input. The writer drains what it has and closes the
    /// transport.
    pub(crate) fn detach(&self) {
        let mut outbox = self.outbox.lock();
        outbox.tx = None;
        outbox.established = false;
    }

    /// Mark registration complete and flush queued messages in order.
    pub(crate) fn establish(&self) -> usize {
        let mut outbox = self.outbox.lock();
        outbox.established = true;

        let pending = std::mem::take(&mut outbox.pending);
        let count = pending.len();
        for msg in pending {
            if let Err(e) = self.write(&outbox, &msg) {
                tracing::warn!(network = %self.name, error = %e, "failed to flush queued message");
            }
        }
        count
    }

    fn write(&self, outbox: &Outbox, msg: &Message) -> Result<(), ConnectionError> {
        let tx = outbox.tx.as_ref().ok_or_else(|| ConnectionError::NotConnected {
            network: self.name.to_string(),
        })?;
        let line = msg.to_string();
        debug!(network = %self.name, "→ {}", line);
        tx.send(line).map_err(|_| ConnectionError::Closed)?;
        crate::metrics::record_sent(&msg.command);
        Ok(())
    }
}
