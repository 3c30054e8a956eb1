//! Thread-safe frame queueing for async network I/O, decoupling the
//! transport layer from the tick loop: a bounded `crossbeam::channel`
//! carrying per-connection WebSocket frames addressed by arena path.
//!
//! Carries both inbound data frames and disconnect notifications through the
//! same channel so both are serialized with tick execution on the scheduler
//! thread.

use std::sync::{Arc, Mutex};

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};

use tankarena_game::client::ClientHandle;

use crate::dispatch::ClientInfo;

/// One inbound frame plus everything `dispatch::handle_frame` needs to act
/// on it. `client_info` is shared with the transport layer's connection
/// object so dispatch's writes (`authenticated`, `id`) are visible on the
/// next frame from the same connection.
#[derive(Clone)]
pub struct QueuedFrame {
    pub path: String,
    pub client: Arc<dyn ClientHandle>,
    pub client_info: Arc<Mutex<ClientInfo>>,
    pub is_binary: bool,
    pub bytes: Vec<u8>,
}

/// A connection that closed without a protocol violation (socket drop,
/// clean WebSocket close, etc). Routed through the same queue as data
/// frames so it is handled on the loop thread, in order relative to any
/// frames the same connection already enqueued.
#[derive(Clone)]
pub struct QueuedDisconnect {
    pub path: String,
    pub client_info: Arc<Mutex<ClientInfo>>,
}

#[derive(Clone)]
pub enum QueuedEvent {
    Frame(QueuedFrame),
    Disconnect(QueuedDisconnect),
}

/// Bounded queue draining into the scheduler's per-tick dispatch pass.
pub struct FrameQueue {
    sender: Sender<QueuedEvent>,
    receiver: Receiver<QueuedEvent>,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    pub fn sender(&self) -> FrameQueueSender {
        FrameQueueSender {
            sender: self.sender.clone(),
        }
    }

    /// Drains everything currently queued without blocking, for the
    /// scheduler to process between ticks.
    pub fn drain(&self) -> Vec<QueuedEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

/// Producer handle, cloned into each connection's read loop.
#[derive(Clone)]
pub struct FrameQueueSender {
    sender: Sender<QueuedEvent>,
}

impl FrameQueueSender {
    /// Returns `true` if enqueued, `false` if the queue was full (dropped,
    /// favoring availability over delivery guarantees under burst load).
    pub fn try_send(&self, frame: QueuedFrame) -> bool {
        self.try_send_event(QueuedEvent::Frame(frame))
    }

    /// Enqueues a disconnect notification for the connection. Dropped on a
    /// full queue like any other event; a lost disconnect notification only
    /// delays tank cleanup, it never corrupts state.
    pub fn try_send_disconnect(&self, disconnect: QueuedDisconnect) -> bool {
        self.try_send_event(QueuedEvent::Disconnect(disconnect))
    }

    fn try_send_event(&self, event: QueuedEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Sized for ordinary burst traffic against a single arena.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
