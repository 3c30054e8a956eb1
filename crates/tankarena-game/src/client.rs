//! Seam to the network layer. The WebSocket/TCP framing library and the
//! HTTP upgrade path are external collaborators; the simulation only needs
//! to be able to push bytes at a bound client and close its connection.
//! The core talks to an interface, not a concrete transport.

use std::fmt;

/// A WebSocket close code sent on arena teardown.
pub const CLOSE_ARENA_TEARDOWN: u16 = 4000;

/// A live connection bound to a Remote tank. Implemented by the transport
/// layer; `tankarena-game` only calls through this trait.
pub trait ClientHandle: Send + Sync {
    /// Send one already-encoded packet. Ordering within a single client's
    /// stream must be preserved — implementations should queue and flush
    /// in call order, not reorder for fairness between clients.
    fn send(&self, bytes: Vec<u8>);

    /// Close the connection with the given WebSocket close code.
    fn close(&self, code: u16);
}

impl fmt::Debug for dyn ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<client handle>")
    }
}
