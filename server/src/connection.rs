use log::warn;
use shared::{CloseReason, ServerMessage};
use std::fmt;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Server-assigned id for one WebSocket connection. Unrelated to player ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Frames queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Close(CloseReason),
}

/// Sending half of a live connection.
///
/// Sends never block: frames go into the connection's writer queue. A failed
/// send means the writer is gone; callers log and carry on.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, addr: SocketAddr, sender: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { id, addr, sender }
    }

    pub fn send(&self, message: &ServerMessage) -> bool {
        match message.encode() {
            Ok(text) => self.send_text(text),
            Err(e) => {
                warn!("Failed to encode message for {}: {}", self.id, e);
                false
            }
        }
    }

    /// Queues an already encoded frame. Broadcasts encode once and share it.
    pub fn send_text(&self, text: String) -> bool {
        if self.sender.send(Outbound::Text(text)).is_err() {
            warn!("Send to {} ({}) failed: writer closed", self.id, self.addr);
            return false;
        }
        true
    }

    pub fn close(&self, reason: CloseReason) -> bool {
        self.sender.send(Outbound::Close(reason)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
