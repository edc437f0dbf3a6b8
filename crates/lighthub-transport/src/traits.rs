//! Transport trait definitions

use bytes::Bytes;
use std::net::SocketAddr;

use crate::error::Result;

/// Events produced by a receiver
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Datagram received
    Data(Bytes),
    /// Receive failed; the receiver keeps running
    Error(String),
}

/// Fire-and-forget datagram output.
///
/// Implementations must not block: callers run on the effect tick path.
pub trait DatagramSink: Send + Sync {
    fn send_datagram(&self, data: &[u8], target: SocketAddr) -> Result<()>;
}
