//! LightHub Transport Layer
//!
//! UDP sockets for talking to nodes: a bound [`UdpTransport`] with a
//! background receiver, plus the [`DatagramSink`] seam pixel flushes go
//! through.

pub mod error;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use traits::{DatagramSink, TransportEvent};
pub use udp::{UdpConfig, UdpReceiver, UdpTransport};
