//! Error types for LightHub core

use thiserror::Error;

/// Malformed datagram errors.
///
/// Both variants are expected when foreign traffic reaches the hub's
/// port, so callers log and drop rather than propagate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Empty datagram or unrecognized kind byte
    #[error("invalid header: {}", describe_header(.0))]
    InvalidHeader(Option<u8>),

    /// Payload length does not match the layout declared by the kind
    #[error("invalid size for {kind}: expected {expected} payload bytes, got {actual}")]
    InvalidSize {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Pixel buffer access errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PixelError {
    #[error("pixel index {index} out of range (size {size})")]
    IndexOutOfRange { index: usize, size: usize },

    /// A guard for this buffer is still alive
    #[error("pixel buffer already acquired")]
    AlreadyAcquired,
}

fn describe_header(kind: &Option<u8>) -> String {
    match kind {
        Some(byte) => format!("unknown kind 0x{byte:02x}"),
        None => "empty datagram".to_string(),
    }
}
