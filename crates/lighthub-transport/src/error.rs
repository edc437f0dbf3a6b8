//! Transport error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("bind failed: {0}")]
    Bind(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Socket buffer full; the datagram was not queued
    #[error("send would block")]
    WouldBlock,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
