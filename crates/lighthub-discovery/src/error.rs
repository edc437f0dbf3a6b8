//! Discovery error types

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Service startup and shutdown failures.
///
/// Errors inside the running loop are logged, never returned.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("transport error: {0}")]
    Transport(#[from] lighthub_transport::TransportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("discovery loop did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("discovery loop failed: {0}")]
    TaskFailed(String),
}

/// Registry miss
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("node not found: {0}")]
    NotFound(String),
}
