//! LightHub Core
//!
//! Core types and encoding for the LightHub node protocol.
//!
//! This crate provides:
//! - Wire packets and their codec ([`Packet`], [`PacketKind`])
//! - RGB colors with HSV construction and blending ([`Color`])
//! - Per-node pixel storage with an acquire/release discipline ([`PixelBuffer`])

pub mod color;
pub mod error;
pub mod packet;
pub mod pixel;

pub use color::Color;
pub use error::{PacketError, PixelError};
pub use packet::{decode, encode, InfoFields, NodeType, Packet, PacketKind};
pub use pixel::{FlushHook, PixelBuffer, PixelGuard};

/// Port nodes listen on for PING probes and PIXELS frames
pub const DEFAULT_SEND_PORT: u16 = 54923;

/// Port the hub listens on for INFO replies
pub const DEFAULT_RECV_PORT: u16 = 54924;

/// Receive buffer size for datagrams from nodes.
///
/// Nodes only ever send INFO, so this bounds what the hub reads, not what
/// it sends: outgoing PIXELS frames are limited by [`packet::MAX_PIXELS`].
pub const MAX_DATAGRAM_SIZE: usize = 512;
