//! Wire packet encoding/decoding
//!
//! LightHub datagram format:
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Byte 0:     Kind                                                │
//! │             0x01 PING    hub -> node, discovery probe           │
//! │             0x02 INFO    node -> hub, self description          │
//! │             0x03 PIXELS  hub -> node, strip contents            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ INFO:   [type: u8][led count: u16 big-endian]                   │
//! │ PIXELS: [count: u16 big-endian][r g b] * count                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no separate length field: the kind declares the payload
//! layout and decoding rejects any datagram whose remaining bytes do not
//! match it exactly.

use crate::{Color, PacketError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// Kind byte size
pub const HEADER_SIZE: usize = 1;

/// INFO payload size
pub const INFO_PAYLOAD_SIZE: usize = 3;

/// Bytes per pixel in a PIXELS payload
pub const BYTES_PER_PIXEL: usize = 3;

/// Largest UDP payload over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Most pixels a single PIXELS packet can carry and still fit in one
/// UDP datagram
pub const MAX_PIXELS: usize = (MAX_UDP_PAYLOAD - HEADER_SIZE - 2) / BYTES_PER_PIXEL;

/// Message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    Ping = 0x01,
    Info = 0x02,
    Pixels = 0x03,
}

impl PacketKind {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(PacketKind::Ping),
            0x02 => Some(PacketKind::Info),
            0x03 => Some(PacketKind::Pixels),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PacketKind::Ping => "PING",
            PacketKind::Info => "INFO",
            PacketKind::Pixels => "PIXELS",
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device class reported in INFO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Single-color strip, every pixel shows the same value
    Analog,
    /// Individually addressable pixels
    Digital,
    /// A type code this hub does not know about
    Unknown(u8),
}

impl NodeType {
    pub fn code(&self) -> u8 {
        match self {
            NodeType::Analog => 0,
            NodeType::Digital => 1,
            NodeType::Unknown(code) => *code,
        }
    }
}

impl From<u8> for NodeType {
    fn from(code: u8) -> Self {
        match code {
            0 => NodeType::Analog,
            1 => NodeType::Digital,
            other => NodeType::Unknown(other),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Analog => f.write_str("analog"),
            NodeType::Digital => f.write_str("digital"),
            NodeType::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

/// Parsed INFO payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoFields {
    pub node_type: NodeType,
    pub led_count: u16,
}

/// A decoded LightHub message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    kind: PacketKind,
    payload: Bytes,
}

impl Packet {
    /// Discovery probe
    pub fn ping() -> Self {
        Self {
            kind: PacketKind::Ping,
            payload: Bytes::new(),
        }
    }

    /// Node self description
    pub fn info(node_type: NodeType, led_count: u16) -> Self {
        let mut payload = BytesMut::with_capacity(INFO_PAYLOAD_SIZE);
        payload.put_u8(node_type.code());
        payload.put_u16(led_count);
        Self {
            kind: PacketKind::Info,
            payload: payload.freeze(),
        }
    }

    /// Strip contents. Colors beyond [`MAX_PIXELS`] are dropped.
    pub fn pixels(colors: &[Color]) -> Self {
        let colors = &colors[..colors.len().min(MAX_PIXELS)];
        let mut payload = BytesMut::with_capacity(2 + colors.len() * BYTES_PER_PIXEL);
        payload.put_u16(colors.len() as u16);
        for color in colors {
            payload.put_u8(color.r);
            payload.put_u8(color.g);
            payload.put_u8(color.b);
        }
        Self {
            kind: PacketKind::Pixels,
            payload: payload.freeze(),
        }
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Type and LED count, if this is an INFO packet
    pub fn info_fields(&self) -> Option<InfoFields> {
        if self.kind != PacketKind::Info {
            return None;
        }
        let mut buf = &self.payload[..];
        Some(InfoFields {
            node_type: NodeType::from(buf.get_u8()),
            led_count: buf.get_u16(),
        })
    }

    /// Pixel colors, if this is a PIXELS packet
    pub fn pixel_colors(&self) -> Option<Vec<Color>> {
        if self.kind != PacketKind::Pixels {
            return None;
        }
        let mut buf = &self.payload[..];
        let count = buf.get_u16() as usize;
        let colors = (0..count)
            .map(|_| Color::rgb(buf.get_u8(), buf.get_u8(), buf.get_u8()))
            .collect();
        Some(colors)
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Encode to a datagram body
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size());
        buf.put_u8(self.kind as u8);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Decode a datagram body
    pub fn decode(mut buf: impl Buf) -> Result<Self, PacketError> {
        if buf.remaining() < HEADER_SIZE {
            return Err(PacketError::InvalidHeader(None));
        }

        let byte = buf.get_u8();
        let kind = PacketKind::from_u8(byte).ok_or(PacketError::InvalidHeader(Some(byte)))?;

        let payload = buf.copy_to_bytes(buf.remaining());
        let actual = payload.len();
        let expected = match kind {
            PacketKind::Ping => 0,
            PacketKind::Info => INFO_PAYLOAD_SIZE,
            PacketKind::Pixels if actual < 2 => 2,
            PacketKind::Pixels => {
                let count = u16::from_be_bytes([payload[0], payload[1]]) as usize;
                2 + count * BYTES_PER_PIXEL
            }
        };

        if actual != expected {
            return Err(PacketError::InvalidSize {
                kind: kind.as_str(),
                expected,
                actual,
            });
        }

        Ok(Self { kind, payload })
    }
}

/// Encode a packet to a datagram body
pub fn encode(packet: &Packet) -> Bytes {
    packet.encode()
}

/// Decode a datagram body
pub fn decode(data: &[u8]) -> Result<Packet, PacketError> {
    Packet::decode(data)
}
