//! Node representation
//!
//! A [`Node`] is one LED strip controller found on the network. It owns the
//! strip's [`PixelBuffer`]; releasing the buffer sends a PIXELS packet to
//! the node's control port.

use lighthub_core::packet::MAX_PIXELS;
use lighthub_core::{Color, FlushHook, InfoFields, NodeType, Packet, PacketKind, PixelBuffer};
use lighthub_transport::DatagramSink;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Connection state.
///
/// Only moves forward: `Discovered -> Connected -> Lost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Created from an INFO reply, not yet adopted
    Discovered,
    /// Reachable and driven by effects
    Connected,
    /// Stopped answering; kept for history, skipped by effects
    Lost,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Discovered => "discovered",
            NodeState::Connected => "connected",
            NodeState::Lost => "lost",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives node state transitions.
///
/// Called synchronously on the thread that performed the transition, after
/// the node's internal locks are released.
pub trait StateListener: Send + Sync {
    fn on_state_change(&self, node: &Node, state: NodeState);
}

/// A discovered LED strip controller
pub struct Node {
    name: String,
    node_type: NodeType,
    address: IpAddr,
    control_port: u16,
    state: RwLock<NodeState>,
    pixels: PixelBuffer,
    listeners: Mutex<Vec<Arc<dyn StateListener>>>,
    discovered_at: Instant,
    last_seen: Mutex<Instant>,
}

impl Node {
    /// Create a node in the `Discovered` state.
    ///
    /// Buffer releases are sent through `sink` to `address:control_port`.
    pub fn new(
        name: String,
        info: InfoFields,
        address: IpAddr,
        control_port: u16,
        sink: Arc<dyn DatagramSink>,
    ) -> Self {
        let target = SocketAddr::new(address, control_port);
        let hook = Arc::new(PixelFlush {
            sink,
            target,
        });
        let now = Instant::now();

        if info.led_count as usize > MAX_PIXELS {
            warn!(
                "Node {} reports {} LEDs; frames carry only the first {}",
                name, info.led_count, MAX_PIXELS
            );
        }

        Self {
            name,
            node_type: info.node_type,
            address,
            control_port,
            state: RwLock::new(NodeState::Discovered),
            pixels: PixelBuffer::with_hook(info.led_count as usize, hook),
            listeners: Mutex::new(Vec::new()),
            discovered_at: now,
            last_seen: Mutex::new(now),
        }
    }

    /// Create a node named after its address
    pub fn from_info(
        address: IpAddr,
        info: InfoFields,
        control_port: u16,
        sink: Arc<dyn DatagramSink>,
    ) -> Self {
        Self::new(address.to_string(), info, address, control_port, sink)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn control_port(&self) -> u16 {
        self.control_port
    }

    /// Where PIXELS frames go
    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.control_port)
    }

    pub fn led_count(&self) -> usize {
        self.pixels.size()
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn state(&self) -> NodeState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == NodeState::Connected
    }

    pub fn discovered_at(&self) -> Instant {
        self.discovered_at
    }

    pub fn last_seen(&self) -> Instant {
        *self.last_seen.lock()
    }

    /// Update last seen time
    pub fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Check if the node has been silent longer than `timeout`
    pub fn is_stale(&self, timeout: Duration) -> bool {
        self.last_seen().elapsed() > timeout
    }

    /// Point-in-time summary for display
    pub fn snapshot(&self) -> NodeInfo {
        NodeInfo {
            name: self.name.clone(),
            node_type: self.node_type,
            control_addr: self.control_addr(),
            state: self.state(),
            led_count: self.led_count(),
            flushes: self.pixels.flush_count(),
            idle: self.last_seen().elapsed(),
        }
    }

    /// Register for state transitions
    pub fn subscribe(&self, listener: Arc<dyn StateListener>) {
        self.listeners.lock().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// `Discovered -> Connected`.
    ///
    /// Returns `false` without notifying if the node was not `Discovered`.
    pub fn connect(&self) -> bool {
        self.transition(NodeState::Discovered, NodeState::Connected)
    }

    /// `Connected -> Lost`.
    ///
    /// Returns `false` without notifying if the node was not `Connected`.
    pub fn mark_lost(&self) -> bool {
        self.transition(NodeState::Connected, NodeState::Lost)
    }

    /// Handle a packet received from this node's address
    pub fn dispatch(&self, packet: &Packet) {
        match packet.kind() {
            PacketKind::Info => {
                self.touch();
                if let Some(info) = packet.info_fields() {
                    if info.led_count as usize != self.led_count() {
                        warn!(
                            "Node {} reports {} LEDs, buffer has {}",
                            self.name,
                            info.led_count,
                            self.led_count()
                        );
                    }
                }
                debug!("INFO refresh from {}", self.name);
            }
            kind => {
                debug!("Ignoring {} packet from node {}", kind, self.name);
            }
        }
    }

    fn transition(&self, from: NodeState, to: NodeState) -> bool {
        {
            let mut state = self.state.write();
            if *state != from {
                return false;
            }
            *state = to;
        }

        info!("Node {} {} -> {}", self.name, from, to);

        let listeners: Vec<Arc<dyn StateListener>> = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_state_change(self, to);
        }
        true
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("node_type", &self.node_type)
            .field("address", &self.address)
            .field("control_port", &self.control_port)
            .field("state", &self.state())
            .field("led_count", &self.led_count())
            .finish()
    }
}

/// Summary of a node, see [`Node::snapshot`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub node_type: NodeType,
    pub control_addr: SocketAddr,
    pub state: NodeState,
    pub led_count: usize,
    pub flushes: u64,
    /// Time since the last INFO
    pub idle: Duration,
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} LEDs) {} at {}, {} frames, idle {:.1}s",
            self.name,
            self.node_type,
            self.led_count,
            self.state,
            self.control_addr,
            self.flushes,
            self.idle.as_secs_f64()
        )
    }
}

/// Sends released buffer contents to the node as a PIXELS packet
struct PixelFlush {
    sink: Arc<dyn DatagramSink>,
    target: SocketAddr,
}

impl FlushHook for PixelFlush {
    fn flush(&self, pixels: &[Color]) {
        let packet = Packet::pixels(pixels);
        if let Err(e) = self.sink.send_datagram(&packet.encode(), self.target) {
            warn!("Failed to send pixels to {}: {}", self.target, e);
        }
    }
}
