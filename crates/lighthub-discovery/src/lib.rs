//! LightHub Discovery
//!
//! Finds LED strip nodes on the local network and tracks them:
//! - PING broadcast on a fixed period
//! - INFO replies turned into [`Node`]s in a [`NodeRegistry`]
//! - Node state transitions and listeners
//! - Optional liveness sweep marking silent nodes lost

pub mod error;
pub mod node;
pub mod registry;
pub mod service;

pub use error::{DiscoveryError, LookupError, Result};
pub use node::{Node, NodeInfo, NodeState, StateListener};
pub use registry::{NodeRegistry, Upserted};
pub use service::DiscoveryService;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

/// Discovery event
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A new node answered a probe; still `Discovered`
    NodeDiscovered(Arc<Node>),
    /// A connected node missed the liveness window
    NodeLost(Arc<Node>),
}

/// Discovery configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Local interface for both sockets
    pub bind_addr: IpAddr,
    /// Local port of the send socket (0 picks any)
    pub send_bind_port: u16,
    /// Port nodes listen on for PING and PIXELS
    pub send_port: u16,
    /// Port the hub listens on for INFO replies
    pub recv_port: u16,
    /// Destination of PING probes
    pub broadcast_addr: IpAddr,
    /// Probe period
    pub period: Duration,
    /// Mark connected nodes lost after this much silence
    pub node_timeout: Option<Duration>,
    /// How long `shutdown` waits for the loop to exit
    pub shutdown_timeout: Duration,
    /// Event channel capacity. Events that do not fit are held by the
    /// loop and retried each period.
    pub event_capacity: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            send_bind_port: 0,
            send_port: lighthub_core::DEFAULT_SEND_PORT,
            recv_port: lighthub_core::DEFAULT_RECV_PORT,
            broadcast_addr: IpAddr::V4(Ipv4Addr::BROADCAST),
            period: Duration::from_millis(1000),
            node_timeout: None,
            shutdown_timeout: Duration::from_secs(2),
            event_capacity: 100,
        }
    }
}
