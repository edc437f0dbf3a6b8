//! Common test helpers and utilities for LightHub tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - A recording datagram sink
//! - A fake LED node speaking the discovery protocol over loopback

use lighthub_core::{decode, NodeType, Packet, PacketKind};
use lighthub_transport::{DatagramSink, TransportEvent, UdpReceiver, UdpTransport};
use parking_lot::Mutex;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check() {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    check()
}

// ============================================================================
// Recording Sink
// ============================================================================

/// Datagram sink that keeps everything sent through it
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Decoded packets, skipping anything malformed
    pub fn packets(&self) -> Vec<(Packet, SocketAddr)> {
        self.sent
            .lock()
            .iter()
            .filter_map(|(data, target)| decode(data).ok().map(|p| (p, *target)))
            .collect()
    }

    pub fn last_packet(&self) -> Option<Packet> {
        self.packets().pop().map(|(packet, _)| packet)
    }
}

impl DatagramSink for RecordingSink {
    fn send_datagram(&self, data: &[u8], target: SocketAddr) -> lighthub_transport::Result<()> {
        self.sent.lock().push((data.to_vec(), target));
        Ok(())
    }
}

// ============================================================================
// Fake Node - RAII loopback peer
// ============================================================================

/// A fake LED node on loopback.
///
/// Receives PING and PIXELS on its own port and answers with INFO when asked.
pub struct FakeNode {
    transport: UdpTransport,
    receiver: UdpReceiver,
    node_type: NodeType,
    led_count: u16,
}

impl FakeNode {
    pub async fn bind(node_type: NodeType, led_count: u16) -> Self {
        Self::bind_at(IpAddr::V4(Ipv4Addr::LOCALHOST), node_type, led_count).await
    }

    /// Bind on a specific loopback address so several nodes can be told
    /// apart by source IP
    pub async fn bind_at(ip: IpAddr, node_type: NodeType, led_count: u16) -> Self {
        let addr = SocketAddr::new(ip, 0);
        let transport = UdpTransport::bind(&addr.to_string()).await.unwrap();
        let receiver = transport.start_receiver();
        Self {
            transport,
            receiver,
            node_type,
            led_count,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr().port()
    }

    pub fn addr(&self) -> SocketAddr {
        self.transport.local_addr().unwrap()
    }

    /// Next decodable packet, or `None` on timeout
    pub async fn recv_packet(&mut self, max_wait: Duration) -> Option<(Packet, SocketAddr)> {
        let deadline = Instant::now() + max_wait;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match timeout(remaining, self.receiver.recv_from()).await {
                Ok(Some((TransportEvent::Data(data), from))) => {
                    if let Ok(packet) = decode(&data) {
                        return Some((packet, from));
                    }
                }
                Ok(Some((TransportEvent::Error(_), _))) => {}
                Ok(None) | Err(_) => return None,
            }
        }
    }

    /// Wait for the next packet of `kind`, discarding others
    pub async fn recv_kind(&mut self, kind: PacketKind, max_wait: Duration) -> Option<Packet> {
        let deadline = Instant::now() + max_wait;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (packet, _) = self.recv_packet(remaining).await?;
            if packet.kind() == kind {
                return Some(packet);
            }
        }
    }

    /// Send this node's INFO to `target`
    pub async fn send_info(&self, target: SocketAddr) {
        let info = Packet::info(self.node_type, self.led_count);
        self.send_raw(&info.encode(), target).await;
    }

    pub async fn send_raw(&self, data: &[u8], target: SocketAddr) {
        self.transport.send_to(data, target).await.unwrap();
    }
}
