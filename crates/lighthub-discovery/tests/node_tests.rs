//! Node state machine and buffer flush tests

use lighthub_core::{Color, InfoFields, NodeType, Packet, PacketKind};
use lighthub_discovery::{Node, NodeState, StateListener};
use lighthub_test_utils::RecordingSink;
use parking_lot::Mutex;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 40));

fn node_with(sink: Arc<RecordingSink>, led_count: u16) -> Node {
    Node::from_info(
        ADDR,
        InfoFields {
            node_type: NodeType::Digital,
            led_count,
        },
        54923,
        sink,
    )
}

#[derive(Default)]
struct Transitions {
    seen: Mutex<Vec<(String, NodeState)>>,
}

impl StateListener for Transitions {
    fn on_state_change(&self, node: &Node, state: NodeState) {
        self.seen.lock().push((node.name().to_string(), state));
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_node_from_info() {
    let node = node_with(Arc::new(RecordingSink::new()), 16);

    assert_eq!(node.name(), "192.168.1.40");
    assert_eq!(node.address(), ADDR);
    assert_eq!(node.node_type(), NodeType::Digital);
    assert_eq!(node.led_count(), 16);
    assert_eq!(node.pixels().size(), 16);
    assert_eq!(node.control_addr(), SocketAddr::new(ADDR, 54923));
    assert_eq!(node.state(), NodeState::Discovered);
}

#[test]
fn test_zero_led_node() {
    let node = node_with(Arc::new(RecordingSink::new()), 0);
    assert_eq!(node.led_count(), 0);

    let guard = node.pixels().acquire().unwrap();
    assert!(guard.is_empty());
}

// ============================================================================
// State Transitions
// ============================================================================

#[test]
fn test_connect_notifies_once() {
    let node = node_with(Arc::new(RecordingSink::new()), 4);
    let listener = Arc::new(Transitions::default());
    node.subscribe(listener.clone());

    assert!(node.connect());
    assert!(!node.connect(), "second connect is a no-op");

    let seen = listener.seen.lock();
    assert_eq!(
        seen.as_slice(),
        &[("192.168.1.40".to_string(), NodeState::Connected)]
    );
}

#[test]
fn test_every_listener_is_notified() {
    let node = node_with(Arc::new(RecordingSink::new()), 4);
    let first = Arc::new(Transitions::default());
    let second = Arc::new(Transitions::default());
    node.subscribe(first.clone());
    node.subscribe(second.clone());
    assert_eq!(node.listener_count(), 2);

    node.connect();

    assert_eq!(first.seen.lock().len(), 1);
    assert_eq!(second.seen.lock().len(), 1);
}

#[test]
fn test_lost_requires_connected() {
    let node = node_with(Arc::new(RecordingSink::new()), 4);

    assert!(!node.mark_lost());
    assert_eq!(node.state(), NodeState::Discovered);

    node.connect();
    assert!(node.mark_lost());
    assert_eq!(node.state(), NodeState::Lost);
}

#[test]
fn test_lost_is_terminal() {
    let node = node_with(Arc::new(RecordingSink::new()), 4);
    let listener = Arc::new(Transitions::default());
    node.subscribe(listener.clone());

    node.connect();
    node.mark_lost();

    assert!(!node.connect());
    assert!(!node.mark_lost());
    assert_eq!(node.state(), NodeState::Lost);

    let states: Vec<NodeState> = listener.seen.lock().iter().map(|(_, s)| *s).collect();
    assert_eq!(states, vec![NodeState::Connected, NodeState::Lost]);
}

struct Painter;

impl StateListener for Painter {
    fn on_state_change(&self, node: &Node, state: NodeState) {
        if state == NodeState::Connected {
            let mut guard = node.pixels().acquire().unwrap();
            guard.fill(Color::GREEN);
            guard.release();
        }
    }
}

#[test]
fn test_listener_can_paint_on_connect() {
    let sink = Arc::new(RecordingSink::new());
    let node = node_with(sink.clone(), 3);
    node.subscribe(Arc::new(Painter));

    node.connect();

    assert_eq!(node.pixels().snapshot(), vec![Color::GREEN; 3]);
    assert_eq!(sink.count(), 1);
}

// ============================================================================
// Flush
// ============================================================================

#[test]
fn test_release_sends_pixels_to_control_port() {
    let sink = Arc::new(RecordingSink::new());
    let node = node_with(sink.clone(), 2);

    let mut guard = node.pixels().acquire().unwrap();
    guard.set(0, Color::RED).unwrap();
    guard.set(1, Color::BLUE).unwrap();
    guard.release();

    let packets = sink.packets();
    assert_eq!(packets.len(), 1);
    let (packet, target) = &packets[0];
    assert_eq!(*target, SocketAddr::new(ADDR, 54923));
    assert_eq!(packet.kind(), PacketKind::Pixels);
    assert_eq!(packet.pixel_colors().unwrap(), vec![Color::RED, Color::BLUE]);
}

#[test]
fn test_busy_buffer_sends_nothing_extra() {
    let sink = Arc::new(RecordingSink::new());
    let node = node_with(sink.clone(), 2);

    let guard = node.pixels().acquire().unwrap();
    assert!(node.pixels().acquire().is_err());
    drop(guard);

    assert_eq!(sink.count(), 1);
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_info_dispatch_refreshes_last_seen() {
    let node = node_with(Arc::new(RecordingSink::new()), 4);
    let before = node.last_seen();

    std::thread::sleep(Duration::from_millis(5));
    node.dispatch(&Packet::info(NodeType::Digital, 4));

    assert!(node.last_seen() > before);
    assert!(!node.is_stale(Duration::from_secs(60)));
}

#[test]
fn test_other_packets_are_ignored() {
    let sink = Arc::new(RecordingSink::new());
    let node = node_with(sink.clone(), 4);
    let before = node.last_seen();

    node.dispatch(&Packet::ping());
    node.dispatch(&Packet::pixels(&[Color::WHITE]));

    assert_eq!(node.last_seen(), before);
    assert_eq!(node.state(), NodeState::Discovered);
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_staleness() {
    let node = node_with(Arc::new(RecordingSink::new()), 4);
    std::thread::sleep(Duration::from_millis(20));

    assert!(node.is_stale(Duration::from_millis(5)));
    assert!(!node.is_stale(Duration::from_secs(60)));
}

#[test]
fn test_snapshot_summary() {
    let sink = Arc::new(RecordingSink::new());
    let node = node_with(sink, 5);
    node.connect();
    node.pixels().acquire().unwrap().release();

    let info = node.snapshot();
    assert_eq!(info.name, "192.168.1.40");
    assert_eq!(info.state, NodeState::Connected);
    assert_eq!(info.led_count, 5);
    assert_eq!(info.flushes, 1);

    let line = info.to_string();
    assert!(line.starts_with("192.168.1.40 (digital, 5 LEDs) connected"));
}

#[test]
fn test_long_strip_frame_is_capped() {
    let sink = Arc::new(RecordingSink::new());
    let node = node_with(sink.clone(), 30_000);
    assert_eq!(node.led_count(), 30_000);

    node.pixels().acquire().unwrap().release();

    let frame = sink.last_packet().expect("frame sent");
    assert_eq!(
        frame.pixel_colors().unwrap().len(),
        lighthub_core::packet::MAX_PIXELS
    );
    assert!(frame.size() <= lighthub_core::packet::MAX_UDP_PAYLOAD);
}
