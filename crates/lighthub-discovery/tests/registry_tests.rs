//! Node registry tests

use lighthub_core::{InfoFields, NodeType};
use lighthub_discovery::{LookupError, Node, NodeRegistry, NodeState};
use lighthub_test_utils::RecordingSink;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

fn make_node(address: IpAddr, led_count: u16) -> Node {
    Node::from_info(
        address,
        InfoFields {
            node_type: NodeType::Analog,
            led_count,
        },
        54923,
        Arc::new(RecordingSink::new()),
    )
}

// ============================================================================
// Upsert
// ============================================================================

#[test]
fn test_upsert_creates_once() {
    let registry = NodeRegistry::new();
    let calls = AtomicUsize::new(0);

    let first = registry.upsert(ip(1), || {
        calls.fetch_add(1, Ordering::SeqCst);
        make_node(ip(1), 8)
    });
    let second = registry.upsert(ip(1), || {
        calls.fetch_add(1, Ordering::SeqCst);
        make_node(ip(1), 99)
    });

    assert!(first.is_created());
    assert!(!second.is_created());
    assert_eq!(calls.load(Ordering::SeqCst), 1, "factory runs only for a new address");
    assert!(Arc::ptr_eq(first.node(), second.node()));
    assert_eq!(second.into_node().led_count(), 8);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_concurrent_upsert_single_node() {
    let registry = Arc::new(NodeRegistry::new());
    let created = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            let created = created.clone();
            std::thread::spawn(move || {
                if registry.upsert(ip(7), || make_node(ip(7), 30)).is_created() {
                    created.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn test_find_by_name_and_address() {
    let registry = NodeRegistry::new();
    registry.upsert(ip(2), || make_node(ip(2), 10));

    let by_name = registry.find_by_name("10.0.0.2").unwrap();
    let by_addr = registry.find_by_address(ip(2)).unwrap();
    assert!(Arc::ptr_eq(&by_name, &by_addr));
}

#[test]
fn test_lookup_miss() {
    let registry = NodeRegistry::new();
    assert!(registry.is_empty());

    assert_eq!(
        registry.find_by_name("kitchen").unwrap_err(),
        LookupError::NotFound("kitchen".to_string())
    );
    assert_eq!(
        registry.find_by_address(ip(3)).unwrap_err(),
        LookupError::NotFound("10.0.0.3".to_string())
    );
}

#[test]
fn test_all_in_discovery_order() {
    let registry = NodeRegistry::new();
    for last in [9, 4, 6] {
        registry.upsert(ip(last), || make_node(ip(last), 1));
        std::thread::sleep(Duration::from_millis(2));
    }

    let names: Vec<String> = registry
        .all()
        .iter()
        .map(|node| node.name().to_string())
        .collect();
    assert_eq!(names, vec!["10.0.0.9", "10.0.0.4", "10.0.0.6"]);
}

// ============================================================================
// State Queries
// ============================================================================

#[test]
fn test_connected_count() {
    let registry = NodeRegistry::new();
    let a = registry.upsert(ip(1), || make_node(ip(1), 1)).into_node();
    registry.upsert(ip(2), || make_node(ip(2), 1));

    assert_eq!(registry.connected_count(), 0);
    a.connect();
    assert_eq!(registry.connected_count(), 1);
    a.mark_lost();
    assert_eq!(registry.connected_count(), 0);
    assert_eq!(registry.len(), 2, "lost nodes stay registered");
}

#[test]
fn test_mark_stale_only_touches_connected() {
    let registry = NodeRegistry::new();
    let connected = registry.upsert(ip(1), || make_node(ip(1), 1)).into_node();
    let discovered = registry.upsert(ip(2), || make_node(ip(2), 1)).into_node();
    connected.connect();

    std::thread::sleep(Duration::from_millis(20));
    let lost = registry.mark_stale(Duration::from_millis(5));

    assert_eq!(lost.len(), 1);
    assert!(Arc::ptr_eq(&lost[0], &connected));
    assert_eq!(connected.state(), NodeState::Lost);
    assert_eq!(discovered.state(), NodeState::Discovered);

    assert!(registry.mark_stale(Duration::from_millis(5)).is_empty());
}

#[test]
fn test_mark_stale_keeps_fresh_nodes() {
    let registry = NodeRegistry::new();
    let node = registry.upsert(ip(1), || make_node(ip(1), 1)).into_node();
    node.connect();

    assert!(registry.mark_stale(Duration::from_secs(60)).is_empty());
    assert!(node.is_connected());
}
