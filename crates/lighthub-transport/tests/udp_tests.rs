//! UDP Transport Tests (lighthub-transport)
//!
//! Tests for the UDP transport implementation including:
//! - Binding and local address
//! - Send/receive operations
//! - The non-blocking datagram sink
//! - Receiver shutdown

use lighthub_core::{decode, Packet, PacketKind};
use lighthub_transport::{DatagramSink, TransportError, TransportEvent, UdpConfig, UdpTransport};
use std::collections::HashSet;
use std::time::Duration;

// ============================================================================
// Basic Binding Tests
// ============================================================================

#[tokio::test]
async fn test_udp_bind_default() {
    let transport = UdpTransport::bind("127.0.0.1:0")
        .await
        .expect("Bind should succeed");

    let addr = transport.local_addr().expect("Should get local address");

    assert!(addr.port() > 0, "Port should be > 0");
}

#[tokio::test]
async fn test_udp_bind_with_config() {
    let config = UdpConfig {
        recv_queue: 8,
        max_packet_size: 1500,
        reuse_address: false,
        broadcast: true,
    };

    let transport = UdpTransport::bind_with_config("127.0.0.1:0", config)
        .await
        .expect("Bind with config should succeed");

    assert!(
        transport.local_addr().is_ok(),
        "Should be able to get local address"
    );
}

#[tokio::test]
async fn test_udp_bind_invalid_address() {
    let result = UdpTransport::bind("not an address").await;
    assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
}

#[tokio::test]
async fn test_udp_reuse_address_shares_port() {
    let first = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let port = first.local_addr().unwrap().port();

    // Both sockets set SO_REUSEADDR, so a second bind on the same port works
    // on platforms where SO_REUSEADDR permits it for UDP.
    let second = UdpTransport::bind(&format!("127.0.0.1:{}", port)).await;
    if let Ok(second) = second {
        assert_eq!(second.local_addr().unwrap().port(), port);
    }
}

// ============================================================================
// Send/Receive Tests
// ============================================================================

#[tokio::test]
async fn test_udp_send_receive_packet() {
    let server = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();

    let server_addr = server.local_addr().unwrap();
    let client_addr = client.local_addr().unwrap();
    let mut receiver = server.start_receiver();

    client
        .send_to(&Packet::ping().encode(), server_addr)
        .await
        .expect("Send should succeed");

    let result = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from()).await;

    match result {
        Ok(Some((TransportEvent::Data(data), from))) => {
            let packet = decode(&data).expect("valid packet");
            assert_eq!(packet.kind(), PacketKind::Ping);
            assert_eq!(
                from.port(),
                client_addr.port(),
                "Source port should match client"
            );
        }
        Ok(Some((TransportEvent::Error(e), _))) => {
            panic!("Receive error: {}", e);
        }
        Ok(None) => {
            panic!("Receiver closed unexpectedly");
        }
        Err(_) => {
            panic!("Timeout waiting for data");
        }
    }
}

#[tokio::test]
async fn test_datagram_sink() {
    let server = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();

    let server_addr = server.local_addr().unwrap();
    let mut receiver = server.start_receiver();

    let sink: &dyn DatagramSink = &client;
    sink.send_datagram(b"\x01", server_addr)
        .expect("Send should succeed");

    let result = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from()).await;
    match result {
        Ok(Some((TransportEvent::Data(data), _))) => {
            assert_eq!(data.as_ref(), b"\x01");
        }
        _ => panic!("Failed to receive data"),
    }
}

#[tokio::test]
async fn test_udp_multiple_messages() {
    let server = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();

    let server_addr = server.local_addr().unwrap();
    let mut receiver = server.start_receiver();

    for i in 0..10u16 {
        let packet = lighthub_core::Packet::info(lighthub_core::NodeType::Digital, i);
        client.send_to(&packet.encode(), server_addr).await.unwrap();
    }

    let mut received = 0;
    for _ in 0..10 {
        let result = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from()).await;
        if let Ok(Some((TransportEvent::Data(_), _))) = result {
            received += 1;
        }
    }

    // Allow some packet loss (UDP is unreliable)
    assert!(
        received >= 8,
        "Should receive at least 8/10 messages, got {}",
        received
    );
}

#[tokio::test]
async fn test_oversized_datagram_is_truncated() {
    let config = UdpConfig {
        max_packet_size: 16,
        ..Default::default()
    };
    let server = UdpTransport::bind_with_config("127.0.0.1:0", config)
        .await
        .unwrap();
    let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();

    let server_addr = server.local_addr().unwrap();
    let mut receiver = server.start_receiver();

    client.send_to(&[0xAB; 64], server_addr).await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from()).await;
    match result {
        // Linux truncates, Windows reports an error; both keep the receiver alive
        Ok(Some((TransportEvent::Data(data), _))) => assert!(data.len() <= 16),
        Ok(Some((TransportEvent::Error(_), _))) => {}
        _ => panic!("Receiver should report the datagram"),
    }
}

// ============================================================================
// Concurrent Tests
// ============================================================================

#[tokio::test]
async fn test_udp_concurrent_sockets() {
    let mut sockets = vec![];
    for _ in 0..5 {
        let socket = UdpTransport::bind("127.0.0.1:0")
            .await
            .expect("Bind should succeed");
        sockets.push(socket);
    }

    let ports: HashSet<u16> = sockets
        .iter()
        .map(|s| s.local_addr().unwrap().port())
        .collect();

    assert_eq!(ports.len(), 5, "All ports should be unique");
}

#[tokio::test]
async fn test_dropping_receiver_stops_task() {
    let server = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let receiver = server.start_receiver();
    drop(receiver);

    // The socket stays usable for sending after the reader is gone
    let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    server
        .send_to(b"\x01", client.local_addr().unwrap())
        .await
        .expect("Send should succeed");
}
