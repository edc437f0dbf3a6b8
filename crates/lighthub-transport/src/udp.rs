//! UDP transport implementation

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{Result, TransportError};
use crate::traits::{DatagramSink, TransportEvent};

/// UDP configuration
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Receive queue depth (datagrams) between the socket task and the
    /// consumer
    pub recv_queue: usize,
    /// Maximum packet size
    pub max_packet_size: usize,
    /// Set SO_REUSEADDR before binding
    pub reuse_address: bool,
    /// Allow sending to broadcast addresses
    pub broadcast: bool,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            recv_queue: 100,
            max_packet_size: lighthub_core::MAX_DATAGRAM_SIZE,
            reuse_address: true,
            broadcast: false,
        }
    }
}

/// UDP transport (connectionless)
#[derive(Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    config: UdpConfig,
}

impl UdpTransport {
    /// Bind to a local address
    pub async fn bind(addr: &str) -> Result<Self> {
        Self::bind_with_config(addr, UdpConfig::default()).await
    }

    /// Bind with config
    pub async fn bind_with_config(addr: &str, config: UdpConfig) -> Result<Self> {
        let local = tokio::net::lookup_host(addr)
            .await
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", addr, e)))?
            .next()
            .ok_or_else(|| TransportError::InvalidAddress(addr.to_string()))?;

        let socket = open_socket(local, &config)
            .map_err(|e| TransportError::Bind(format!("{}: {}", local, e)))?;
        let socket = UdpSocket::from_std(socket.into())?;

        info!("UDP bound to {}", socket.local_addr()?);

        Ok(Self {
            socket: Arc::new(socket),
            config,
        })
    }

    /// Get local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Io)
    }

    /// Start receiving packets.
    ///
    /// The socket is read on a spawned task until the returned receiver is
    /// dropped.
    pub fn start_receiver(&self) -> UdpReceiver {
        let (tx, rx) = mpsc::channel(self.config.recv_queue);
        let socket = self.socket.clone();
        let max_size = self.config.max_packet_size;

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; max_size];

            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, from)) => {
                        debug!("UDP received {} bytes from {}", len, from);
                        let data = Bytes::copy_from_slice(&buf[..len]);
                        if tx.send((TransportEvent::Data(data), from)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("UDP receive error: {}", e);
                        if tx
                            .send((
                                TransportEvent::Error(e.to_string()),
                                SocketAddr::from(([0, 0, 0, 0], 0)),
                            ))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
        });

        UdpReceiver { rx, task }
    }

    /// Send to a specific address
    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        self.socket
            .send_to(data, target)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(())
    }

    /// Send without waiting for socket readiness
    pub fn try_send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        match self.socket.try_send_to(data, target) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(TransportError::WouldBlock),
            Err(e) => Err(TransportError::SendFailed(e.to_string())),
        }
    }

    pub fn broadcast(&self) -> Result<bool> {
        self.socket.broadcast().map_err(TransportError::Io)
    }
}

impl DatagramSink for UdpTransport {
    fn send_datagram(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        self.try_send_to(data, target)
    }
}

fn open_socket(local: SocketAddr, config: &UdpConfig) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(local), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(config.reuse_address)?;
    socket.set_broadcast(config.broadcast)?;
    socket.set_nonblocking(true)?;
    socket.bind(&local.into())?;
    Ok(socket)
}

/// UDP receiver
pub struct UdpReceiver {
    rx: mpsc::Receiver<(TransportEvent, SocketAddr)>,
    task: JoinHandle<()>,
}

impl UdpReceiver {
    /// Receive the next event with source address
    pub async fn recv_from(&mut self) -> Option<(TransportEvent, SocketAddr)> {
        self.rx.recv().await
    }

    /// Take an already queued event without waiting
    pub fn try_recv_from(&mut self) -> Option<(TransportEvent, SocketAddr)> {
        self.rx.try_recv().ok()
    }
}

impl Drop for UdpReceiver {
    fn drop(&mut self) {
        self.task.abort();
    }
}
