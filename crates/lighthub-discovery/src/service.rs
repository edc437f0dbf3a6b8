//! Broadcast discovery service
//!
//! Owns two UDP sockets: one broadcasts PING and carries PIXELS frames to
//! nodes, the other receives INFO replies. A single task multiplexes the
//! probe timer, incoming datagrams and shutdown.

use crate::{
    DiscoveryConfig, DiscoveryError, DiscoveryEvent, Node, NodeRegistry, Result, Upserted,
};
use lighthub_core::{decode, Packet, PacketKind};
use lighthub_transport::{DatagramSink, TransportEvent, UdpConfig, UdpReceiver, UdpTransport};
use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Running discovery loop.
///
/// Dropping the service aborts the loop; [`DiscoveryService::shutdown`]
/// stops it gracefully.
pub struct DiscoveryService {
    registry: Arc<NodeRegistry>,
    local_send_addr: SocketAddr,
    local_recv_addr: SocketAddr,
    shutdown_timeout: Duration,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DiscoveryService {
    /// Bind both sockets and start the loop.
    ///
    /// The first PING goes out immediately, then once per `config.period`.
    /// New nodes are reported on the returned channel in the `Discovered`
    /// state; the receiver decides when to connect them.
    pub async fn start(
        config: DiscoveryConfig,
        registry: Arc<NodeRegistry>,
    ) -> Result<(Self, mpsc::Receiver<DiscoveryEvent>)> {
        let send_bind = SocketAddr::new(config.bind_addr, config.send_bind_port);
        let send = UdpTransport::bind_with_config(
            &send_bind.to_string(),
            UdpConfig {
                broadcast: true,
                ..Default::default()
            },
        )
        .await?;

        let recv_bind = SocketAddr::new(config.bind_addr, config.recv_port);
        let recv = UdpTransport::bind(&recv_bind.to_string()).await?;

        let local_send_addr = send.local_addr()?;
        let local_recv_addr = recv.local_addr()?;
        info!(
            "Discovery sending from {}, listening on {}",
            local_send_addr, local_recv_addr
        );

        let (event_tx, event_rx) = mpsc::channel(config.event_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let receiver = recv.start_receiver();
        let shutdown_timeout = config.shutdown_timeout;
        let worker = Worker {
            probe_target: SocketAddr::new(config.broadcast_addr, config.send_port),
            sink: Arc::new(send.clone()),
            send,
            registry: registry.clone(),
            events: event_tx,
            backlog: VecDeque::new(),
            config,
        };
        let task = tokio::spawn(worker.run(receiver, shutdown_rx));

        Ok((
            Self {
                registry,
                local_send_addr,
                local_recv_addr,
                shutdown_timeout,
                shutdown_tx: Some(shutdown_tx),
                task: Some(task),
            },
            event_rx,
        ))
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Address PING and PIXELS are sent from
    pub fn local_send_addr(&self) -> SocketAddr {
        self.local_send_addr
    }

    /// Address INFO replies are received on
    pub fn local_recv_addr(&self) -> SocketAddr {
        self.local_recv_addr
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// Datagrams already queued are processed before the loop returns.
    /// The loop is aborted if it does not exit within the configured
    /// shutdown timeout.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => {
                info!("Discovery stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(DiscoveryError::TaskFailed(e.to_string())),
            Err(_) => {
                task.abort();
                Err(DiscoveryError::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }
}

impl Drop for DiscoveryService {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Worker {
    config: DiscoveryConfig,
    probe_target: SocketAddr,
    send: UdpTransport,
    sink: Arc<dyn DatagramSink>,
    registry: Arc<NodeRegistry>,
    events: mpsc::Sender<DiscoveryEvent>,
    /// Events the subscriber had no room for, retried each period.
    /// Holds at most one discovered and one lost event per node.
    backlog: VecDeque<DiscoveryEvent>,
}

impl Worker {
    async fn run(mut self, mut receiver: UdpReceiver, mut shutdown: oneshot::Receiver<()>) {
        self.probe().await;

        let period = self.config.period;
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    debug!("Discovery shutdown requested");
                    break;
                }
                _ = timer.tick() => {
                    self.on_timer().await;
                }
                event = receiver.recv_from() => match event {
                    Some((TransportEvent::Data(data), from)) => {
                        self.on_datagram(&data, from);
                    }
                    Some((TransportEvent::Error(e), _)) => {
                        warn!("Discovery receive error: {}", e);
                    }
                    None => {
                        warn!("Discovery receiver closed");
                        break;
                    }
                },
            }
        }

        while let Some((event, from)) = receiver.try_recv_from() {
            if let TransportEvent::Data(data) = event {
                self.on_datagram(&data, from);
            }
        }
    }

    async fn probe(&self) {
        let ping = Packet::ping().encode();
        match self.send.send_to(&ping, self.probe_target).await {
            Ok(()) => debug!("PING sent to {}", self.probe_target),
            Err(e) => warn!("Failed to send PING to {}: {}", self.probe_target, e),
        }
    }

    async fn on_timer(&mut self) {
        self.probe().await;
        self.flush_backlog();

        if let Some(timeout) = self.config.node_timeout {
            for node in self.registry.mark_stale(timeout) {
                warn!("Node {} silent for more than {:?}", node.name(), timeout);
                self.emit(DiscoveryEvent::NodeLost(node));
            }
        }
    }

    fn on_datagram(&mut self, data: &[u8], from: SocketAddr) {
        let packet = match decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Dropping datagram from {}: {}", from, e);
                return;
            }
        };

        let address = from.ip();
        match self.registry.find_by_address(address) {
            Ok(node) => node.dispatch(&packet),
            Err(_) if packet.kind() == PacketKind::Info => self.adopt(address, &packet),
            Err(_) => {
                warn!("{} packet from unconnected device {}", packet.kind(), from);
            }
        }
    }

    fn adopt(&mut self, address: IpAddr, packet: &Packet) {
        let Some(info) = packet.info_fields() else {
            return;
        };

        let send_port = self.config.send_port;
        let sink = self.sink.clone();
        let upserted = self
            .registry
            .upsert(address, || Node::from_info(address, info, send_port, sink));

        match upserted {
            Upserted::Created(node) => {
                info!(
                    "Discovered {} node {} with {} LEDs",
                    node.node_type(),
                    node.name(),
                    node.led_count()
                );
                self.emit(DiscoveryEvent::NodeDiscovered(node));
            }
            Upserted::Existing(node) => node.dispatch(packet),
        }
    }

    /// Hand an event to the subscriber without waiting on it
    fn emit(&mut self, event: DiscoveryEvent) {
        if !self.backlog.is_empty() {
            self.backlog.push_back(event);
            self.flush_backlog();
            return;
        }

        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Discovery subscriber is behind, deferring event");
                self.backlog.push_back(event);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Discovery event dropped, no subscriber");
            }
        }
    }

    fn flush_backlog(&mut self) {
        while let Some(event) = self.backlog.pop_front() {
            match self.events.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(event)) => {
                    self.backlog.push_front(event);
                    debug!("{} discovery events still pending", self.backlog.len());
                    return;
                }
                Err(TrySendError::Closed(_)) => {
                    self.backlog.clear();
                    return;
                }
            }
        }
    }
}
