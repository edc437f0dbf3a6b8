//! Node registry

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::LookupError;
use crate::node::{Node, NodeState};

/// Outcome of [`NodeRegistry::upsert`]
#[derive(Debug, Clone)]
pub enum Upserted {
    /// The factory ran and its node was stored
    Created(Arc<Node>),
    /// A node was already registered for the address
    Existing(Arc<Node>),
}

impl Upserted {
    pub fn node(&self) -> &Arc<Node> {
        match self {
            Upserted::Created(node) | Upserted::Existing(node) => node,
        }
    }

    pub fn into_node(self) -> Arc<Node> {
        match self {
            Upserted::Created(node) | Upserted::Existing(node) => node,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }
}

/// Every node the hub has heard from, keyed by IP address.
///
/// Nodes are never removed, so snapshots stay valid for effects.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: DashMap<IpAddr, Arc<Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the node for `address`, creating it with `factory` if absent.
    ///
    /// Atomic per address: concurrent callers never create two nodes for
    /// one address. `factory` runs with the address's shard locked and must
    /// not call back into the registry.
    pub fn upsert<F>(&self, address: IpAddr, factory: F) -> Upserted
    where
        F: FnOnce() -> Node,
    {
        match self.nodes.entry(address) {
            Entry::Occupied(entry) => Upserted::Existing(entry.get().clone()),
            Entry::Vacant(entry) => {
                let node = Arc::new(factory());
                entry.insert(node.clone());
                Upserted::Created(node)
            }
        }
    }

    pub fn find_by_address(&self, address: IpAddr) -> Result<Arc<Node>, LookupError> {
        self.nodes
            .get(&address)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LookupError::NotFound(address.to_string()))
    }

    pub fn find_by_name(&self, name: &str) -> Result<Arc<Node>, LookupError> {
        self.nodes
            .iter()
            .find(|entry| entry.value().name() == name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LookupError::NotFound(name.to_string()))
    }

    /// Snapshot of all nodes in discovery order
    pub fn all(&self) -> Vec<Arc<Node>> {
        let mut nodes: Vec<Arc<Node>> = self
            .nodes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        nodes.sort_by_key(|node| (node.discovered_at(), node.address()));
        nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|entry| entry.value().state() == NodeState::Connected)
            .count()
    }

    /// Mark connected nodes silent for longer than `timeout` as lost.
    ///
    /// Returns the nodes that changed state. Listeners run after the
    /// registry snapshot is taken, so they may use the registry.
    pub fn mark_stale(&self, timeout: Duration) -> Vec<Arc<Node>> {
        self.all()
            .into_iter()
            .filter(|node| node.is_connected() && node.is_stale(timeout))
            .filter(|node| node.mark_lost())
            .collect()
    }
}
