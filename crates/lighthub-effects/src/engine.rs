//! Effect engine

use lighthub_discovery::Node;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::Effect;

/// Owns the effects and the nodes they drive
#[derive(Default)]
pub struct EffectEngine {
    effects: Vec<Box<dyn Effect>>,
    nodes: Vec<Arc<Node>>,
}

impl EffectEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an effect. Only nodes attached afterwards are given to it.
    pub fn add_effect<E>(&mut self, effect: E)
    where
        E: Effect + 'static,
    {
        info!("Effect {} added", effect.name());
        self.effects.push(Box::new(effect));
    }

    /// Hand a node to every effect, then connect it.
    ///
    /// Effects subscribe during attach, so they observe the connect
    /// transition and paint their initial frame. Returns `false` if the
    /// node was already attached.
    pub fn attach_node(&mut self, node: Arc<Node>) -> bool {
        if self.nodes.iter().any(|known| Arc::ptr_eq(known, &node)) {
            debug!("Node {} already attached", node.name());
            return false;
        }

        for effect in &mut self.effects {
            effect.attach(node.clone());
        }
        self.nodes.push(node.clone());

        if !node.connect() {
            debug!("Node {} attached in state {}", node.name(), node.state());
        }
        true
    }

    /// Advance every effect by `elapsed`
    pub fn tick(&mut self, elapsed: Duration) {
        for effect in &mut self.effects {
            effect.tick(elapsed);
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn effect_names(&self) -> Vec<&str> {
        self.effects.iter().map(|effect| effect.name()).collect()
    }
}
