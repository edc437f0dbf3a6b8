//! Three-segment color effect fed from an external source
//!
//! Whatever produces colors (an audio analyzer, a control surface) sends
//! [`ColorTriple`]s over a `tokio::sync::watch` channel. Each tick the
//! effect picks up the latest triple and paints every connected node as
//! left, center and right thirds.

use lighthub_core::Color;
use lighthub_discovery::{Node, NodeState, StateListener};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

use crate::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorTriple {
    pub left: Color,
    pub center: Color,
    pub right: Color,
}

impl ColorTriple {
    pub const fn new(left: Color, center: Color, right: Color) -> Self {
        Self {
            left,
            center,
            right,
        }
    }

    pub const fn solid(color: Color) -> Self {
        Self::new(color, color, color)
    }

    /// Move each segment toward `target`, keeping `strength` of the current
    /// color
    pub fn filter(&self, target: ColorTriple, strength: f64) -> ColorTriple {
        ColorTriple {
            left: self.left.filter(target.left, strength),
            center: self.center.filter(target.center, strength),
            right: self.right.filter(target.right, strength),
        }
    }

    /// Color for pixel `index` of a strip with `len` pixels
    pub fn color_at(&self, index: usize, len: usize) -> Color {
        match index * 3 / len.max(1) {
            0 => self.left,
            1 => self.center,
            _ => self.right,
        }
    }
}

pub struct TriColorEffect {
    feed: watch::Receiver<ColorTriple>,
    smoothing: Option<f64>,
    current: Arc<Mutex<ColorTriple>>,
    nodes: Vec<Arc<Node>>,
}

impl TriColorEffect {
    pub fn new(feed: watch::Receiver<ColorTriple>) -> Self {
        let current = *feed.borrow();
        Self {
            feed,
            smoothing: None,
            current: Arc::new(Mutex::new(current)),
            nodes: Vec::new(),
        }
    }

    /// Ease toward each new triple instead of jumping. `strength` in
    /// `0.0..1.0` is how much of the previous color is kept per tick.
    pub fn with_smoothing(mut self, strength: f64) -> Self {
        self.smoothing = Some(strength.clamp(0.0, 1.0));
        self
    }

    /// Triple currently on the strips
    pub fn current(&self) -> ColorTriple {
        *self.current.lock()
    }
}

impl Effect for TriColorEffect {
    fn name(&self) -> &str {
        "tricolor"
    }

    fn attach(&mut self, node: Arc<Node>) {
        if self.nodes.iter().any(|known| Arc::ptr_eq(known, &node)) {
            return;
        }
        node.subscribe(Arc::new(TriColorPainter {
            current: self.current.clone(),
        }));
        self.nodes.push(node);
    }

    fn tick(&mut self, _elapsed: Duration) {
        let target = *self.feed.borrow_and_update();
        let next = {
            let mut current = self.current.lock();
            let next = match self.smoothing {
                Some(strength) => current.filter(target, strength),
                None => target,
            };
            if next == *current {
                return;
            }
            *current = next;
            next
        };

        for node in self.nodes.iter().filter(|node| node.is_connected()) {
            paint(node, next);
        }
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

struct TriColorPainter {
    current: Arc<Mutex<ColorTriple>>,
}

impl StateListener for TriColorPainter {
    fn on_state_change(&self, node: &Node, state: NodeState) {
        if state == NodeState::Connected {
            let triple = *self.current.lock();
            paint(node, triple);
        }
    }
}

fn paint(node: &Node, triple: ColorTriple) {
    match node.pixels().acquire() {
        Ok(mut guard) => {
            let len = guard.len();
            for (index, pixel) in guard.as_mut_slice().iter_mut().enumerate() {
                *pixel = triple.color_at(index, len);
            }
            guard.release();
        }
        Err(e) => warn!("TriColor skipped {}: {}", node.name(), e),
    }
}
