//! LightHub Effects
//!
//! Effects paint node pixel buffers when nodes connect and advance them on
//! every engine tick. Each buffer change goes through acquire/release, so
//! every step reaches the node as one PIXELS frame.

pub mod chase;
pub mod engine;
pub mod tricolor;

pub use chase::ChaseEffect;
pub use engine::EffectEngine;
pub use tricolor::{ColorTriple, TriColorEffect};

use lighthub_discovery::Node;
use std::sync::Arc;
use std::time::Duration;

/// A time-based effect over a set of nodes.
///
/// Effects keep their own timing state; `tick` receives the time since the
/// previous tick rather than reading a clock.
pub trait Effect: Send {
    /// Effect name for logs
    fn name(&self) -> &str;

    /// Start driving `node`. Called before the node connects, so the effect
    /// can subscribe to its state changes. Attaching a node twice is a no-op.
    fn attach(&mut self, node: Arc<Node>);

    /// Advance the effect by `elapsed`
    fn tick(&mut self, elapsed: Duration);

    /// Nodes attached so far
    fn node_count(&self) -> usize;
}
