//! Chase effect
//!
//! Paints alternating runs of two colors and rotates them one pixel per
//! step.

use lighthub_core::Color;
use lighthub_discovery::{Node, NodeState, StateListener};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::Effect;

/// Pixels per run of one color
const RUN_LENGTH: usize = 4;

pub struct ChaseEffect {
    pattern: Arc<ChasePattern>,
    speed: Duration,
    elapsed: Duration,
    nodes: Vec<Arc<Node>>,
}

impl ChaseEffect {
    /// `speed` is the time between one-pixel steps
    pub fn new(color1: Color, color2: Color, speed: Duration) -> Self {
        Self {
            pattern: Arc::new(ChasePattern { color1, color2 }),
            speed,
            elapsed: Duration::ZERO,
            nodes: Vec::new(),
        }
    }

    pub fn speed(&self) -> Duration {
        self.speed
    }

    /// Time accumulated toward the next step
    pub fn pending(&self) -> Duration {
        self.elapsed
    }

    fn step(&self) {
        for node in self.nodes.iter().filter(|node| node.is_connected()) {
            match node.pixels().acquire() {
                Ok(mut guard) => {
                    guard.rotate_left(1);
                    guard.release();
                }
                Err(e) => warn!("Chase skipped {}: {}", node.name(), e),
            }
        }
    }
}

impl Effect for ChaseEffect {
    fn name(&self) -> &str {
        "chase"
    }

    fn attach(&mut self, node: Arc<Node>) {
        if self.nodes.iter().any(|known| Arc::ptr_eq(known, &node)) {
            return;
        }
        node.subscribe(self.pattern.clone());
        self.nodes.push(node);
    }

    fn tick(&mut self, elapsed: Duration) {
        self.elapsed += elapsed;
        if self.elapsed < self.speed {
            return;
        }
        self.elapsed = Duration::ZERO;
        self.step();
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Initial frame, painted when a node connects
struct ChasePattern {
    color1: Color,
    color2: Color,
}

impl ChasePattern {
    fn color_at(&self, index: usize) -> Color {
        if index % (RUN_LENGTH * 2) < RUN_LENGTH {
            self.color1
        } else {
            self.color2
        }
    }
}

impl StateListener for ChasePattern {
    fn on_state_change(&self, node: &Node, state: NodeState) {
        if state != NodeState::Connected {
            return;
        }

        let mut guard = match node.pixels().acquire() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Chase could not paint {}: {}", node.name(), e);
                return;
            }
        };
        for (index, pixel) in guard.as_mut_slice().iter_mut().enumerate() {
            *pixel = self.color_at(index);
        }
        guard.release();
        debug!("Chase painted {}", node.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_runs() {
        let pattern = ChasePattern {
            color1: Color::RED,
            color2: Color::BLUE,
        };
        let colors: Vec<Color> = (0..10).map(|i| pattern.color_at(i)).collect();
        assert_eq!(
            colors,
            vec![
                Color::RED,
                Color::RED,
                Color::RED,
                Color::RED,
                Color::BLUE,
                Color::BLUE,
                Color::BLUE,
                Color::BLUE,
                Color::RED,
                Color::RED,
            ]
        );
    }

    #[test]
    fn test_accumulator_resets_on_step() {
        let mut chase = ChaseEffect::new(Color::RED, Color::BLUE, Duration::from_millis(100));
        chase.tick(Duration::from_millis(60));
        assert_eq!(chase.pending(), Duration::from_millis(60));
        chase.tick(Duration::from_millis(60));
        assert_eq!(chase.pending(), Duration::ZERO);
    }
}
