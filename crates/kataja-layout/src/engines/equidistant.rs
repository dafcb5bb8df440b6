#![forbid(unsafe_code)]

//! Three-dimensional spring net.
//!
//! No axis is bound: every node floats under [`elastic_force`]. Drawing
//! only seeds nodes the engine has not seen yet, spreading fresh nodes on a
//! sunflower spiral with a small depth offset so the net can unfold in z.

use kataja_core::{LayoutConfig, Point3};
use kataja_forest::{Axes, ForestState, LayoutEngine, Node, NodeId};
use rustc_hash::FxHashSet;

use super::{reset_all, timed};
use crate::physics::elastic_force;

/// Golden angle in radians.
const SPREAD_ANGLE: f64 = 2.399_963_229_728_653;

#[derive(Debug, Clone)]
pub struct Equidistant3dTree {
    config: LayoutConfig,
    seeded: FxHashSet<NodeId>,
}

fn reset_net_node(node: &mut Node) {
    node.locked_to_position = false;
    node.bind = Axes::empty();
}

/// Depth offset in `[-5, 5]`, fixed per node.
fn depth_jitter(id: NodeId) -> f64 {
    f64::from(id.0.wrapping_mul(7919) % 11) - 5.0
}

impl Equidistant3dTree {
    pub const NAME: &'static str = "equidistant_3d_tree";

    #[must_use]
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            config: config.clone(),
            seeded: FxHashSet::default(),
        }
    }

    fn seed(&self, node: &mut Node) {
        if node.current_position == Point3::ZERO {
            let k = f64::from(node.id.0);
            let r = self.config.spring_length * (k + 1.0).sqrt();
            let a = k * SPREAD_ANGLE;
            node.computed_position = Point3::new(r * a.cos(), r * a.sin(), depth_jitter(node.id));
            node.jump_to_final();
        } else {
            node.current_position.z += depth_jitter(node.id);
            node.computed_position = node.current_position - node.adjustment;
        }
    }
}

impl LayoutEngine for Equidistant3dTree {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reset_node(&self, node: &mut Node) {
        reset_net_node(node);
    }

    fn prepare(&mut self, state: &mut ForestState, reset: bool) {
        if reset {
            self.seeded.clear();
            reset_all(state, reset_net_node);
        }
    }

    fn draw(&mut self, state: &mut ForestState) {
        timed(Self::NAME, state.node_count(), || {
            for id in state.visible_nodes() {
                if !self.seeded.insert(id) {
                    continue;
                }
                if let Some(node) = state.node_mut(id) {
                    self.seed(node);
                }
            }
        });
    }

    fn calculate_movement(&self, state: &ForestState, node: NodeId) -> Point3 {
        elastic_force(state, node, &self.config)
    }
}
