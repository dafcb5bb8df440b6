#![forbid(unsafe_code)]

//! The seam between a forest and the algorithm that places its nodes.
//!
//! Engines write `computed_position` (and, where they drive motion with
//! forces, the per-node bind flags). They never add or remove nodes.

use std::fmt;

use kataja_core::Point3;

use crate::node::{Node, NodeId};
use crate::state::ForestState;

pub trait LayoutEngine: fmt::Debug {
    /// Registry name, e.g. `balanced_tree`.
    fn name(&self) -> &'static str;

    /// Restore this engine's default motion policy on one node.
    fn reset_node(&self, node: &mut Node);

    /// Bind to a forest. With `reset`, user adjustments are cleared and every
    /// node gets the engine's default bind flags.
    fn prepare(&mut self, state: &mut ForestState, reset: bool) {
        if reset {
            for node in state.nodes_mut() {
                node.adjustment = Point3::ZERO;
                self.reset_node(node);
            }
        }
    }

    /// Compute `computed_position` for every visible node.
    fn draw(&mut self, state: &mut ForestState);

    /// Per-tick displacement for a node whose axes are not all bound.
    fn calculate_movement(&self, _state: &ForestState, _node: NodeId) -> Point3 {
        Point3::ZERO
    }

    /// Rotate to the next sub-mode, such as which parent of a shared
    /// constituent draws it.
    fn reselect(&mut self, _state: &ForestState) {}
}
