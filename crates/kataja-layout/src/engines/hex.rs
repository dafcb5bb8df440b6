#![forbid(unsafe_code)]

//! Hexagonal trees: every branching opens a 120° fan.
//!
//! Nodes are placed in continuous space, one edge length from their
//! parent along the fan. When a child would overlap something already
//! placed, the parent is pushed one edge length further along its own
//! direction and its subtree is placed again; if the parent cannot move
//! either, the push goes to the grandparent. Past the iteration cap,
//! overlapping children simply slide outwards until they fit.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, PI};

use kataja_core::{LayoutConfig, Point3, Rect};
use kataja_forest::{ForestState, LayoutEngine, Node, NodeId};
use rustc_hash::FxHashMap;
use tracing::debug;

use super::{place_satellites, reset_all, reset_tree_node, timed, visible_children};
use crate::physics::directed_force;
use crate::traces::{Rotation, TracesToDraw};

#[derive(Debug, Clone)]
pub struct LeftFirstHexTree {
    config: LayoutConfig,
    rotation: Rotation,
}

#[derive(Debug, Clone, Copy)]
struct Placed {
    x: f64,
    y: f64,
    angle: f64,
    parent: Option<NodeId>,
}

/// One layout pass over all trees.
struct HexPass<'a> {
    state: &'a ForestState,
    traces: &'a TracesToDraw,
    drawn: FxHashMap<NodeId, Placed>,
    areas: FxHashMap<NodeId, Rect>,
    edge: f64,
    start_x: f64,
    iterations: u32,
    max_iterations: u32,
}

/// A child did not fit and this ancestor must move.
struct Blocked(NodeId);

impl<'a> HexPass<'a> {
    fn new(state: &'a ForestState, traces: &'a TracesToDraw, config: &LayoutConfig) -> Self {
        Self {
            state,
            traces,
            drawn: FxHashMap::default(),
            areas: FxHashMap::default(),
            edge: (config.edge_width.hypot(config.edge_height) * 2.0).max(1.0),
            start_x: 0.0,
            iterations: 0,
            max_iterations: config.hex_max_iterations,
        }
    }

    fn rect(&self, id: NodeId, x: f64, y: f64) -> Rect {
        let (w, h) = self.state.node(id).map_or((0.0, 0.0), |n| (n.width, n.height));
        Rect::centered(Point3::xy(x, y), w, h)
    }

    fn has_room(&self, area: &Rect) -> bool {
        self.areas.values().all(|a| !a.intersects(area))
    }

    fn is_below(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.drawn.get(&id).and_then(|p| p.parent);
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            cursor = self.drawn.get(&p).and_then(|d| d.parent);
        }
        false
    }

    /// Forget everything placed under `id`.
    fn clear_below(&mut self, id: NodeId) {
        let below: Vec<NodeId> = self
            .drawn
            .keys()
            .copied()
            .filter(|d| self.is_below(*d, id))
            .collect();
        for d in below {
            self.drawn.remove(&d);
            self.areas.remove(&d);
        }
    }

    fn place_root(&mut self, root: NodeId) {
        let mut rect = self.rect(root, self.start_x, 0.0);
        while !self.has_room(&rect) {
            self.start_x += self.edge;
            rect = self.rect(root, self.start_x, 0.0);
        }
        self.areas.insert(root, rect);
        self.drawn.insert(
            root,
            Placed {
                x: self.start_x,
                y: 0.0,
                angle: FRAC_PI_2,
                parent: None,
            },
        );
    }

    fn drawable_children(&self, id: NodeId) -> Vec<NodeId> {
        visible_children(self.state, id)
            .into_iter()
            .filter(|c| self.traces.should_draw(*c, Some(id)))
            .collect()
    }

    /// First placed node, in preorder, with a child still to place.
    fn unfinished(&self, root: NodeId) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let children = self.drawable_children(id);
            if children.iter().any(|c| !self.drawn.contains_key(c)) {
                return Some(id);
            }
            for c in children.into_iter().rev() {
                if self.drawn.get(&c).is_some_and(|p| p.parent == Some(id)) {
                    stack.push(c);
                }
            }
        }
        None
    }

    fn draw_tree(&mut self, root: NodeId) {
        self.place_root(root);
        let mut outcome = self.place_children(root, false);
        loop {
            outcome = match outcome {
                Err(Blocked(ancestor)) => self.redraw(ancestor),
                Ok(()) => match self.unfinished(root) {
                    Some(id) => self.place_children(id, false),
                    None => break,
                },
            };
        }
    }

    /// Push `id` one step further out and place its subtree again.
    fn redraw(&mut self, id: NodeId) -> Result<(), Blocked> {
        self.iterations += 1;
        self.clear_below(id);
        self.areas.remove(&id);
        let Some(mut placed) = self.drawn.get(&id).copied() else {
            return Ok(());
        };
        placed.x += placed.angle.cos() * self.edge;
        placed.y += placed.angle.sin() * self.edge;
        self.drawn.insert(id, placed);
        let rect = self.rect(id, placed.x, placed.y);
        let allow_crossing = if self.has_room(&rect) {
            false
        } else if let Some(parent) = placed.parent {
            return Err(Blocked(parent));
        } else {
            true
        };
        self.areas.insert(id, rect);
        self.place_children(id, allow_crossing)
    }

    fn place_children(&mut self, id: NodeId, allow_crossing: bool) -> Result<(), Blocked> {
        let Some(parent) = self.drawn.get(&id).copied() else {
            return Ok(());
        };
        let children = self.drawable_children(id);
        let of = children.len();
        for (n, child) in children.into_iter().enumerate() {
            if self.drawn.contains_key(&child) {
                continue;
            }
            let allow = allow_crossing || self.iterations > self.max_iterations;
            let angle = if of > 1 {
                let step = (2.0 * PI / 3.0) / (of - 1) as f64;
                parent.angle + FRAC_PI_3 - n as f64 * step
            } else {
                parent.angle
            };
            let mut x = parent.x + angle.cos() * self.edge;
            let mut y = parent.y + angle.sin() * self.edge;
            let mut rect = self.rect(child, x, y);
            if !self.has_room(&rect) {
                if !allow {
                    return Err(Blocked(id));
                }
                while !self.has_room(&rect) {
                    x += angle.cos() * self.edge;
                    y += angle.sin() * self.edge;
                    rect = self.rect(child, x, y);
                }
            }
            self.areas.insert(child, rect);
            self.drawn.insert(
                child,
                Placed {
                    x,
                    y,
                    angle,
                    parent: Some(id),
                },
            );
            self.place_children(child, allow)?;
        }
        Ok(())
    }
}

impl LeftFirstHexTree {
    pub const NAME: &'static str = "left_first_hex_tree";

    #[must_use]
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            config: config.clone(),
            rotation: Rotation::default(),
        }
    }

    /// Scene position of every placed constituent.
    #[must_use]
    pub fn positions(&self, state: &ForestState, traces: &TracesToDraw) -> Vec<(NodeId, Point3)> {
        let mut pass = HexPass::new(state, traces, &self.config);
        for root in state.roots() {
            if state.is_visible(*root) && !pass.drawn.contains_key(root) {
                pass.draw_tree(*root);
                pass.start_x += 100.0;
            }
        }
        debug!(iterations = pass.iterations, placed = pass.drawn.len(), "hex layout settled");
        let mut out: Vec<(NodeId, Point3)> = pass
            .drawn
            .into_iter()
            .map(|(id, p)| (id, Point3::xy(p.x, p.y)))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }
}

impl LayoutEngine for LeftFirstHexTree {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reset_node(&self, node: &mut Node) {
        reset_tree_node(node);
    }

    fn prepare(&mut self, state: &mut ForestState, reset: bool) {
        if reset {
            self.rotation.reset();
            reset_all(state, reset_tree_node);
        }
    }

    fn draw(&mut self, state: &mut ForestState) {
        timed(Self::NAME, state.node_count(), || {
            let traces = self.rotation.traces(state);
            for (id, position) in self.positions(state, &traces) {
                if let Some(node) = state.node_mut(id) {
                    node.computed_position = position;
                }
            }
            place_satellites(state, &self.config);
        });
    }

    fn calculate_movement(&self, state: &ForestState, node: NodeId) -> Point3 {
        directed_force(state, node, &self.config)
    }

    fn reselect(&mut self, state: &ForestState) {
        self.rotation.step(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kataja_core::UndoConfig;
    use kataja_forest::{Alignment, EdgeType, Forest, ForestSettings, NodeType};

    fn full_tree(depth: u32) -> Forest {
        let mut f = Forest::new(&UndoConfig::default(), ForestSettings::default());
        fn grow(f: &mut Forest, at: NodeId, depth: u32) {
            if depth == 0 {
                return;
            }
            for side in [Alignment::Left, Alignment::Right] {
                let c = f.create_node(NodeType::Constituent, "x");
                f.connect(at, c, EdgeType::Constituent, side).unwrap();
                grow(f, c, depth - 1);
            }
        }
        let root = f.create_node(NodeType::Constituent, "x");
        grow(&mut f, root, depth);
        f
    }

    #[test]
    fn children_fan_below_their_parent() {
        let f = full_tree(1);
        let engine = LeftFirstHexTree::new(&LayoutConfig::default());
        let pos = engine.positions(f.state(), &TracesToDraw::compute(f.state(), 0));
        let [(_, top), (_, left), (_, right)] = pos.as_slice() else {
            panic!("expected three placements, got {pos:?}");
        };
        assert!(left.y > top.y && right.y > top.y);
        assert!(left.x < right.x, "the first child opens to the left");
    }

    #[test]
    fn dense_trees_place_every_node() {
        let f = full_tree(4);
        let engine = LeftFirstHexTree::new(&LayoutConfig::default());
        let pos = engine.positions(f.state(), &TracesToDraw::compute(f.state(), 0));
        assert_eq!(pos.len(), f.state().node_count());
        assert!(pos.iter().all(|(_, p)| p.is_finite()));
    }
}
