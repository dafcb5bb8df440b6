#![forbid(unsafe_code)]

//! Spiralling trees.
//!
//! Every placed node is a layer with a polar angle relative to its parent.
//! Children fan out symmetrically around the parent's angle, at steps of
//! `2π / (sides / 2) / (children - 1)`. A child that collides makes its
//! parent expand one edge length outwards; a parent that has run out of
//! attempts retracts and passes the expansion to its own parent. When even
//! the root cannot make room, the whole pass restarts with one more side.
//!
//! ```text
//!            root
//!           /    \        angle of a child = parent angle
//!        c0        c1                       + π / (sides / 2)
//!       /  \      /  \                      - n * step
//! ```
//!
//! # Invariants
//!
//! 1. A pass never exceeds the iteration cap, counted across restarts.
//! 2. Every visible constituent reached from a root gets a position, placed
//!    or fallen back to below its parent.

use std::collections::VecDeque;
use std::f64::consts::{FRAC_PI_2, PI};

use kataja_core::{LayoutConfig, Point3, Rect};
use kataja_forest::{ForestState, LayoutEngine, Node, NodeId};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use super::{place_satellites, reset_all, reset_tree_node, timed, visible_children};
use crate::physics::directed_force;
use crate::traces::{Rotation, TracesToDraw};

/// Horizontal step between trees that cannot start where the previous did.
const ROOT_STEP: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct SpirallingTree {
    config: LayoutConfig,
    rotation: Rotation,
    sides: u32,
}

#[derive(Debug, Clone)]
struct Layer {
    focus: NodeId,
    parent: Option<usize>,
    x: f64,
    y: f64,
    angle: f64,
    rect: Rect,
    children: Vec<usize>,
    attempts: u32,
}

/// The pass could not fit a root's subtree with the current side count.
struct Restart;

struct SpiralPass<'a> {
    state: &'a ForestState,
    traces: &'a TracesToDraw,
    layers: Vec<Layer>,
    areas: FxHashMap<NodeId, Rect>,
    waiting: VecDeque<usize>,
    sides: u32,
    edge: f64,
    start_x: f64,
    iterations: u32,
    max_iterations: u32,
    max_attempts: u32,
}

impl<'a> SpiralPass<'a> {
    fn rect(&self, id: NodeId, x: f64, y: f64) -> Rect {
        let (w, h) = self.state.node(id).map_or((0.0, 0.0), |n| (n.width, n.height));
        Rect::centered(Point3::xy(x, y), w, h)
    }

    /// No other node's area intersects `area`.
    fn has_room(&self, own: NodeId, area: &Rect) -> bool {
        self.areas
            .iter()
            .all(|(id, a)| *id == own || !a.intersects(area))
    }

    fn reset(&mut self) {
        self.layers.clear();
        self.areas.clear();
        self.waiting.clear();
        self.start_x = 0.0;
    }

    fn add_layer(&mut self, focus: NodeId, parent: Option<usize>) -> usize {
        self.layers.push(Layer {
            focus,
            parent,
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            rect: Rect::default(),
            children: Vec::new(),
            attempts: 0,
        });
        self.layers.len() - 1
    }

    /// Place layer `idx` as child `n` of `of`. Returns whether it fits.
    fn try_to_draw(&mut self, idx: usize, n: usize, of: usize) -> bool {
        let focus = self.layers[idx].focus;
        let (x, y, angle, rect) = match self.layers[idx].parent {
            Some(p) => {
                let parent = &self.layers[p];
                let angle = if of < 2 {
                    parent.angle
                } else if self.sides == 3 {
                    parent.angle + PI - (n + 1) as f64 * (2.0 * PI / 3.0)
                } else {
                    let half = f64::from(self.sides) / 2.0;
                    let step = (2.0 * PI / half) / (of - 1) as f64;
                    parent.angle + PI / half - n as f64 * step
                };
                let (dx, dy) = (angle.cos() * self.edge, angle.sin() * self.edge);
                let (mut x, mut y) = (parent.x + dx, parent.y + dy);
                let parent_rect = parent.rect;
                let mut rect = self.rect(focus, x, y);
                while rect.intersects(&parent_rect) {
                    x += dx;
                    y += dy;
                    rect = self.rect(focus, x, y);
                }
                (x, y, angle, rect)
            }
            None => (self.start_x, 0.0, FRAC_PI_2, self.rect(focus, self.start_x, 0.0)),
        };
        let layer = &mut self.layers[idx];
        layer.x = x;
        layer.y = y;
        layer.angle = angle;
        layer.rect = rect;
        if !self.has_room(focus, &rect) {
            return false;
        }
        self.areas.insert(focus, rect);
        true
    }

    /// Move layer `idx` one edge length outwards, dropping its subtree.
    fn expand(&mut self, idx: usize) -> bool {
        self.remove_children(idx);
        let layer = &self.layers[idx];
        if layer.attempts > self.max_attempts || !self.has_room(layer.focus, &layer.rect) {
            return false;
        }
        let layer = &mut self.layers[idx];
        layer.attempts += 1;
        layer.x += layer.angle.cos() * self.edge;
        layer.y += layer.angle.sin() * self.edge;
        let (focus, x, y) = (layer.focus, layer.x, layer.y);
        let rect = self.rect(focus, x, y);
        self.layers[idx].rect = rect;
        if !self.has_room(focus, &rect) {
            return false;
        }
        self.areas.insert(focus, rect);
        true
    }

    fn remove_children(&mut self, idx: usize) {
        let children = std::mem::take(&mut self.layers[idx].children);
        for child in children {
            self.remove_areas(child);
        }
    }

    fn remove_areas(&mut self, idx: usize) {
        let focus = self.layers[idx].focus;
        self.areas.remove(&focus);
        self.waiting.retain(|w| *w != idx);
        self.remove_children(idx);
    }

    fn someone_must_expand(&mut self, mut idx: usize) -> Result<Option<usize>, Restart> {
        loop {
            if self.expand(idx) {
                return Ok(Some(idx));
            }
            match self.layers[idx].parent {
                Some(parent) => {
                    self.remove_areas(idx);
                    idx = parent;
                }
                None => return Err(Restart),
            }
        }
    }

    /// Place the children of `idx`; returns the next layer to work on.
    fn select_layer(&mut self, idx: usize) -> Result<Option<usize>, Restart> {
        self.iterations += 1;
        if self.iterations > self.max_iterations {
            return Ok(None);
        }
        let focus = self.layers[idx].focus;
        let children: Vec<NodeId> = visible_children(self.state, focus);
        let of = children.len();
        self.layers[idx].children.clear();
        for (n, child) in children.into_iter().enumerate() {
            if !self.traces.should_draw(child, Some(focus)) || self.areas.contains_key(&child) {
                continue;
            }
            let layer = self.add_layer(child, Some(idx));
            if !self.try_to_draw(layer, n, of) {
                self.remove_areas(layer);
                return self.someone_must_expand(idx);
            }
            self.layers[idx].children.push(layer);
            self.waiting.push_back(layer);
        }
        let first = self.layers[idx]
            .children
            .iter()
            .copied()
            .find(|c| self.waiting.contains(c));
        if let Some(first) = first {
            self.waiting.retain(|w| *w != first);
            return Ok(Some(first));
        }
        if self.layers[idx].parent.is_some() {
            return Ok(self.waiting.pop_front());
        }
        Ok(None)
    }

    fn draw_tree(&mut self, root: NodeId) -> Result<(), Restart> {
        let layer = self.add_layer(root, None);
        while !self.try_to_draw(layer, 0, 1) {
            self.start_x += ROOT_STEP;
        }
        let mut next = Some(layer);
        while let Some(idx) = next {
            next = self.select_layer(idx)?;
        }
        Ok(())
    }

    /// Final position of every constituent reached from the roots.
    fn positions(&self) -> FxHashMap<NodeId, Point3> {
        let mut out = FxHashMap::default();
        let mut by_focus = FxHashMap::default();
        for layer in &self.layers {
            if self.areas.contains_key(&layer.focus) {
                by_focus.insert(layer.focus, Point3::xy(layer.x, layer.y));
            }
        }
        for root in self.state.roots() {
            if !self.state.is_visible(*root) {
                continue;
            }
            let mut stack = vec![(*root, Point3::xy(self.start_x, 0.0))];
            while let Some((id, fallback)) = stack.pop() {
                if out.contains_key(&id) {
                    continue;
                }
                let at = by_focus.get(&id).copied().unwrap_or(fallback);
                out.insert(id, at);
                for child in visible_children(self.state, id) {
                    if self.traces.should_draw(child, Some(id)) {
                        stack.push((child, at + Point3::xy(0.0, self.edge)));
                    }
                }
            }
        }
        out
    }
}

impl SpirallingTree {
    pub const NAME: &'static str = "spiralling_tree";

    #[must_use]
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            config: config.clone(),
            rotation: Rotation::default(),
            sides: config.spiral_sides.max(3),
        }
    }

    /// Side count the last pass ended with.
    #[must_use]
    pub fn sides(&self) -> u32 {
        self.sides
    }

    /// Lay out all trees. Raises the side count when a root's subtree does
    /// not fit or a node has more children than the polygon has room for.
    pub fn positions(&mut self, state: &ForestState, traces: &TracesToDraw) -> FxHashMap<NodeId, Point3> {
        let widest = state
            .nodes()
            .map(|n| visible_children(state, n.id).len() as u32 + 1)
            .max()
            .unwrap_or(0);
        if widest > self.sides {
            warn!(sides = widest, "spiral needs more sides for this tree");
            self.sides = widest;
        }
        let mut pass = SpiralPass {
            state,
            traces,
            layers: Vec::new(),
            areas: FxHashMap::default(),
            waiting: VecDeque::new(),
            sides: self.sides,
            edge: (self.config.edge_width.hypot(self.config.edge_height) * 2.0).max(1.0),
            start_x: 0.0,
            iterations: 0,
            max_iterations: self.config.spiral_max_iterations,
            max_attempts: self.config.spiral_max_attempts,
        };
        'pass: loop {
            pass.reset();
            for root in state.roots() {
                if !state.is_visible(*root) {
                    continue;
                }
                if pass.draw_tree(*root).is_err() {
                    pass.sides += 1;
                    debug!(sides = pass.sides, iterations = pass.iterations, "spiral restarts");
                    continue 'pass;
                }
            }
            break;
        }
        if pass.iterations > pass.max_iterations {
            warn!(iterations = pass.max_iterations, "spiral gave up, unplaced nodes fall back");
        }
        self.sides = pass.sides;
        pass.positions()
    }
}

impl LayoutEngine for SpirallingTree {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reset_node(&self, node: &mut Node) {
        reset_tree_node(node);
    }

    fn prepare(&mut self, state: &mut ForestState, reset: bool) {
        if reset {
            self.rotation.reset();
            self.sides = self.config.spiral_sides.max(3);
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
