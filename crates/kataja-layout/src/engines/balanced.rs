#![forbid(unsafe_code)]

//! Bottom-up balanced trees.
//!
//! Each subtree is laid out on its own grid. Sibling grids are merged with
//! the smallest shift that keeps every row apart, and the parent is
//! centred over its children two rows up.
//!
//! ```text
//!   .L.L..   .R.R..       .L.L.R.R..
//!   .L....   R.R...  -->  .L..R.R...
//!   ..L..L   ..R.R.       ..L..LR.R.   (plus subtree padding)
//! ```

use kataja_core::{LayoutConfig, Point3};
use kataja_forest::{ForestState, LayoutEngine, Node, NodeId};
use rustc_hash::FxHashSet;

use super::{place_grid, place_satellites, reset_all, reset_tree_node, timed, visible_children};
use crate::grid::{Cell, Grid, Slant};
use crate::physics::directed_force;
use crate::traces::{Rotation, TracesToDraw};

#[derive(Debug, Clone)]
pub struct BalancedTree {
    config: LayoutConfig,
    rotation: Rotation,
}

impl BalancedTree {
    pub const NAME: &'static str = "balanced_tree";

    #[must_use]
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            config: config.clone(),
            rotation: Rotation::default(),
        }
    }

    #[must_use]
    pub fn build_grid(&self, state: &ForestState, traces: &TracesToDraw) -> Grid {
        let mut merged = Grid::new();
        let mut done = FxHashSet::default();
        for root in state.roots() {
            if !state.is_visible(*root) {
                continue;
            }
            let grid = self.subtree(state, traces, &mut done, *root, None);
            merged.merge_grids(&grid, self.config.grid_padding);
        }
        merged
    }

    fn subtree(
        &self,
        state: &ForestState,
        traces: &TracesToDraw,
        done: &mut FxHashSet<NodeId>,
        node: NodeId,
        parent: Option<NodeId>,
    ) -> Grid {
        if !traces.should_draw(node, parent) || !done.insert(node) {
            return Grid::new();
        }
        let mut children = Grid::new();
        let mut columns = Vec::new();
        for child in visible_children(state, node) {
            let grid = self.subtree(state, traces, done, child, Some(node));
            let Some((cx, _)) = grid.find(child) else {
                continue;
            };
            let shift = children.merge_grids(&grid, self.config.subtree_padding);
            columns.push(cx + shift);
        }

        let mut grid = Grid::new();
        if columns.is_empty() {
            grid.set(0, 0, Cell::Node(node));
            return grid;
        }
        let x = columns.iter().sum::<i32>().div_euclid(columns.len() as i32);
        grid.overlay(&children, 0, 2);
        grid.set(x, 0, Cell::Node(node));
        for cx in columns {
            grid.fill_path(&Grid::pixelated_path((x, 0), (cx, 2)), Slant::between(x, cx));
        }
        grid
    }
}

impl LayoutEngine for BalancedTree {
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
            let grid = self.build_grid(state, &traces);
            place_grid(state, &grid, &self.config);
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
