#![forbid(unsafe_code)]

//! Top-down, left-first grid trees.
//!
//! Each branch takes the room it needs and may push later branches further
//! down and to the right, in the manner of LaTeX `qtree`.
//!
//! ```text
//!   ....O....        a node's first child goes down-left,
//!   .../.\...        later children slide down-right along the
//!   ..O...O..        diagonal until both the cell and the path
//!   ./.\...\.        to it are free
//!   O...O...O
//! ```

use kataja_core::{LayoutConfig, Point3};
use kataja_forest::{ForestState, LayoutEngine, Node, NodeId};
use rustc_hash::FxHashSet;

use super::{place_grid, place_satellites, reset_all, reset_tree_node, timed, visible_children};
use crate::grid::{Cell, Grid, Slant};
use crate::physics::directed_force;
use crate::traces::{Rotation, TracesToDraw};

const X_STEP: i32 = 2;
const Y_STEP: i32 = 2;

#[derive(Debug, Clone)]
pub struct LeftFirstTree {
    config: LayoutConfig,
    rotation: Rotation,
}

impl LeftFirstTree {
    pub const NAME: &'static str = "left_first_tree";

    #[must_use]
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            config: config.clone(),
            rotation: Rotation::default(),
        }
    }

    /// Lay out every tree and merge them left to right.
    #[must_use]
    pub fn build_grid(&self, state: &ForestState, traces: &TracesToDraw) -> Grid {
        let mut merged = Grid::new();
        let mut done = FxHashSet::default();
        for root in state.roots() {
            if !state.is_visible(*root) {
                continue;
            }
            let mut grid = Grid::new();
            put_to_grid(state, traces, &mut grid, &mut done, *root, (0, 0), None);
            merged.merge_grids(&grid, self.config.grid_padding);
        }
        merged
    }
}

fn is_free(grid: &Grid, from: (i32, i32), to: (i32, i32)) -> bool {
    !grid.get(to.0, to.1).is_filled() && !grid.is_path_blocked(&Grid::pixelated_path(from, to))
}

/// First slot at or down-right of `start` where `child` fits.
///
/// A slot fits when its cell and the path from the parent are free and the
/// child's own first child would fit below it. After enough misses only a
/// free cell is required; far enough down-right every cell is free, so the
/// search always ends.
fn find_slot(grid: &Grid, parent: (i32, i32), start: (i32, i32), grandchildren: usize) -> (i32, i32) {
    let strict_tries = grid.width() + grid.height() + 8;
    let (mut nx, mut ny) = start;
    let mut tries = 0;
    loop {
        if !grid.get(nx, ny).is_filled() {
            if tries >= strict_tries {
                return (nx, ny);
            }
            let below = match grandchildren {
                0 => None,
                1 => Some((nx, ny + Y_STEP)),
                _ => Some((nx - X_STEP, ny + Y_STEP)),
            };
            if !grid.is_path_blocked(&Grid::pixelated_path(parent, (nx, ny)))
                && below.is_none_or(|b| is_free(grid, (nx, ny), b))
            {
                return (nx, ny);
            }
        }
        nx += X_STEP;
        ny += Y_STEP;
        tries += 1;
    }
}

fn put_to_grid(
    state: &ForestState,
    traces: &TracesToDraw,
    grid: &mut Grid,
    done: &mut FxHashSet<NodeId>,
    node: NodeId,
    (x, y): (i32, i32),
    parent: Option<NodeId>,
) {
    if !traces.should_draw(node, parent) || !done.insert(node) {
        return;
    }
    grid.set(x, y, Cell::Node(node));
    let children: Vec<NodeId> = visible_children(state, node)
        .into_iter()
        .filter(|c| traces.should_draw(*c, Some(node)) && !done.contains(c))
        .collect();
    let many = children.len() > 2;
    let mut nx = x - (children.len() as i32 / 2) * X_STEP;
    let mut ny = y + Y_STEP;
    for (i, child) in children.into_iter().enumerate() {
        if done.contains(&child) {
            continue;
        }
        let grandchildren = visible_children(state, child).len();
        let (cx, cy) = find_slot(grid, (x, y), (nx, ny), grandchildren);
        grid.fill_path(&Grid::pixelated_path((x, y), (cx, cy)), Slant::between(x, cx));
        put_to_grid(state, traces, grid, done, child, (cx, cy), Some(node));
        nx = cx + if i == 0 && !many { X_STEP * 2 } else { X_STEP };
        ny = cy;
    }
}

impl LayoutEngine for LeftFirstTree {
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
