#![forbid(unsafe_code)]

//! Layout engines and the helpers they share.
//!
//! The grid engines build a [`Grid`] per tree, merge the trees side by
//! side, then turn cells into scene coordinates with [`place_grid`]. Wide
//! or tall labels widen their column or row so neighbours do not overlap.
//! Nodes that are not constituents (features, glosses) are not in the grid;
//! they hang below their host and float under the force model.

mod balanced;
mod equidistant;
mod hex;
mod left_first;
mod spiral;

pub use balanced::BalancedTree;
pub use equidistant::Equidistant3dTree;
pub use hex::LeftFirstHexTree;
pub use left_first::LeftFirstTree;
pub use spiral::SpirallingTree;

use kataja_core::{LayoutConfig, Point3};
use kataja_forest::{Axes, ForestState, Node, NodeId, NodeType};
use rustc_hash::FxHashMap;
use web_time::Instant;

use crate::grid::{Cell, Grid};

/// Constituents are placed by the engine; everything else floats.
pub(crate) fn reset_tree_node(node: &mut Node) {
    node.bind = if node.node_type == NodeType::Constituent {
        Axes::all()
    } else {
        Axes::empty()
    };
}

/// Clear user adjustments and apply `reset` to every node.
pub(crate) fn reset_all(state: &mut ForestState, reset: impl Fn(&mut Node)) {
    for node in state.nodes_mut() {
        node.adjustment = Point3::ZERO;
        reset(node);
    }
}

/// Visible constituent children, left first.
pub(crate) fn visible_children(state: &ForestState, id: NodeId) -> Vec<NodeId> {
    state
        .children(id)
        .into_iter()
        .filter(|c| state.is_visible(*c))
        .collect()
}

/// Run one layout pass inside a `layout.draw` span that records its cost.
pub(crate) fn timed<R>(engine: &'static str, nodes: usize, f: impl FnOnce() -> R) -> R {
    let start = Instant::now();
    let _span = tracing::debug_span!(
        "layout.draw",
        engine,
        nodes,
        duration_us = tracing::field::Empty,
    )
    .entered();
    let out = f();
    let duration_us = start.elapsed().as_micros() as u64;
    tracing::Span::current().record("duration_us", duration_us);
    tracing::debug!(engine, nodes, duration_us, "layout pass finished");
    out
}

fn round_up(value: f64, step: f64) -> f64 {
    if step > 0.0 {
        (value / step).ceil() * step
    } else {
        value.ceil()
    }
}

/// Give every node cell of `grid` its scene position.
///
/// Columns are `edge_width` apart and rows `edge_height`, plus whatever a
/// wide label spills into its column or a tall one into its row.
pub(crate) fn place_grid(state: &mut ForestState, grid: &Grid, config: &LayoutConfig) {
    let ew = config.edge_width;
    let eh = config.edge_height;
    let mut extra_widths = vec![0.0_f64; grid.width()];
    let mut extra_heights = Vec::with_capacity(grid.height());
    for y in grid.min_y()..grid.end_y() {
        let mut extra_height = 0.0_f64;
        let mut prev_width = 0.0;
        for (col, x) in (grid.min_x()..grid.end_x()).enumerate() {
            let Cell::Node(id) = grid.get(x, y) else {
                continue;
            };
            let Some(node) = state.node(id) else {
                continue;
            };
            let height_spill = node.height - eh;
            if height_spill > extra_height {
                extra_height = round_up(height_spill, eh);
            }
            let width_spill = (node.width + prev_width) / 2.0 - ew * 2.0;
            if width_spill > extra_widths[col] {
                extra_widths[col] = round_up(width_spill, ew);
            }
            prev_width = node.width;
        }
        extra_heights.push(extra_height);
    }

    let mut top = 0.0;
    for (row, y) in (grid.min_y()..grid.end_y()).enumerate() {
        let mut left = 0.0;
        for (col, x) in (grid.min_x()..grid.end_x()).enumerate() {
            left += extra_widths[col];
            if let Cell::Node(id) = grid.get(x, y)
                && let Some(node) = state.node_mut(id)
            {
                node.computed_position = Point3::xy(left, top);
            }
            left += ew;
        }
        top += eh + extra_heights[row];
    }
}

/// Put each visible non-constituent node in a row under its first visible
/// host.
pub(crate) fn place_satellites(state: &mut ForestState, config: &LayoutConfig) {
    let mut by_host: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    let mut hosts: Vec<NodeId> = Vec::new();
    for id in state.visible_nodes() {
        let Some(node) = state.node(id) else {
            continue;
        };
        if node.node_type == NodeType::Constituent {
            continue;
        }
        let host = node
            .edges_up
            .iter()
            .filter_map(|e| state.edge(*e))
            .filter_map(|e| e.start)
            .find(|s| state.is_visible(*s));
        if let Some(host) = host {
            if !by_host.contains_key(&host) {
                hosts.push(host);
            }
            by_host.entry(host).or_default().push(id);
        }
    }
    for host in hosts {
        let Some(anchor) = state.node(host).map(|n| n.computed_position) else {
            continue;
        };
        let hanging = by_host.remove(&host).unwrap_or_default();
        let mid = (hanging.len() as f64 - 1.0) / 2.0;
        for (k, id) in hanging.into_iter().enumerate() {
            if let Some(node) = state.node_mut(id) {
                let dx = (k as f64 - mid) * config.edge_width;
                node.computed_position = anchor + Point3::xy(dx, config.edge_height);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kataja_core::UndoConfig;
    use kataja_forest::{Alignment, EdgeType, Forest, ForestSettings};

    #[test]
    fn grid_cells_map_to_scene_units() {
        let mut f = Forest::new(&UndoConfig::default(), ForestSettings::default());
        let a = f.create_node(NodeType::Constituent, "a");
        let b = f.create_node(NodeType::Constituent, "b");
        let mut grid = Grid::new();
        grid.set(-1, 0, Cell::Node(a));
        grid.set(1, 2, Cell::Node(b));
        place_grid(f.state_mut(), &grid, &LayoutConfig::default());
        assert_eq!(f.node(a).unwrap().computed_position, Point3::xy(0.0, 0.0));
        assert_eq!(f.node(b).unwrap().computed_position, Point3::xy(40.0, 40.0));
    }

    #[test]
    fn satellites_hang_below_their_host() {
        let settings = ForestSettings {
            feature_nodes: true,
            ..ForestSettings::default()
        };
        let mut f = Forest::new(&UndoConfig::default(), settings);
        let host = f.create_node(NodeType::Constituent, "v");
        let f1 = f.create_node(NodeType::Feature, "iD");
        let f2 = f.create_node(NodeType::Feature, "uCase");
        f.connect(host, f1, EdgeType::Feature, Alignment::None).unwrap();
        f.connect(host, f2, EdgeType::Feature, Alignment::None).unwrap();
        f.state_mut().node_mut(host).unwrap().computed_position = Point3::xy(100.0, 0.0);
        place_satellites(f.state_mut(), &LayoutConfig::default());
        assert_eq!(f.node(f1).unwrap().computed_position, Point3::xy(90.0, 20.0));
        assert_eq!(f.node(f2).unwrap().computed_position, Point3::xy(110.0, 20.0));
    }

    #[test]
    fn tree_nodes_bind_only_constituents() {
        let mut n = Node::new(NodeId(0), NodeType::Gloss, None, "g");
        reset_tree_node(&mut n);
        assert!(n.bind.is_empty());
        n.node_type = NodeType::Constituent;
        reset_tree_node(&mut n);
        assert!(n.is_kinematic());
    }
}
