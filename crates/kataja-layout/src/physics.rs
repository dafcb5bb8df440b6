#![forbid(unsafe_code)]

//! Per-tick force model for nodes whose axes are not bound.
//!
//! Two flavours share the same repulsion term:
//!
//! - [`directed_force`]: flat trees. Edges pull a child towards a slot
//!   below and to the side of its parent; the first parent pulls hardest.
//! - [`elastic_force`]: three-dimensional nets. Edges behave as springs
//!   with a rest length.
//!
//! Both zero the components on bound axes.

use kataja_core::{LayoutConfig, Point3};
use kataja_forest::{Alignment, Axes, EdgeId, ForestState, NodeId};

/// Vertical distance a directed edge tries to keep between its ends.
const DIRECTED_DROP: f64 = 15.0;

/// Squared distance beyond which nodes stop repelling.
const REPULSION_RANGE_SQ: f64 = 1.0e6;

/// Below this length a spring exerts no force.
const SPRING_SLACK: f64 = 15.0;

/// Charge every visible node carries.
#[must_use]
pub fn node_force(config: &LayoutConfig) -> f64 {
    config.repulsion * config.spring_length * config.spring_length
}

fn repulsion(state: &ForestState, id: NodeId, config: &LayoutConfig, with_z: bool) -> Point3 {
    let Some(node) = state.node(id) else {
        return Point3::ZERO;
    };
    let force = node_force(config);
    let here = node.current_position;
    let mut out = Point3::ZERO;
    for other in state.visible_nodes() {
        if other == id {
            continue;
        }
        let Some(there) = state.node(other).map(|n| n.current_position) else {
            continue;
        };
        let mut d = here - there;
        if !with_z {
            d.z = 0.0;
        }
        let dist_sq = d.length_squared();
        if dist_sq > 0.0 && dist_sq < REPULSION_RANGE_SQ {
            out += d * (force / dist_sq);
        }
    }
    out
}

fn visible_edges_of<'a>(state: &'a ForestState, ids: &'a [EdgeId]) -> impl Iterator<Item = &'a kataja_forest::Edge> + 'a {
    ids.iter()
        .filter_map(|e| state.edge(*e))
        .filter(|e| e.visible)
}

fn mask(delta: Point3, bind: Axes) -> Point3 {
    Point3::new(
        if bind.contains(Axes::X) { 0.0 } else { delta.x },
        if bind.contains(Axes::Y) { 0.0 } else { delta.y },
        if bind.contains(Axes::Z) { 0.0 } else { delta.z },
    )
}

/// Displacement for a node in a flat, directed tree.
#[must_use]
pub fn directed_force(state: &ForestState, id: NodeId, config: &LayoutConfig) -> Point3 {
    let Some(node) = state.node(id) else {
        return Point3::ZERO;
    };
    let mut v = repulsion(state, id, config, false);
    for edge in visible_edges_of(state, &node.edges_down) {
        let target_dx = if edge.alignment == Alignment::Left {
            config.edge_width
        } else {
            -config.edge_width
        };
        let dx = edge.start_point.x - edge.end_point.x;
        let dy = edge.start_point.y - edge.end_point.y;
        v.x += (target_dx - dx) * edge.pull;
        v.y += (-DIRECTED_DROP - dy) * edge.pull;
    }
    for (i, edge) in visible_edges_of(state, &node.edges_up).enumerate() {
        let target_dx = if edge.alignment == Alignment::Left {
            -config.edge_width
        } else {
            config.edge_width
        };
        let dx = edge.end_point.x - edge.start_point.x;
        let dy = edge.end_point.y - edge.start_point.y;
        let rank = (i + 1) as f64;
        v.x += (target_dx - dx) * edge.pull / (rank * rank);
        v.y += (DIRECTED_DROP - dy) * edge.pull;
    }
    mask(v, node.bind)
}

/// Displacement for a node in a three-dimensional spring net.
#[must_use]
pub fn elastic_force(state: &ForestState, id: NodeId, config: &LayoutConfig) -> Point3 {
    let Some(node) = state.node(id) else {
        return Point3::ZERO;
    };
    let mut v = repulsion(state, id, config, true);
    let incident = node.edges_up.iter().chain(node.edges_down.iter()).copied().collect::<Vec<_>>();
    for edge in visible_edges_of(state, &incident) {
        let towards = if edge.start == Some(id) {
            edge.end_point - edge.start_point
        } else {
            edge.start_point - edge.end_point
        };
        let dist = towards.length();
        if dist > SPRING_SLACK {
            v += towards * ((dist - config.spring_length) * config.attraction / dist);
        }
    }
    mask(v, node.bind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kataja_core::UndoConfig;
    use kataja_forest::{EdgeType, Forest, ForestSettings, NodeType};

    fn pair(gap: f64) -> (Forest, NodeId, NodeId) {
        let mut f = Forest::new(&UndoConfig::default(), ForestSettings::default());
        let a = f.create_node(NodeType::Constituent, "A");
        let b = f.create_node(NodeType::Constituent, "B");
        for (id, x) in [(a, 0.0), (b, gap)] {
            let n = f.state_mut().node_mut(id).unwrap();
            n.current_position = Point3::xy(x, 0.0);
            n.bind = Axes::empty();
        }
        (f, a, b)
    }

    #[test]
    fn unconnected_nodes_push_apart() {
        let (f, a, b) = pair(10.0);
        let cfg = LayoutConfig::default();
        assert!(directed_force(f.state(), a, &cfg).x < 0.0);
        assert!(directed_force(f.state(), b, &cfg).x > 0.0);
    }

    #[test]
    fn bound_axes_do_not_move() {
        let (mut f, a, _) = pair(10.0);
        f.state_mut().node_mut(a).unwrap().bind = Axes::X;
        let v = elastic_force(f.state(), a, &LayoutConfig::default());
        assert_eq!(v.x, 0.0);
    }

    #[test]
    fn stretched_springs_pull_together() {
        let (mut f, a, b) = pair(200.0);
        f.connect(a, b, EdgeType::Constituent, Alignment::Left).unwrap();
        f.state_mut().update_edges();
        let cfg = LayoutConfig {
            repulsion: 0.0,
            ..LayoutConfig::default()
        };
        assert!(elastic_force(f.state(), b, &cfg).x < 0.0);
        assert!(elastic_force(f.state(), a, &cfg).x > 0.0);
    }
}
