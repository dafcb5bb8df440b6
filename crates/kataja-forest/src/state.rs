#![forbid(unsafe_code)]

//! The snapshot-able part of a forest.
//!
//! [`ForestState`] holds nodes, edges, roots, the syntax arena the nodes
//! stand for, and the settings. It is plain data: cloning it is a snapshot,
//! serializing it is the forest's canonical serialization. Layout engines
//! read the graph and write positions through it.
//!
//! Nodes and edges live in dense slot vectors indexed by id; removal leaves
//! an empty slot so ids are never reused.
//!
//! ```text
//!   nodes: [Some(n0), None, Some(n2), ...]     n1 was removed
//!   edges: [Some(e0), Some(e1), None, ...]
//! ```

use kataja_core::{Point3, Rect};
use kataja_syntax::{ConstituentId, SyntaxArena};
use serde::{Deserialize, Serialize};

use crate::edge::{Alignment, Edge, EdgeId, EdgeType};
use crate::node::{Node, NodeId, NodeType, SyntacticRef};
use crate::settings::ForestSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForestState {
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) edges: Vec<Option<Edge>>,
    pub(crate) roots: Vec<NodeId>,
    pub syntax: SyntaxArena,
    pub settings: ForestSettings,
}

impl ForestState {
    #[must_use]
    pub fn new(settings: ForestSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().flatten()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut().flatten()
    }

    /// Live edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().flatten()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.iter_mut().flatten()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Top-level constituent nodes in order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Node standing for `syntactic`, if one exists.
    #[must_use]
    pub fn node_for(&self, syntactic: SyntacticRef) -> Option<NodeId> {
        self.nodes()
            .find(|n| n.syntactic == Some(syntactic))
            .map(|n| n.id)
    }

    #[must_use]
    pub fn node_for_constituent(&self, id: ConstituentId) -> Option<NodeId> {
        self.node_for(SyntacticRef::Constituent(id))
    }

    pub(crate) fn next_node_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u32)
    }

    pub(crate) fn next_edge_id(&self) -> EdgeId {
        EdgeId(self.edges.len() as u32)
    }

    /// Children along edges of `edge_type`, left before unaligned before right.
    #[must_use]
    pub fn children_of_type(&self, id: NodeId, edge_type: EdgeType) -> Vec<NodeId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut out: Vec<(u8, NodeId)> = node
            .edges_down
            .iter()
            .filter_map(|e| self.edge(*e))
            .filter(|e| e.edge_type == edge_type)
            .filter_map(|e| {
                let rank = match e.alignment {
                    Alignment::Left => 0,
                    Alignment::None => 1,
                    Alignment::Right => 2,
                };
                e.end.map(|end| (rank, end))
            })
            .collect();
        out.sort_by_key(|(rank, _)| *rank);
        out.into_iter().map(|(_, n)| n).collect()
    }

    /// Constituent children, left first.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.children_of_type(id, EdgeType::Constituent)
    }

    /// Constituent parents in edge order.
    #[must_use]
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        node.edges_up
            .iter()
            .filter_map(|e| self.edge(*e))
            .filter(|e| e.edge_type == EdgeType::Constituent)
            .filter_map(|e| e.start)
            .collect()
    }

    /// Every node hanging below `id` along non-arrow edges, excluding `id`,
    /// each once, in preorder.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = ahash::AHashSet::new();
        seen.insert(id);
        self.collect_below(id, &mut seen, &mut out);
        out
    }

    fn collect_below(&self, id: NodeId, seen: &mut ahash::AHashSet<NodeId>, out: &mut Vec<NodeId>) {
        let Some(node) = self.node(id) else {
            return;
        };
        let below: Vec<NodeId> = node
            .edges_down
            .iter()
            .filter_map(|e| self.edge(*e))
            .filter(|e| e.edge_type != EdgeType::Arrow)
            .filter_map(|e| e.end)
            .collect();
        for child in below {
            if seen.insert(child) {
                out.push(child);
                self.collect_below(child, seen, out);
            }
        }
    }

    /// Whether `id` passes the visibility predicate.
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.node(id)
            .is_some_and(|n| !n.folded_away && self.settings.shows(n.node_type))
    }

    /// Visible nodes in insertion order.
    #[must_use]
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| self.is_visible(n.id))
            .map(|n| n.id)
            .collect()
    }

    /// Visible edges: both present endpoints visible and the edge not hidden.
    #[must_use]
    pub fn visible_edges(&self) -> Vec<EdgeId> {
        self.edges()
            .filter(|e| {
                e.visible
                    && e.start.is_none_or(|s| self.is_visible(s))
                    && e.end.is_none_or(|n| self.is_visible(n))
            })
            .map(|e| e.id)
            .collect()
    }

    /// Bounding box of visible nodes at their current positions.
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        self.visible_nodes()
            .into_iter()
            .filter_map(|id| self.node(id))
            .fold(Rect::default(), |acc, n| acc.union(&n.rect()))
    }

    /// Topmost visible node under `point`.
    #[must_use]
    pub fn node_at(&self, point: Point3) -> Option<NodeId> {
        self.visible_nodes()
            .into_iter()
            .rev()
            .find(|id| self.node(*id).is_some_and(|n| n.rect().contains(point)))
    }

    /// Recompute endpoints and control points of every visible edge.
    pub fn update_edges(&mut self) {
        for id in self.visible_edges() {
            let start = self
                .edge(id)
                .and_then(|e| e.start)
                .and_then(|s| self.node(s))
                .map(|n| n.current_position);
            let end = self
                .edge(id)
                .and_then(|e| e.end)
                .and_then(|s| self.node(s))
                .map(|n| n.current_position);
            if let Some(edge) = self.edge_mut(id) {
                let s = start.or(end).unwrap_or(Point3::ZERO);
                let e = end.unwrap_or(s);
                edge.update_geometry(s, e);
            }
        }
    }

    /// Nodes of `node_type`.
    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes().filter(move |n| n.node_type == node_type)
    }
}
