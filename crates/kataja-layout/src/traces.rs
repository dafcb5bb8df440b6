#![forbid(unsafe_code)]

//! Which parent draws a multidominated node.
//!
//! A node with several constituent parents is drawn once, under one of
//! them; its other occurrences are traces. The candidates are every parent
//! occurrence in document order across all trees. A rotation counter picks
//! how many skippable candidates to pass over, so repeated reselection walks
//! through every distinct arrangement.
//!
//! ```text
//!   preorder position  2  3  7  9  13 15 16
//!   chain              i  j  i  i  k  j  k
//!   last occurrence             x     x  x   (cannot be skipped)
//!   rotation 0         *  *        *
//!   rotation 1            *  *     *
//!   rotation 2               *     *  *
//! ```
//!
//! # Invariants
//!
//! Every visible multidominated node has exactly one drawn parent.

use kataja_forest::{ForestState, NodeId};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TracesToDraw {
    drawn_parent: FxHashMap<NodeId, NodeId>,
    rotations: usize,
}

struct Candidate {
    position: usize,
    node: NodeId,
    parent: NodeId,
    skippable: bool,
}

/// Each node reachable from `root` along visible constituent edges, once,
/// in preorder.
pub(crate) fn preorder_once(state: &ForestState, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) || !state.is_visible(id) {
            continue;
        }
        out.push(id);
        for child in state.children(id).into_iter().rev() {
            stack.push(child);
        }
    }
    out
}

impl TracesToDraw {
    /// Build the map for `rotation`, wrapping it into range.
    #[must_use]
    pub fn compute(state: &ForestState, rotation: usize) -> Self {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut required: Vec<NodeId> = Vec::new();
        for root in state.roots() {
            let listed = preorder_once(state, *root);
            let position: FxHashMap<NodeId, usize> =
                listed.iter().enumerate().map(|(i, n)| (*n, i)).collect();
            let mut tree: Vec<Candidate> = Vec::new();
            for node in &listed {
                let parents = state.parents(*node);
                if parents.len() < 2 {
                    continue;
                }
                let mut mine: Vec<Candidate> = parents
                    .into_iter()
                    .filter_map(|p| {
                        position.get(&p).map(|i| Candidate {
                            position: *i,
                            node: *node,
                            parent: p,
                            skippable: true,
                        })
                    })
                    .collect();
                if mine.is_empty() {
                    continue;
                }
                if !required.contains(node) {
                    required.push(*node);
                }
                mine.sort_by_key(|c| (c.position, c.parent));
                if let Some(last) = mine.last_mut() {
                    last.skippable = false;
                }
                tree.extend(mine);
            }
            tree.sort_by_key(|c| (c.position, c.node, c.parent));
            candidates.extend(tree);
        }

        let rotations = candidates.len() - required.len() + 1;
        let rotation = rotation % rotations;
        let mut drawn_parent = FxHashMap::default();
        let mut skips = 0;
        for c in candidates {
            if drawn_parent.contains_key(&c.node) {
                continue;
            }
            if skips == rotation || !c.skippable {
                drawn_parent.insert(c.node, c.parent);
            } else {
                skips += 1;
            }
        }
        Self {
            drawn_parent,
            rotations,
        }
    }

    /// Number of distinct rotations; always at least one.
    #[must_use]
    pub fn rotations(&self) -> usize {
        self.rotations.max(1)
    }

    /// Parent that hosts the drawn copy of `node`, if it is multidominated.
    #[must_use]
    pub fn drawn_parent(&self, node: NodeId) -> Option<NodeId> {
        self.drawn_parent.get(&node).copied()
    }

    /// Whether `node` is drawn when reached from `parent`.
    #[must_use]
    pub fn should_draw(&self, node: NodeId, parent: Option<NodeId>) -> bool {
        match (self.drawn_parent.get(&node), parent) {
            (Some(host), Some(parent)) => *host == parent,
            _ => true,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drawn_parent.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drawn_parent.is_empty()
    }
}

/// Rotation counter shared by the engines that honour traces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Rotation(usize);

impl Rotation {
    pub(crate) fn reset(&mut self) {
        self.0 = 0;
    }

    pub(crate) fn traces(&mut self, state: &ForestState) -> TracesToDraw {
        let traces = TracesToDraw::compute(state, self.0);
        self.0 %= traces.rotations();
        traces
    }

    /// Step back one arrangement, wrapping to the last.
    pub(crate) fn step(&mut self, state: &ForestState) {
        let n = TracesToDraw::compute(state, 0).rotations();
        self.0 = (self.0 % n + n - 1) % n;
    }
}
