#![forbid(unsafe_code)]

//! Which nodes and edges are selected.
//!
//! The model stores ids only. The forest tells it when an item goes away
//! through [`SelectionModel::forget`], so a selection never names a removed
//! item.

use serde::{Deserialize, Serialize};

use crate::edge::EdgeId;
use crate::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selectable {
    Node(NodeId),
    Edge(EdgeId),
}

impl From<NodeId> for Selectable {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<EdgeId> for Selectable {
    fn from(id: EdgeId) -> Self {
        Self::Edge(id)
    }
}

/// Ordered selection; order is the order of selecting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionModel {
    items: Vec<Selectable>,
}

impl SelectionModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with `item`. Returns whether anything changed.
    pub fn select(&mut self, item: impl Into<Selectable>) -> bool {
        let item = item.into();
        if self.items == [item] {
            return false;
        }
        self.items.clear();
        self.items.push(item);
        true
    }

    /// Add `item` to the selection.
    pub fn add(&mut self, item: impl Into<Selectable>) -> bool {
        let item = item.into();
        if self.items.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Add `item` if absent, remove it if present.
    pub fn toggle(&mut self, item: impl Into<Selectable>) {
        let item = item.into();
        if !self.forget(item) {
            self.items.push(item);
        }
    }

    /// Drop `item`. Returns whether it was selected.
    pub fn forget(&mut self, item: impl Into<Selectable>) -> bool {
        let item = item.into();
        let before = self.items.len();
        self.items.retain(|i| *i != item);
        self.items.len() != before
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.items.is_empty();
        self.items.clear();
        changed
    }

    #[must_use]
    pub fn contains(&self, item: impl Into<Selectable>) -> bool {
        self.items.contains(&item.into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Selectable> + '_ {
        self.items.iter().copied()
    }

    /// Selected nodes in selection order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items.iter().filter_map(|i| match i {
            Selectable::Node(n) => Some(*n),
            Selectable::Edge(_) => None,
        })
    }

    /// Selected edges in selection order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.items.iter().filter_map(|i| match i {
            Selectable::Edge(e) => Some(*e),
            Selectable::Node(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_replaces_add_extends() {
        let mut s = SelectionModel::new();
        assert!(s.select(NodeId(1)));
        assert!(!s.select(NodeId(1)));
        assert!(s.add(EdgeId(4)));
        assert!(!s.add(EdgeId(4)));
        assert_eq!(s.len(), 2);
        assert_eq!(s.nodes().collect::<Vec<_>>(), [NodeId(1)]);
        assert_eq!(s.edges().collect::<Vec<_>>(), [EdgeId(4)]);
    }

    #[test]
    fn toggle_and_forget() {
        let mut s = SelectionModel::new();
        s.toggle(NodeId(2));
        assert!(s.contains(NodeId(2)));
        s.toggle(NodeId(2));
        assert!(s.is_empty());
        s.add(NodeId(3));
        assert!(s.forget(NodeId(3)));
        assert!(!s.forget(NodeId(3)));
        assert!(!s.clear());
    }
}
