#![forbid(unsafe_code)]

//! Per-forest display settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::edge::{EdgeShape, EdgeType};
use crate::node::NodeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BracketStyle {
    #[default]
    None,
    /// Brackets only around nodes with children.
    MajorCategories,
    All,
}

impl BracketStyle {
    /// Next style in the toggle cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::None => Self::MajorCategories,
            Self::MajorCategories => Self::All,
            Self::All => Self::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestSettings {
    pub bracket_style: BracketStyle,
    /// Draw multidominated constituents once with several parents; when
    /// off, extra occurrences are drawn as traces.
    pub multidomination: bool,
    /// Materialise features as nodes of their own.
    pub feature_nodes: bool,
    pub gloss_nodes: bool,
    pub property_nodes: bool,
    /// Let edges pull like magnets in physics layouts.
    pub magnets: bool,
    pub show_merge_order: bool,
    pub show_select_order: bool,
    pub edge_shapes: BTreeMap<EdgeType, EdgeShape>,
    /// Name of the bound visualization.
    pub visualization: String,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            bracket_style: BracketStyle::None,
            multidomination: true,
            feature_nodes: false,
            gloss_nodes: true,
            property_nodes: false,
            magnets: false,
            show_merge_order: false,
            show_select_order: false,
            edge_shapes: BTreeMap::new(),
            visualization: String::new(),
        }
    }
}

impl ForestSettings {
    /// Shape for new edges of `edge_type`.
    #[must_use]
    pub fn edge_shape(&self, edge_type: EdgeType) -> EdgeShape {
        self.edge_shapes.get(&edge_type).copied().unwrap_or_default()
    }

    /// Whether nodes of `node_type` are shown at all.
    #[must_use]
    pub fn shows(&self, node_type: NodeType) -> bool {
        match node_type {
            NodeType::Constituent => true,
            NodeType::Feature => self.feature_nodes,
            NodeType::Gloss => self.gloss_nodes,
            NodeType::Property | NodeType::Attribute => self.property_nodes,
        }
    }
}
