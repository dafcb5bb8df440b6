#![forbid(unsafe_code)]

//! Persisted layout.
//!
//! A saved graph is a flat JSON object from save key to a record of
//! primitives. References between objects are written as the other
//! object's save key, so a loader can restore identity (including shared
//! constituents) by resolving keys once.
//!
//! ```text
//! {
//!   "Forest":          { "roots": ["Node:n2"], ... },
//!   "Node:n2":         { "syntactic": "Constituent:c2", "edges_down": ["Edge:e0", ...] },
//!   "Constituent:c2":  { "label": "the", "part1": "Constituent:c1", ... },
//!   ...
//! }
//! ```
//!
//! # Invariants
//!
//! Every save key appears exactly once in a saved graph.

use ahash::AHashSet;
use kataja_core::Point3;
use kataja_syntax::{Constituent, ConstituentId, Feature, FeatureId, FeatureKind};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::edge::{Alignment, Edge, EdgeId};
use crate::error::{ForestError, Result};
use crate::node::{Node, NodeId, SyntacticRef};
use crate::state::ForestState;

pub trait Savable {
    /// Key unique within one saved graph.
    fn save_key(&self) -> String;

    /// Primitive fields, with references given as save keys.
    fn saved_fields(&self) -> Map<String, Value>;
}

fn node_key(id: NodeId) -> String {
    format!("Node:{id}")
}

fn edge_key(id: EdgeId) -> String {
    format!("Edge:{id}")
}

fn constituent_key(id: ConstituentId) -> String {
    format!("Constituent:{id}")
}

fn feature_key(id: FeatureId) -> String {
    format!("Feature:{id}")
}

fn point(p: Point3) -> Value {
    json!([p.x, p.y, p.z])
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl Savable for Node {
    fn save_key(&self) -> String {
        node_key(self.id)
    }

    fn saved_fields(&self) -> Map<String, Value> {
        let syntactic = self.syntactic.map(|s| match s {
            SyntacticRef::Constituent(c) => constituent_key(c),
            SyntacticRef::Feature(f) => feature_key(f),
        });
        into_map(json!({
            "node_type": self.node_type.name(),
            "label": self.label,
            "syntactic": syntactic,
            "computed_position": point(self.computed_position),
            "adjustment": point(self.adjustment),
            "bind": self.bind.bits(),
            "locked_to_position": self.locked_to_position,
            "folded_away": self.folded_away,
            "folding_towards": self.folding_towards.map(node_key),
            "display": self.display.bits(),
            "edges_up": self.edges_up.iter().map(|e| edge_key(*e)).collect::<Vec<_>>(),
            "edges_down": self.edges_down.iter().map(|e| edge_key(*e)).collect::<Vec<_>>(),
        }))
    }
}

impl Savable for Edge {
    fn save_key(&self) -> String {
        edge_key(self.id)
    }

    fn saved_fields(&self) -> Map<String, Value> {
        let alignment = match self.alignment {
            Alignment::None => Value::Null,
            Alignment::Left => json!("left"),
            Alignment::Right => json!("right"),
        };
        into_map(json!({
            "edge_type": format!("{:?}", self.edge_type),
            "start": self.start.map(node_key),
            "end": self.end.map(node_key),
            "alignment": alignment,
            "shape_name": self.shape.name(),
            "pull": self.pull,
            "visible": self.visible,
            "label_text": self.label_text,
        }))
    }
}

/// A constituent seen through its arena id.
#[derive(Debug, Clone, Copy)]
pub struct ConstituentRecord<'a> {
    pub id: ConstituentId,
    pub constituent: &'a Constituent,
}

impl Savable for ConstituentRecord<'_> {
    fn save_key(&self) -> String {
        constituent_key(self.id)
    }

    fn saved_fields(&self) -> Map<String, Value> {
        let c = self.constituent;
        into_map(json!({
            "label": c.label,
            "features": c.features.iter().map(|f| feature_key(*f)).collect::<Vec<_>>(),
            "part1": c.part1.map(constituent_key),
            "part2": c.part2.map(constituent_key),
            "transferred": c.transferred,
        }))
    }
}

/// A feature seen through its arena id.
#[derive(Debug, Clone, Copy)]
pub struct FeatureRecord<'a> {
    pub id: FeatureId,
    pub feature: &'a Feature,
}

impl Savable for FeatureRecord<'_> {
    fn save_key(&self) -> String {
        feature_key(self.id)
    }

    fn saved_fields(&self) -> Map<String, Value> {
        let f = self.feature;
        into_map(json!({
            "name": f.name,
            "value": f.value,
            "ifeature": f.kind == FeatureKind::Interpretable,
            "counter": f.counter,
            "origin": f.origin.map(constituent_key),
        }))
    }
}

impl Savable for ForestState {
    fn save_key(&self) -> String {
        "Forest".to_string()
    }

    fn saved_fields(&self) -> Map<String, Value> {
        let settings = serde_json::to_value(&self.settings).unwrap_or_default();
        into_map(json!({
            "roots": self.roots().iter().map(|n| node_key(*n)).collect::<Vec<_>>(),
            "nodes": self.nodes().map(Savable::save_key).collect::<Vec<_>>(),
            "edges": self.edges().map(Savable::save_key).collect::<Vec<_>>(),
            "settings": settings,
        }))
    }
}

fn insert(graph: &mut Map<String, Value>, item: &dyn Savable) -> Result<()> {
    let key = item.save_key();
    if graph.contains_key(&key) {
        warn!(key = %key, "duplicate save key");
        return Err(ForestError::DuplicateSaveKey(key));
    }
    graph.insert(key, Value::Object(item.saved_fields()));
    Ok(())
}

/// Save key map for the whole forest, syntax included.
pub fn save_graph(state: &ForestState) -> Result<Map<String, Value>> {
    let mut graph = Map::new();
    insert(&mut graph, state)?;
    for node in state.nodes() {
        insert(&mut graph, node)?;
    }
    for edge in state.edges() {
        insert(&mut graph, edge)?;
    }
    for id in state.syntax.ids() {
        let record = ConstituentRecord {
            id,
            constituent: &state.syntax[id],
        };
        insert(&mut graph, &record)?;
    }
    for n in 0..state.syntax.feature_count() {
        let id = FeatureId(n as u32);
        let record = FeatureRecord {
            id,
            feature: &state.syntax[id],
        };
        insert(&mut graph, &record)?;
    }
    Ok(graph)
}

/// Check that no key repeats among `items`.
pub fn verify_unique_keys<'a>(items: impl IntoIterator<Item = &'a dyn Savable>) -> Result<()> {
    let mut seen = AHashSet::new();
    for item in items {
        let key = item.save_key();
        if !seen.insert(key.clone()) {
            return Err(ForestError::DuplicateSaveKey(key));
        }
    }
    Ok(())
}
