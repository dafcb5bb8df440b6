#![forbid(unsafe_code)]

//! The owner of one derivation's graph.
//!
//! Every structural edit goes through a [`Forest`] method. Each method
//! validates first and mutates second, so a failing call leaves the forest
//! exactly as it was. Successful edits mark the forest dirty (the next
//! scheduler tick re-runs the layout once) and fire signals.
//!
//! ```text
//!            ┌────────────── Forest ───────────────┐
//!  edits ──▶ │ ForestState  (nodes, edges, syntax) │ ──▶ LayoutEngine::draw
//!            │ SelectionModel                      │
//!            │ UndoManager  (snapshots of ↑ both)  │
//!            │ DerivationStepLog (read-only)       │
//!            │ SignalHub    ──▶ observers          │
//!            └─────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. For every edge, `start.edges_down` and `end.edges_up` contain it.
//! 2. Every root has no constituent edge above it.
//! 3. A constituent node has at most two constituent children, on distinct
//!    sides.
//! 4. Removing a node removes its incident edges in the same call.

use kataja_core::{Point3, UndoConfig};
use kataja_syntax::{ConstituentId, Derivation, DerivationStepLog, Feature, FeatureId};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::edge::{Alignment, Edge, EdgeId, EdgeShape, EdgeType};
use crate::error::{ForestError, Result};
use crate::node::{Node, NodeId, NodeType, SyntacticRef};
use crate::selection::{Selectable, SelectionModel};
use crate::settings::{BracketStyle, ForestSettings};
use crate::signals::{Signal, SignalEvent, SignalHub, Subscription};
use crate::state::ForestState;
use crate::undo::UndoManager;
use crate::visualization::LayoutEngine;

#[derive(Debug)]
pub struct Forest {
    state: ForestState,
    steps: DerivationStepLog,
    undo: UndoManager,
    selection: SelectionModel,
    engine: Option<Box<dyn LayoutEngine>>,
    signals: SignalHub,
    dirty: bool,
}

impl Forest {
    /// An empty forest with an `init` undo entry.
    #[must_use]
    pub fn new(undo: &UndoConfig, settings: ForestSettings) -> Self {
        let mut forest = Self {
            state: ForestState::new(settings),
            steps: DerivationStepLog::new(),
            undo: UndoManager::new(undo),
            selection: SelectionModel::new(),
            engine: None,
            signals: SignalHub::new(),
            dirty: false,
        };
        forest.record("init");
        forest
    }

    /// Materialise a finished derivation and keep its step log.
    pub fn from_derivation(
        derivation: &Derivation,
        undo: &UndoConfig,
        settings: ForestSettings,
    ) -> Result<Self> {
        let mut forest = Self {
            state: ForestState::new(settings),
            steps: derivation.steps.clone(),
            undo: UndoManager::new(undo),
            selection: SelectionModel::new(),
            engine: None,
            signals: SignalHub::new(),
            dirty: false,
        };
        forest.state.syntax = derivation.syntax.clone();
        forest.add_tree(derivation.root)?;
        info!(
            nodes = forest.state.node_count(),
            edges = forest.state.edge_count(),
            steps = forest.steps.len(),
            "forest built from derivation"
        );
        forest.record("init");
        Ok(forest)
    }

    #[must_use]
    pub fn state(&self) -> &ForestState {
        &self.state
    }

    /// Position-level access for the scheduler and input handling.
    /// Structural edits go through the forest methods.
    pub fn state_mut(&mut self) -> &mut ForestState {
        &mut self.state
    }

    #[must_use]
    pub fn settings(&self) -> &ForestSettings {
        &self.state.settings
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.state.node(id)
    }

    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.state.edge(id)
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        self.state.roots()
    }

    #[must_use]
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        self.state.visible_nodes()
    }

    #[must_use]
    pub fn steps(&self) -> &DerivationStepLog {
        &self.steps
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    #[must_use]
    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    #[must_use]
    pub fn signals(&self) -> &SignalHub {
        &self.signals
    }

    pub fn subscribe(&mut self, signal: Signal, callback: impl Fn(&SignalEvent) + 'static) -> Subscription {
        self.signals.subscribe(signal, callback)
    }

    fn changed(&mut self, subject: Option<NodeId>) {
        self.dirty = true;
        match subject {
            Some(id) => self.signals.emit_about(Signal::ForestChanged, id),
            None => self.signals.emit(Signal::ForestChanged),
        }
    }

    fn require_node(&self, id: NodeId) -> Result<&Node> {
        self.state.node(id).ok_or(ForestError::NoSuchNode(id))
    }

    // --- nodes -----------------------------------------------------------

    /// Node for `syntactic`, created on first request.
    pub fn add_node(&mut self, syntactic: SyntacticRef) -> Result<NodeId> {
        if let Some(existing) = self.state.node_for(syntactic) {
            return Ok(existing);
        }
        let label = match syntactic {
            SyntacticRef::Constituent(c) => self
                .state
                .syntax
                .get(c)
                .map(|c| c.label.clone())
                .ok_or(ForestError::NoSuchConstituent(c))?,
            SyntacticRef::Feature(f) => self
                .state
                .syntax
                .feature(f)
                .map(ToString::to_string)
                .ok_or(ForestError::NoSuchFeature(f))?,
        };
        let id = self.insert_node(syntactic.node_type(), Some(syntactic), label);
        if syntactic.node_type() == NodeType::Constituent {
            self.state.roots.push(id);
        }
        Ok(id)
    }

    fn insert_node(&mut self, node_type: NodeType, syntactic: Option<SyntacticRef>, label: String) -> NodeId {
        let id = self.state.next_node_id();
        let mut node = Node::new(id, node_type, syntactic, label);
        node.opacity = 0.0;
        node.fade_in();
        if let Some(engine) = &self.engine {
            engine.reset_node(&mut node);
        }
        debug!(node = %id, node_type = node_type.name(), "node created");
        self.state.nodes.push(Some(node));
        id
    }

    /// Create a node from scratch. Constituents and features get a fresh
    /// syntactic object; other types are placeholders.
    pub fn create_node(&mut self, node_type: NodeType, label: &str) -> NodeId {
        let id = match node_type {
            NodeType::Constituent => {
                let c = self.state.syntax.new_leaf(label, Vec::new());
                let id = self.insert_node(node_type, Some(SyntacticRef::Constituent(c)), label.to_string());
                self.state.roots.push(id);
                id
            }
            NodeType::Feature => {
                let f = self.state.syntax.add_feature(Feature::plain(label));
                let text = self.state.syntax[f].to_string();
                self.insert_node(node_type, Some(SyntacticRef::Feature(f)), text)
            }
            _ => self.insert_node(node_type, None, label.to_string()),
        };
        self.changed(Some(id));
        id
    }

    /// Build nodes and edges for the constituent DAG under `root`.
    ///
    /// Shared constituents get one node with several parents. Feature nodes
    /// are created only when the settings ask for them.
    pub fn add_tree(&mut self, root: ConstituentId) -> Result<NodeId> {
        if self.state.syntax.get(root).is_none() {
            return Err(ForestError::NoSuchConstituent(root));
        }
        let id = self.materialise(root)?;
        self.changed(Some(id));
        Ok(id)
    }

    fn materialise(&mut self, c: ConstituentId) -> Result<NodeId> {
        if let Some(existing) = self.state.node_for_constituent(c) {
            return Ok(existing);
        }
        let node = self.add_node(SyntacticRef::Constituent(c))?;
        let constituent = self.state.syntax[c].clone();
        if let (Some(p1), Some(p2)) = (constituent.part1, constituent.part2) {
            let left = self.materialise(p1)?;
            self.connect_unchecked(node, left, EdgeType::Constituent, Alignment::Left);
            let right = self.materialise(p2)?;
            self.connect_unchecked(node, right, EdgeType::Constituent, Alignment::Right);
        }
        if self.state.settings.feature_nodes {
            for f in constituent.features {
                let fnode = self.add_node(SyntacticRef::Feature(f))?;
                self.connect_unchecked(node, fnode, EdgeType::Feature, Alignment::None);
            }
        }
        Ok(node)
    }

    /// Change a node's label; constituent labels change in the syntax too.
    pub fn set_label(&mut self, id: NodeId, label: &str) -> Result<()> {
        let syntactic = self.require_node(id)?.syntactic;
        if let Some(SyntacticRef::Constituent(c)) = syntactic {
            self.state.syntax[c].label = label.to_string();
        }
        if let Some(node) = self.state.node_mut(id) {
            node.set_label(label);
        }
        self.changed(Some(id));
        Ok(())
    }

    /// Remove a node and all its incident edges.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.require_node(id)?;
        let incident: Vec<EdgeId> = node.edges_up.iter().chain(node.edges_down.iter()).copied().collect();
        for edge in incident {
            self.detach_edge(edge);
        }
        self.state.nodes[id.0 as usize] = None;
        self.state.roots.retain(|r| *r != id);
        if self.selection.forget(id) {
            self.signals.emit(Signal::SelectionChanged);
        }
        debug!(node = %id, "node removed");
        self.changed(None);
        Ok(())
    }

    // --- edges -----------------------------------------------------------

    /// Create an edge from `parent` down to `child`.
    ///
    /// Constituent edges fill `part1` (left) or `part2` (right) of the
    /// parent's constituent; an unaligned constituent edge takes the first
    /// free side. Feature edges add the feature to the constituent.
    pub fn connect(
        &mut self,
        parent: NodeId,
        child: NodeId,
        edge_type: EdgeType,
        alignment: Alignment,
    ) -> Result<EdgeId> {
        let alignment = self.validate_connect(parent, child, edge_type, alignment).inspect_err(|e| {
            warn!(node = %parent, error = %e, "connect refused");
        })?;
        let edge = self.connect_unchecked(parent, child, edge_type, alignment);
        self.changed(Some(parent));
        Ok(edge)
    }

    fn validate_connect(
        &self,
        parent: NodeId,
        child: NodeId,
        edge_type: EdgeType,
        alignment: Alignment,
    ) -> Result<Alignment> {
        let p = self.require_node(parent)?;
        let c = self.require_node(child)?;
        if parent == child {
            return Err(ForestError::SelfLoop(parent));
        }
        match edge_type {
            EdgeType::Constituent => {
                if p.syntactic.and_then(SyntacticRef::constituent).is_none() {
                    return Err(ForestError::PlaceholderEndpoint(parent));
                }
                if c.syntactic.and_then(SyntacticRef::constituent).is_none() {
                    return Err(ForestError::PlaceholderEndpoint(child));
                }
                let taken: SmallVec<[Alignment; 2]> = p
                    .edges_down
                    .iter()
                    .filter_map(|e| self.state.edge(*e))
                    .filter(|e| e.edge_type == EdgeType::Constituent)
                    .map(|e| e.alignment)
                    .collect();
                if taken.len() >= 2 {
                    return Err(ForestError::TooManyChildren(parent));
                }
                match alignment {
                    Alignment::None if taken.contains(&Alignment::Left) => Ok(Alignment::Right),
                    Alignment::None => Ok(Alignment::Left),
                    side if taken.contains(&side) => Err(ForestError::AlignmentTaken {
                        node: parent,
                        alignment: side,
                    }),
                    side => Ok(side),
                }
            }
            EdgeType::Feature => {
                if p.syntactic.and_then(SyntacticRef::constituent).is_none() {
                    return Err(ForestError::PlaceholderEndpoint(parent));
                }
                if c.syntactic.and_then(SyntacticRef::feature).is_none() {
                    return Err(ForestError::PlaceholderEndpoint(child));
                }
                Ok(alignment)
            }
            _ => Ok(alignment),
        }
    }

    fn connect_unchecked(&mut self, parent: NodeId, child: NodeId, edge_type: EdgeType, alignment: Alignment) -> EdgeId {
        let id = self.state.next_edge_id();
        let mut edge = Edge::new(id, Some(parent), Some(child), edge_type, alignment);
        edge.shape = self.state.settings.edge_shape(edge_type);
        self.state.edges.push(Some(edge));
        if let Some(p) = self.state.node_mut(parent) {
            p.edges_down.push(id);
        }
        if let Some(c) = self.state.node_mut(child) {
            c.edges_up.push(id);
        }
        let parent_ref = self.state.node(parent).and_then(|n| n.syntactic);
        let child_ref = self.state.node(child).and_then(|n| n.syntactic);
        match (edge_type, parent_ref, child_ref) {
            (EdgeType::Constituent, Some(SyntacticRef::Constituent(p)), Some(SyntacticRef::Constituent(c))) => {
                match alignment {
                    Alignment::Right => self.state.syntax[p].part2 = Some(c),
                    _ => self.state.syntax[p].part1 = Some(c),
                }
                self.state.roots.retain(|r| *r != child);
            }
            (EdgeType::Feature, Some(SyntacticRef::Constituent(p)), Some(SyntacticRef::Feature(f))) => {
                if !self.state.syntax[p].features.contains(&f) {
                    self.state.syntax[p].features.push(f);
                }
            }
            _ => {}
        }
        debug!(edge = %id, node = %parent, child = %child, ?edge_type, ?alignment, "edge created");
        id
    }

    /// Arrow from `start` to `end`; either end may be missing.
    pub fn add_arrow(&mut self, start: Option<NodeId>, end: Option<NodeId>) -> Result<EdgeId> {
        for id in start.into_iter().chain(end) {
            self.require_node(id)?;
        }
        let id = self.state.next_edge_id();
        let mut edge = Edge::new(id, start, end, EdgeType::Arrow, Alignment::None);
        edge.shape = self.state.settings.edge_shape(EdgeType::Arrow);
        self.state.edges.push(Some(edge));
        if let Some(s) = start.and_then(|s| self.state.node_mut(s)) {
            s.edges_down.push(id);
        }
        if let Some(e) = end.and_then(|e| self.state.node_mut(e)) {
            e.edges_up.push(id);
        }
        self.changed(start);
        Ok(id)
    }

    /// Remove an edge, undoing its syntactic effect.
    pub fn disconnect(&mut self, edge: EdgeId) -> Result<()> {
        if self.state.edge(edge).is_none() {
            warn!(edge = %edge, "no such edge");
            return Err(ForestError::NoSuchEdge(edge));
        }
        let start = self.detach_edge(edge);
        self.changed(start);
        Ok(())
    }

    /// Unlink and drop an existing edge. Returns its start node.
    fn detach_edge(&mut self, id: EdgeId) -> Option<NodeId> {
        let edge = self.state.edges.get_mut(id.0 as usize)?.take()?;
        if let Some(s) = edge.start.and_then(|s| self.state.node_mut(s)) {
            s.edges_down.retain(|e| *e != id);
        }
        if let Some(e) = edge.end.and_then(|e| self.state.node_mut(e)) {
            e.edges_up.retain(|x| *x != id);
        }
        let start_ref = edge.start.and_then(|n| self.state.node(n)).and_then(|n| n.syntactic);
        let end_ref = edge.end.and_then(|n| self.state.node(n)).and_then(|n| n.syntactic);
        match (edge.edge_type, start_ref, end_ref) {
            (EdgeType::Constituent, Some(SyntacticRef::Constituent(p)), Some(SyntacticRef::Constituent(c))) => {
                let parent = &mut self.state.syntax[p];
                if edge.alignment != Alignment::Right && parent.part1 == Some(c) {
                    parent.part1 = None;
                } else if parent.part2 == Some(c) {
                    parent.part2 = None;
                } else if parent.part1 == Some(c) {
                    parent.part1 = None;
                }
                if let Some(child) = edge.end
                    && self.state.parents(child).is_empty()
                    && !self.state.roots.contains(&child)
                {
                    self.state.roots.push(child);
                }
            }
            (EdgeType::Feature, Some(SyntacticRef::Constituent(p)), Some(SyntacticRef::Feature(f))) => {
                self.state.syntax[p].features.retain(|x| *x != f);
            }
            _ => {}
        }
        if self.selection.forget(id) {
            self.signals.emit(Signal::SelectionChanged);
        }
        debug!(edge = %id, "edge removed");
        edge.start
    }

    /// Move every edge arriving at `old` so it arrives at `new` instead.
    ///
    /// Parents already linked to `new` by an edge of the same type lose the
    /// redundant edge rather than gaining a duplicate. `old` stays in the
    /// forest as a free root.
    pub fn replace_subtree(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        let old_node = self.require_node(old)?;
        self.require_node(new)?;
        if old == new {
            return Ok(());
        }
        let incoming: Vec<EdgeId> = old_node.edges_up.to_vec();
        let old_c = old_node.syntactic.and_then(SyntacticRef::constituent);
        let new_c = self.require_node(new)?.syntactic.and_then(SyntacticRef::constituent);
        let existing: Vec<(Option<NodeId>, EdgeType)> = self
            .require_node(new)?
            .edges_up
            .iter()
            .filter_map(|e| self.state.edge(*e))
            .map(|e| (e.start, e.edge_type))
            .collect();

        let mut redundant = Vec::new();
        let mut moved = Vec::new();
        for id in incoming {
            let Some(edge) = self.state.edge(id) else { continue };
            if edge.start == Some(new) || existing.contains(&(edge.start, edge.edge_type)) {
                redundant.push(id);
            } else {
                moved.push(id);
            }
        }
        for id in redundant {
            self.detach_edge(id);
        }
        for id in &moved {
            let Some(edge) = self.state.edge_mut(*id) else { continue };
            edge.end = Some(new);
            let (parent, edge_type) = (edge.start, edge.edge_type);
            if edge_type == EdgeType::Constituent
                && let (Some(p), Some(oc), Some(nc)) = (
                    parent.and_then(|p| self.state.node(p)).and_then(|n| n.syntactic).and_then(SyntacticRef::constituent),
                    old_c,
                    new_c,
                )
            {
                let pc = &mut self.state.syntax[p];
                if pc.part1 == Some(oc) {
                    pc.part1 = Some(nc);
                }
                if pc.part2 == Some(oc) {
                    pc.part2 = Some(nc);
                }
            }
        }
        if let Some(n) = self.state.node_mut(old) {
            n.edges_up.retain(|e| !moved.contains(e));
        }
        if let Some(n) = self.state.node_mut(new) {
            n.edges_up.extend(moved.iter().copied());
        }
        let new_has_parents = !self.state.parents(new).is_empty();
        if let Some(pos) = self.state.roots.iter().position(|r| *r == old) {
            if new_has_parents || self.state.roots.contains(&new) {
                self.state.roots.remove(pos);
            } else {
                self.state.roots[pos] = new;
            }
        }
        if new_has_parents {
            self.state.roots.retain(|r| *r != new);
        }
        if old_c.is_some() && self.state.parents(old).is_empty() && !self.state.roots.contains(&old) {
            self.state.roots.push(old);
        }
        debug!(node = %old, replacement = %new, "subtree replaced");
        self.changed(Some(new));
        Ok(())
    }

    /// Let every holder of `old` hold `new` instead, merging feature nodes.
    pub fn unify_feature(&mut self, old: FeatureId, new: FeatureId) -> Result<usize> {
        if self.state.syntax.feature(old).is_none() {
            return Err(ForestError::NoSuchFeature(old));
        }
        if self.state.syntax.feature(new).is_none() {
            return Err(ForestError::NoSuchFeature(new));
        }
        let changed = self.state.syntax.replace_feature_everywhere(old, new);
        if let Some(old_node) = self.state.node_for(SyntacticRef::Feature(old)) {
            match self.state.node_for(SyntacticRef::Feature(new)) {
                Some(new_node) => {
                    self.replace_subtree(old_node, new_node)?;
                    self.remove_node(old_node)?;
                }
                None => {
                    let text = self.state.syntax[new].to_string();
                    if let Some(n) = self.state.node_mut(old_node) {
                        n.syntactic = Some(SyntacticRef::Feature(new));
                        n.set_label(text);
                    }
                }
            }
        }
        debug!(old = %old, new = %new, changed, "feature unified");
        self.changed(None);
        Ok(changed)
    }

    // --- folding ---------------------------------------------------------

    /// Hide everything below `id` behind it.
    pub fn fold(&mut self, id: NodeId) -> Result<()> {
        self.require_node(id)?;
        for d in self.state.descendants(id) {
            if let Some(n) = self.state.node_mut(d)
                && !n.folded_away
            {
                n.folded_away = true;
                n.folding_towards = Some(id);
            }
        }
        self.refresh_edge_visibility();
        self.changed(Some(id));
        Ok(())
    }

    /// Reveal what [`fold`](Self::fold) hid behind `id`.
    pub fn unfold(&mut self, id: NodeId) -> Result<()> {
        self.require_node(id)?;
        for n in self.state.nodes_mut() {
            if n.folding_towards == Some(id) {
                n.folded_away = false;
                n.folding_towards = None;
            }
        }
        self.refresh_edge_visibility();
        self.changed(Some(id));
        Ok(())
    }

    /// Whether some node is folded away behind `id`.
    #[must_use]
    pub fn is_folded(&self, id: NodeId) -> bool {
        self.state.nodes().any(|n| n.folding_towards == Some(id))
    }

    fn refresh_edge_visibility(&mut self) {
        let hidden: Vec<(EdgeId, bool)> = self
            .state
            .edges()
            .map(|e| {
                let folded = |n: Option<NodeId>| n.and_then(|n| self.state.node(n)).is_some_and(|n| n.folded_away);
                (e.id, !(folded(e.start) || folded(e.end)))
            })
            .collect();
        for (id, visible) in hidden {
            if let Some(e) = self.state.edge_mut(id) {
                e.visible = visible;
            }
        }
    }

    // --- derivation steps ------------------------------------------------

    /// Rebuild the graph from step `index` of the derivation log.
    ///
    /// Nodes standing for constituents that survive keep their current
    /// position so the scheduler animates the change.
    pub fn load_step(&mut self, index: usize) -> Result<()> {
        let step = self.steps.jump_to(index).ok_or(ForestError::NoSuchStep(index))?.clone();
        let settings = self.state.settings.clone();
        let previous = std::mem::replace(&mut self.state, ForestState::new(settings));
        self.state.syntax = step.syntax.clone();
        let roots = step
            .workspace
            .iter()
            .chain(step.sub_workspace.iter().flatten())
            .copied();
        for root in roots {
            self.materialise(root)?;
        }
        for node in self.state.nodes_mut() {
            if let Some(old) = previous.nodes().find(|o| o.syntactic == node.syntactic) {
                node.current_position = old.current_position;
                node.computed_position = old.computed_position;
                node.opacity = old.opacity;
                node.fade = old.fade;
            }
        }
        if self.selection.clear() {
            self.signals.emit(Signal::SelectionChanged);
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.prepare(&mut self.state, false);
        }
        info!(step = index, message = %step.message, "derivation step loaded");
        self.changed(None);
        Ok(())
    }

    // --- layout ----------------------------------------------------------

    /// Bind a layout engine.
    pub fn set_engine(&mut self, mut engine: Box<dyn LayoutEngine>, reset: bool) {
        let name = engine.name();
        engine.prepare(&mut self.state, reset);
        self.state.settings.visualization = name.to_string();
        self.engine = Some(engine);
        self.dirty = true;
        info!(visualization = name, reset, "visualization bound");
        self.signals.emit_detail(Signal::Visualization, name);
    }

    #[must_use]
    pub fn engine_name(&self) -> Option<&'static str> {
        self.engine.as_ref().map(|e| e.name())
    }

    /// Run the layout once and clear the dirty flag.
    pub fn draw(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.draw(&mut self.state);
        }
        self.dirty = false;
    }

    pub fn request_draw(&mut self) {
        self.dirty = true;
    }

    #[must_use]
    pub fn needs_draw(&self) -> bool {
        self.dirty
    }

    /// Engine's displacement for `node` this tick.
    #[must_use]
    pub fn calculate_movement(&self, node: NodeId) -> Point3 {
        self.engine
            .as_ref()
            .map_or(Point3::ZERO, |e| e.calculate_movement(&self.state, node))
    }

    pub fn reselect(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.reselect(&self.state);
            self.dirty = true;
        }
    }

    // --- undo ------------------------------------------------------------

    /// Snapshot the forest and selection under `label`.
    pub fn record(&mut self, label: &str) -> bool {
        self.undo.record(label, &self.state, &self.selection)
    }

    /// Restore the previous snapshot; returns the label undone.
    pub fn undo(&mut self) -> Result<String> {
        let (label, entry) = self.undo.undo()?;
        self.state = entry.state.clone();
        self.selection = entry.selection.clone();
        info!(label = %label, "undo");
        self.restored();
        Ok(label)
    }

    /// Re-apply the next snapshot; returns its label.
    pub fn redo(&mut self) -> Result<String> {
        let entry = self.undo.redo()?;
        let label = entry.label.clone();
        self.state = entry.state.clone();
        self.selection = entry.selection.clone();
        info!(label = %label, "redo");
        self.restored();
        Ok(label)
    }

    fn restored(&mut self) {
        self.dirty = true;
        self.signals.emit(Signal::ForestChanged);
        self.signals.emit(Signal::SelectionChanged);
    }

    /// Run `f` without recording undo entries.
    pub fn with_undo_suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.undo.suppress();
        let out = f(self);
        self.undo.resume();
        out
    }

    // --- selection -------------------------------------------------------

    fn require_item(&self, item: Selectable) -> Result<()> {
        match item {
            Selectable::Node(n) => self.require_node(n).map(|_| ()),
            Selectable::Edge(e) => self.state.edge(e).map(|_| ()).ok_or(ForestError::NoSuchEdge(e)),
        }
    }

    /// Replace the selection with `item`.
    pub fn select(&mut self, item: impl Into<Selectable>) -> Result<()> {
        let item = item.into();
        self.require_item(item)?;
        if self.selection.select(item) {
            self.signals.emit(Signal::SelectionChanged);
        }
        Ok(())
    }

    pub fn add_to_selection(&mut self, item: impl Into<Selectable>) -> Result<()> {
        let item = item.into();
        self.require_item(item)?;
        if self.selection.add(item) {
            self.signals.emit(Signal::SelectionChanged);
        }
        Ok(())
    }

    pub fn toggle_selection(&mut self, item: impl Into<Selectable>) -> Result<()> {
        let item = item.into();
        self.require_item(item)?;
        self.selection.toggle(item);
        self.signals.emit(Signal::SelectionChanged);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear() {
            self.signals.emit(Signal::SelectionChanged);
        }
    }

    // --- settings and adjustments ----------------------------------------

    pub fn cycle_brackets(&mut self) -> BracketStyle {
        let style = self.state.settings.bracket_style.next();
        self.state.settings.bracket_style = style;
        self.changed(None);
        style
    }

    /// Switch between shared occurrences and traces.
    pub fn toggle_multidomination(&mut self) -> bool {
        self.state.settings.multidomination = !self.state.settings.multidomination;
        self.changed(None);
        self.state.settings.multidomination
    }

    pub fn toggle_magnets(&mut self) -> bool {
        self.state.settings.magnets = !self.state.settings.magnets;
        self.changed(None);
        self.state.settings.magnets
    }

    pub fn toggle_merge_order(&mut self) -> bool {
        self.state.settings.show_merge_order = !self.state.settings.show_merge_order;
        self.changed(None);
        self.state.settings.show_merge_order
    }

    pub fn toggle_select_order(&mut self) -> bool {
        self.state.settings.show_select_order = !self.state.settings.show_select_order;
        self.changed(None);
        self.state.settings.show_select_order
    }

    /// Set the shape for `edge_type`, existing edges included.
    pub fn set_edge_shape(&mut self, edge_type: EdgeType, shape: EdgeShape) {
        self.state.settings.edge_shapes.insert(edge_type, shape);
        for edge in self.state.edges_mut().filter(|e| e.edge_type == edge_type) {
            edge.shape = shape;
        }
        self.signals.emit_detail(Signal::EdgeShape, shape.name());
    }

    /// Change how strongly an edge pulls in physics layouts.
    pub fn set_edge_pull(&mut self, edge: EdgeId, pull: f64) -> Result<()> {
        let e = self.state.edge_mut(edge).ok_or(ForestError::NoSuchEdge(edge))?;
        e.pull = pull;
        self.signals.emit(Signal::EdgeAdjustment);
        Ok(())
    }

    /// Set the user offset of a node; the final position follows.
    pub fn set_adjustment(&mut self, id: NodeId, adjustment: Point3) -> Result<()> {
        let node = self.state.node_mut(id).ok_or(ForestError::NoSuchNode(id))?;
        node.adjustment = adjustment;
        self.signals.emit_about(Signal::ForestChanged, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kataja_syntax::{Driver, Lexicon, Numeration};

    fn forest() -> Forest {
        Forest::new(&UndoConfig::default(), ForestSettings::default())
    }

    fn two_word() -> Derivation {
        let lexicon = Lexicon::from_json_str(
            r#"{"the": ["iD", "uPerson"], "dog": ["Root", "iPerson", "iNumber", "iGender"]}"#,
        )
        .unwrap();
        Driver::new(&lexicon)
            .derive(&Numeration::flat(&["dog", "the"]))
            .unwrap()
    }

    #[test]
    fn derivation_materialises_three_nodes_two_edges() {
        let f = Forest::from_derivation(&two_word(), &UndoConfig::default(), ForestSettings::default()).unwrap();
        assert_eq!(f.state().node_count(), 3);
        assert_eq!(f.state().edge_count(), 2);
        assert_eq!(f.roots().len(), 1);
        let root = f.node(f.roots()[0]).unwrap();
        assert_eq!(root.label, "the");
        let kids = f.state().children(root.id);
        assert_eq!(kids.len(), 2);
        let sides: Vec<Alignment> = root.edges_down.iter().map(|e| f.edge(*e).unwrap().alignment).collect();
        assert!(sides.contains(&Alignment::Left) && sides.contains(&Alignment::Right));
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut f = Forest::from_derivation(&two_word(), &UndoConfig::default(), ForestSettings::default()).unwrap();
        let c = f.node(f.roots()[0]).unwrap().syntactic.unwrap();
        let before = f.state().node_count();
        let again = f.add_node(c).unwrap();
        assert_eq!(again, f.roots()[0]);
        assert_eq!(f.state().node_count(), before);
    }

    #[test]
    fn feature_nodes_follow_the_setting() {
        let settings = ForestSettings {
            feature_nodes: true,
            ..ForestSettings::default()
        };
        let f = Forest::from_derivation(&two_word(), &UndoConfig::default(), settings).unwrap();
        assert!(f.state().nodes_of_type(NodeType::Feature).count() > 0);
        for e in f.state().edges().filter(|e| e.edge_type == EdgeType::Feature) {
            let end = f.node(e.end.unwrap()).unwrap();
            assert_eq!(end.node_type, NodeType::Feature);
        }
    }

    #[test]
    fn connect_fills_parts_and_refuses_a_third_child() {
        let mut f = forest();
        let p = f.create_node(NodeType::Constituent, "P");
        let a = f.create_node(NodeType::Constituent, "a");
        let b = f.create_node(NodeType::Constituent, "b");
        let c = f.create_node(NodeType::Constituent, "c");
        f.connect(p, a, EdgeType::Constituent, Alignment::None).unwrap();
        assert_eq!(
            f.connect(p, b, EdgeType::Constituent, Alignment::Left),
            Err(ForestError::AlignmentTaken { node: p, alignment: Alignment::Left })
        );
        f.connect(p, b, EdgeType::Constituent, Alignment::None).unwrap();
        assert_eq!(f.connect(p, c, EdgeType::Constituent, Alignment::Right), Err(ForestError::TooManyChildren(p)));

        let pc = f.node(p).unwrap().syntactic.and_then(SyntacticRef::constituent).unwrap();
        let ac = f.node(a).unwrap().syntactic.and_then(SyntacticRef::constituent).unwrap();
        let bc = f.node(b).unwrap().syntactic.and_then(SyntacticRef::constituent).unwrap();
        assert_eq!(f.state().syntax[pc].part1, Some(ac));
        assert_eq!(f.state().syntax[pc].part2, Some(bc));
        assert_eq!(f.roots(), [p, c]);
    }

    #[test]
    fn placeholders_cannot_carry_constituent_edges() {
        let mut f = forest();
        let p = f.create_node(NodeType::Constituent, "P");
        let g = f.create_node(NodeType::Gloss, "a dog");
        let edges = f.state().edge_count();
        assert_eq!(
            f.connect(p, g, EdgeType::Constituent, Alignment::Left),
            Err(ForestError::PlaceholderEndpoint(g))
        );
        assert_eq!(f.state().edge_count(), edges, "refused connect must not mutate");
        assert!(f.connect(p, g, EdgeType::Gloss, Alignment::None).is_ok());
        assert_eq!(f.connect(p, p, EdgeType::Arrow, Alignment::None), Err(ForestError::SelfLoop(p)));
    }

    #[test]
    fn disconnect_then_connect_restores_structure() {
        let mut f = Forest::from_derivation(&two_word(), &UndoConfig::default(), ForestSettings::default()).unwrap();
        let root = f.roots()[0];
        let edge = f.node(root).unwrap().edges_down[0];
        let (start, end, kind, side) = {
            let e = f.edge(edge).unwrap();
            (e.start.unwrap(), e.end.unwrap(), e.edge_type, e.alignment)
        };
        let syntax_before = f.state().syntax.clone();
        f.disconnect(edge).unwrap();
        assert!(f.roots().contains(&end), "orphaned child becomes a root");
        assert_ne!(f.state().syntax, syntax_before);
        f.connect(start, end, kind, side).unwrap();
        assert_eq!(f.state().syntax, syntax_before);
        assert_eq!(f.roots(), [root]);
        assert_eq!(f.disconnect(EdgeId(99)), Err(ForestError::NoSuchEdge(EdgeId(99))));
    }

    #[test]
    fn remove_node_drops_incident_edges_and_selection() {
        let mut f = Forest::from_derivation(&two_word(), &UndoConfig::default(), ForestSettings::default()).unwrap();
        let root = f.roots()[0];
        let kids = f.state().children(root);
        f.select(root).unwrap();
        f.remove_node(root).unwrap();
        assert_eq!(f.state().edge_count(), 0);
        assert!(f.selection().is_empty());
        assert_eq!(f.roots(), kids.as_slice());
        for k in kids {
            assert!(f.node(k).unwrap().edges_up.is_empty());
        }
    }

    #[test]
    fn fold_hides_and_unfold_restores() {
        let mut f = Forest::from_derivation(&two_word(), &UndoConfig::default(), ForestSettings::default()).unwrap();
        let root = f.roots()[0];
        let visible = f.visible_nodes();
        f.fold(root).unwrap();
        assert_eq!(f.visible_nodes(), [root]);
        assert!(f.is_folded(root));
        assert!(f.state().visible_edges().is_empty());
        f.unfold(root).unwrap();
        assert_eq!(f.visible_nodes(), visible);
        assert_eq!(f.state().visible_edges().len(), 2);
    }

    #[test]
    fn replace_subtree_rewires_parents() {
        let mut f = Forest::from_derivation(&two_word(), &UndoConfig::default(), ForestSettings::default()).unwrap();
        let root = f.roots()[0];
        let old = f.state().children(root)[1];
        let new = f.create_node(NodeType::Constituent, "cat");
        f.replace_subtree(old, new).unwrap();
        assert_eq!(f.state().children(root)[1], new);
        assert!(f.node(old).unwrap().edges_up.is_empty());
        assert!(f.roots().contains(&old));
        assert!(!f.roots().contains(&new));
        let rc = f.node(root).unwrap().syntactic.and_then(SyntacticRef::constituent).unwrap();
        let nc = f.node(new).unwrap().syntactic.and_then(SyntacticRef::constituent).unwrap();
        assert_eq!(f.state().syntax[rc].part2, Some(nc));
    }

    #[test]
    fn load_step_rebuilds_from_the_log() {
        let mut f = Forest::from_derivation(&two_word(), &UndoConfig::default(), ForestSettings::default()).unwrap();
        assert!(f.steps().len() >= 2);
        f.load_step(0).unwrap();
        assert!(f.state().node_count() < 3);
        let last = f.steps().len() - 1;
        f.load_step(last).unwrap();
        assert_eq!(f.state().node_count(), 3);
        assert_eq!(f.load_step(999), Err(ForestError::NoSuchStep(999)));
    }

    #[test]
    fn signals_fire_on_edits() {
        let mut f = forest();
        f.create_node(NodeType::Constituent, "A");
        f.set_edge_shape(EdgeType::Constituent, EdgeShape::FixedCurve);
        assert_eq!(f.signals().count(Signal::ForestChanged), 1);
        assert_eq!(f.signals().count(Signal::EdgeShape), 1);
        assert!(f.needs_draw());
        f.draw();
        assert!(!f.needs_draw());
    }
}
