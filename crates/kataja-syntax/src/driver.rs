#![forbid(unsafe_code)]

//! The derivation driver.
//!
//! Consumes a [`Numeration`] item by item and builds one spine by repeated
//! merge. Every merge runs the same grand cycle:
//!
//! ```text
//!   select x, y ─► push both ─► feature check ─► label y ─► project
//!        ▲                                                    │
//!        │            ┌── unlabeled: unlabeled move, relabel ◄┤
//!        │            ├── postponed Q/Top goal: remerge back ◄┤
//!        └── spine ◄──┴── phase head: dephase or transfer   ◄─┘
//! ```
//!
//! Local failures (no label yet, remerge blocked, nothing to transfer) are
//! logged as events and the derivation goes on. The only hard failure is a
//! final spine that stays unlabeled, reported as [`Crash::Unlabeled`].
//!
//! # Invariants
//!
//! 1. Every merge creates exactly one arena node; dephasing relabels in
//!    place and never creates one.
//! 2. The step log only grows while [`Driver::derive`] runs.
//! 3. Unification replaces feature ids globally, so a valued feature is
//!    shared by every constituent that checked it.

use ahash::AHashSet;
use tracing::{debug, error, info, info_span, warn};

use crate::constituent::{ConstituentId, SyntaxArena, UNLABELED};
use crate::error::Result;
use crate::events::{Crash, DerivationEvent, LabelKind};
use crate::feature::FeatureId;
use crate::lexicon::{Counters, Lexicon, LexiconConfig};
use crate::numeration::{Numeration, NumerationItem};
use crate::stack::Stack;
use crate::steps::{DerivationStep, DerivationStepLog};

const PHI_NAMES: [&str; 3] = ["Person", "Number", "Gender"];

/// How a derivation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Converged,
    Crashed(Crash),
}

/// Result of running the driver.
///
/// A crashed derivation keeps its partial tree and full step log.
#[derive(Debug, Clone)]
pub struct Derivation {
    pub syntax: SyntaxArena,
    pub root: ConstituentId,
    pub outcome: Outcome,
    pub steps: DerivationStepLog,
    /// Every event in emission order.
    pub events: Vec<DerivationEvent>,
    pub counters: Counters,
    pub stack: Stack,
}

impl Derivation {
    #[must_use]
    pub fn converged(&self) -> bool {
        self.outcome == Outcome::Converged
    }

    /// Label of the finished root.
    #[must_use]
    pub fn root_label(&self) -> &str {
        &self.syntax[self.root].label
    }
}

/// A realized numeration item.
#[derive(Debug, Clone)]
enum Realized {
    Leaf(ConstituentId),
    Sub(Vec<Realized>),
}

impl Realized {
    /// The leaf that will be consumed first from this item.
    fn first_consumed(&self) -> Option<ConstituentId> {
        match self {
            Self::Leaf(id) => Some(*id),
            Self::Sub(items) => items.last().and_then(Self::first_consumed),
        }
    }
}

/// Runs one derivation over a lexicon.
pub struct Driver<'a> {
    lexicon: &'a Lexicon,
    arena: SyntaxArena,
    stack: Stack,
    counters: Counters,
    lookahead: Option<ConstituentId>,
    main_spine: Option<ConstituentId>,
    remaining: Vec<String>,
    passed: AHashSet<ConstituentId>,
    pending: Vec<DerivationEvent>,
    events: Vec<DerivationEvent>,
    steps: DerivationStepLog,
}

impl<'a> Driver<'a> {
    #[must_use]
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self {
            lexicon,
            arena: SyntaxArena::new(),
            stack: Stack::new(),
            counters: Counters::default(),
            lookahead: None,
            main_spine: None,
            remaining: Vec::new(),
            passed: AHashSet::new(),
            pending: Vec::new(),
            events: Vec::new(),
            steps: DerivationStepLog::new(),
        }
    }

    /// Derive `numeration` to completion.
    ///
    /// Errors only for malformed input (empty numeration, bad templates);
    /// grammatical failure is reported through [`Derivation::outcome`].
    pub fn derive(mut self, numeration: &Numeration) -> Result<Derivation> {
        numeration.validate()?;
        let _span = info_span!("derivation", lexemes = numeration.lexeme_count()).entered();
        let items = self.realize_items(&numeration.items)?;
        self.announce(Vec::new(), format!("Numeration: {}", render_items(&numeration.items)));

        let root = self.run_stream(items, &[])?;
        self.remaining.clear();

        let mut outcome = Outcome::Converged;
        if !self.arena[root].is_labeled() {
            self.label_if_possible(root);
        }
        if self.arena[root].is_labeled() {
            info!(label = %self.arena[root].label, merges = self.counters.merge, "derivation converged");
            self.announce(vec![root], format!("Done: {}", self.arena.bracketed(root)));
        } else {
            let crash = Crash::Unlabeled { node: root };
            error!(tree = %self.arena.bracketed(root), "Crash(Unlabeled)");
            self.emit(DerivationEvent::Crashed(crash));
            self.announce(vec![root], "Crash(Unlabeled)".to_string());
            outcome = Outcome::Crashed(crash);
        }

        Ok(Derivation {
            syntax: self.arena,
            root,
            outcome,
            steps: self.steps,
            events: self.events,
            counters: self.counters,
            stack: self.stack,
        })
    }

    fn config(&self) -> &'a LexiconConfig {
        self.lexicon.config()
    }

    // ── realization ────────────────────────────────────────────────────

    /// Realize every lexeme, last to first, keeping numeration order.
    fn realize_items(&mut self, items: &[NumerationItem]) -> Result<Vec<Realized>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items.iter().rev() {
            out.push(match item {
                NumerationItem::Lexeme(lexeme) => {
                    let (label, features) = self.lexicon.realize(lexeme, &mut self.counters)?;
                    Realized::Leaf(self.arena.new_leaf(label, features))
                }
                NumerationItem::Substream(inner) => Realized::Sub(self.realize_items(inner)?),
            });
        }
        out.reverse();
        Ok(out)
    }

    fn render(&self, item: &Realized) -> String {
        match item {
            Realized::Leaf(id) => self.arena[*id].label.clone(),
            Realized::Sub(items) => {
                let inner: Vec<String> = items.iter().map(|i| self.render(i)).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }

    /// Consume `items` from the end, merging each into the growing spine.
    fn run_stream(&mut self, mut items: Vec<Realized>, outer: &[String]) -> Result<ConstituentId> {
        let mut spine: Option<ConstituentId> = None;
        while let Some(next) = items.pop() {
            self.lookahead = items.last().and_then(Realized::first_consumed);
            self.remaining = items
                .iter()
                .map(|i| self.render(i))
                .chain(outer.iter().cloned())
                .collect();
            let item = match next {
                Realized::Leaf(id) => id,
                Realized::Sub(inner) => {
                    let lookahead = self.lookahead;
                    let outer_now = self.remaining.clone();
                    let sub = self.substream(inner, &outer_now)?;
                    self.lookahead = lookahead;
                    match spine {
                        Some(main) => {
                            spine = Some(self.merge_cycle(main, sub));
                            self.track_main(spine);
                            continue;
                        }
                        None => sub,
                    }
                }
            };
            spine = Some(match spine {
                Some(s) => self.merge_cycle(item, s),
                None => item,
            });
            self.track_main(spine);
        }
        // Numerations and substreams are validated non-empty.
        spine.ok_or(crate::error::SyntaxError::EmptyNumeration)
    }

    fn track_main(&mut self, spine: Option<ConstituentId>) {
        if self.stack.is_main() {
            self.main_spine = spine;
        }
    }

    fn substream(&mut self, items: Vec<Realized>, outer: &[String]) -> Result<ConstituentId> {
        let previous = self.stack.mode();
        self.stack.start_sub_stream();
        self.emit(DerivationEvent::SubStream);
        debug!("entering substream");
        let sub = self.run_stream(items, outer)?;
        if !self.arena[sub].is_labeled() {
            self.label_if_possible(sub);
        }
        if previous == crate::stack::StackMode::Main {
            self.stack.end_sub_stream();
        }
        self.emit(DerivationEvent::MainStream);
        self.announce(vec![sub], format!("Substream done: {}", self.arena.bracketed(sub)));
        Ok(sub)
    }

    // ── events and steps ───────────────────────────────────────────────

    fn emit(&mut self, event: DerivationEvent) {
        debug!(event = %event.describe(&self.arena), "derivation event");
        self.pending.push(event);
    }

    fn announce(&mut self, focus: Vec<ConstituentId>, headline: String) {
        let events = std::mem::take(&mut self.pending);
        let mut message = headline;
        for e in &events {
            message.push('\n');
            message.push_str(&e.describe(&self.arena));
        }
        let (workspace, sub_workspace) = if self.stack.is_sub() {
            (self.main_spine.into_iter().collect(), Some(focus))
        } else {
            (focus, None)
        };
        self.events.extend(events.iter().cloned());
        self.steps.push(DerivationStep {
            index: 0,
            message,
            numeration: self.remaining.clone(),
            workspace,
            sub_workspace,
            events,
            syntax: self.arena.clone(),
        });
    }

    // ── grand cycle ────────────────────────────────────────────────────

    fn merge_cycle(&mut self, x: ConstituentId, y: ConstituentId) -> ConstituentId {
        self.emit(DerivationEvent::Selected { x, y });
        self.announce(vec![x, y], format!("Merge {} + {}", self.arena[x].label, self.arena[y].label));

        self.stack.push(x);
        self.stack.push(y);
        let external = self.arena.head_has(x, &["MergeF"]);
        let postponed = self.check_features(x, y);
        self.label_if_possible(y);

        let mut merged = self.project(x, y, external);
        self.announce(vec![merged], self.arena.bracketed(merged));

        if !self.arena[merged].is_labeled() {
            self.emit(DerivationEvent::NoLabel { node: merged });
            let locus = if self.stack.is_main() {
                self.unlabeled_move(merged)
            } else {
                None
            };
            self.label_if_possible(merged);
            if let Some(locus) = locus {
                merged = self.remerge(locus, merged, UNLABELED);
                self.label_if_possible(merged);
                self.relabel_my_parent(merged, locus);
            }
            self.announce(vec![merged], self.arena.bracketed(merged));
        } else if let Some(goal) = postponed {
            merged = self.remerge_back(merged, goal);
            self.announce(vec![merged], self.arena.bracketed(merged));
        }

        if self.config().is_phase_head(&self.arena[merged].label) {
            merged = self.phase(merged);
            self.announce(vec![merged], self.arena.bracketed(merged));
        }
        merged
    }

    /// Pick the projector and build the merged node.
    fn project(&mut self, x: ConstituentId, y: ConstituentId, external: bool) -> ConstituentId {
        let cfg = self.config();
        let x_head = self.arena.head_has(x, &["Head"]);
        let y_head = self.arena.head_has(y, &["Head"]);

        let (projector, other, kind) = if x_head != y_head {
            let (p, o) = if x_head { (x, y) } else { (y, x) };
            self.arena.consume_head_feature(p, "Head");
            (Some(p), o, LabelKind::Head)
        } else if cfg.adjunct_labels.contains(&self.arena[y].label) {
            (Some(x), y, LabelKind::Adjunct)
        } else if self.shares_phi(x, y) {
            (None, y, LabelKind::SharedFeats)
        } else if cfg.projects_right(&self.arena[x].label) {
            (Some(y), x, LabelKind::Projection)
        } else if self.lookahead_prefers_left() {
            (None, y, LabelKind::Projection)
        } else if external {
            (Some(x), y, LabelKind::Projection)
        } else {
            (Some(y), x, LabelKind::Projection)
        };

        let (part1, label) = match projector {
            Some(p) => (p, self.arena[p].label.clone()),
            None => (x, UNLABELED.to_string()),
        };
        let merged = self.arena.new_merged(label.clone(), part1, other);
        self.counters.merge += 1;
        self.emit(DerivationEvent::Merged { node: merged, part1, part2: other });
        if projector.is_some() && label != UNLABELED {
            self.emit(DerivationEvent::Labeled { node: merged, label, kind });
        }
        merged
    }

    /// Both heads carry the same full interpretable phi-set; labeling
    /// decides between them.
    fn shares_phi(&self, x: ConstituentId, y: ConstituentId) -> bool {
        let a = &self.arena;
        let shared = a.shared_features(&a.head_features(x), &a.head_features(y));
        a.has_all(&shared, &["iPerson", "iNumber", "iGender"])
    }

    fn lookahead_prefers_left(&self) -> bool {
        let Some(la) = self.lookahead else {
            return false;
        };
        let cfg = self.config();
        let c = &self.arena[la];
        cfg.det_heads.contains(&c.label)
            || (c.label == cfg.expletive && self.arena.has_all(&c.features, &["uPerson"]))
    }

    // ── labeling ───────────────────────────────────────────────────────

    /// Label every unlabeled internal node under `root`, bottom-up.
    ///
    /// Returns whether anything got labeled.
    pub(crate) fn label_if_possible(&mut self, root: ConstituentId) -> bool {
        let mut found = AHashSet::new();
        found.insert(root);
        let mut waiting = Vec::new();
        self.collect_unlabeled(root, &mut found, &mut waiting);

        let mut any = false;
        for (node, p1, p2, moved1, moved2) in waiting.into_iter().rev() {
            if self.arena[node].is_labeled() {
                continue;
            }
            if let Some((label, kind)) = self.labeling_function(p1, p2, moved1, moved2) {
                self.arena[node].label = label.clone();
                self.emit(DerivationEvent::Labeled { node, label, kind });
                any = true;
            }
        }
        any
    }

    /// Top-down collection of internal nodes with copy flags: a child
    /// already met higher up has moved away from this position.
    fn collect_unlabeled(
        &self,
        id: ConstituentId,
        found: &mut AHashSet<ConstituentId>,
        waiting: &mut Vec<(ConstituentId, ConstituentId, ConstituentId, bool, bool)>,
    ) {
        let c = &self.arena[id];
        let (Some(p1), Some(p2)) = (c.part1, c.part2) else {
            return;
        };
        let moved1 = !found.insert(p1);
        let moved2 = !found.insert(p2);
        waiting.push((id, p1, p2, moved1, moved2));
        if !moved1 {
            self.collect_unlabeled(p1, found, waiting);
        }
        if !moved2 {
            self.collect_unlabeled(p2, found, waiting);
        }
    }

    fn side_features(&self, id: ConstituentId) -> Vec<FeatureId> {
        let c = &self.arena[id];
        match c.part1 {
            Some(p1) if !c.is_labeled() => self.arena.head_features(p1),
            _ => self.arena.head_features(id),
        }
    }

    /// Decide a label for `[_ x y]`, or `None` when nothing qualifies yet.
    fn labeling_function(
        &self,
        x: ConstituentId,
        y: ConstituentId,
        x_moved: bool,
        y_moved: bool,
    ) -> Option<(String, LabelKind)> {
        let a = &self.arena;
        let f1 = self.side_features(x);
        let f2 = self.side_features(y);
        if f1.is_empty() || f2.is_empty() {
            return None;
        }
        if !a[x].is_labeled() && !a[y].is_labeled() {
            return None;
        }
        if a[x].is_labeled() && a.has_all(&f1, &["Root", "iPerson", "iNumber", "iGender"]) {
            return Some((a[x].label.clone(), LabelKind::Strengthened));
        }
        if x_moved != y_moved {
            let (moved, stays) = if x_moved { (&f1, y) } else { (&f2, x) };
            if a[stays].is_labeled()
                && (a.has_all(moved, &["iPerson"]) || a.has_all(moved, &["Root"]))
            {
                return Some((a[stays].label.clone(), LabelKind::Move));
            }
        }
        let shared = a.shared_features(&f1, &f2);
        if a.has_all(&shared, &["iPerson", "iNumber", "iGender"]) {
            return Some((format!("Phi{}", self.counters.phi), LabelKind::SharedFeats));
        }
        if a.has_all(&shared, &["iPerson"]) {
            return Some(("Per".to_string(), LabelKind::SharedFeats));
        }
        None
    }

    // ── feature checking ───────────────────────────────────────────────

    /// Consume MergeF, pass features down, then unify x's unvalued features
    /// against the stack. Returns a Q/Top goal to remerge after labeling.
    fn check_features(&mut self, x: ConstituentId, y: ConstituentId) -> Option<ConstituentId> {
        self.arena.consume_head_feature(x, "MergeF");
        let x_feats = self.arena.head_features(x);
        let unvalued_phi = self.arena.has_all(&x_feats, &["uPerson", "uNumber", "uGender"]);
        let mut unvalued: Vec<FeatureId> = x_feats
            .iter()
            .copied()
            .filter(|f| {
                let f = &self.arena[*f];
                f.is_unvalued() || (f.name == "Case" && f.is_valued() && unvalued_phi)
            })
            .collect();
        if unvalued.is_empty() {
            return None;
        }
        self.inherit_features(x, y);

        unvalued.sort_by_key(|f| self.arena[*f].to_string());
        let candidates: Vec<ConstituentId> = self.stack.top_down().filter(|c| *c != x).collect();
        let mut checked = Vec::new();
        let mut remerge = None;

        while let Some(probe) = unvalued.pop() {
            let feature = self.arena[probe].clone();
            if feature.name == "Case" && feature.is_valued() {
                let goal = candidates.iter().find_map(|c| {
                    self.arena
                        .head_features(*c)
                        .into_iter()
                        .find(|g| self.arena[*g].name == "Case" && self.arena[*g].is_unvalued())
                });
                if let Some(goal) = goal {
                    self.arena.replace_feature_everywhere(goal, probe);
                    self.emit(DerivationEvent::Unified { unvalued: goal, valued: probe });
                    checked.push(probe);
                }
                continue;
            }
            for cand in &candidates {
                let cand_node = &self.arena[*cand];
                if !cand_node.is_labeled() || cand_node.label.contains("Phi") {
                    continue;
                }
                let goal = self.arena.head_features(*cand).into_iter().find(|g| {
                    let g_feat = &self.arena[*g];
                    *g != probe
                        && g_feat.name == feature.name
                        && g_feat.is_valued()
                        && (feature.value.is_empty() || g_feat.value == feature.value)
                });
                let Some(goal) = goal else {
                    continue;
                };
                if feature.is_unvalued() {
                    self.arena.replace_feature_everywhere(probe, goal);
                    self.emit(DerivationEvent::Unified { unvalued: probe, valued: goal });
                }
                checked.push(goal);
                if matches!(feature.name.as_str(), "Q" | "Top")
                    && self.arena[goal].ifeature()
                    && self.stack.is_main()
                {
                    remerge = Some(*cand);
                }
                break;
            }
        }
        if !checked.is_empty() {
            self.counters.check += checked.len() as u32;
            self.emit(DerivationEvent::CheckedFeatures { features: checked });
        }
        remerge
    }

    /// Phi inheritance: an operand with a full unvalued phi-set or a
    /// phase-head label passes its unvalued phis down into the other
    /// operand's first bare Root leaf.
    fn inherit_features(&mut self, x: ConstituentId, y: ConstituentId) -> bool {
        let inheritable = |arena: &SyntaxArena, feats: Vec<FeatureId>| -> Vec<FeatureId> {
            feats
                .into_iter()
                .filter(|f| {
                    let f = &arena[*f];
                    (PHI_NAMES.contains(&f.name.as_str()) && f.is_unvalued())
                        || (f.name == "Case" && f.is_valued() && !f.ifeature())
                })
                .collect()
        };
        let mut phis = inheritable(&self.arena, self.arena.head_features(x));
        let from = if phis.len() >= 3 || self.config().is_phase_head(&self.arena[x].label) {
            x
        } else {
            phis.extend(inheritable(&self.arena, self.arena.head_features(y)));
            if phis.len() < 3 {
                return false;
            }
            y
        };
        if phis.is_empty() {
            return false;
        }
        let target = if from == x { y } else { x };

        let mut prev_label = String::new();
        let mut passed = false;
        let mut current = Some(target);
        let mut seen = AHashSet::new();
        while let Some(node) = current {
            if !seen.insert(node) {
                break;
            }
            let (p1, p2) = (self.arena[node].part1, self.arena[node].part2);
            if let Some(p1) = p1 {
                passed |= self.pass_into(p1, &mut prev_label, &phis, from);
            }
            match p2 {
                Some(p2) => current = Some(p2),
                None => {
                    passed |= self.pass_into(node, &mut prev_label, &phis, from);
                    current = None;
                }
            }
            prev_label.clone_from(&self.arena[node].label);
        }
        passed
    }

    fn pass_into(
        &mut self,
        node: ConstituentId,
        prev_label: &mut String,
        phis: &[FeatureId],
        from: ConstituentId,
    ) -> bool {
        let c = &self.arena[node];
        if let (Some(p1), Some(p2)) = (c.part1, c.part2) {
            let right = self.pass_into(p2, prev_label, phis, from);
            let left = self.pass_into(p1, prev_label, phis, from);
            return right || left;
        }
        let bare_root = self.arena.has_all(&c.features, &["Root"])
            && !["uPerson", "iPerson", "iD", "iN"]
                .iter()
                .any(|p| self.arena.has_all(&c.features, &[p]));
        let blocked = *prev_label == self.config().expletive || self.passed.contains(&node);
        let label = c.label.clone();
        let mut found = false;
        if bare_root && !blocked {
            let leaf = &mut self.arena[node];
            for f in phis {
                if !leaf.features.contains(f) {
                    leaf.features.push(*f);
                }
            }
            self.passed.insert(node);
            self.counters.inheritance += 1;
            self.emit(DerivationEvent::PassedFeatures {
                from,
                to: node,
                features: phis.to_vec(),
            });
            found = true;
        }
        *prev_label = label;
        found
    }

    // ── movement ───────────────────────────────────────────────────────

    /// Locus to remerge when a merge came out unlabeled.
    fn unlabeled_move(&self, merged: ConstituentId) -> Option<ConstituentId> {
        let a = &self.arena;
        let (head, comp) = (a[merged].part1?, a[merged].part2?);
        if self.lookahead_prefers_left() && self.config().theta_assigners.contains(&a[head].label) {
            return None;
        }
        let nominal = |feats: &[FeatureId]| {
            a.has_all(feats, &["iD", "iPerson"]) || a.has_all(feats, &["iQ", "iPerson"])
        };
        if nominal(&a.head_features(head)) {
            return None;
        }
        if !a[comp].is_labeled() {
            let locus = a[comp].part1?;
            let feats = a.head_features(locus);
            return (a.has_all(&feats, &["iN", "uPerson"]) || nominal(&feats)).then_some(locus);
        }
        if a[comp].label.contains("Phi") {
            let locus = a[comp].part1?;
            return nominal(&a.head_features(locus)).then_some(locus);
        }
        let feats = a.head_features(comp);
        (a.has_all(&feats, &["iN"]) || nominal(&feats)).then_some(comp)
    }

    fn remerge(&mut self, target: ConstituentId, merged: ConstituentId, label: &str) -> ConstituentId {
        let result = self.arena.new_merged(label, target, merged);
        self.counters.merge += 1;
        self.emit(DerivationEvent::Remerged { target, result });
        result
    }

    /// After `[top chosen X]`, relabel chosen's lower parent to its other
    /// child's label unless its head carries Root.
    fn relabel_my_parent(&mut self, top: ConstituentId, chosen: ConstituentId) {
        let Some(below) = self.arena[top].part2 else {
            return;
        };
        let Some(parent) = self.arena.parent_of(below, chosen) else {
            return;
        };
        if self.arena.head_has(parent, &["Root"]) {
            return;
        }
        let p = &self.arena[parent];
        let other = if p.part1 == Some(chosen) { p.part2 } else { p.part1 };
        let Some(other) = other else {
            return;
        };
        let label = self.arena[other].label.clone();
        if label != UNLABELED && self.arena[parent].label != label {
            self.arena[parent].label = label.clone();
            self.emit(DerivationEvent::Labeled { node: parent, label, kind: LabelKind::Move });
        }
    }

    /// Remerge a Q/Top goal over the labeled `merged`.
    fn remerge_back(&mut self, merged: ConstituentId, goal: ConstituentId) -> ConstituentId {
        let shared = self
            .arena
            .shared_features(&self.arena.head_features(merged), &self.arena.head_features(goal));
        let label = if self.arena.has_all(&shared, &["iQ"]) {
            "Q"
        } else if self.arena.has_all(&shared, &["iTop"]) {
            "Top"
        } else {
            warn!(goal = %self.arena[goal].label, "cannot determine label for remerge");
            self.emit(DerivationEvent::RemergeBlocked { target: goal });
            return merged;
        };
        let result = self.remerge(goal, merged, label);
        self.emit(DerivationEvent::Labeled {
            node: result,
            label: label.to_string(),
            kind: LabelKind::RemergeBack,
        });
        result
    }

    // ── phases ─────────────────────────────────────────────────────────

    fn phase(&mut self, merged: ConstituentId) -> ConstituentId {
        let label = self.arena[merged].label.clone();
        if self.stack.is_main()
            && self.config().dephasing_heads.contains(&label)
            && let Some(done) = self.dephase(merged)
        {
            return done;
        }
        self.transfer_check(merged)
    }

    /// Relabel `merged` as `Root+label` onto the closest Root down the
    /// part2 chain and transfer that Root's complement.
    fn dephase(&mut self, merged: ConstituentId) -> Option<ConstituentId> {
        let root = self
            .arena
            .spine(merged)
            .into_iter()
            .find(|id| self.arena.head_has(*id, &["Root"]))?;
        if !self.arena[root].is_labeled() {
            return None;
        }
        let label = format!("{}+{}", self.arena[root].label, self.arena[merged].label);
        self.arena[merged].label = label.clone();
        self.stack.cut_to(root);
        self.emit(DerivationEvent::Dephased { node: merged, label });
        let target = self.arena[root].part2;
        self.transfer(target);
        Some(merged)
    }

    fn transfer(&mut self, target: Option<ConstituentId>) {
        if let Some(t) = target {
            self.arena[t].transferred = true;
            self.counters.transfer += 1;
            debug!(target = %self.arena[t].label, "transfer");
        }
        self.emit(DerivationEvent::Transferred { target });
    }

    fn transfer_check(&mut self, merged: ConstituentId) -> ConstituentId {
        let mut merged = merged;
        let mut target = None;
        let deleted = self.arena.head_has(merged, &["Delete"]);
        if deleted {
            let (t, m) = self.dephase_deleted_c(merged);
            target = t;
            merged = m;
        }
        if self.stack.is_main()
            && let Some(remerged) = self.remerge_if_can(merged, deleted)
        {
            merged = remerged;
        }
        if !deleted {
            let target_label = self.target_label(merged);
            target = self.find_complement(merged, &target_label);
        }
        self.transfer(target);
        if self.stack.is_sub() {
            self.stack.push_main(merged);
        }
        merged
    }

    fn target_label(&self, id: ConstituentId) -> String {
        let c = &self.arena[id];
        match c.part2 {
            Some(p2) if !c.is_labeled() || c.label.contains("Phi") => self.arena[p2].label.clone(),
            _ => c.label.clone(),
        }
    }

    /// A phase head marked `Delete` hands phasehood to its complement.
    fn dephase_deleted_c(&mut self, merged: ConstituentId) -> (Option<ConstituentId>, ConstituentId) {
        let Some(complement) = self.arena[merged].part2 else {
            return (None, merged);
        };
        let label = self.arena[complement].label.clone();
        self.emit(DerivationEvent::Dephased { node: complement, label });
        let target_label = self.target_label(complement);
        (self.find_complement(complement, &target_label), complement)
    }

    /// Remerge the most recent stacked constituent that still has unvalued
    /// features, unless its complement shares features with the phase.
    fn remerge_if_can(&mut self, merged: ConstituentId, silent: bool) -> Option<ConstituentId> {
        let phase_label = self.arena[merged].label.clone();
        let phase_feats = self.arena.head_features(merged);
        let candidates: Vec<ConstituentId> = self.stack.main().iter().rev().copied().collect();
        for current in candidates {
            let c = &self.arena[current];
            if current == merged || c.label == phase_label || c.label.contains("Phi") {
                continue;
            }
            let feats = self.arena.head_features(current);
            if !feats.iter().any(|f| self.arena[*f].is_unvalued()) {
                continue;
            }
            let Some(parent) = self.arena.parent_of(merged, current) else {
                continue;
            };
            let p = &self.arena[parent];
            let complement = if p.part1 == Some(current) { p.part2 } else { p.part1 };
            let Some(complement) = complement else {
                continue;
            };
            let shared = self
                .arena
                .shared_features(&phase_feats, &self.arena.head_features(complement));
            if !shared.is_empty() {
                if !silent {
                    self.emit(DerivationEvent::RemergeBlocked { target: current });
                }
                return None;
            }
            let result = self.remerge(current, merged, UNLABELED);
            self.label_if_possible(result);
            return Some(result);
        }
        None
    }

    /// Complement of the phase: the first stacked item whose label differs
    /// from `target` right after one that matches, falling back to the
    /// first such node in a preorder walk of the tree.
    fn find_complement(&self, root: ConstituentId, target: &str) -> Option<ConstituentId> {
        let label = |id: ConstituentId| self.arena[id].label.as_str();
        let from_stack = self.stack.current().windows(2).find_map(|w| {
            (label(w[0]) == target && label(w[1]) != target && self.arena.contains(root, w[1]))
                .then_some(w[1])
        });
        from_stack.or_else(|| self.complement_in_tree(root, target, false))
    }

    fn complement_in_tree(&self, id: ConstituentId, target: &str, parent_matched: bool) -> Option<ConstituentId> {
        let c = &self.arena[id];
        let matched = c.label == target;
        if parent_matched && !matched {
            return Some(id);
        }
        c.parts()
            .find_map(|p| self.complement_in_tree(p, target, matched))
    }
}

fn render_items(items: &[NumerationItem]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon(pairs: &[(&str, &[&str])]) -> Lexicon {
        Lexicon::from_pairs(pairs.iter().map(|(k, v)| (*k, *v))).unwrap()
    }

    #[test]
    fn single_lexeme_converges_without_merge() {
        let lex = lexicon(&[("dog", &["Root"])]);
        let d = Driver::new(&lex).derive(&Numeration::flat(&["dog"])).unwrap();
        assert!(d.converged());
        assert_eq!(d.root_label(), "dog");
        assert_eq!(d.counters.merge, 0);
    }

    #[test]
    fn empty_numeration_is_an_input_error() {
        let lex = lexicon(&[]);
        assert!(Driver::new(&lex).derive(&Numeration::default()).is_err());
    }

    #[test]
    fn head_feature_projects_and_is_consumed() {
        let lex = lexicon(&[("T", &["Head"]), ("x", &["Root"])]);
        let d = Driver::new(&lex).derive(&Numeration::flat(&["x", "T"])).unwrap();
        assert_eq!(d.root_label(), "T");
        let t = d.syntax[d.root].part1.unwrap();
        assert!(!d.syntax.head_has(t, &["Head"]), "Head must be consumed");
    }

    #[test]
    fn merge_f_on_x_projects_x() {
        let lex = lexicon(&[("V", &["MergeF", "Root"]), ("o", &["iD"])]);
        // "o" is consumed first, then V merges as x.
        let d = Driver::new(&lex).derive(&Numeration::flat(&["V", "o"])).unwrap();
        assert_eq!(d.root_label(), "V");
        assert!(!d.syntax.head_has(d.root, &["MergeF"]), "MergeF consumed on merge");
    }

    #[test]
    fn adjunct_on_the_right_never_projects() {
        let lex = lexicon(&[("in", &[]), ("walk", &["Root"])]);
        let d = Driver::new(&lex).derive(&Numeration::flat(&["walk", "in"])).unwrap();
        assert_eq!(d.root_label(), "walk");
        assert_eq!(d.syntax[d.root].part2.map(|p| d.syntax[p].label.clone()).as_deref(), Some("in"));
    }

    #[test]
    fn unlabelable_final_spine_crashes_softly() {
        let lex = lexicon(&[("the", &["iD"]), ("a", &["iD"]), ("b", &["iD"])]);
        let d = Driver::new(&lex).derive(&Numeration::flat(&["the", "a", "b"])).unwrap();
        assert!(matches!(d.outcome, Outcome::Crashed(Crash::Unlabeled { .. })));
        assert!(d.events.iter().any(|e| matches!(e, DerivationEvent::Crashed(_))));
        assert!(d.steps.last().unwrap().message.contains("Crash(Unlabeled)"));
    }

    #[test]
    fn matching_phi_sets_leave_the_merge_to_labeling() {
        let phi: &[&str] = &["iPerson:3", "iNumber:Sg", "iGender:M"];
        let lex = lexicon(&[("a", phi), ("b", phi)]);
        for order in [["a", "b"], ["b", "a"]] {
            let d = Driver::new(&lex).derive(&Numeration::flat(&order)).unwrap();
            assert!(d.converged());
            assert_eq!(d.root_label(), "Phi0");
            assert!(d.events.iter().any(|e| matches!(e, DerivationEvent::NoLabel { .. })));
        }
    }

    #[test]
    fn unification_shares_the_valued_feature() {
        let lex = lexicon(&[("T", &["Head", "uPerson"]), ("he", &["iPerson:3"])]);
        let d = Driver::new(&lex).derive(&Numeration::flat(&["T", "he"])).unwrap();
        let t = d.syntax[d.root].part1.unwrap();
        let he = d.syntax[d.root].part2.unwrap();
        let shared = d.syntax.shared_features(&d.syntax[t].features, &d.syntax[he].features);
        assert_eq!(shared.len(), 1);
        assert!(d.events.iter().any(|e| matches!(e, DerivationEvent::Unified { .. })));
        assert_eq!(d.counters.check, 1);
    }

    #[test]
    fn substream_merges_back_into_main_spine() {
        let lex = lexicon(&[
            ("the", &["Head", "iD"]),
            ("dog", &["Root"]),
            ("V", &["MergeF", "Root"]),
        ]);
        let n = Numeration::from_json_str(r#"[["dog", "the"], "V"]"#).unwrap();
        let d = Driver::new(&lex).derive(&n).unwrap();
        let tags: Vec<String> = d.events.iter().map(DerivationEvent::tag).collect();
        let sub = tags.iter().position(|t| t == "SubStream").unwrap();
        let main = tags.iter().position(|t| t == "MainStream").unwrap();
        assert!(sub < main);
        assert_eq!(d.root_label(), "V");
        let dp = d.syntax[d.root].part2.unwrap();
        assert_eq!(d.syntax[dp].label, "the");
        assert!(d.steps.iter().any(|s| s.sub_workspace.is_some()));
    }

    #[test]
    fn steps_record_remaining_numeration() {
        let lex = lexicon(&[("the", &["iD", "uPerson"]), ("dog", &["Root"])]);
        let d = Driver::new(&lex).derive(&Numeration::flat(&["dog", "the"])).unwrap();
        let first_merge = d.steps.iter().find(|s| s.message.starts_with("Merge")).unwrap();
        assert!(first_merge.numeration.is_empty());
        assert_eq!(d.steps.get(0).unwrap().message, "Numeration: dog, the");
        assert!(d.steps.iter().all(|s| s.syntax.len() <= d.syntax.len()));
    }
}
