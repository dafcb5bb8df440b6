#![forbid(unsafe_code)]

//! Constituents and the arena that owns them.
//!
//! Constituents form a DAG: a merge creates a new internal node over two
//! existing ones, and remerge reuses an already-merged constituent as a
//! child again. Nodes are never copied to express movement; a constituent
//! reachable along two paths *is* the moved element.
//!
//! ```text
//!            [Q]                 remerge of DP
//!           /   \
//!         DP    [C]
//!               /  \
//!              C   [T]
//!                  /  \
//!                 DP   T'        DP is the same ConstituentId twice
//! ```
//!
//! # Invariants
//!
//! 1. A constituent has either zero or two children while owned by the
//!    driver. The forest may clear one part transiently when an edge is
//!    disconnected.
//! 2. Ids are dense and never reused; the arena only grows.
//! 3. Head features are computed on demand and never cached, so relabeling
//!    or unification is immediately visible.

use std::fmt;
use std::ops::{Index, IndexMut};

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::feature::{Feature, FeatureId, FeaturePattern};

/// Label of a constituent that has not been labeled yet.
pub const UNLABELED: &str = "_";

/// Labels whose head features are the intersection of both children's.
pub const SHARED_LABELS: [&str; 4] = ["Phi", "Q", "Top", "Per"];

/// Stable index of a constituent inside a [`SyntaxArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstituentId(pub u32);

impl fmt::Display for ConstituentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A syntactic object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    pub label: String,
    pub features: Vec<FeatureId>,
    pub part1: Option<ConstituentId>,
    pub part2: Option<ConstituentId>,
    /// Set once the constituent has been sent to interpretation.
    pub transferred: bool,
}

impl Constituent {
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.part1.is_none() && self.part2.is_none()
    }

    #[must_use]
    pub fn is_labeled(&self) -> bool {
        self.label != UNLABELED
    }

    /// Children in order, skipping missing parts.
    pub fn parts(&self) -> impl Iterator<Item = ConstituentId> + '_ {
        self.part1.into_iter().chain(self.part2)
    }
}

/// Whether `label` names a shared category (`Phi3`, `Q`, `Top`, `Per`).
#[must_use]
pub fn is_shared_label(label: &str) -> bool {
    SHARED_LABELS.iter().any(|prefix| label.starts_with(prefix))
}

/// Owner of all constituents and features of one derivation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxArena {
    constituents: Vec<Constituent>,
    features: Vec<Feature>,
}

impl Index<ConstituentId> for SyntaxArena {
    type Output = Constituent;
    fn index(&self, id: ConstituentId) -> &Constituent {
        &self.constituents[id.0 as usize]
    }
}

impl IndexMut<ConstituentId> for SyntaxArena {
    fn index_mut(&mut self, id: ConstituentId) -> &mut Constituent {
        &mut self.constituents[id.0 as usize]
    }
}

impl Index<FeatureId> for SyntaxArena {
    type Output = Feature;
    fn index(&self, id: FeatureId) -> &Feature {
        &self.features[id.0 as usize]
    }
}

impl IndexMut<FeatureId> for SyntaxArena {
    fn index_mut(&mut self, id: FeatureId) -> &mut Feature {
        &mut self.features[id.0 as usize]
    }
}

impl SyntaxArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of constituents ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constituents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }

    /// Number of features ever created.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn get(&self, id: ConstituentId) -> Option<&Constituent> {
        self.constituents.get(id.0 as usize)
    }

    #[must_use]
    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id.0 as usize)
    }

    /// All constituent ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = ConstituentId> + '_ {
        (0..self.constituents.len() as u32).map(ConstituentId)
    }

    /// Store a feature and return its id.
    pub fn add_feature(&mut self, feature: Feature) -> FeatureId {
        let id = FeatureId(self.features.len() as u32);
        self.features.push(feature);
        id
    }

    /// Create a leaf owning `features`; their origin is set to the new leaf.
    pub fn new_leaf(&mut self, label: impl Into<String>, features: Vec<Feature>) -> ConstituentId {
        let id = ConstituentId(self.constituents.len() as u32);
        let ids = features
            .into_iter()
            .map(|mut f| {
                f.origin = Some(id);
                self.add_feature(f)
            })
            .collect();
        self.constituents.push(Constituent {
            label: label.into(),
            features: ids,
            part1: None,
            part2: None,
            transferred: false,
        });
        id
    }

    /// Create an internal node over two existing constituents.
    pub fn new_merged(
        &mut self,
        label: impl Into<String>,
        part1: ConstituentId,
        part2: ConstituentId,
    ) -> ConstituentId {
        let id = ConstituentId(self.constituents.len() as u32);
        self.constituents.push(Constituent {
            label: label.into(),
            features: Vec::new(),
            part1: Some(part1),
            part2: Some(part2),
            transferred: false,
        });
        id
    }

    /// The leaf that determines `id`'s head features.
    #[must_use]
    pub fn head(&self, id: ConstituentId) -> ConstituentId {
        let c = &self[id];
        match (c.part1, c.part2) {
            (None, None) => id,
            (Some(p1), Some(p2)) => {
                if c.is_labeled() && self[p2].label == c.label && self[p1].label != c.label {
                    self.head(p2)
                } else {
                    self.head(p1)
                }
            }
            (Some(p), None) | (None, Some(p)) => self.head(p),
        }
    }

    /// Head features of `id`.
    ///
    /// Leaves yield their own features. An internal node whose label equals
    /// a child's label yields that child's head features; a shared label
    /// yields the intersection of both children's head features (falling
    /// back to the first child when nothing is shared); anything else falls
    /// back to the first child.
    #[must_use]
    pub fn head_features(&self, id: ConstituentId) -> Vec<FeatureId> {
        let c = &self[id];
        let (p1, p2) = match (c.part1, c.part2) {
            (None, None) => return c.features.clone(),
            (Some(p1), Some(p2)) => (p1, p2),
            (Some(p), None) | (None, Some(p)) => return self.head_features(p),
        };
        if !c.is_labeled() || self[p1].label == c.label {
            return self.head_features(p1);
        }
        if self[p2].label == c.label {
            return self.head_features(p2);
        }
        if is_shared_label(&c.label) {
            let shared = self.shared_features(&self.head_features(p1), &self.head_features(p2));
            if !shared.is_empty() {
                return shared;
            }
        }
        self.head_features(p1)
    }

    /// Features of `a` equal to some feature of `b`, in `a`'s order.
    #[must_use]
    pub fn shared_features(&self, a: &[FeatureId], b: &[FeatureId]) -> Vec<FeatureId> {
        a.iter()
            .copied()
            .filter(|fa| b.iter().any(|fb| self[*fa] == self[*fb]))
            .collect()
    }

    /// First feature of `features` matching `pattern`.
    #[must_use]
    pub fn find(&self, features: &[FeatureId], pattern: &FeaturePattern) -> Option<FeatureId> {
        features
            .iter()
            .copied()
            .find(|f| self[*f].matches(pattern))
    }

    /// Whether `features` contain a match for every pattern in `patterns`.
    #[must_use]
    pub fn has_all(&self, features: &[FeatureId], patterns: &[&str]) -> bool {
        patterns.iter().all(|p| {
            p.parse::<FeaturePattern>()
                .map(|pat| self.find(features, &pat).is_some())
                .unwrap_or(false)
        })
    }

    /// Whether the head features of `id` contain every pattern.
    #[must_use]
    pub fn head_has(&self, id: ConstituentId, patterns: &[&str]) -> bool {
        self.has_all(&self.head_features(id), patterns)
    }

    /// Remove the first feature named `name` from the head leaf of `id`.
    pub fn consume_head_feature(&mut self, id: ConstituentId, name: &str) -> Option<FeatureId> {
        let head = self.head(id);
        let pos = self[head]
            .features
            .iter()
            .position(|f| self.features[f.0 as usize].name == name)?;
        Some(self[head].features.remove(pos))
    }

    /// Unification: every constituent holding `old` holds `new` instead.
    ///
    /// Returns how many constituents changed.
    pub fn replace_feature_everywhere(&mut self, old: FeatureId, new: FeatureId) -> usize {
        if old == new {
            return 0;
        }
        let mut changed = 0;
        for c in &mut self.constituents {
            if let Some(pos) = c.features.iter().position(|f| *f == old) {
                if c.features.contains(&new) {
                    c.features.remove(pos);
                } else {
                    c.features[pos] = new;
                }
                changed += 1;
            }
        }
        changed
    }

    /// Constituents reachable from `root`, parents before children, each once.
    #[must_use]
    pub fn preorder(&self, root: ConstituentId) -> Vec<ConstituentId> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            let c = &self[id];
            if let Some(p2) = c.part2 {
                stack.push(p2);
            }
            if let Some(p1) = c.part1 {
                stack.push(p1);
            }
        }
        out
    }

    /// Whether `needle` is reachable from `root` (including `root` itself).
    #[must_use]
    pub fn contains(&self, root: ConstituentId, needle: ConstituentId) -> bool {
        self.preorder(root).contains(&needle)
    }

    /// First node under `root` (preorder) that has `child` as a part.
    #[must_use]
    pub fn parent_of(&self, root: ConstituentId, child: ConstituentId) -> Option<ConstituentId> {
        self.preorder(root)
            .into_iter()
            .find(|id| self[*id].parts().any(|p| p == child))
    }

    /// The `part2` chain starting at `root`: root, root.part2, ...
    #[must_use]
    pub fn spine(&self, root: ConstituentId) -> Vec<ConstituentId> {
        let mut out = vec![root];
        let mut current = root;
        while let Some(next) = self[current].part2 {
            if out.contains(&next) {
                break;
            }
            out.push(next);
            current = next;
        }
        out
    }

    /// Bracketed rendering, `[label a b]`.
    #[must_use]
    pub fn bracketed(&self, id: ConstituentId) -> String {
        let c = &self[id];
        match (c.part1, c.part2) {
            (Some(a), Some(b)) => {
                format!("[{} {} {}]", c.label, self.bracketed(a), self.bracketed(b))
            }
            _ => c.label.clone(),
        }
    }

    /// Head features rendered for messages.
    #[must_use]
    pub fn describe_features(&self, features: &[FeatureId]) -> String {
        features
            .iter()
            .map(|f| self[*f].to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(arena: &mut SyntaxArena, label: &str, templates: &[&str]) -> ConstituentId {
        let features = templates
            .iter()
            .map(|t| Feature::parse_template(t).unwrap())
            .collect();
        arena.new_leaf(label, features)
    }

    #[test]
    fn leaf_has_own_head_features() {
        let mut arena = SyntaxArena::new();
        let d = leaf(&mut arena, "the", &["iD", "uPerson"]);
        assert_eq!(arena.head(d), d);
        assert_eq!(arena.head_features(d).len(), 2);
        assert_eq!(arena[arena.head_features(d)[0]].origin, Some(d));
    }

    #[test]
    fn label_selects_projecting_child() {
        let mut arena = SyntaxArena::new();
        let the = leaf(&mut arena, "the", &["iD"]);
        let dog = leaf(&mut arena, "dog", &["Root"]);
        let dp = arena.new_merged("the", the, dog);
        assert_eq!(arena.head(dp), the);
        assert!(arena.head_has(dp, &["iD"]));

        let np = arena.new_merged("dog", the, dog);
        assert_eq!(arena.head(np), dog);
        assert!(arena.head_has(np, &["Root"]));
    }

    #[test]
    fn unlabeled_uses_first_child() {
        let mut arena = SyntaxArena::new();
        let a = leaf(&mut arena, "a", &["iQ"]);
        let b = leaf(&mut arena, "b", &["Root"]);
        let m = arena.new_merged(UNLABELED, a, b);
        assert_eq!(arena.head(m), a);
        assert!(arena.head_has(m, &["iQ"]));
    }

    #[test]
    fn shared_label_intersects() {
        let mut arena = SyntaxArena::new();
        let a = leaf(&mut arena, "a", &["iPerson:3", "iNumber:Sg", "iD"]);
        let b = leaf(&mut arena, "b", &["iPerson:3", "iNumber:Sg", "uCase"]);
        let m = arena.new_merged("Phi0", a, b);
        let hf = arena.head_features(m);
        let names: Vec<_> = hf.iter().map(|f| arena[*f].name.clone()).collect();
        assert_eq!(names, vec!["Person", "Number"]);
    }

    #[test]
    fn unification_replaces_everywhere() {
        let mut arena = SyntaxArena::new();
        let a = leaf(&mut arena, "a", &["uPerson"]);
        let b = leaf(&mut arena, "b", &["iPerson:3"]);
        let u = arena[a].features[0];
        // Share the unvalued feature with another constituent.
        let c = arena.new_merged("a", a, b);
        arena[c].features.push(u);
        let valued = arena[b].features[0];
        assert_eq!(arena.replace_feature_everywhere(u, valued), 2);
        assert_eq!(arena[a].features, vec![valued]);
        assert_eq!(arena[c].features, vec![valued]);
    }

    #[test]
    fn unification_does_not_duplicate() {
        let mut arena = SyntaxArena::new();
        let a = leaf(&mut arena, "a", &["uPerson", "iPerson:1"]);
        let (u, v) = (arena[a].features[0], arena[a].features[1]);
        arena.replace_feature_everywhere(u, v);
        assert_eq!(arena[a].features, vec![v]);
    }

    #[test]
    fn preorder_visits_shared_child_once() {
        let mut arena = SyntaxArena::new();
        let a = leaf(&mut arena, "a", &[]);
        let b = leaf(&mut arena, "b", &[]);
        let ab = arena.new_merged("a", a, b);
        let top = arena.new_merged("b", b, ab);
        assert_eq!(arena.preorder(top), vec![top, b, ab, a]);
        assert_eq!(arena.parent_of(top, a), Some(ab));
        assert_eq!(arena.spine(top), vec![top, ab, b]);
    }

    #[test]
    fn consume_head_feature_removes_once() {
        let mut arena = SyntaxArena::new();
        let a = leaf(&mut arena, "a", &["Head", "MergeF"]);
        let b = leaf(&mut arena, "b", &[]);
        let m = arena.new_merged("a", a, b);
        assert!(arena.consume_head_feature(m, "Head").is_some());
        assert!(arena.consume_head_feature(m, "Head").is_none());
        assert!(arena.head_has(m, &["MergeF"]));
    }

    #[test]
    fn bracketed_rendering() {
        let mut arena = SyntaxArena::new();
        let a = leaf(&mut arena, "the", &[]);
        let b = leaf(&mut arena, "dog", &[]);
        let m = arena.new_merged("the", a, b);
        assert_eq!(arena.bracketed(m), "[the the dog]");
    }
}
