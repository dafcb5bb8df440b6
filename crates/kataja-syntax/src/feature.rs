#![forbid(unsafe_code)]

//! Features: atomic typed attributes of constituents.
//!
//! A feature is written `[i|u]Name[:value]`:
//!
//! | Template   | Kind            | Name     | Value |
//! |------------|-----------------|----------|-------|
//! | `iPerson:` | interpretable   | `Person` | ``    |
//! | `uCase`    | uninterpretable | `Case`   | ``    |
//! | `Case:Acc` | plain           | `Case`   | `Acc` |
//! | `Root`     | plain           | `Root`   | ``    |
//!
//! Counted features additionally carry a numeric `counter` that is printed
//! after the value (`uPerson3`). The counter keeps features of different
//! lexical items apart in display and logs; it does not take part in
//! equality.
//!
//! # Invariants
//!
//! 1. Equality compares `(name, value, ifeature)` only.
//! 2. A feature is unvalued iff it is uninterpretable and has no value.
//! 3. Feature identity (which [`FeatureId`] a constituent holds) changes only
//!    through unification, see
//!    [`SyntaxArena::replace_feature_everywhere`](crate::constituent::SyntaxArena::replace_feature_everywhere).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constituent::ConstituentId;
use crate::error::SyntaxError;

/// Stable index of a feature inside a [`SyntaxArena`](crate::constituent::SyntaxArena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub u32);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Interpretability class, given by the template prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// `i` prefix: valued at its origin.
    Interpretable,
    /// `u` prefix: needs valuation.
    Uninterpretable,
    /// No prefix: a marker such as `Root` or `Head`.
    Plain,
}

/// An atomic attribute of a constituent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub value: String,
    pub kind: FeatureKind,
    pub counter: u32,
    /// The leaf that introduced this feature.
    pub origin: Option<ConstituentId>,
}

impl Feature {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
            counter: 0,
            origin: None,
        }
    }

    /// An interpretable feature.
    #[must_use]
    pub fn interpretable(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, FeatureKind::Interpretable)
    }

    /// An unvalued, uninterpretable feature.
    #[must_use]
    pub fn unvalued(name: impl Into<String>) -> Self {
        Self::new(name, "", FeatureKind::Uninterpretable)
    }

    /// A plain marker feature.
    #[must_use]
    pub fn plain(name: impl Into<String>) -> Self {
        Self::new(name, "", FeatureKind::Plain)
    }

    #[must_use]
    pub fn with_counter(mut self, counter: u32) -> Self {
        self.counter = counter;
        self
    }

    /// Parse a lexicon template. Templates never carry counters.
    pub fn parse_template(template: &str) -> Result<Self, SyntaxError> {
        let bad = || SyntaxError::FeatureTemplate(template.to_string());
        let template = template.trim();
        let (head, value) = match template.split_once(':') {
            Some((head, value)) => (head, value),
            None => (template, ""),
        };
        let (kind, name) = split_prefix(head);
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(bad());
        }
        Ok(Self::new(name, value, kind))
    }

    #[inline]
    #[must_use]
    pub fn ifeature(&self) -> bool {
        self.kind == FeatureKind::Interpretable
    }

    /// Whether the feature still needs a value.
    #[inline]
    #[must_use]
    pub fn is_unvalued(&self) -> bool {
        self.kind == FeatureKind::Uninterpretable && self.value.is_empty()
    }

    /// Whether this feature is valued: interpretable, or carrying a value.
    #[inline]
    #[must_use]
    pub fn is_valued(&self) -> bool {
        self.ifeature() || !self.value.is_empty()
    }

    /// Partial match: `pattern`'s name must equal ours; its prefix and
    /// value, when present, must match too.
    #[must_use]
    pub fn matches(&self, pattern: &FeaturePattern) -> bool {
        if self.name != pattern.name {
            return false;
        }
        if let Some(kind) = pattern.kind
            && kind != self.kind
        {
            return false;
        }
        match &pattern.value {
            Some(v) => *v == self.value,
            None => true,
        }
    }
}

fn split_prefix(head: &str) -> (FeatureKind, &str) {
    let mut chars = head.chars();
    match (chars.next(), chars.next()) {
        (Some('i'), Some(c)) if c.is_uppercase() => (FeatureKind::Interpretable, &head[1..]),
        (Some('u'), Some(c)) if c.is_uppercase() => (FeatureKind::Uninterpretable, &head[1..]),
        _ => (FeatureKind::Plain, head),
    }
}

impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value && self.ifeature() == other.ifeature()
    }
}

impl Eq for Feature {}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FeatureKind::Interpretable => f.write_str("i")?,
            FeatureKind::Uninterpretable => f.write_str("u")?,
            FeatureKind::Plain => {}
        }
        f.write_str(&self.name)?;
        if !self.value.is_empty() {
            write!(f, ":{}", self.value)?;
        }
        if self.counter != 0 {
            write!(f, "{}", self.counter)?;
        }
        Ok(())
    }
}

/// A partial feature description used for containment queries.
///
/// Parsed from the same syntax as templates, except that omitting the
/// prefix or the value leaves that part unconstrained: `Person` matches
/// `iPerson:3` and `uPerson`, while `iPerson` matches only interpretable ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePattern {
    pub name: String,
    pub kind: Option<FeatureKind>,
    pub value: Option<String>,
}

impl FromStr for FeaturePattern {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, value) = match s.split_once(':') {
            Some((head, value)) => (head, Some(value.to_string())),
            None => (s, None),
        };
        let (kind, name) = split_prefix(head);
        if name.is_empty() {
            return Err(SyntaxError::FeatureTemplate(s.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            kind: (kind != FeatureKind::Plain).then_some(kind),
            value: value.filter(|v| !v.is_empty()),
        })
    }
}

impl FeaturePattern {
    /// Pattern that matches by name only.
    #[must_use]
    pub fn name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: None,
            value: None,
        }
    }

    /// Pattern for an interpretable feature with the given name.
    #[must_use]
    pub fn interpretable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: Some(FeatureKind::Interpretable),
            value: None,
        }
    }

    /// Pattern for an uninterpretable feature with the given name.
    #[must_use]
    pub fn uninterpretable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: Some(FeatureKind::Uninterpretable),
            value: None,
        }
    }
}
