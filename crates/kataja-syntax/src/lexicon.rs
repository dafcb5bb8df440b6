#![forbid(unsafe_code)]

//! Lexicon: lexeme name to feature templates.
//!
//! [`LexiconConfig`] holds the label classes the driver consults (phase
//! heads, determiners, adjuncts, ...) and the counted-feature lists. The
//! defaults reproduce the PoP grammar fragment; [`Lexicon::pop_default`]
//! bundles them with its lexical entries.
//!
//! A lexicon file is a plain mapping:
//!
//! ```json
//! { "the": ["iD", "uPerson"], "dog": ["Root", "iPerson:", "iNumber:", "iGender:"] }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SyntaxError};
use crate::feature::Feature;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Label classes and counting rules used by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    /// Labels that make a merged node a phase.
    pub phase_heads: BTreeSet<String>,
    /// Phase heads that dephase onto the closest verbal root.
    pub dephasing_heads: BTreeSet<String>,
    /// D-class determiners, consulted by look-ahead.
    pub det_heads: BTreeSet<String>,
    /// Heads that assign theta roles; external merge into them blocks movement.
    pub theta_assigners: BTreeSet<String>,
    /// Right-hand labels that never project.
    pub adjunct_labels: BTreeSet<String>,
    /// Label fragments on the left operand that make the right operand project.
    pub right_projecting: BTreeSet<String>,
    /// Templates whose realizations share the feature counter.
    pub counted: BTreeSet<String>,
    /// Templates whose realizations share the phi counter.
    pub counted_phi: BTreeSet<String>,
    /// Synthetic spellings rewritten to canonical labels.
    pub rewrites: BTreeMap<String, String>,
    /// Label of the expletive nominal.
    pub expletive: String,
    /// Entry used for lexemes the lexicon does not list.
    pub default_lexeme: String,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            phase_heads: set(&[
                "v*", "C", "C_Q", "that", "C_Null", "C_Top", "in", "if", "C_if", "ni", "no",
                "CASE", "C_Q_e",
            ]),
            dephasing_heads: set(&["v*"]),
            det_heads: set(&["the", "a", "d", "no"]),
            theta_assigners: set(&["v*", "vUnerg", "v", "v_be"]),
            adjunct_labels: set(&["P_in", "in"]),
            right_projecting: set(&["C", "P_in"]),
            counted: set(&[
                "uPerson", "uNumber", "uGender", "Case:Nom", "Case:Acc", "Case:Dat", "Root",
                "uCase", "iTop", "uScp", "iQ", "iv", "Case:Top", "Case:X",
            ]),
            counted_phi: set(&["iPerson:", "iNumber:", "iGender:"]),
            rewrites: [("C_Null", "C"), ("n_Expl", "n")]
                .into_iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            expletive: "n".into(),
            default_lexeme: "root".into(),
        }
    }
}

impl LexiconConfig {
    #[must_use]
    pub fn is_phase_head(&self, label: &str) -> bool {
        self.phase_heads.contains(label)
    }

    /// Whether a left operand with this label lets the right operand project.
    #[must_use]
    pub fn projects_right(&self, label: &str) -> bool {
        self.right_projecting.iter().any(|frag| label.contains(frag.as_str()))
    }
}

/// Per-derivation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub feature: u32,
    pub phi: u32,
    pub merge: u32,
    pub inheritance: u32,
    pub check: u32,
    pub transfer: u32,
}

/// Mapping from lexeme to ordered feature templates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lexicon {
    entries: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    config: LexiconConfig,
}

impl Lexicon {
    /// Build from entries, validating every template.
    pub fn new(entries: BTreeMap<String, Vec<String>>) -> Result<Self> {
        for (lexeme, templates) in &entries {
            for t in templates {
                Feature::parse_template(t).map_err(|e| SyntaxError::LexiconEntry {
                    lexeme: lexeme.clone(),
                    source: Box::new(e),
                })?;
            }
        }
        Ok(Self {
            entries,
            config: LexiconConfig::default(),
        })
    }

    /// Build from `(lexeme, templates)` pairs.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a [&'a str])>,
    ) -> Result<Self> {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| (*s).to_string()).collect()))
                .collect(),
        )
    }

    #[must_use]
    pub fn with_config(mut self, config: LexiconConfig) -> Self {
        self.config = config;
        self
    }

    /// Parse a JSON mapping of lexeme to template list.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::new(serde_json::from_str(s)?)
    }

    /// Parse a TOML table of lexeme to template list.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Self::new(toml::from_str(s)?)
    }

    /// Load a JSON or TOML file, chosen by extension (`.toml` is TOML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|e| e == "toml") {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// The PoP grammar fragment.
    #[must_use]
    pub fn pop_default() -> Self {
        const PHI_U: [&str; 3] = ["uPerson", "uNumber", "uGender"];
        const PHI_I: [&str; 3] = ["iPerson:", "iNumber:", "iGender:"];
        let mut entries: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut put = |name: &str, parts: &[&[&str]]| {
            entries.insert(
                name.to_string(),
                parts.iter().flat_map(|p| p.iter()).map(|s| (*s).to_string()).collect(),
            );
        };
        put("the", &[&["MergeF", "Head"], &PHI_U, &["iD", "uCase"]]);
        put("a", &[&["MergeF", "Head"], &PHI_U, &["iD", "uCase"]]);
        put("d", &[&["MergeF", "Head"], &PHI_U, &["iD", "uCase"]]);
        put("n", &[&["MergeF", "Head", "iN"], &PHI_U]);
        put("n_Expl", &[&["MergeF", "Head", "iN", "uPerson"]]);
        put("he", &[&["MergeF"], &PHI_I, &["iD", "uCase"]]);
        put("she", &[&["MergeF"], &PHI_I, &["iD", "uCase"]]);
        put("it", &[&["MergeF"], &PHI_I, &["iD", "uCase"]]);
        put("what", &[&["MergeF"], &PHI_I, &["iD", "iQ", "uCase"]]);
        put("who", &[&["MergeF"], &PHI_I, &["iD", "iQ", "uCase"]]);
        put("v*", &[&PHI_U, &["Phase", "MergeF", "Head", "Case:Acc", "Affix", "Theta"]]);
        put("v", &[&["MergeF", "Head", "Affix"]]);
        put("vUnerg", &[&PHI_U, &["MergeF", "Head", "Affix", "Theta"]]);
        put("v_be", &[&["MergeF", "Head", "Affix"]]);
        put("C", &[&PHI_U, &["MergeF", "Head", "Phase", "Case:Nom"]]);
        put("C_Null", &[&PHI_U, &["MergeF", "Head", "Phase", "Case:Nom", "Delete"]]);
        put("C_Q", &[&PHI_U, &["MergeF", "Head", "Phase", "Case:Nom", "uQ", "uScp"]]);
        put("C_Top", &[&PHI_U, &["MergeF", "Head", "Phase", "Case:Nom", "uTop"]]);
        put("that", &[&PHI_U, &["MergeF", "Head", "Phase", "Case:Nom"]]);
        put("if", &[&PHI_U, &["MergeF", "Head", "Phase", "Case:Nom", "uQ"]]);
        put("in", &[&["MergeF", "Head", "Phase", "Case:Dat"]]);
        put("P_in", &[&["MergeF", "Head", "Case:Dat"]]);
        put("root", &[&["MergeF", "Root"]]);
        Self {
            entries,
            config: LexiconConfig::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LexiconConfig {
        &self.config
    }

    /// Templates for a lexeme, if listed.
    #[must_use]
    pub fn get(&self, lexeme: &str) -> Option<&[String]> {
        self.entries.get(lexeme).map(Vec::as_slice)
    }

    /// Number of listed lexemes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lexical realization: label and fresh features for one occurrence of
    /// `lexeme`, advancing `counters`.
    ///
    /// Unknown lexemes use the configured default entry. Counted templates
    /// receive the feature counter, counted phi templates the phi counter;
    /// each counter advances once per lexeme that has any such template.
    pub fn realize(&self, lexeme: &str, counters: &mut Counters) -> Result<(String, Vec<Feature>)> {
        let templates = self
            .entries
            .get(lexeme)
            .or_else(|| self.entries.get(&self.config.default_lexeme))
            .map(Vec::as_slice)
            .unwrap_or_default();
        if templates.iter().any(|t| self.config.counted.contains(t)) {
            counters.feature += 1;
        }
        if templates.iter().any(|t| self.config.counted_phi.contains(t)) {
            counters.phi += 1;
        }
        let mut features = Vec::with_capacity(templates.len());
        for t in templates {
            let mut f = Feature::parse_template(t)?;
            if self.config.counted.contains(t) {
                f.counter = counters.feature;
            } else if self.config.counted_phi.contains(t) {
                f.counter = counters.phi;
            }
            features.push(f);
        }
        let label = self
            .config
            .rewrites
            .get(lexeme)
            .cloned()
            .unwrap_or_else(|| lexeme.to_string());
        debug!(lexeme, label = %label, features = features.len(), "lexical realization");
        Ok((label, features))
    }
}
