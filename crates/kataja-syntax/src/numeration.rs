#![forbid(unsafe_code)]

//! Numerations: the ordered, possibly nested lexeme lists fed to the driver.
//!
//! Items are consumed from the end of each list. A nested list is a
//! substream: it is derived to completion on its own before being merged
//! into the enclosing spine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyntaxError};

/// One entry of a numeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumerationItem {
    Lexeme(String),
    Substream(Vec<NumerationItem>),
}

impl NumerationItem {
    fn validate(&self) -> Result<()> {
        match self {
            Self::Lexeme(_) => Ok(()),
            Self::Substream(items) if items.is_empty() => Err(SyntaxError::EmptySubstream),
            Self::Substream(items) => items.iter().try_for_each(Self::validate),
        }
    }
}

impl fmt::Display for NumerationItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexeme(s) => f.write_str(s),
            Self::Substream(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for NumerationItem {
    fn from(s: &str) -> Self {
        Self::Lexeme(s.to_string())
    }
}

/// A complete numeration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Numeration {
    pub items: Vec<NumerationItem>,
}

impl Numeration {
    /// A flat numeration of lexemes.
    #[must_use]
    pub fn flat<S: AsRef<str>>(lexemes: &[S]) -> Self {
        Self {
            items: lexemes
                .iter()
                .map(|s| NumerationItem::Lexeme(s.as_ref().to_string()))
                .collect(),
        }
    }

    /// Parse from nested JSON arrays, e.g. `["v*", ["the", "dog"], "V"]`.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let n: Self = serde_json::from_str(s)?;
        n.validate()?;
        Ok(n)
    }

    /// Reject empty numerations and empty substreams.
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(SyntaxError::EmptyNumeration);
        }
        self.items.iter().try_for_each(NumerationItem::validate)
    }

    /// Number of lexemes, counting into substreams.
    #[must_use]
    pub fn lexeme_count(&self) -> usize {
        fn count(items: &[NumerationItem]) -> usize {
            items
                .iter()
                .map(|i| match i {
                    NumerationItem::Lexeme(_) => 1,
                    NumerationItem::Substream(sub) => count(sub),
                })
                .sum()
        }
        count(&self.items)
    }
}
