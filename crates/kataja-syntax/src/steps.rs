#![forbid(unsafe_code)]

//! Derivation steps and their append-only log.
//!
//! Each step carries a full snapshot of the syntax arena as it was when the
//! step was announced, so stepping back and forth never re-runs the driver.
//! The log grows only while a derivation runs; afterwards the only mutable
//! state is the read cursor.

use serde::{Deserialize, Serialize};

use crate::constituent::{ConstituentId, SyntaxArena};
use crate::events::DerivationEvent;

/// Immutable snapshot of one derivation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationStep {
    pub index: usize,
    pub message: String,
    /// Lexemes not yet consumed, in numeration order.
    pub numeration: Vec<String>,
    /// Constituents in focus in the main stream.
    pub workspace: Vec<ConstituentId>,
    /// Constituents in focus while a substream is being built.
    pub sub_workspace: Option<Vec<ConstituentId>>,
    /// Events since the previous step.
    pub events: Vec<DerivationEvent>,
    pub syntax: SyntaxArena,
}

impl DerivationStep {
    /// Roots to display: the substream focus when present, else the main one.
    #[must_use]
    pub fn roots(&self) -> &[ConstituentId] {
        self.sub_workspace
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.workspace)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivationStepLog {
    steps: Vec<DerivationStep>,
    cursor: Option<usize>,
}

impl DerivationStepLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step. Its index is overwritten with its log position.
    pub fn push(&mut self, mut step: DerivationStep) {
        step.index = self.steps.len();
        self.steps.push(step);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DerivationStep> {
        self.steps.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DerivationStep> {
        self.steps.iter()
    }

    #[must_use]
    pub fn last(&self) -> Option<&DerivationStep> {
        self.steps.last()
    }

    /// Index of the step being viewed.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The step being viewed.
    #[must_use]
    pub fn current(&self) -> Option<&DerivationStep> {
        self.cursor.and_then(|i| self.steps.get(i))
    }

    /// View step `index`; out of range indices are clamped.
    pub fn jump_to(&mut self, index: usize) -> Option<&DerivationStep> {
        if self.steps.is_empty() {
            return None;
        }
        let i = index.min(self.steps.len() - 1);
        self.cursor = Some(i);
        self.steps.get(i)
    }

    /// Advance the cursor; stays on the last step at the end.
    pub fn next_step(&mut self) -> Option<&DerivationStep> {
        let next = self.cursor.map_or(0, |i| i + 1);
        self.jump_to(next)
    }

    /// Move the cursor back; stays on the first step at the start.
    pub fn previous_step(&mut self) -> Option<&DerivationStep> {
        let prev = self.cursor.map_or(0, |i| i.saturating_sub(1));
        self.jump_to(prev)
    }
}
