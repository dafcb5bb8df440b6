#![forbid(unsafe_code)]

//! The driver's dual-layer working stack.
//!
//! The main layer collects everything merged into the main spine; while a
//! substream is being built, pushes go to the sub layer instead. Goals for
//! feature checking are searched from the top (most recent) downwards.
//!
//! # Invariants
//!
//! 1. No constituent appears twice in the same layer.
//! 2. Leaving a substream empties the sub layer.

use serde::{Deserialize, Serialize};

use crate::constituent::ConstituentId;

/// Which layer receives pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StackMode {
    #[default]
    Main,
    Sub,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    main: Vec<ConstituentId>,
    sub: Vec<ConstituentId>,
    mode: StackMode,
}

impl Stack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(&self) -> StackMode {
        self.mode
    }

    #[must_use]
    pub fn is_main(&self) -> bool {
        self.mode == StackMode::Main
    }

    #[must_use]
    pub fn is_sub(&self) -> bool {
        self.mode == StackMode::Sub
    }

    /// Enter a substream with an empty sub layer.
    pub fn start_sub_stream(&mut self) {
        self.sub.clear();
        self.mode = StackMode::Sub;
    }

    /// Leave the substream, discarding the sub layer.
    pub fn end_sub_stream(&mut self) {
        self.sub.clear();
        self.mode = StackMode::Main;
    }

    pub fn clear_main(&mut self) {
        self.main.clear();
    }

    fn current_mut(&mut self) -> &mut Vec<ConstituentId> {
        match self.mode {
            StackMode::Main => &mut self.main,
            StackMode::Sub => &mut self.sub,
        }
    }

    /// The active layer, bottom first.
    #[must_use]
    pub fn current(&self) -> &[ConstituentId] {
        match self.mode {
            StackMode::Main => &self.main,
            StackMode::Sub => &self.sub,
        }
    }

    #[must_use]
    pub fn main(&self) -> &[ConstituentId] {
        &self.main
    }

    #[must_use]
    pub fn sub(&self) -> &[ConstituentId] {
        &self.sub
    }

    /// Push onto the active layer unless already present there.
    ///
    /// Returns whether the item was added.
    pub fn push(&mut self, item: ConstituentId) -> bool {
        let layer = self.current_mut();
        if layer.contains(&item) {
            return false;
        }
        layer.push(item);
        true
    }

    /// Push onto the main layer regardless of mode.
    pub fn push_main(&mut self, item: ConstituentId) -> bool {
        if self.main.contains(&item) {
            return false;
        }
        self.main.push(item);
        true
    }

    /// Drop everything below `item` in the active layer, keeping `item` and
    /// what was pushed after it. Returns false if `item` is not present.
    pub fn cut_to(&mut self, item: ConstituentId) -> bool {
        let layer = self.current_mut();
        match layer.iter().position(|i| *i == item) {
            Some(pos) => {
                layer.drain(..pos);
                true
            }
            None => false,
        }
    }

    /// Replace `old` with `new` in the active layer (or main only).
    pub fn replace(&mut self, old: ConstituentId, new: ConstituentId, main_only: bool) {
        let layer = if main_only {
            &mut self.main
        } else {
            self.current_mut()
        };
        let already = layer.contains(&new);
        if already {
            layer.retain(|i| *i != old);
        } else {
            for item in layer.iter_mut() {
                if *item == old {
                    *item = new;
                }
            }
        }
    }

    /// Whether the active layer holds `item`.
    #[must_use]
    pub fn contains(&self, item: ConstituentId) -> bool {
        self.current().contains(&item)
    }

    /// Active layer from the most recent push down to the oldest.
    pub fn top_down(&self) -> impl Iterator<Item = ConstituentId> + '_ {
        self.current().iter().rev().copied()
    }

    /// Depth-ordered position of `item` in the active layer, 0 = bottom.
    #[must_use]
    pub fn position(&self, item: ConstituentId) -> Option<usize> {
        self.current().iter().position(|i| *i == item)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.current().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(n: u32) -> ConstituentId {
        ConstituentId(n)
    }

    #[test]
    fn push_deduplicates() {
        let mut s = Stack::new();
        assert!(s.push(c(1)));
        assert!(s.push(c(2)));
        assert!(!s.push(c(1)));
        assert_eq!(s.main(), [c(1), c(2)]);
    }

    #[test]
    fn substream_isolated_from_main() {
        let mut s = Stack::new();
        s.push(c(1));
        s.start_sub_stream();
        assert!(s.is_sub());
        s.push(c(1));
        s.push(c(2));
        assert_eq!(s.sub(), [c(1), c(2)]);
        assert_eq!(s.main(), [c(1)]);
        assert!(s.push_main(c(3)));
        s.end_sub_stream();
        assert!(s.sub().is_empty());
        assert_eq!(s.main(), [c(1), c(3)]);
    }

    #[test]
    fn cut_to_keeps_item_and_above() {
        let mut s = Stack::new();
        for n in 1..=5 {
            s.push(c(n));
        }
        assert!(s.cut_to(c(3)));
        assert_eq!(s.main(), [c(3), c(4), c(5)]);
        assert!(!s.cut_to(c(9)));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn replace_keeps_uniqueness() {
        let mut s = Stack::new();
        s.push(c(1));
        s.push(c(2));
        s.replace(c(1), c(7), false);
        assert_eq!(s.main(), [c(7), c(2)]);
        s.replace(c(7), c(2), false);
        assert_eq!(s.main(), [c(2)]);
    }

    #[test]
    fn top_down_order() {
        let mut s = Stack::new();
        s.push(c(1));
        s.push(c(2));
        s.push(c(3));
        assert_eq!(s.top_down().collect::<Vec<_>>(), [c(3), c(2), c(1)]);
        assert_eq!(s.position(c(2)), Some(1));
    }
}
