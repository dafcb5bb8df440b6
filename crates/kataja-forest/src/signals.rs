#![forbid(unsafe_code)]

//! Watch-list signals fired on forest state changes.
//!
//! Observers register a callback per [`Signal`] and get back a
//! [`Subscription`] guard. The hub keeps only weak references; dropping the
//! guard unsubscribes, and dead entries are pruned on the next emit.
//!
//! # Invariants
//!
//! 1. Callbacks run in registration order.
//! 2. `count(signal)` increments by exactly one per emit of that signal,
//!    whether or not anyone listens.

use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    ForestChanged,
    SelectionChanged,
    ScopeChanged,
    EdgeShape,
    EdgeAdjustment,
    PaletteChanged,
    Visualization,
    UiFontChanged,
}

impl Signal {
    pub const ALL: [Signal; 8] = [
        Self::ForestChanged,
        Self::SelectionChanged,
        Self::ScopeChanged,
        Self::EdgeShape,
        Self::EdgeAdjustment,
        Self::PaletteChanged,
        Self::Visualization,
        Self::UiFontChanged,
    ];

    /// Watch-list name, e.g. `forest_changed`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ForestChanged => "forest_changed",
            Self::SelectionChanged => "selection_changed",
            Self::ScopeChanged => "scope_changed",
            Self::EdgeShape => "edge_shape",
            Self::EdgeAdjustment => "edge_adjustment",
            Self::PaletteChanged => "palette_changed",
            Self::Visualization => "visualization",
            Self::UiFontChanged => "ui_font_changed",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// What observers receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEvent {
    pub signal: Signal,
    /// Node the change is about, when there is one.
    pub subject: Option<NodeId>,
    /// Free-form detail such as a visualization or shape name.
    pub detail: Option<String>,
}

type Callback = Rc<dyn Fn(&SignalEvent)>;
type CallbackWeak = Weak<dyn Fn(&SignalEvent)>;

#[derive(Default)]
pub struct SignalHub {
    subscribers: Vec<(Signal, CallbackWeak)>,
    counts: [u64; Signal::ALL.len()],
}

impl fmt::Debug for SignalHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHub")
            .field("subscriber_count", &self.subscribers.len())
            .field("counts", &self.counts)
            .finish()
    }
}

impl SignalHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `signal`. Keep the guard alive to stay
    /// subscribed.
    pub fn subscribe(&mut self, signal: Signal, callback: impl Fn(&SignalEvent) + 'static) -> Subscription {
        let strong: Callback = Rc::new(callback);
        self.subscribers.push((signal, Rc::downgrade(&strong)));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    pub fn emit(&mut self, signal: Signal) {
        self.emit_event(SignalEvent {
            signal,
            subject: None,
            detail: None,
        });
    }

    pub fn emit_about(&mut self, signal: Signal, subject: NodeId) {
        self.emit_event(SignalEvent {
            signal,
            subject: Some(subject),
            detail: None,
        });
    }

    pub fn emit_detail(&mut self, signal: Signal, detail: impl Into<String>) {
        self.emit_event(SignalEvent {
            signal,
            subject: None,
            detail: Some(detail.into()),
        });
    }

    fn emit_event(&mut self, event: SignalEvent) {
        self.counts[event.signal.index()] += 1;
        self.subscribers.retain(|(_, w)| w.strong_count() > 0);
        let callbacks: Vec<Callback> = self
            .subscribers
            .iter()
            .filter(|(s, _)| *s == event.signal)
            .filter_map(|(_, w)| w.upgrade())
            .collect();
        trace!(signal = event.signal.name(), listeners = callbacks.len(), "signal");
        for cb in callbacks {
            cb(&event);
        }
    }

    /// How many times `signal` has fired.
    #[must_use]
    pub fn count(&self, signal: Signal) -> u64 {
        self.counts[signal.index()]
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// RAII guard for a signal callback.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
