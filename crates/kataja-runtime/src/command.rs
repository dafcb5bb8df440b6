#![forbid(unsafe_code)]

//! Named commands, their shortcuts, and the widgets that trigger them.
//!
//! A [`Command`] is looked up by name and runs against the whole
//! [`Kataja`] engine. Commands are plain function pointers, so the registry
//! can hand one out and let it borrow the engine mutably.
//!
//! # Shortcut resolution
//!
//! ```text
//!  key ──▶ enabled commands bound to the shortcut
//!            0 ─▶ unhandled
//!            1 ─▶ that command
//!           2+ ─▶ first visible widget bound to one of them
//!                   none visible ─▶ first registered (fallback)
//! ```
//!
//! # Invariants
//!
//! 1. Command names are unique; registering a name again replaces the
//!    earlier command in place.
//! 2. A widget is bound to at most one command.

use std::fmt;

use kataja_core::{ColorKey, Point3, Shortcut, Viewport};
use kataja_forest::{NodeId, NodeType};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::engine::Kataja;
use crate::error::{CommandError, Result};

/// Body of a command. Returns the message shown to the user, which is also
/// the undo label for undoable commands.
pub type CommandFn<V> = fn(&mut Kataja<V>, &Invocation<'_>) -> Result<String>;

/// Read-only question asked of the engine (enabled? checked?).
pub type Predicate<V> = fn(&Kataja<V>) -> bool;

/// Identifier of a UI element that can trigger a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(pub u64);

/// Arguments supplied by whoever triggers a command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    pub node: Option<NodeId>,
    pub text: Option<String>,
    pub color: Option<ColorKey>,
    pub position: Option<Point3>,
}

impl CommandArgs {
    #[must_use]
    pub fn node(node: NodeId) -> Self {
        Self {
            node: Some(node),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn color(color: ColorKey) -> Self {
        Self {
            color: Some(color),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn at(mut self, position: Point3) -> Self {
        self.position = Some(position);
        self
    }
}

/// One call of a command: its name, the node type it was registered for,
/// and the caller's arguments.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub command: &'a str,
    pub bound: Option<NodeType>,
    pub args: &'a CommandArgs,
}

impl Invocation<'_> {
    pub(crate) fn missing(&self, argument: &'static str) -> CommandError {
        CommandError::MissingArgument {
            command: self.command.to_string(),
            argument,
        }
    }

    pub(crate) fn node_type(&self) -> Result<NodeType> {
        self.bound.ok_or_else(|| self.missing("node type"))
    }

    pub(crate) fn text(&self, what: &'static str) -> Result<&str> {
        self.args.text.as_deref().ok_or_else(|| self.missing(what))
    }
}

pub struct Command<V: Viewport> {
    pub name: String,
    pub shortcut: Option<Shortcut>,
    pub undoable: bool,
    pub bound: Option<NodeType>,
    enabler: Option<Predicate<V>>,
    checked: Option<Predicate<V>>,
    run: CommandFn<V>,
}

impl<V: Viewport> fmt::Debug for Command<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("shortcut", &self.shortcut)
            .field("undoable", &self.undoable)
            .field("checkable", &self.checked.is_some())
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

impl<V: Viewport> Command<V> {
    #[must_use]
    pub fn new(name: impl Into<String>, run: CommandFn<V>) -> Self {
        Self {
            name: name.into(),
            shortcut: None,
            undoable: false,
            bound: None,
            enabler: None,
            checked: None,
            run,
        }
    }

    /// Bind a shortcut written like `Ctrl+Shift+Z`. An unparsable spelling
    /// leaves the command without a shortcut.
    #[must_use]
    pub fn shortcut(mut self, spelling: &str) -> Self {
        match spelling.parse() {
            Ok(s) => self.shortcut = Some(s),
            Err(e) => warn!(command = %self.name, error = %e, "shortcut ignored"),
        }
        self
    }

    #[must_use]
    pub fn undoable(mut self) -> Self {
        self.undoable = true;
        self
    }

    #[must_use]
    pub fn enabled_when(mut self, enabler: Predicate<V>) -> Self {
        self.enabler = Some(enabler);
        self
    }

    /// Make the command checkable, reporting its state through `checked`.
    #[must_use]
    pub fn checkable(mut self, checked: Predicate<V>) -> Self {
        self.checked = Some(checked);
        self
    }

    #[must_use]
    pub fn for_node_type(mut self, node_type: NodeType) -> Self {
        self.bound = Some(node_type);
        self
    }

    #[must_use]
    pub fn is_enabled(&self, engine: &Kataja<V>) -> bool {
        self.enabler.is_none_or(|p| p(engine))
    }

    #[must_use]
    pub fn is_checkable(&self) -> bool {
        self.checked.is_some()
    }

    /// Checked state; `None` for commands that are not checkable.
    #[must_use]
    pub fn is_checked(&self, engine: &Kataja<V>) -> Option<bool> {
        self.checked.map(|p| p(engine))
    }

    pub(crate) fn body(&self) -> CommandFn<V> {
        self.run
    }
}

#[derive(Debug, Clone, Copy)]
struct WidgetBinding {
    widget: WidgetId,
    command: usize,
    visible: bool,
}

/// Commands by name, plus the widgets bound to them.
pub struct CommandRegistry<V: Viewport> {
    commands: Vec<Command<V>>,
    by_name: FxHashMap<String, usize>,
    widgets: Vec<WidgetBinding>,
}

impl<V: Viewport> fmt::Debug for CommandRegistry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.len())
            .field("widgets", &self.widgets.len())
            .finish()
    }
}

impl<V: Viewport> Default for CommandRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Viewport> CommandRegistry<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            by_name: FxHashMap::default(),
            widgets: Vec::new(),
        }
    }

    pub fn register(&mut self, command: Command<V>) {
        if let Some(&idx) = self.by_name.get(&command.name) {
            debug!(command = %command.name, "command replaced");
            self.commands[idx] = command;
        } else {
            self.by_name.insert(command.name.clone(), self.commands.len());
            self.commands.push(command);
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Command<V>> {
        self.by_name.get(name).map(|&i| &self.commands[i])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Connect `widget` to `command`, replacing any earlier binding of the
    /// widget. New widgets start visible.
    pub fn bind_widget(&mut self, widget: WidgetId, command: &str) -> Result<()> {
        let idx = *self
            .by_name
            .get(command)
            .ok_or_else(|| CommandError::UnknownCommand(command.to_string()))?;
        self.widgets.retain(|w| w.widget != widget);
        self.widgets.push(WidgetBinding {
            widget,
            command: idx,
            visible: true,
        });
        Ok(())
    }

    pub fn unbind_widget(&mut self, widget: WidgetId) {
        self.widgets.retain(|w| w.widget != widget);
    }

    /// Returns false for a widget that is not bound.
    pub fn set_widget_visible(&mut self, widget: WidgetId, visible: bool) -> bool {
        match self.widgets.iter_mut().find(|w| w.widget == widget) {
            Some(w) => {
                w.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Name of the command `shortcut` triggers, given which commands are
    /// currently enabled.
    pub fn resolve(&self, shortcut: Shortcut, is_enabled: impl Fn(&Command<V>) -> bool) -> Option<&str> {
        let candidates: Vec<usize> = self
            .commands
            .iter()
            .enumerate()
            .filter(|(_, c)| c.shortcut == Some(shortcut) && is_enabled(c))
            .map(|(i, _)| i)
            .collect();
        let chosen = match candidates.as_slice() {
            [] => return None,
            [only] => *only,
            [first, ..] => {
                let clicked = self
                    .widgets
                    .iter()
                    .find(|w| w.visible && candidates.contains(&w.command))
                    .map(|w| w.command);
                debug!(%shortcut, candidates = candidates.len(), widget = clicked.is_some(), "ambiguous shortcut");
                clicked.unwrap_or(*first)
            }
        };
        Some(self.commands[chosen].name.as_str())
    }
}
