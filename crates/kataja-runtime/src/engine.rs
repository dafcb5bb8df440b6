#![forbid(unsafe_code)]

//! The engine: forests, scheduler, commands and input dispatch in one place.
//!
//! ```text
//!  ViewportEvent ──▶ handle_event ──┬─ press/drag/release ─▶ Forest
//!                                   └─ key ─▶ shortcut ─▶ execute ─┐
//!                                                                  ▼
//!  host timer ─────▶ tick ─▶ AnimationScheduler ─▶ current Forest ─▶ Viewport
//!                                                                  │
//!  take_requests ◀── HostRequest (fullscreen, print, fit) ◀────────┘
//! ```
//!
//! # Invariants
//!
//! 1. There is always at least one forest, and `current` indexes one.
//! 2. Switching forests or visualizations cancels the running animation
//!    before the new layout is requested.
//! 3. A failed command leaves no undo entry.

use kataja_core::{
    ColorKey, CursorKind, Modifiers, MouseButton, MouseButtons, Point3, Rect, Shortcut, Viewport,
    ViewportEvent,
};
use kataja_forest::{Forest, ForestSettings, NodeId, NodeType, Signal, SignalEvent, SignalHub, Subscription};
use kataja_syntax::Derivation;
use rustc_hash::FxHashMap;
use tracing::{debug, info, trace, warn};
use web_time::Instant;

use crate::builtin;
use crate::command::{CommandArgs, CommandRegistry, Invocation};
use crate::context::Context;
use crate::error::{CommandError, Result};
use crate::scheduler::{AnimationScheduler, TickSummary};

/// Something only the host surface can do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostRequest {
    /// Toggle fullscreen.
    Fullscreen,
    PrintPdf,
    /// Zoom so the scene rectangle fills the window.
    FitToWindow(Rect),
}

/// How nodes of one type are drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStyle {
    pub color: ColorKey,
    pub font: String,
}

fn default_style(node_type: NodeType) -> NodeStyle {
    let (color, font) = match node_type {
        NodeType::Constituent => (ColorKey::Content(1), "main"),
        NodeType::Feature => (ColorKey::Accent(2), "feature"),
        NodeType::Gloss => (ColorKey::Content(2), "gloss"),
        NodeType::Property => (ColorKey::Accent(4), "small"),
        NodeType::Attribute => (ColorKey::Accent(5), "small"),
    };
    NodeStyle {
        color,
        font: font.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    node: NodeId,
    origin: Point3,
    start_adjustment: Point3,
    moved: bool,
}

#[derive(Debug)]
pub struct Kataja<V: Viewport> {
    context: Context<V>,
    forests: Vec<Forest>,
    current: usize,
    scheduler: AnimationScheduler,
    commands: CommandRegistry<V>,
    signals: SignalHub,
    outbox: Vec<HostRequest>,
    styles: FxHashMap<NodeType, NodeStyle>,
    fullscreen: bool,
    drag: Option<Drag>,
}

impl<V: Viewport> Kataja<V> {
    /// An engine with one empty forest and the built-in commands.
    #[must_use]
    pub fn new(context: Context<V>) -> Self {
        let scheduler = AnimationScheduler::new(&context.prefs);
        let mut commands = CommandRegistry::new();
        for command in builtin::commands() {
            commands.register(command);
        }
        let mut engine = Self {
            context,
            forests: Vec::new(),
            current: 0,
            scheduler,
            commands,
            signals: SignalHub::new(),
            outbox: Vec::new(),
            styles: NodeType::ALL.into_iter().map(|t| (t, default_style(t))).collect(),
            fullscreen: false,
            drag: None,
        };
        let first = engine.empty_forest();
        engine.add_forest(first);
        engine
    }

    // --- surroundings ----------------------------------------------------

    #[must_use]
    pub fn context(&self) -> &Context<V> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context<V> {
        &mut self.context
    }

    #[must_use]
    pub fn viewport(&self) -> &V {
        &self.context.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.context.viewport
    }

    #[must_use]
    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn commands(&self) -> &CommandRegistry<V> {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandRegistry<V> {
        &mut self.commands
    }

    #[must_use]
    pub fn signals(&self) -> &SignalHub {
        &self.signals
    }

    pub fn subscribe(&mut self, signal: Signal, callback: impl Fn(&SignalEvent) + 'static) -> Subscription {
        self.signals.subscribe(signal, callback)
    }

    pub(crate) fn emit(&mut self, signal: Signal, detail: impl Into<String>) {
        self.signals.emit_detail(signal, detail);
    }

    /// Drain requests for the host surface.
    pub fn take_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn request(&mut self, request: HostRequest) {
        debug!(?request, "host request queued");
        self.outbox.push(request);
    }

    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub(crate) fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.request(HostRequest::Fullscreen);
        self.fullscreen
    }

    #[must_use]
    pub fn style(&self, node_type: NodeType) -> NodeStyle {
        self.styles.get(&node_type).cloned().unwrap_or_else(|| default_style(node_type))
    }

    pub(crate) fn style_mut(&mut self, node_type: NodeType) -> &mut NodeStyle {
        self.styles.entry(node_type).or_insert_with(|| default_style(node_type))
    }

    // --- forests ---------------------------------------------------------

    fn empty_forest(&self) -> Forest {
        Forest::new(&self.context.prefs.undo, ForestSettings::default())
    }

    #[must_use]
    pub fn forest(&self) -> &Forest {
        &self.forests[self.current]
    }

    pub fn forest_mut(&mut self) -> &mut Forest {
        &mut self.forests[self.current]
    }

    #[must_use]
    pub fn forests(&self) -> &[Forest] {
        &self.forests
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Append `forest` with the default visualization bound. The current
    /// forest does not change.
    pub fn add_forest(&mut self, mut forest: Forest) -> usize {
        let name = self.context.prefs.default_visualization.clone();
        if let Err(e) = kataja_layout::change_visualization(&mut forest, &name, &self.context.prefs.layout) {
            warn!(visualization = %name, error = %e, "default visualization unavailable");
        }
        self.forests.push(forest);
        self.forests.len() - 1
    }

    /// Materialise a derivation as a new forest.
    pub fn add_derivation(&mut self, derivation: &Derivation) -> Result<usize> {
        let forest = Forest::from_derivation(derivation, &self.context.prefs.undo, ForestSettings::default())?;
        Ok(self.add_forest(forest))
    }

    /// Make forest `index` current. Returns false for an index out of range.
    pub fn show_forest(&mut self, index: usize) -> bool {
        if index >= self.forests.len() {
            warn!(index, forests = self.forests.len(), "no such forest");
            return false;
        }
        let previous = self.current;
        self.scheduler.cancel(&mut self.forests[previous]);
        self.drag = None;
        self.current = index;
        self.forest_mut().request_draw();
        self.scheduler.start();
        info!(from = previous, to = index, "forest shown");
        self.signals.emit(Signal::ForestChanged);
        true
    }

    pub fn next_forest(&mut self) -> usize {
        let next = (self.current + 1) % self.forests.len();
        self.show_forest(next);
        self.current
    }

    pub fn previous_forest(&mut self) -> usize {
        let n = self.forests.len();
        self.show_forest((self.current + n - 1) % n);
        self.current
    }

    /// Add an empty forest and show it.
    pub fn new_forest(&mut self) -> usize {
        let forest = self.empty_forest();
        let index = self.add_forest(forest);
        self.show_forest(index);
        index
    }

    /// Bind the visualization called `name` to the current forest.
    pub fn change_visualization(&mut self, name: &str) -> Result<()> {
        let idx = self.current;
        self.scheduler.cancel(&mut self.forests[idx]);
        kataja_layout::change_visualization(&mut self.forests[idx], name, &self.context.prefs.layout)?;
        self.scheduler.start();
        self.signals.emit_detail(Signal::Visualization, name);
        Ok(())
    }

    // --- animation -------------------------------------------------------

    /// Make sure the scheduler runs after a mutation.
    pub fn wake(&mut self) {
        self.scheduler.start();
    }

    /// Run one scheduler tick on the current forest, if the scheduler runs.
    pub fn tick(&mut self) -> Option<TickSummary> {
        if !self.scheduler.is_running() {
            return None;
        }
        let forest = &mut self.forests[self.current];
        Some(self.scheduler.on_tick(forest, &mut self.context.viewport))
    }

    /// Tick when a frame period has passed since the previous tick.
    pub fn poll(&mut self, now: Instant) -> Option<TickSummary> {
        let forest = &mut self.forests[self.current];
        self.scheduler.poll(now, forest, &mut self.context.viewport)
    }

    /// Tick until the scheduler stops or `max_ticks` ran. Returns the
    /// number of ticks run.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick().is_some() {
            ticks += 1;
        }
        ticks
    }

    pub fn fade_background(&mut self, from: ColorKey, to: ColorKey) {
        let (a, b) = (self.context.colors.get(from), self.context.colors.get(to));
        self.scheduler.fade_background(a, b, self.context.colors.as_ref());
    }

    // --- commands --------------------------------------------------------

    /// Command that `shortcut` would run right now.
    #[must_use]
    pub fn resolve_shortcut(&self, shortcut: Shortcut) -> Option<String> {
        self.commands
            .resolve(shortcut, |c| c.is_enabled(self))
            .map(str::to_string)
    }

    /// Run the command called `name`. Undoable commands record an undo
    /// entry labelled with the returned message.
    pub fn execute(&mut self, name: &str, args: &CommandArgs) -> Result<String> {
        let _span = tracing::debug_span!("command.execute", command = name).entered();
        let outcome = self.run_command(name, args);
        match &outcome {
            Ok(message) => info!(command = name, message = %message, "command finished"),
            Err(e) => warn!(command = name, error = %e, "command failed"),
        }
        outcome
    }

    fn run_command(&mut self, name: &str, args: &CommandArgs) -> Result<String> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        if !command.is_enabled(self) {
            return Err(CommandError::Disabled(name.to_string()));
        }
        let (body, undoable, bound) = (command.body(), command.undoable, command.bound);
        let invocation = Invocation {
            command: name,
            bound,
            args,
        };
        let message = body(self, &invocation)?;
        if undoable {
            self.forest_mut().record(&message);
        }
        self.scheduler.start();
        Ok(message)
    }

    // --- input -----------------------------------------------------------

    /// Dispatch one viewport event. Returns whether the engine used it.
    pub fn handle_event(&mut self, event: &ViewportEvent) -> bool {
        trace!(kind = event.kind(), "viewport event");
        match event {
            ViewportEvent::PointerPress {
                position,
                button: MouseButton::Left,
                modifiers,
            } => self.press(*position, *modifiers),
            ViewportEvent::PointerMove { position, buttons, .. } if buttons.contains(MouseButtons::LEFT) => {
                self.drag_to(*position)
            }
            ViewportEvent::PointerRelease {
                button: MouseButton::Left,
                ..
            } => self.release(),
            ViewportEvent::KeyPress(key) => self.key(key.shortcut()),
            ViewportEvent::Wheel { .. } | ViewportEvent::Resize { .. } => {
                self.context.viewport.request_redraw(None);
                true
            }
            _ => false,
        }
    }

    fn press(&mut self, position: Point3, modifiers: Modifiers) -> bool {
        let scene = self.context.viewport.map_to_scene(position);
        let Some(id) = self.forest().state().node_at(scene) else {
            self.forest_mut().clear_selection();
            self.drag = None;
            return true;
        };
        let picked = if modifiers.contains(Modifiers::SHIFT) {
            self.forest_mut().add_to_selection(id)
        } else {
            self.forest_mut().select(id)
        };
        if let Err(e) = picked {
            warn!(node = %id, error = %e, "selection failed");
            return false;
        }
        let Some(node) = self.forest_mut().state_mut().node_mut(id) else {
            return false;
        };
        node.dragged = true;
        let start_adjustment = node.adjustment;
        self.drag = Some(Drag {
            node: id,
            origin: scene,
            start_adjustment,
            moved: false,
        });
        self.context.viewport.set_cursor(CursorKind::ClosedHand);
        true
    }

    fn drag_to(&mut self, position: Point3) -> bool {
        let Some(mut drag) = self.drag else {
            return false;
        };
        let scene = self.context.viewport.map_to_scene(position);
        let delta = scene - drag.origin;
        let adjustment = drag.start_adjustment + Point3::xy(delta.x, delta.y);
        if let Err(e) = self.forest_mut().set_adjustment(drag.node, adjustment) {
            warn!(node = %drag.node, error = %e, "drag target vanished");
            self.drag = None;
            return false;
        }
        if let Some(node) = self.forest_mut().state_mut().node_mut(drag.node) {
            node.jump_to_final();
        }
        drag.moved |= delta.x != 0.0 || delta.y != 0.0;
        self.drag = Some(drag);
        self.context.viewport.request_redraw(None);
        true
    }

    fn release(&mut self) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        if let Some(node) = self.forest_mut().state_mut().node_mut(drag.node) {
            node.dragged = false;
        }
        self.context.viewport.set_cursor(CursorKind::Arrow);
        if drag.moved {
            self.forest_mut().record("move node");
            self.scheduler.start();
        }
        true
    }

    fn key(&mut self, shortcut: Shortcut) -> bool {
        let Some(name) = self.resolve_shortcut(shortcut) else {
            trace!(%shortcut, "unbound shortcut");
            return false;
        };
        // Failures are logged by execute.
        let _ = self.execute(&name, &CommandArgs::default());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kataja_core::HeadlessViewport;

    fn engine() -> Kataja<HeadlessViewport> {
        Kataja::new(Context::with_viewport(HeadlessViewport::default()))
    }

    #[test]
    fn starts_with_one_forest_bound_to_the_default_visualization() {
        let k = engine();
        assert_eq!(k.forests().len(), 1);
        assert_eq!(k.current_index(), 0);
        assert_eq!(k.forest().engine_name(), Some("balanced_tree"));
    }

    #[test]
    fn forest_navigation_wraps() {
        let mut k = engine();
        assert_eq!(k.new_forest(), 1);
        assert_eq!(k.current_index(), 1);
        assert_eq!(k.next_forest(), 0);
        assert_eq!(k.previous_forest(), 1);
        assert!(!k.show_forest(7));
        assert_eq!(k.current_index(), 1);
    }

    #[test]
    fn unknown_visualization_keeps_the_current_one() {
        let mut k = engine();
        let err = k.change_visualization("upside_down").unwrap_err();
        assert!(matches!(err, CommandError::Layout(_)));
        assert_eq!(k.forest().engine_name(), Some("balanced_tree"));
    }

    #[test]
    fn default_styles_cover_every_node_type() {
        let k = engine();
        for t in NodeType::ALL {
            assert!(!k.style(t).font.is_empty());
        }
    }
}
