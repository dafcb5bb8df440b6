#![forbid(unsafe_code)]

//! Fixed-period animation loop.
//!
//! The scheduler is off until something needs animating. Whoever owns it
//! calls [`AnimationScheduler::start`] after a mutation and then drives
//! [`AnimationScheduler::on_tick`] (or [`AnimationScheduler::poll`]) from
//! the host timer until the scheduler reports itself stopped.
//!
//! ```text
//!   on_tick
//!     │ forest dirty? ──────────▶ Forest::draw (once)
//!     │ background fade step ───▶ Viewport::set_background
//!     │ edge endpoints
//!     │ node opacity
//!     │ node positions: kinematic ease | physics + centering
//!     │ Viewport::request_redraw
//!     ▼ nothing moved or faded ─▶ stop
//! ```
//!
//! # Invariants
//!
//! 1. Within a tick every displacement is computed from the previous tick's
//!    positions before any of them is applied.
//! 2. Dragged and locked nodes are never moved by a tick.
//! 3. The scheduler stops on the first tick in which no node moved, no fade
//!    advanced and no background step was painted.

use kataja_core::{Brush, Color, ColorProvider, EasingCurve, Hsv, Point3, Preferences, Viewport};
use kataja_forest::{Axes, Fade, Forest, NodeId};
use tracing::{debug, warn};
use web_time::{Duration, Instant};

/// Physics displacements at most this long count as rest.
const REST_DISTANCE: f64 = 0.01;

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummary {
    /// The layout ran because the forest was dirty.
    pub drew_layout: bool,
    /// Nodes whose current position changed.
    pub moved: usize,
    /// Nodes whose fade is still running.
    pub fading: usize,
    /// Background fade steps remain.
    pub background: bool,
}

impl TickSummary {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.moved == 0 && self.fading == 0 && !self.background
    }
}

#[derive(Debug, Clone)]
pub struct AnimationScheduler {
    period: Duration,
    curve: EasingCurve,
    fade_steps: u32,
    background_steps: u32,
    physics_clamp: f64,
    /// Pending background brushes, next one last.
    background: Vec<Brush>,
    running: bool,
    last_tick: Option<Instant>,
    ticks: u64,
}

fn free_axes(delta: Point3, bind: Axes) -> Point3 {
    let mut d = delta;
    if bind.contains(Axes::X) {
        d.x = 0.0;
    }
    if bind.contains(Axes::Y) {
        d.y = 0.0;
    }
    if bind.contains(Axes::Z) {
        d.z = 0.0;
    }
    d
}

fn lerp_hsv(from: Hsv, to: Hsv, t: f64) -> Hsv {
    Hsv {
        h: from.h + (to.h - from.h) * t,
        s: from.s + (to.s - from.s) * t,
        v: from.v + (to.v - from.v) * t,
        a: from.a + (to.a - from.a) * t,
    }
}

impl AnimationScheduler {
    #[must_use]
    pub fn new(prefs: &Preferences) -> Self {
        Self {
            period: prefs.frame_period(),
            curve: EasingCurve::movement(prefs.move_frames),
            fade_steps: prefs.fade_steps.max(1),
            background_steps: prefs.background_fade_steps.max(1),
            physics_clamp: prefs.physics_clamp,
            background: Vec::new(),
            running: false,
            last_tick: None,
            ticks: 0,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn frame_period(&self) -> Duration {
        self.period
    }

    /// Ticks run since creation.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.last_tick = None;
            debug!(period_ms = self.period.as_millis() as u64, "scheduler started");
        }
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            debug!(ticks = self.ticks, "scheduler stopped");
        }
    }

    /// Stop and abandon everything in flight. Nodes stay where they are
    /// drawn; fades jump to their end state.
    pub fn cancel(&mut self, forest: &mut Forest) {
        self.stop();
        self.background.clear();
        for node in forest.state_mut().nodes_mut() {
            node.cancel_motion();
            match node.fade {
                Fade::Idle => {}
                Fade::In { .. } => node.opacity = 1.0,
                Fade::Out { .. } => node.opacity = 0.0,
            }
            node.fade = Fade::Idle;
        }
    }

    /// Fade the background from `from` to `to` over the configured steps.
    pub fn fade_background(&mut self, from: Color, to: Color, colors: &dyn ColorProvider) {
        let (a, b) = (from.to_hsv(), to.to_hsv());
        let n = self.background_steps;
        self.background = (1..=n)
            .rev()
            .map(|k| {
                let c = lerp_hsv(a, b, f64::from(k) / f64::from(n)).to_color();
                Brush::Gradient(colors.lighter(c), c)
            })
            .collect();
        self.start();
    }

    /// Whether a tick is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.running && self.last_tick.is_none_or(|t| now.duration_since(t) >= self.period)
    }

    /// Tick if running and a period has passed since the last tick.
    pub fn poll(&mut self, now: Instant, forest: &mut Forest, viewport: &mut dyn Viewport) -> Option<TickSummary> {
        if !self.is_due(now) {
            return None;
        }
        self.last_tick = Some(now);
        Some(self.on_tick(forest, viewport))
    }

    /// Run one tick.
    pub fn on_tick(&mut self, forest: &mut Forest, viewport: &mut dyn Viewport) -> TickSummary {
        let start = Instant::now();
        let _span = tracing::debug_span!(
            "scheduler.tick",
            tick = self.ticks,
            moved = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        )
        .entered();
        self.ticks += 1;

        let mut summary = TickSummary::default();
        if forest.needs_draw() {
            forest.draw();
            summary.drew_layout = true;
        }

        if let Some(brush) = self.background.pop() {
            viewport.set_background(brush);
            summary.background = !self.background.is_empty();
        }

        forest.state_mut().update_edges();

        let visible = forest.visible_nodes();
        for id in &visible {
            if let Some(node) = forest.state_mut().node_mut(*id)
                && node.advance_fade(self.fade_steps)
            {
                summary.fading += 1;
            }
        }

        summary.moved = self.move_nodes(forest, &visible);

        viewport.request_redraw(None);

        if summary.is_idle() {
            self.stop();
        }
        let span = tracing::Span::current();
        span.record("moved", summary.moved);
        span.record("duration_us", start.elapsed().as_micros() as u64);
        summary
    }

    fn move_nodes(&self, forest: &mut Forest, visible: &[NodeId]) -> usize {
        let mut kinematic = Vec::new();
        let mut physics: Vec<(NodeId, Axes, Point3)> = Vec::new();
        let mut can_normalize = true;
        for &id in visible {
            let Some(node) = forest.node(id) else {
                warn!(node = %id, "visible node missing during tick");
                continue;
            };
            if node.dragged {
                can_normalize = false;
                continue;
            }
            if node.locked_to_position {
                continue;
            }
            if node.is_kinematic() {
                kinematic.push(id);
                continue;
            }
            let delta = forest.calculate_movement(id);
            if !delta.is_finite() {
                warn!(node = %id, "non-finite physics displacement skipped");
                continue;
            }
            physics.push((id, node.bind, free_axes(delta.clamp_axes(self.physics_clamp), node.bind)));
        }

        let state = forest.state_mut();
        let mut moved = 0;
        for id in kinematic {
            if let Some(node) = state.node_mut(id)
                && node.kinematic_step(&self.curve)
            {
                moved += 1;
            }
        }
        if moved > 0 {
            can_normalize = false;
        }

        // Centre the physics motion so the whole net does not drift.
        if can_normalize && !physics.is_empty() {
            let sum = physics.iter().fold(Point3::ZERO, |acc, (_, _, d)| acc + *d);
            let mean = sum * (1.0 / physics.len() as f64);
            for (_, bind, d) in &mut physics {
                *d = free_axes(*d - mean, *bind);
            }
        }
        for (id, _, delta) in physics {
            if delta.length() <= REST_DISTANCE {
                continue;
            }
            if let Some(node) = state.node_mut(id) {
                node.physics_step(delta);
                moved += 1;
            }
        }
        moved
    }
}
