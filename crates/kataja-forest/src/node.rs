#![forbid(unsafe_code)]

//! Graph vertices.
//!
//! A [`Node`] is the visual, movable stand-in for a constituent, a feature
//! or a free-standing annotation. Its position comes in three layers:
//!
//! ```text
//!   computed_position   what the layout engine asked for
//! + adjustment          what the user dragged on top of it
//! = final_position      where the node is heading
//!   current_position    where it is drawn this tick
//! ```
//!
//! # Invariants
//!
//! 1. `final_position() == computed_position + adjustment`, always; there is
//!    no stored final position to drift out of sync.
//! 2. A kinematic move reaches its target in exactly `frames` steps and
//!    snaps onto it on the last one.
//! 3. `opacity` stays within `0.0..=1.0`.

use std::fmt;

use bitflags::bitflags;
use kataja_core::text::measure_label;
use kataja_core::{EasingCurve, Point3, Rect};
use kataja_syntax::{ConstituentId, FeatureId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::edge::{EdgeId, EdgeType};

/// Stable key of a node; never reused within a forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    Constituent,
    Feature,
    Gloss,
    Property,
    Attribute,
}

impl NodeType {
    pub const ALL: [NodeType; 5] = [
        Self::Constituent,
        Self::Feature,
        Self::Gloss,
        Self::Property,
        Self::Attribute,
    ];

    /// Lower-case name used in command names (`add_gloss_node`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Constituent => "constituent",
            Self::Feature => "feature",
            Self::Gloss => "gloss",
            Self::Property => "property",
            Self::Attribute => "attribute",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Edge type used when a node of this type hangs below another.
    #[must_use]
    pub const fn default_edge_type(self) -> EdgeType {
        match self {
            Self::Constituent => EdgeType::Constituent,
            Self::Feature => EdgeType::Feature,
            Self::Gloss => EdgeType::Gloss,
            Self::Property => EdgeType::Property,
            Self::Attribute => EdgeType::Attribute,
        }
    }

    /// Whether nodes of this type must be backed by a syntactic object.
    #[must_use]
    pub const fn is_syntactic(self) -> bool {
        matches!(self, Self::Constituent | Self::Feature)
    }
}

/// The syntactic object behind a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntacticRef {
    Constituent(ConstituentId),
    Feature(FeatureId),
}

impl SyntacticRef {
    #[must_use]
    pub const fn node_type(self) -> NodeType {
        match self {
            Self::Constituent(_) => NodeType::Constituent,
            Self::Feature(_) => NodeType::Feature,
        }
    }

    #[must_use]
    pub const fn constituent(self) -> Option<ConstituentId> {
        match self {
            Self::Constituent(c) => Some(c),
            Self::Feature(_) => None,
        }
    }

    #[must_use]
    pub const fn feature(self) -> Option<FeatureId> {
        match self {
            Self::Feature(f) => Some(f),
            Self::Constituent(_) => None,
        }
    }
}

bitflags! {
    /// Axes on which motion is bound to the final position. Unbound axes
    /// are driven by physics.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Axes: u8 {
        const X = 0b001;
        const Y = 0b010;
        const Z = 0b100;
    }
}

bitflags! {
    /// Per-node display toggles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct NodeDisplay: u8 {
        const LABEL    = 0b0_0001;
        const INDEX    = 0b0_0010;
        const EDGES    = 0b0_0100;
        const BRACKETS = 0b0_1000;
        const FEATURES = 0b1_0000;
    }
}

impl Default for NodeDisplay {
    fn default() -> Self {
        Self::LABEL | Self::INDEX | Self::EDGES
    }
}

/// Opacity animation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Fade {
    #[default]
    Idle,
    In { step: u32 },
    Out { step: u32 },
}

/// An in-flight kinematic move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Motion {
    origin: Point3,
    target: Point3,
    step: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub syntactic: Option<SyntacticRef>,
    pub label: String,
    pub computed_position: Point3,
    pub adjustment: Point3,
    pub current_position: Point3,
    pub bind: Axes,
    /// User pin: the scheduler never moves a locked node.
    pub locked_to_position: bool,
    /// Set while the pointer drags the node.
    pub dragged: bool,
    pub folded_away: bool,
    pub folding_towards: Option<NodeId>,
    pub display: NodeDisplay,
    pub edges_up: SmallVec<[EdgeId; 2]>,
    pub edges_down: SmallVec<[EdgeId; 4]>,
    pub width: f64,
    pub height: f64,
    pub opacity: f64,
    pub fade: Fade,
    motion: Option<Motion>,
}

impl Node {
    #[must_use]
    pub fn new(
        id: NodeId,
        node_type: NodeType,
        syntactic: Option<SyntacticRef>,
        label: impl Into<String>,
    ) -> Self {
        let label = label.into();
        let (width, height) = measure_label(&label);
        Self {
            id,
            node_type,
            syntactic,
            label,
            computed_position: Point3::ZERO,
            adjustment: Point3::ZERO,
            current_position: Point3::ZERO,
            bind: Axes::all(),
            locked_to_position: false,
            dragged: false,
            folded_away: false,
            folding_towards: None,
            display: NodeDisplay::default(),
            edges_up: SmallVec::new(),
            edges_down: SmallVec::new(),
            width,
            height,
            opacity: 1.0,
            fade: Fade::Idle,
            motion: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn final_position(&self) -> Point3 {
        self.computed_position + self.adjustment
    }

    /// Change the label and re-measure.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        let (w, h) = measure_label(&self.label);
        self.width = w;
        self.height = h;
    }

    /// Text drawn for the node.
    #[must_use]
    pub fn label_text(&self) -> String {
        match self.node_type {
            NodeType::Gloss => format!("'{}'", self.label),
            NodeType::Property | NodeType::Attribute => format!("{}:", self.label),
            NodeType::Constituent | NodeType::Feature => self.label.clone(),
        }
    }

    /// Bounding box around the current position.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::centered(self.current_position, self.width, self.height)
    }

    /// Bounding box around the final position.
    #[must_use]
    pub fn final_rect(&self) -> Rect {
        Rect::centered(self.final_position(), self.width, self.height)
    }

    /// Kinematic motion applies when x and y are both bound.
    #[must_use]
    pub fn is_kinematic(&self) -> bool {
        self.bind.contains(Axes::X | Axes::Y)
    }

    /// Whether the scheduler may move this node.
    #[must_use]
    pub fn is_movable(&self) -> bool {
        !self.locked_to_position && !self.dragged
    }

    #[must_use]
    pub fn at_final_position(&self) -> bool {
        self.current_position == self.final_position()
    }

    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    /// Drop any in-flight move, leaving the node where it is.
    pub fn cancel_motion(&mut self) {
        self.motion = None;
    }

    /// Place the node on its final position without animating.
    pub fn jump_to_final(&mut self) {
        self.motion = None;
        self.current_position = self.final_position();
    }

    /// Advance one eased step towards the final position.
    ///
    /// A new move starts whenever the final position differs from the
    /// target of the current one. Returns whether the node moved.
    pub fn kinematic_step(&mut self, curve: &EasingCurve) -> bool {
        let target = self.final_position();
        let motion = match self.motion {
            Some(m) if m.target == target => m,
            _ if self.current_position == target => {
                self.motion = None;
                return false;
            }
            _ => Motion {
                origin: self.current_position,
                target,
                step: 0,
            },
        };
        let step = motion.step + 1;
        if step >= curve.frames() {
            self.current_position = target;
            self.motion = None;
        } else {
            self.current_position = motion.origin.lerp(target, curve.progress(step));
            self.motion = Some(Motion { step, ..motion });
        }
        true
    }

    /// Move by a physics displacement; the computed position follows so
    /// the final position stays where the node is drawn.
    pub fn physics_step(&mut self, delta: Point3) {
        let mut delta = delta;
        if self.bind.contains(Axes::X) {
            delta.x = 0.0;
        }
        if self.bind.contains(Axes::Y) {
            delta.y = 0.0;
        }
        if self.bind.contains(Axes::Z) {
            delta.z = 0.0;
        }
        self.current_position += delta;
        self.computed_position = self.current_position - self.adjustment;
        self.motion = None;
    }

    pub fn fade_in(&mut self) {
        self.fade = Fade::In { step: 0 };
    }

    pub fn fade_out(&mut self) {
        self.fade = Fade::Out { step: 0 };
    }

    #[must_use]
    pub fn is_fading(&self) -> bool {
        self.fade != Fade::Idle
    }

    /// Advance the fade by one of `steps` steps. Returns whether a fade is
    /// still running afterwards.
    pub fn advance_fade(&mut self, steps: u32) -> bool {
        let steps = steps.max(1);
        let (step, rising) = match self.fade {
            Fade::Idle => return false,
            Fade::In { step } => (step + 1, true),
            Fade::Out { step } => (step + 1, false),
        };
        let t = f64::from(step.min(steps)) / f64::from(steps);
        let opacity = if rising { t } else { 1.0 - t };
        self.opacity = opacity.clamp(0.0, 1.0);
        if step >= steps {
            self.fade = Fade::Idle;
            false
        } else {
            self.fade = if rising { Fade::In { step } } else { Fade::Out { step } };
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node::new(NodeId(0), NodeType::Constituent, None, "TP")
    }

    #[test]
    fn final_position_is_computed_plus_adjustment() {
        let mut n = node();
        n.computed_position = Point3::xy(10.0, 20.0);
        n.adjustment = Point3::xy(-3.0, 1.0);
        assert_eq!(n.final_position(), Point3::xy(7.0, 21.0));
    }

    #[test]
    fn kinematic_move_takes_exactly_the_curve_frames() {
        let curve = EasingCurve::movement(12);
        let mut n = node();
        n.computed_position = Point3::xy(120.0, -40.0);
        for tick in 1..=12 {
            assert!(n.kinematic_step(&curve), "tick {tick} should move");
            if tick < 12 {
                assert!(!n.at_final_position(), "arrived early at tick {tick}");
            }
        }
        assert!(n.at_final_position());
        assert!(!n.kinematic_step(&curve), "idle once arrived");
    }

    #[test]
    fn retargeting_restarts_the_move() {
        let curve = EasingCurve::movement(4);
        let mut n = node();
        n.computed_position = Point3::xy(40.0, 0.0);
        n.kinematic_step(&curve);
        n.computed_position = Point3::xy(-40.0, 0.0);
        for _ in 0..4 {
            n.kinematic_step(&curve);
        }
        assert_eq!(n.current_position, Point3::xy(-40.0, 0.0));
    }

    #[test]
    fn physics_respects_bound_axes() {
        let mut n = node();
        n.bind = Axes::Y;
        n.physics_step(Point3::xy(5.0, 5.0));
        assert_eq!(n.current_position, Point3::xy(5.0, 0.0));
        assert_eq!(n.final_position(), n.current_position);
    }

    #[test]
    fn fade_runs_for_the_given_steps() {
        let mut n = node();
        n.fade_in();
        let mut active = 0;
        while n.advance_fade(10) {
            active += 1;
        }
        assert_eq!(active, 9);
        assert_eq!(n.opacity, 1.0);
        n.fade_out();
        while n.advance_fade(10) {}
        assert_eq!(n.opacity, 0.0);
    }

    #[test]
    fn type_dispatch() {
        assert_eq!(NodeType::from_name("gloss"), Some(NodeType::Gloss));
        assert_eq!(NodeType::Feature.default_edge_type(), EdgeType::Feature);
        assert!(!NodeType::Gloss.is_syntactic());
        let g = Node::new(NodeId(1), NodeType::Gloss, None, "the dog");
        assert_eq!(g.label_text(), "'the dog'");
    }
}
