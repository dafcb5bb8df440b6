#![forbid(unsafe_code)]

//! Typed, directed links between nodes.
//!
//! Either endpoint may be missing, which makes the edge a stub (an arrow
//! pointing into empty space, say). Geometry (endpoints and control
//! points) is recomputed from the endpoint nodes every tick by
//! [`Edge::update_geometry`]; only the shape name and the pull are state.

use std::fmt;
use std::str::FromStr;

use kataja_core::Point3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeType {
    Constituent,
    Feature,
    Gloss,
    Arrow,
    Property,
    Attribute,
    Abstract,
}

impl EdgeType {
    /// Whether creating or removing an edge of this type edits syntax.
    #[must_use]
    pub const fn is_syntactic(self) -> bool {
        matches!(self, Self::Constituent | Self::Feature)
    }
}

/// Which child slot a constituent edge fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EdgeShape {
    #[default]
    Straight,
    /// Control points at a fraction of the edge length.
    RelativeCurve,
    /// Control points at a fixed offset from the endpoints.
    FixedCurve,
}

impl EdgeShape {
    pub const ALL: [EdgeShape; 3] = [Self::Straight, Self::RelativeCurve, Self::FixedCurve];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Straight => "straight",
            Self::RelativeCurve => "relative_curve",
            Self::FixedCurve => "fixed_curve",
        }
    }

    /// Next shape in the cycle used by the shape toggle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Straight => Self::RelativeCurve,
            Self::RelativeCurve => Self::FixedCurve,
            Self::FixedCurve => Self::Straight,
        }
    }
}

impl FromStr for EdgeShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|shape| shape.name() == s)
            .ok_or_else(|| format!("unknown edge shape: {s}"))
    }
}

const RELATIVE_BEND: f64 = 0.2;
const FIXED_BEND: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub start: Option<NodeId>,
    pub end: Option<NodeId>,
    pub edge_type: EdgeType,
    pub alignment: Alignment,
    pub shape: EdgeShape,
    /// Spring strength used by the force model.
    pub pull: f64,
    pub visible: bool,
    pub label_text: Option<String>,
    pub start_point: Point3,
    pub end_point: Point3,
    pub control_points: SmallVec<[Point3; 2]>,
}

impl Edge {
    #[must_use]
    pub fn new(
        id: EdgeId,
        start: Option<NodeId>,
        end: Option<NodeId>,
        edge_type: EdgeType,
        alignment: Alignment,
    ) -> Self {
        Self {
            id,
            start,
            end,
            edge_type,
            alignment,
            shape: EdgeShape::default(),
            pull: 1.0,
            visible: true,
            label_text: None,
            start_point: Point3::ZERO,
            end_point: Point3::ZERO,
            control_points: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn is_stub(&self) -> bool {
        self.start.is_none() || self.end.is_none()
    }

    /// The endpoint that is not `node`, if `node` is an endpoint.
    #[must_use]
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.start == Some(node) {
            self.end
        } else if self.end == Some(node) {
            self.start
        } else {
            None
        }
    }

    /// Recompute endpoints and control points for the current shape.
    ///
    /// Curves bow away from the parent towards the side given by the
    /// alignment; unaligned edges bow to the right.
    pub fn update_geometry(&mut self, start: Point3, end: Point3) {
        self.start_point = start;
        self.end_point = end;
        self.control_points.clear();
        let side = match self.alignment {
            Alignment::Left => -1.0,
            Alignment::Right | Alignment::None => 1.0,
        };
        let d = end - start;
        match self.shape {
            EdgeShape::Straight => {}
            EdgeShape::RelativeCurve => {
                let len = d.length();
                let bend = len * RELATIVE_BEND * side;
                self.control_points.push(start + d * 0.25 + Point3::xy(bend, 0.0));
                self.control_points.push(start + d * 0.75 + Point3::xy(bend * 0.5, 0.0));
            }
            EdgeShape::FixedCurve => {
                let bend = FIXED_BEND * side;
                self.control_points.push(start + Point3::xy(bend, FIXED_BEND));
                self.control_points.push(end + Point3::xy(0.0, -FIXED_BEND));
            }
        }
    }
}
