#![forbid(unsafe_code)]

use thiserror::Error;

use kataja_syntax::{ConstituentId, FeatureId};

use crate::edge::{Alignment, EdgeId};
use crate::node::NodeId;

/// Structural errors. Every failing operation leaves the forest untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForestError {
    #[error("no such node: {0}")]
    NoSuchNode(NodeId),
    #[error("no such edge: {0}")]
    NoSuchEdge(EdgeId),
    #[error("no such constituent: {0}")]
    NoSuchConstituent(ConstituentId),
    #[error("no such feature: {0}")]
    NoSuchFeature(FeatureId),
    #[error("node {0} has no syntactic object and cannot carry this edge")]
    PlaceholderEndpoint(NodeId),
    #[error("node {0} already has two constituent children")]
    TooManyChildren(NodeId),
    #[error("node {node} already has a {alignment:?} child")]
    AlignmentTaken { node: NodeId, alignment: Alignment },
    #[error("node {0} cannot be connected to itself")]
    SelfLoop(NodeId),
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("no derivation step {0}")]
    NoSuchStep(usize),
    #[error("save key {0} appears more than once")]
    DuplicateSaveKey(String),
}

pub type Result<T> = std::result::Result<T, ForestError>;
