#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("unknown visualization: {0}")]
    UnknownVisualization(String),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
