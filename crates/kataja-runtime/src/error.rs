#![forbid(unsafe_code)]

use thiserror::Error;

use kataja_forest::ForestError;
use kataja_layout::LayoutError;
use kataja_syntax::SyntaxError;

/// Why a command did not run. A failed command never records an undo entry.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("command {0} is disabled")]
    Disabled(String),
    #[error("command {command} needs a {argument}")]
    MissingArgument {
        command: String,
        argument: &'static str,
    },
    #[error(transparent)]
    Forest(#[from] ForestError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

pub type Result<T> = std::result::Result<T, CommandError>;
