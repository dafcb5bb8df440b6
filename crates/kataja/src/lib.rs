#![forbid(unsafe_code)]

//! Kataja public facade crate.
//!
//! Re-exports the workspace crates under short names, a prelude for
//! everyday use, and one error type covering all of them.
//!
//! ```
//! use kataja::prelude::*;
//!
//! let forest = kataja::derive_forest(
//!     &Lexicon::pop_default(),
//!     r#"["the", "dog"]"#,
//!     &Preferences::default(),
//! )
//! .unwrap();
//! assert!(forest.state().node_count() >= 3);
//! ```

use thiserror::Error;

pub use kataja_core as core;
pub use kataja_forest as forest;
pub use kataja_layout as layout;
#[cfg(feature = "runtime")]
pub use kataja_runtime as runtime;
pub use kataja_syntax as syntax;

#[cfg(feature = "tracing-json")]
pub mod logging;

use kataja_core::Preferences;
use kataja_forest::{Forest, ForestSettings};
use kataja_syntax::{Driver, Lexicon, Numeration};

/// Any error a Kataja API can return.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] kataja_core::ConfigError),
    #[error(transparent)]
    Syntax(#[from] kataja_syntax::SyntaxError),
    #[error(transparent)]
    Forest(#[from] kataja_forest::ForestError),
    #[error(transparent)]
    Layout(#[from] kataja_layout::LayoutError),
    #[cfg(feature = "runtime")]
    #[error(transparent)]
    Command(#[from] kataja_runtime::CommandError),
    /// The log subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Derive a numeration given as JSON and lay the result out as a forest
/// with the preferred visualization bound.
pub fn derive_forest(lexicon: &Lexicon, numeration_json: &str, prefs: &Preferences) -> Result<Forest> {
    let numeration = Numeration::from_json_str(numeration_json)?;
    let derivation = Driver::new(lexicon).derive(&numeration)?;
    let mut forest = Forest::from_derivation(&derivation, &prefs.undo, ForestSettings::default())?;
    kataja_layout::change_visualization(&mut forest, &prefs.default_visualization, &prefs.layout)?;
    tracing::debug!(
        nodes = forest.state().node_count(),
        outcome = ?derivation.outcome,
        "forest derived"
    );
    Ok(forest)
}

pub mod prelude {
    pub use crate::{Error, Result, derive_forest};

    pub use kataja_core::{
        Color, ColorKey, ColorProvider, HeadlessViewport, KeyCode, KeyEvent, LayoutConfig, Modifiers, MouseButton,
        MouseButtons, Point3, Preferences, Rect, Shortcut, StaticPalette, UndoConfig, Viewport, ViewportEvent,
    };
    pub use kataja_forest::{
        Alignment, EdgeType, Forest, ForestSettings, LayoutEngine, Node, NodeId, NodeType, Signal,
    };
    pub use kataja_layout::VISUALIZATIONS;
    #[cfg(feature = "runtime")]
    pub use kataja_runtime::{CommandArgs, Context, HostRequest, Kataja};
    pub use kataja_syntax::{Derivation, Driver, Lexicon, Numeration, Outcome};

    pub use crate::{core, forest, layout, syntax};
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}
