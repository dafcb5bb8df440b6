#![forbid(unsafe_code)]

//! The graph side of Kataja: nodes and edges standing for a derivation's
//! constituents, owned by a [`Forest`] that enforces the structural
//! invariants, keeps undo snapshots, tracks selection and fires change
//! signals.
//!
//! ```
//! use kataja_core::UndoConfig;
//! use kataja_forest::{Alignment, EdgeType, Forest, ForestSettings, NodeType};
//!
//! let mut forest = Forest::new(&UndoConfig::default(), ForestSettings::default());
//! let a = forest.create_node(NodeType::Constituent, "A");
//! let b = forest.create_node(NodeType::Constituent, "B");
//! forest.connect(a, b, EdgeType::Constituent, Alignment::Left).unwrap();
//! assert_eq!(forest.roots(), [a]);
//! ```

pub mod edge;
pub mod error;
pub mod forest;
pub mod node;
pub mod persist;
pub mod selection;
pub mod settings;
pub mod signals;
pub mod state;
pub mod undo;
pub mod visualization;

pub use edge::{Alignment, Edge, EdgeId, EdgeShape, EdgeType};
pub use error::{ForestError, Result};
pub use forest::Forest;
pub use node::{Axes, Fade, Node, NodeDisplay, NodeId, NodeType, SyntacticRef};
pub use persist::{ConstituentRecord, FeatureRecord, Savable, save_graph, verify_unique_keys};
pub use selection::{Selectable, SelectionModel};
pub use settings::{BracketStyle, ForestSettings};
pub use signals::{Signal, SignalEvent, SignalHub, Subscription};
pub use state::ForestState;
pub use undo::{UndoEntry, UndoManager};
pub use visualization::LayoutEngine;
