#![forbid(unsafe_code)]

//! Tree layouts for Kataja forests.
//!
//! Every engine implements [`kataja_forest::LayoutEngine`] and is built by
//! name through [`create`]:
//!
//! | name | placement |
//! |------|-----------|
//! | `left_first_tree` | top-down grid, branches slide down-right when crowded |
//! | `balanced_tree` | bottom-up grid, parents centred over children |
//! | `left_first_hex_tree` | 120° fans in continuous space |
//! | `spiralling_tree` | polar fans that expand and retract on collision |
//! | `equidistant_3d_tree` | free spring net in three dimensions |
//!
//! Multidominated constituents are drawn once, under the parent chosen by
//! [`TracesToDraw`]; `reselect` rotates that choice.
//!
//! ```
//! use kataja_core::{LayoutConfig, UndoConfig};
//! use kataja_forest::{Alignment, EdgeType, Forest, ForestSettings, NodeType};
//!
//! let mut forest = Forest::new(&UndoConfig::default(), ForestSettings::default());
//! let top = forest.create_node(NodeType::Constituent, "the");
//! let dog = forest.create_node(NodeType::Constituent, "dog");
//! forest.connect(top, dog, EdgeType::Constituent, Alignment::Right).unwrap();
//!
//! kataja_layout::change_visualization(&mut forest, "balanced_tree", &LayoutConfig::default()).unwrap();
//! forest.draw();
//! assert!(forest.node(dog).unwrap().computed_position.y > 0.0);
//! ```

pub mod engines;
pub mod error;
pub mod grid;
pub mod physics;
pub mod registry;
pub mod traces;

pub use engines::{BalancedTree, Equidistant3dTree, LeftFirstHexTree, LeftFirstTree, SpirallingTree};
pub use error::{LayoutError, Result};
pub use grid::{Cell, Grid, Slant};
pub use physics::{directed_force, elastic_force, node_force};
pub use registry::{VISUALIZATIONS, change_visualization, create, next_visualization};
pub use traces::TracesToDraw;
