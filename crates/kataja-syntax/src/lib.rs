#![forbid(unsafe_code)]

//! Syntax: features, constituents, lexicon, numeration and the
//! stack-based derivation driver.
//!
//! ```
//! use kataja_syntax::{Driver, Lexicon, Numeration};
//!
//! let lexicon = Lexicon::from_json_str(
//!     r#"{"the": ["iD", "uPerson"], "dog": ["Root", "iPerson", "iNumber", "iGender"]}"#,
//! ).unwrap();
//! let derivation = Driver::new(&lexicon)
//!     .derive(&Numeration::flat(&["dog", "the"]))
//!     .unwrap();
//! assert_eq!(derivation.root_label(), "the");
//! ```

pub mod constituent;
pub mod driver;
pub mod error;
pub mod events;
pub mod feature;
pub mod lexicon;
pub mod numeration;
pub mod stack;
pub mod steps;

pub use constituent::{Constituent, ConstituentId, SyntaxArena, UNLABELED};
pub use driver::{Derivation, Driver, Outcome};
pub use error::{Result, SyntaxError};
pub use events::{Crash, DerivationEvent, LabelKind};
pub use feature::{Feature, FeatureId, FeatureKind, FeaturePattern};
pub use lexicon::{Counters, Lexicon, LexiconConfig};
pub use numeration::{Numeration, NumerationItem};
pub use stack::{Stack, StackMode};
pub use steps::{DerivationStep, DerivationStepLog};
