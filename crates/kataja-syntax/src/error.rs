#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors raised while reading lexicons and numerations.
///
/// A derivation that runs but ends unlabeled is not an error; it is reported
/// as [`crate::driver::Outcome::Crashed`].
#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("invalid feature template `{0}`")]
    FeatureTemplate(String),
    #[error("lexeme `{lexeme}` has an invalid template: {source}")]
    LexiconEntry {
        lexeme: String,
        #[source]
        source: Box<SyntaxError>,
    },
    #[error("numeration is empty")]
    EmptyNumeration,
    #[error("numeration contains an empty substream")]
    EmptySubstream,
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML input: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyntaxError>;
