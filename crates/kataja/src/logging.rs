#![forbid(unsafe_code)]

//! JSON log output for hosts that have no subscriber of their own.

use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Install a global JSON subscriber filtered by `filter`
/// (`EnvFilter` syntax, e.g. `kataja_runtime=debug,info`).
///
/// Fails when the filter does not parse or a subscriber is already set.
pub fn init(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter).map_err(|e| Error::Logging(e.to_string()))?;
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "kataja logging ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_filter_is_reported() {
        let err = init("kataja=loud").unwrap_err();
        assert!(matches!(err, Error::Logging(_)));
    }
}
