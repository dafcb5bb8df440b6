#![forbid(unsafe_code)]

//! Layout engines by name.

use kataja_core::LayoutConfig;
use kataja_forest::{Forest, LayoutEngine};
use tracing::{info, warn};

use crate::engines::{BalancedTree, Equidistant3dTree, LeftFirstHexTree, LeftFirstTree, SpirallingTree};
use crate::error::{LayoutError, Result};

/// Every registered engine name, in menu order.
pub const VISUALIZATIONS: [&str; 5] = [
    LeftFirstTree::NAME,
    BalancedTree::NAME,
    LeftFirstHexTree::NAME,
    SpirallingTree::NAME,
    Equidistant3dTree::NAME,
];

/// Build the engine registered as `name`.
pub fn create(name: &str, config: &LayoutConfig) -> Result<Box<dyn LayoutEngine>> {
    let engine: Box<dyn LayoutEngine> = match name {
        LeftFirstTree::NAME => Box::new(LeftFirstTree::new(config)),
        BalancedTree::NAME => Box::new(BalancedTree::new(config)),
        LeftFirstHexTree::NAME => Box::new(LeftFirstHexTree::new(config)),
        SpirallingTree::NAME => Box::new(SpirallingTree::new(config)),
        Equidistant3dTree::NAME => Box::new(Equidistant3dTree::new(config)),
        other => {
            warn!(visualization = other, "unknown visualization");
            return Err(LayoutError::UnknownVisualization(other.to_string()));
        }
    };
    Ok(engine)
}

/// The engine after `current` in menu order, wrapping around.
#[must_use]
pub fn next_visualization(current: &str) -> &'static str {
    let at = VISUALIZATIONS.iter().position(|v| *v == current);
    VISUALIZATIONS[at.map_or(0, |i| (i + 1) % VISUALIZATIONS.len())]
}

/// Bind the engine called `name` to `forest`.
///
/// Switching to a different engine resets adjustments and motion policy;
/// re-binding the current one keeps them.
pub fn change_visualization(forest: &mut Forest, name: &str, config: &LayoutConfig) -> Result<()> {
    let engine = create(name, config)?;
    let reset = forest.engine_name() != Some(name);
    info!(visualization = name, reset, "changing visualization");
    forest.set_engine(engine, reset);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kataja_core::UndoConfig;
    use kataja_forest::ForestSettings;

    #[test]
    fn every_name_builds_its_engine() {
        for name in VISUALIZATIONS {
            let engine = create(name, &LayoutConfig::default()).unwrap();
            assert_eq!(engine.name(), name);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut f = Forest::new(&UndoConfig::default(), ForestSettings::default());
        let err = change_visualization(&mut f, "sideways_tree", &LayoutConfig::default()).unwrap_err();
        assert_eq!(err, LayoutError::UnknownVisualization("sideways_tree".into()));
        assert_eq!(f.engine_name(), None);
    }

    #[test]
    fn next_wraps_around() {
        assert_eq!(next_visualization("equidistant_3d_tree"), "left_first_tree");
        assert_eq!(next_visualization("nonsense"), "left_first_tree");
        assert_eq!(next_visualization("left_first_tree"), "balanced_tree");
    }
}
