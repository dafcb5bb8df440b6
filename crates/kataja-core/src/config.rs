#![forbid(unsafe_code)]

//! Engine preferences loaded as data.
//!
//! [`Preferences`] bundles every tunable the scheduler, the layout engines
//! and the undo history read. It loads from TOML or JSON; missing fields
//! take their defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! # kataja.toml
//! move_frames = 16
//!
//! [layout]
//! edge_width = 24.0
//! spiral_sides = 10
//! ```
//!
//! ```rust,ignore
//! let prefs = Preferences::from_toml_file("kataja.toml")?;
//! let problems = prefs.validate();
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration rejected: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Layout engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal size of a grid cell in scene units.
    pub edge_width: f64,
    /// Vertical size of a grid cell in scene units.
    pub edge_height: f64,
    /// Columns between whole trees.
    pub grid_padding: i32,
    /// Columns between sibling subtrees.
    pub subtree_padding: i32,
    /// Polygon sides used by the spiralling layout.
    pub spiral_sides: u32,
    /// Hard cap on spiralling placement iterations.
    pub spiral_max_iterations: u32,
    /// Expansion attempts before a spiralling layer retracts.
    pub spiral_max_attempts: u32,
    /// Hard cap on hexagonal placement iterations.
    pub hex_max_iterations: u32,
    /// Rest length of edges in the force model.
    pub spring_length: f64,
    /// Repulsion constant between nodes.
    pub repulsion: f64,
    /// Spring constant along edges.
    pub attraction: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            edge_width: 20.0,
            edge_height: 20.0,
            grid_padding: 3,
            subtree_padding: 1,
            spiral_sides: 12,
            spiral_max_iterations: 500,
            spiral_max_attempts: 4,
            hex_max_iterations: 100,
            spring_length: 30.0,
            repulsion: 0.2,
            attraction: 0.2,
        }
    }
}

/// Undo history limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    /// Maximum number of entries kept; the oldest are evicted first.
    pub max_depth: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

/// Top-level preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Scheduler tick period in milliseconds.
    pub frame_period_ms: u64,
    /// Ticks a kinematic move takes.
    pub move_frames: u32,
    /// Ticks a node fade takes.
    pub fade_steps: u32,
    /// Ticks a background color fade takes.
    pub background_fade_steps: u32,
    /// Per-tick bound on physics displacement along each axis.
    pub physics_clamp: f64,
    /// Name of the visualization new forests start with.
    pub default_visualization: String,
    pub layout: LayoutConfig,
    pub undo: UndoConfig,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            frame_period_ms: 33,
            move_frames: 12,
            fade_steps: 10,
            background_fade_steps: 7,
            physics_clamp: 6.0,
            default_visualization: "balanced_tree".into(),
            layout: LayoutConfig::default(),
            undo: UndoConfig::default(),
        }
    }
}

impl Preferences {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the
    /// preferences are usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.frame_period_ms == 0 {
            errors.push("frame_period_ms must be > 0".into());
        }
        if self.move_frames == 0 {
            errors.push("move_frames must be > 0".into());
        }
        if self.fade_steps == 0 {
            errors.push("fade_steps must be > 0".into());
        }
        if !(self.physics_clamp > 0.0) {
            errors.push(format!(
                "physics_clamp must be > 0, got {}",
                self.physics_clamp
            ));
        }

        let layout = &self.layout;
        if !(layout.edge_width > 0.0) {
            errors.push(format!(
                "layout.edge_width must be > 0, got {}",
                layout.edge_width
            ));
        }
        if !(layout.edge_height > 0.0) {
            errors.push(format!(
                "layout.edge_height must be > 0, got {}",
                layout.edge_height
            ));
        }
        if layout.grid_padding < 0 || layout.subtree_padding < 0 {
            errors.push("layout paddings must be >= 0".into());
        }
        if layout.spiral_sides < 4 {
            errors.push(format!(
                "layout.spiral_sides must be >= 4, got {}",
                layout.spiral_sides
            ));
        }
        if layout.spiral_max_iterations == 0 || layout.hex_max_iterations == 0 {
            errors.push("layout iteration caps must be > 0".into());
        }
        if self.undo.max_depth == 0 {
            errors.push("undo.max_depth must be > 0".into());
        }

        errors
    }

    /// Load, then reject the result if [`Self::validate`] finds problems.
    pub fn from_toml_str_validated(s: &str) -> Result<Self, ConfigError> {
        let prefs = Self::from_toml_str(s)?;
        let errors = prefs.validate();
        if errors.is_empty() {
            Ok(prefs)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Tick period as a duration.
    #[must_use]
    pub fn frame_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.frame_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Preferences::default().validate().is_empty());
    }

    #[test]
    fn empty_toml_is_default() {
        let prefs = Preferences::from_toml_str("").unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let prefs = Preferences::from_toml_str(
            "move_frames = 16\n[layout]\nedge_width = 24.0\nspiral_sides = 10\n",
        )
        .unwrap();
        assert_eq!(prefs.move_frames, 16);
        assert_eq!(prefs.layout.edge_width, 24.0);
        assert_eq!(prefs.layout.spiral_sides, 10);
        assert_eq!(prefs.layout.edge_height, 20.0);
    }

    #[test]
    fn json_loading() {
        let prefs = Preferences::from_json_str(r#"{"fade_steps": 4, "undo": {"max_depth": 3}}"#)
            .unwrap();
        assert_eq!(prefs.fade_steps, 4);
        assert_eq!(prefs.undo.max_depth, 3);
    }

    #[test]
    fn validate_catches_bad_values() {
        let mut prefs = Preferences::default();
        prefs.move_frames = 0;
        prefs.layout.edge_width = -1.0;
        prefs.layout.spiral_sides = 2;
        let errors = prefs.validate();
        assert!(errors.iter().any(|e| e.contains("move_frames")));
        assert!(errors.iter().any(|e| e.contains("edge_width")));
        assert!(errors.iter().any(|e| e.contains("spiral_sides")));
    }

    #[test]
    fn validated_loader_rejects() {
        let err = Preferences::from_toml_str_validated("fade_steps = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref e) if e.len() == 1));
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(matches!(
            Preferences::from_toml_str("move_frames = \"many\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let prefs = Preferences::default();
        let text = prefs.to_toml_string().unwrap();
        assert_eq!(Preferences::from_toml_str(&text).unwrap(), prefs);
    }
}
