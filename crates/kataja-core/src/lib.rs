#![forbid(unsafe_code)]

//! Core: geometry, viewport events, easing curves, palette and viewport
//! interfaces, and preferences.

pub mod color;
pub mod config;
pub mod easing;
pub mod event;
pub mod geometry;
pub mod text;
pub mod viewport;

pub use color::{Color, ColorKey, ColorProvider, Hsv, StaticPalette};
pub use config::{ConfigError, LayoutConfig, Preferences, UndoConfig};
pub use easing::EasingCurve;
pub use event::{KeyCode, KeyEvent, Modifiers, MouseButton, MouseButtons, Shortcut, ViewportEvent};
pub use geometry::{Point3, Rect};
pub use viewport::{Brush, CursorKind, HeadlessViewport, Viewport, ViewportRequest};
