#![forbid(unsafe_code)]

//! Everything a subsystem needs from its surroundings, passed explicitly.

use kataja_core::{ColorProvider, Preferences, StaticPalette, Viewport};

/// Preferences, palette and the drawing surface.
#[derive(Debug)]
pub struct Context<V: Viewport> {
    pub prefs: Preferences,
    pub colors: Box<dyn ColorProvider>,
    pub viewport: V,
}

impl<V: Viewport> Context<V> {
    #[must_use]
    pub fn new(prefs: Preferences, colors: Box<dyn ColorProvider>, viewport: V) -> Self {
        Self {
            prefs,
            colors,
            viewport,
        }
    }

    /// Default preferences and the built-in palette.
    #[must_use]
    pub fn with_viewport(viewport: V) -> Self {
        Self::new(Preferences::default(), Box::new(StaticPalette::new()), viewport)
    }
}
