#![forbid(unsafe_code)]

//! Palette access by semantic key.
//!
//! The core never picks concrete colors. It asks a [`ColorProvider`] for a
//! [`ColorKey`] (`content1`, `accent3`, ...) and the provider answers from its
//! active theme. [`StaticPalette`] is a small built-in provider with fixed
//! themes, used headless and in tests.

use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// An sRGB color with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Convert to hue/saturation/value.
    #[must_use]
    pub fn to_hsv(self) -> Hsv {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let s = if max == 0.0 { 0.0 } else { delta / max };
        Hsv {
            h,
            s,
            v: max,
            a: f64::from(self.a) / 255.0,
        }
    }

    /// Linear interpolation in HSV space.
    #[must_use]
    pub fn mix(self, other: Color, t: f64) -> Color {
        let a = self.to_hsv();
        let b = other.to_hsv();
        let mut dh = b.h - a.h;
        if dh > 180.0 {
            dh -= 360.0;
        } else if dh < -180.0 {
            dh += 360.0;
        }
        Hsv {
            h: (a.h + dh * t).rem_euclid(360.0),
            s: a.s + (b.s - a.s) * t,
            v: a.v + (b.v - a.v) * t,
            a: a.a + (b.a - a.a) * t,
        }
        .to_color()
    }
}

/// Hue in degrees `[0, 360)`, saturation, value and alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
    pub a: f64,
}

impl Hsv {
    #[must_use]
    pub fn to_color(self) -> Color {
        let s = self.s.clamp(0.0, 1.0);
        let v = self.v.clamp(0.0, 1.0);
        let h = self.h.rem_euclid(360.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match (h / 60.0) as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let to_u8 = |f: f64| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Color::rgba(
            to_u8(r),
            to_u8(g),
            to_u8(b),
            (self.a.clamp(0.0, 1.0) * 255.0).round() as u8,
        )
    }
}

/// Semantic palette slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColorKey {
    /// `content1..=content3`
    Content(u8),
    /// `background1..=background2`
    Background(u8),
    /// `accent1..=accent8`
    Accent(u8),
    /// `custom1..=custom10`
    Custom(u8),
}

impl ColorKey {
    /// Every key a provider must be able to answer.
    #[must_use]
    pub fn all() -> Vec<ColorKey> {
        let mut keys = Vec::with_capacity(23);
        keys.extend((1..=3).map(ColorKey::Content));
        keys.extend((1..=2).map(ColorKey::Background));
        keys.extend((1..=8).map(ColorKey::Accent));
        keys.extend((1..=10).map(ColorKey::Custom));
        keys
    }

    fn in_range(self) -> bool {
        match self {
            Self::Content(n) => (1..=3).contains(&n),
            Self::Background(n) => (1..=2).contains(&n),
            Self::Accent(n) => (1..=8).contains(&n),
            Self::Custom(n) => (1..=10).contains(&n),
        }
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(n) => write!(f, "content{n}"),
            Self::Background(n) => write!(f, "background{n}"),
            Self::Accent(n) => write!(f, "accent{n}"),
            Self::Custom(n) => write!(f, "custom{n}"),
        }
    }
}

/// Error for an unknown palette key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color key `{0}`")]
pub struct ColorKeyError(pub String);

impl FromStr for ColorKey {
    type Err = ColorKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| ColorKeyError(s.to_string()))?;
        let (name, digits) = s.split_at(split);
        let n: u8 = digits.parse().map_err(|_| ColorKeyError(s.to_string()))?;
        let key = match name {
            "content" => Self::Content(n),
            "background" => Self::Background(n),
            "accent" => Self::Accent(n),
            "custom" => Self::Custom(n),
            _ => return Err(ColorKeyError(s.to_string())),
        };
        if key.in_range() {
            Ok(key)
        } else {
            Err(ColorKeyError(s.to_string()))
        }
    }
}

impl TryFrom<String> for ColorKey {
    type Error = ColorKeyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColorKey> for String {
    fn from(key: ColorKey) -> Self {
        key.to_string()
    }
}

/// Source of palette colors.
pub trait ColorProvider: fmt::Debug {
    /// Color for a semantic key in the active theme.
    fn get(&self, key: ColorKey) -> Color;

    /// Switch the active theme. Returns false for an unknown theme.
    fn set_theme(&mut self, name: &str) -> bool;

    /// Name of the active theme.
    fn theme(&self) -> &str;

    /// Names of all themes this provider knows.
    fn enumerate_themes(&self) -> Vec<String>;

    /// A lighter variant of `color`.
    fn lighter(&self, color: Color) -> Color {
        let mut hsv = color.to_hsv();
        hsv.v = (hsv.v * 1.2).min(1.0);
        hsv.s *= 0.85;
        hsv.to_color()
    }

    /// A darker variant of `color`.
    fn darker(&self, color: Color) -> Color {
        let mut hsv = color.to_hsv();
        hsv.v *= 0.7;
        hsv.to_color()
    }

    /// `color` with alpha replaced.
    fn with_alpha(&self, color: Color, alpha: f64) -> Color {
        Color {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..color
        }
    }

    /// A human readable name for a hue.
    fn name_of(&self, hsv: Hsv) -> String {
        if hsv.s < 0.1 {
            return if hsv.v > 0.8 {
                "white".into()
            } else if hsv.v < 0.2 {
                "black".into()
            } else {
                "gray".into()
            };
        }
        const NAMES: [(f64, &str); 7] = [
            (15.0, "red"),
            (45.0, "orange"),
            (70.0, "yellow"),
            (160.0, "green"),
            (250.0, "blue"),
            (320.0, "purple"),
            (360.0, "red"),
        ];
        let h = hsv.h.rem_euclid(360.0);
        NAMES
            .iter()
            .find(|(limit, _)| h < *limit)
            .map_or("red", |(_, name)| name)
            .to_string()
    }
}

/// Fixed set of themes keyed by name.
#[derive(Debug, Clone)]
pub struct StaticPalette {
    themes: Vec<(String, AHashMap<ColorKey, Color>)>,
    active: usize,
}

impl StaticPalette {
    /// Palette with the built-in `kataja` (light) and `dark` themes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            themes: vec![
                ("kataja".into(), build_theme(Color::rgb(40, 40, 60), Color::rgb(250, 248, 240), 210.0)),
                ("dark".into(), build_theme(Color::rgb(230, 230, 220), Color::rgb(28, 30, 36), 35.0)),
            ],
            active: 0,
        }
    }

    /// Add or replace a theme generated from a content color, background and
    /// base hue.
    pub fn add_theme(&mut self, name: &str, content: Color, background: Color, hue: f64) {
        let theme = build_theme(content, background, hue);
        if let Some(slot) = self.themes.iter_mut().find(|(n, _)| n == name) {
            slot.1 = theme;
        } else {
            self.themes.push((name.to_string(), theme));
        }
    }
}

impl Default for StaticPalette {
    fn default() -> Self {
        Self::new()
    }
}

fn build_theme(content: Color, background: Color, hue: f64) -> AHashMap<ColorKey, Color> {
    let mut map = AHashMap::new();
    map.insert(ColorKey::Content(1), content);
    map.insert(ColorKey::Content(2), content.mix(background, 0.3));
    map.insert(ColorKey::Content(3), content.mix(background, 0.6));
    map.insert(ColorKey::Background(1), background);
    map.insert(ColorKey::Background(2), background.mix(content, 0.08));
    let v = content.to_hsv().v.max(0.55);
    for i in 1..=8u8 {
        let h = hue + f64::from(i - 1) * 45.0;
        map.insert(ColorKey::Accent(i), Hsv { h, s: 0.65, v, a: 1.0 }.to_color());
    }
    for i in 1..=10u8 {
        let h = hue + 18.0 + f64::from(i - 1) * 36.0;
        map.insert(ColorKey::Custom(i), Hsv { h, s: 0.4, v, a: 1.0 }.to_color());
    }
    map
}

impl ColorProvider for StaticPalette {
    fn get(&self, key: ColorKey) -> Color {
        self.themes
            .get(self.active)
            .and_then(|(_, theme)| theme.get(&key).copied())
            .unwrap_or_default()
    }

    fn set_theme(&mut self, name: &str) -> bool {
        match self.themes.iter().position(|(n, _)| n == name) {
            Some(idx) => {
                self.active = idx;
                true
            }
            None => false,
        }
    }

    fn theme(&self) -> &str {
        self.themes.get(self.active).map_or("", |(n, _)| n.as_str())
    }

    fn enumerate_themes(&self) -> Vec<String> {
        self.themes.iter().map(|(n, _)| n.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parse_and_display() {
        for key in ColorKey::all() {
            let text = key.to_string();
            assert_eq!(text.parse::<ColorKey>().unwrap(), key);
        }
        assert!("accent9".parse::<ColorKey>().is_err());
        assert!("content0".parse::<ColorKey>().is_err());
        assert!("shiny1".parse::<ColorKey>().is_err());
        assert!("accent".parse::<ColorKey>().is_err());
    }

    #[test]
    fn hsv_round_trip_primary_colors() {
        for c in [
            Color::rgb(255, 0, 0),
            Color::rgb(0, 255, 0),
            Color::rgb(0, 0, 255),
            Color::rgb(128, 128, 128),
        ] {
            assert_eq!(c.to_hsv().to_color(), c);
        }
    }

    #[test]
    fn palette_answers_every_key() {
        let palette = StaticPalette::new();
        for key in ColorKey::all() {
            assert_eq!(palette.get(key).a, 255, "{key}");
        }
    }

    #[test]
    fn theme_switching() {
        let mut palette = StaticPalette::new();
        let light_bg = palette.get(ColorKey::Background(1));
        assert!(palette.set_theme("dark"));
        assert_eq!(palette.theme(), "dark");
        assert_ne!(palette.get(ColorKey::Background(1)), light_bg);
        assert!(!palette.set_theme("nope"));
        assert_eq!(palette.theme(), "dark");
        assert_eq!(palette.enumerate_themes(), vec!["kataja", "dark"]);
    }

    #[test]
    fn lighter_and_darker_move_value() {
        let palette = StaticPalette::new();
        let base = Color::rgb(100, 50, 50);
        assert!(palette.lighter(base).to_hsv().v > base.to_hsv().v);
        assert!(palette.darker(base).to_hsv().v < base.to_hsv().v);
        assert_eq!(palette.with_alpha(base, 0.5).a, 128);
    }

    #[test]
    fn hue_names() {
        let palette = StaticPalette::new();
        assert_eq!(palette.name_of(Color::rgb(255, 0, 0).to_hsv()), "red");
        assert_eq!(palette.name_of(Color::rgb(0, 0, 255).to_hsv()), "blue");
        assert_eq!(palette.name_of(Color::rgb(255, 255, 255).to_hsv()), "white");
    }

    #[test]
    fn mix_endpoints() {
        let a = Color::rgb(255, 0, 0);
        let b = Color::rgb(0, 0, 255);
        assert_eq!(a.mix(b, 0.0), a);
        assert_eq!(a.mix(b, 1.0), b);
    }
}
