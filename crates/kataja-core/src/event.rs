#![forbid(unsafe_code)]

//! Input events delivered by the viewport.
//!
//! The viewport translates whatever its host toolkit produces into
//! [`ViewportEvent`] values and hands them to the engine one at a time, in
//! delivery order. Pointer positions are in widget coordinates; the engine
//! maps them into the scene through [`crate::viewport::Viewport::map_to_scene`].
//!
//! # Shortcuts
//!
//! [`Shortcut`] is the key + modifier pair commands are bound to. It parses
//! from the conventional `"Ctrl+Shift+Z"` spelling:
//!
//! ```
//! use kataja_core::event::{KeyCode, Modifiers, Shortcut};
//!
//! let s: Shortcut = "Ctrl+Shift+Z".parse().unwrap();
//! assert_eq!(s.code, KeyCode::Char('z'));
//! assert_eq!(s.modifiers, Modifiers::CTRL | Modifiers::SHIFT);
//! ```

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::geometry::Point3;

/// An event delivered by the viewport.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEvent {
    /// A pointer button went down.
    PointerPress {
        position: Point3,
        button: MouseButton,
        modifiers: Modifiers,
    },
    /// A pointer button went up.
    PointerRelease {
        position: Point3,
        button: MouseButton,
        modifiers: Modifiers,
    },
    /// The pointer moved, with the currently held buttons.
    PointerMove {
        position: Point3,
        buttons: MouseButtons,
        modifiers: Modifiers,
    },
    /// Scroll wheel; positive delta scrolls away from the user.
    Wheel { delta: f64, modifiers: Modifiers },
    /// A key was pressed.
    KeyPress(KeyEvent),
    /// The viewport gained keyboard focus.
    FocusIn,
    /// The viewport lost keyboard focus.
    FocusOut,
    /// The viewport was resized to the given widget size.
    Resize { width: f64, height: f64 },
}

impl ViewportEvent {
    /// Short name for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PointerPress { .. } => "pointer-press",
            Self::PointerRelease { .. } => "pointer-release",
            Self::PointerMove { .. } => "pointer-move",
            Self::Wheel { .. } => "wheel",
            Self::KeyPress(_) => "key-press",
            Self::FocusIn => "focus-in",
            Self::FocusOut => "focus-out",
            Self::Resize { .. } => "resize",
        }
    }
}

/// A single pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// The button as a member of a [`MouseButtons`] set.
    #[must_use]
    pub const fn as_flag(self) -> MouseButtons {
        match self {
            Self::Left => MouseButtons::LEFT,
            Self::Right => MouseButtons::RIGHT,
            Self::Middle => MouseButtons::MIDDLE,
        }
    }
}

bitflags! {
    /// Set of pointer buttons held during a move.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u8 {
        const LEFT   = 0b001;
        const RIGHT  = 0b010;
        const MIDDLE = 0b100;
    }
}

bitflags! {
    /// Modifier keys that can be held during an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// Key identity, independent of modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable character, stored lowercase for letters.
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    /// Function key `F1..=F24`.
    F(u8),
}

impl KeyCode {
    fn parse(token: &str) -> Option<Self> {
        let lower = token.to_ascii_lowercase();
        let code = match lower.as_str() {
            "enter" | "return" => Self::Enter,
            "esc" | "escape" => Self::Escape,
            "backspace" => Self::Backspace,
            "tab" => Self::Tab,
            "del" | "delete" => Self::Delete,
            "home" => Self::Home,
            "end" => Self::End,
            "pgup" | "pageup" => Self::PageUp,
            "pgdown" | "pagedown" => Self::PageDown,
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "space" => Self::Char(' '),
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    (Some('f'), Some(_)) => {
                        let n: u8 = lower[1..].parse().ok()?;
                        if (1..=24).contains(&n) {
                            Self::F(n)
                        } else {
                            return None;
                        }
                    }
                    _ => return None,
                }
            }
        };
        Some(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(' ') => f.write_str("Space"),
            Self::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Self::Enter => f.write_str("Enter"),
            Self::Escape => f.write_str("Esc"),
            Self::Backspace => f.write_str("Backspace"),
            Self::Tab => f.write_str("Tab"),
            Self::Delete => f.write_str("Delete"),
            Self::Home => f.write_str("Home"),
            Self::End => f.write_str("End"),
            Self::PageUp => f.write_str("PgUp"),
            Self::PageDown => f.write_str("PgDown"),
            Self::Up => f.write_str("Up"),
            Self::Down => f.write_str("Down"),
            Self::Left => f.write_str("Left"),
            Self::Right => f.write_str("Right"),
            Self::F(n) => write!(f, "F{n}"),
        }
    }
}

/// A key press with modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A key event with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
        }
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// The shortcut this key event would trigger.
    #[must_use]
    pub fn shortcut(&self) -> Shortcut {
        Shortcut::new(normalize(self.code), self.modifiers)
    }
}

fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

/// A keyboard shortcut: key plus exact modifier set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl Shortcut {
    #[must_use]
    pub fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            code: normalize(code),
            modifiers,
        }
    }
}

/// Error returned when a shortcut string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid shortcut `{0}`")]
pub struct ShortcutParseError(pub String);

impl FromStr for Shortcut {
    type Err = ShortcutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::NONE;
        let mut code = None;
        for token in s.split('+').map(str::trim) {
            match token.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= Modifiers::CTRL,
                "shift" => modifiers |= Modifiers::SHIFT,
                "alt" | "option" => modifiers |= Modifiers::ALT,
                "meta" | "super" | "cmd" => modifiers |= Modifiers::SUPER,
                "" => return Err(ShortcutParseError(s.to_string())),
                _ => {
                    if code.is_some() {
                        return Err(ShortcutParseError(s.to_string()));
                    }
                    code = Some(
                        KeyCode::parse(token).ok_or_else(|| ShortcutParseError(s.to_string()))?,
                    );
                }
            }
        }
        code.map(|code| Shortcut::new(code, modifiers))
            .ok_or_else(|| ShortcutParseError(s.to_string()))
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CTRL, "Ctrl+"),
            (Modifiers::ALT, "Alt+"),
            (Modifiers::SHIFT, "Shift+"),
            (Modifiers::SUPER, "Meta+"),
        ] {
            if self.modifiers.contains(flag) {
                f.write_str(name)?;
            }
        }
        write!(f, "{}", self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_letter() {
        let s: Shortcut = "b".parse().unwrap();
        assert_eq!(s, Shortcut::new(KeyCode::Char('b'), Modifiers::NONE));
    }

    #[test]
    fn parse_is_case_insensitive() {
        let a: Shortcut = "ctrl+z".parse().unwrap();
        let b: Shortcut = "Ctrl+Z".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parse_named_keys() {
        let s: Shortcut = "Delete".parse().unwrap();
        assert_eq!(s.code, KeyCode::Delete);
        let s: Shortcut = "Alt+F11".parse().unwrap();
        assert_eq!(s.code, KeyCode::F(11));
        assert_eq!(s.modifiers, Modifiers::ALT);
    }

    #[test]
    fn parse_rejects_two_keys_and_empty_tokens() {
        assert!("Ctrl+A+B".parse::<Shortcut>().is_err());
        assert!("Ctrl+".parse::<Shortcut>().is_err());
        assert!("Ctrl".parse::<Shortcut>().is_err());
        assert!("F99".parse::<Shortcut>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for text in ["Ctrl+Shift+Z", "Delete", "Alt+F4", "Space"] {
            let s: Shortcut = text.parse().unwrap();
            let again: Shortcut = s.to_string().parse().unwrap();
            assert_eq!(s, again, "{text}");
        }
    }

    #[test]
    fn key_event_shortcut_lowercases() {
        let key = KeyEvent::new(KeyCode::Char('Z')).with_modifiers(Modifiers::CTRL);
        assert_eq!(key.shortcut(), "Ctrl+Z".parse().unwrap());
    }

    #[test]
    fn mouse_button_flags() {
        assert_eq!(MouseButton::Left.as_flag(), MouseButtons::LEFT);
        assert!(
            (MouseButtons::LEFT | MouseButtons::MIDDLE).contains(MouseButton::Middle.as_flag())
        );
    }
}
