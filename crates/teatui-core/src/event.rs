#![forbid(unsafe_code)]

//! Input event types produced by the decoder.
//!
//! All events derive `Clone`, `PartialEq` and `Eq` so tests can compare them
//! directly.
//!
//! # Design Notes
//!
//! - Mouse coordinates are 0-indexed (the terminal reports them 1-indexed)
//! - Sequences the decoder does not understand are kept as [`Event::Unknown`]
//!   with their raw bytes instead of being dropped

use std::fmt;

use bitflags::bitflags;

/// A decoded terminal input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A keyboard event.
    Key(KeyEvent),

    /// A mouse event (SGR encoding).
    Mouse(MouseEvent),

    /// Text delivered through bracketed paste, as one unit.
    Paste(String),

    /// The terminal window gained focus.
    Focus,

    /// The terminal window lost focus.
    Blur,

    /// A complete escape sequence the decoder does not recognise.
    ///
    /// Carries the raw bytes, including the leading `ESC`.
    Unknown(Vec<u8>),
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// The key that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the press.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create a key event without modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
        }
    }

    /// Replace the modifiers of this key event.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Check if this is a specific character key.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }

    /// Check if Ctrl is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// Check if Alt is held.
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// Check if Shift is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// Renders keys the way applications usually match on them:
/// `"ctrl+c"`, `"alt+enter"`, `"up"`, `"f5"`, `"q"`.
impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl() {
            f.write_str("ctrl+")?;
        }
        if self.alt() {
            f.write_str("alt+")?;
        }
        if self.shift() {
            f.write_str("shift+")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::Enter => f.write_str("enter"),
            KeyCode::Escape => f.write_str("esc"),
            KeyCode::Backspace => f.write_str("backspace"),
            KeyCode::Tab => f.write_str("tab"),
            KeyCode::BackTab => f.write_str("shift+tab"),
            KeyCode::Delete => f.write_str("delete"),
            KeyCode::Insert => f.write_str("insert"),
            KeyCode::Home => f.write_str("home"),
            KeyCode::End => f.write_str("end"),
            KeyCode::PageUp => f.write_str("pgup"),
            KeyCode::PageDown => f.write_str("pgdown"),
            KeyCode::Up => f.write_str("up"),
            KeyCode::Down => f.write_str("down"),
            KeyCode::Left => f.write_str("left"),
            KeyCode::Right => f.write_str("right"),
            KeyCode::F(n) => write!(f, "f{n}"),
        }
    }
}

/// Key codes for keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable character, or a letter combined with Ctrl.
    Char(char),
    /// Enter/Return.
    Enter,
    /// Escape.
    Escape,
    /// Backspace (`0x08`).
    Backspace,
    /// Tab.
    Tab,
    /// Shift+Tab.
    BackTab,
    /// Delete (`0x7F` or `CSI 3 ~`).
    Delete,
    /// Insert.
    Insert,
    /// Home.
    Home,
    /// End.
    End,
    /// Page Up.
    PageUp,
    /// Page Down.
    PageDown,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Function key F1-F12.
    F(u8),
}

bitflags! {
    /// Modifier keys held during a key or mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b000;
        /// Shift key.
        const SHIFT = 0b001;
        /// Alt/Option key.
        const ALT   = 0b010;
        /// Control key.
        const CTRL  = 0b100;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// A mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// What happened.
    pub kind: MouseEventKind,
    /// Column, 0-indexed.
    pub x: u16,
    /// Row, 0-indexed.
    pub y: u16,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
}

impl MouseEvent {
    /// Create a mouse event without modifiers.
    #[must_use]
    pub const fn new(kind: MouseEventKind, x: u16, y: u16) -> Self {
        Self {
            kind,
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    /// Replace the modifiers of this mouse event.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Position as `(x, y)`.
    #[must_use]
    pub const fn position(&self) -> (u16, u16) {
        (self.x, self.y)
    }
}

/// The type of mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    /// Button pressed (`M` final byte).
    Press(MouseButton),
    /// Button released (`m` final byte).
    Release(MouseButton),
    /// Motion with a button held.
    Drag(MouseButton),
    /// Motion with no button held (all-motion tracking only).
    Moved,
    /// Wheel up.
    ScrollUp,
    /// Wheel down.
    ScrollDown,
    /// Horizontal wheel left.
    ScrollLeft,
    /// Horizontal wheel right.
    ScrollRight,
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left button.
    Left,
    /// Middle button (wheel click).
    Middle,
    /// Right button.
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_plain() {
        assert_eq!(KeyEvent::new(KeyCode::Char('q')).to_string(), "q");
        assert_eq!(KeyEvent::new(KeyCode::Up).to_string(), "up");
        assert_eq!(KeyEvent::new(KeyCode::F(5)).to_string(), "f5");
        assert_eq!(KeyEvent::new(KeyCode::Char(' ')).to_string(), "space");
    }

    #[test]
    fn key_display_modifiers_are_ordered() {
        let key = KeyEvent::new(KeyCode::Char('c')).with_modifiers(Modifiers::CTRL);
        assert_eq!(key.to_string(), "ctrl+c");

        let key = KeyEvent::new(KeyCode::Enter).with_modifiers(Modifiers::ALT | Modifiers::CTRL);
        assert_eq!(key.to_string(), "ctrl+alt+enter");
    }

    #[test]
    fn key_helpers() {
        let key = KeyEvent::new(KeyCode::Char('x')).with_modifiers(Modifiers::ALT);
        assert!(key.is_char('x'));
        assert!(key.alt());
        assert!(!key.ctrl());
        assert!(!key.shift());
    }

    #[test]
    fn mouse_position() {
        let ev = MouseEvent::new(MouseEventKind::Moved, 3, 7);
        assert_eq!(ev.position(), (3, 7));
        assert_eq!(ev.modifiers, Modifiers::NONE);
    }

    #[test]
    fn modifiers_default_is_none() {
        assert_eq!(Modifiers::default(), Modifiers::NONE);
        assert!(Modifiers::default().is_empty());
    }
}
