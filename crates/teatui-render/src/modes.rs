#![forbid(unsafe_code)]

//! Terminal mode bookkeeping.
//!
//! [`TerminalModes`] remembers which modes are on and writes a toggle
//! sequence only when the requested state differs from the current one.
//! Every setter returns whether it wrote anything.

use std::io::{self, Write};

use crate::ansi;

/// Mouse tracking mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MouseMode {
    /// No mouse reporting.
    #[default]
    Disabled,
    /// Presses, releases, wheel, and motion while a button is held.
    CellMotion,
    /// Every event, including motion with no button held.
    AllMotion,
}

impl MouseMode {
    fn enable_seq(self) -> Option<&'static [u8]> {
        match self {
            Self::Disabled => None,
            Self::CellMotion => Some(ansi::MOUSE_CELL_MOTION_ENABLE),
            Self::AllMotion => Some(ansi::MOUSE_ALL_MOTION_ENABLE),
        }
    }

    fn disable_seq(self) -> Option<&'static [u8]> {
        match self {
            Self::Disabled => None,
            Self::CellMotion => Some(ansi::MOUSE_CELL_MOTION_DISABLE),
            Self::AllMotion => Some(ansi::MOUSE_ALL_MOTION_DISABLE),
        }
    }
}

/// Current terminal modes, as far as this process has set them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalModes {
    alt_screen: bool,
    cursor_hidden: bool,
    mouse: MouseMode,
    bracketed_paste: bool,
    report_focus: bool,
    title: Option<String>,
}

impl TerminalModes {
    /// All modes off, cursor visible.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn alt_screen(&self) -> bool {
        self.alt_screen
    }

    #[must_use]
    pub fn cursor_hidden(&self) -> bool {
        self.cursor_hidden
    }

    #[must_use]
    pub fn mouse(&self) -> MouseMode {
        self.mouse
    }

    #[must_use]
    pub fn bracketed_paste(&self) -> bool {
        self.bracketed_paste
    }

    #[must_use]
    pub fn report_focus(&self) -> bool {
        self.report_focus
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Enter or leave the alternate screen.
    ///
    /// Entering also clears it and homes the cursor, and re-hides the
    /// cursor if it was hidden, since some terminals keep cursor state per
    /// screen.
    pub fn set_alt_screen<W: Write>(&mut self, w: &mut W, on: bool) -> io::Result<bool> {
        if self.alt_screen == on {
            return Ok(false);
        }
        if on {
            w.write_all(ansi::ALT_SCREEN_ENTER)?;
            ansi::clear_screen(w)?;
        } else {
            w.write_all(ansi::ALT_SCREEN_LEAVE)?;
        }
        if self.cursor_hidden {
            w.write_all(ansi::CURSOR_HIDE)?;
        }
        self.alt_screen = on;
        Ok(true)
    }

    pub fn set_cursor_hidden<W: Write>(&mut self, w: &mut W, hidden: bool) -> io::Result<bool> {
        if self.cursor_hidden == hidden {
            return Ok(false);
        }
        w.write_all(if hidden {
            ansi::CURSOR_HIDE
        } else {
            ansi::CURSOR_SHOW
        })?;
        self.cursor_hidden = hidden;
        Ok(true)
    }

    /// Switch mouse tracking. Any enabled mode also turns on SGR encoding.
    pub fn set_mouse<W: Write>(&mut self, w: &mut W, mode: MouseMode) -> io::Result<bool> {
        if self.mouse == mode {
            return Ok(false);
        }
        if let Some(seq) = self.mouse.disable_seq() {
            w.write_all(seq)?;
        }
        match mode.enable_seq() {
            Some(seq) => {
                w.write_all(seq)?;
                if self.mouse == MouseMode::Disabled {
                    w.write_all(ansi::MOUSE_SGR_ENABLE)?;
                }
            }
            None => w.write_all(ansi::MOUSE_SGR_DISABLE)?,
        }
        self.mouse = mode;
        Ok(true)
    }

    pub fn set_bracketed_paste<W: Write>(&mut self, w: &mut W, on: bool) -> io::Result<bool> {
        if self.bracketed_paste == on {
            return Ok(false);
        }
        w.write_all(if on {
            ansi::BRACKETED_PASTE_ENABLE
        } else {
            ansi::BRACKETED_PASTE_DISABLE
        })?;
        self.bracketed_paste = on;
        Ok(true)
    }

    pub fn set_report_focus<W: Write>(&mut self, w: &mut W, on: bool) -> io::Result<bool> {
        if self.report_focus == on {
            return Ok(false);
        }
        w.write_all(if on {
            ansi::FOCUS_ENABLE
        } else {
            ansi::FOCUS_DISABLE
        })?;
        self.report_focus = on;
        Ok(true)
    }

    pub fn set_title<W: Write>(&mut self, w: &mut W, title: &str) -> io::Result<bool> {
        if self.title.as_deref() == Some(title) {
            return Ok(false);
        }
        ansi::set_window_title(w, title)?;
        self.title = Some(title.to_owned());
        Ok(true)
    }

    /// Move to `target`, writing only the differences.
    ///
    /// The title is applied only when `target` has one.
    pub fn apply<W: Write>(&mut self, w: &mut W, target: &TerminalModes) -> io::Result<bool> {
        let mut changed = self.set_cursor_hidden(w, target.cursor_hidden)?;
        changed |= self.set_alt_screen(w, target.alt_screen)?;
        changed |= self.set_mouse(w, target.mouse)?;
        changed |= self.set_bracketed_paste(w, target.bracketed_paste)?;
        changed |= self.set_report_focus(w, target.report_focus)?;
        if let Some(title) = &target.title {
            changed |= self.set_title(w, title)?;
        }
        Ok(changed)
    }

    /// Put the terminal back the way a shell expects it: cursor shown,
    /// main screen, no mouse, paste, or focus reporting.
    pub fn reset<W: Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.set_cursor_hidden(w, false)?;
        self.set_alt_screen(w, false)?;
        self.set_mouse(w, MouseMode::Disabled)?;
        self.set_bracketed_paste(w, false)?;
        self.set_report_focus(w, false)?;
        Ok(())
    }
}
