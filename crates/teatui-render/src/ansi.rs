#![forbid(unsafe_code)]

//! ANSI escape sequence emitters.
//!
//! Pure byte generation, no state. The renderer and the mode tracker decide
//! *when* to emit; this module only knows *what* the bytes are.
//!
//! # Sequence Reference
//!
//! | Sequence | Description |
//! |----------|-------------|
//! | `CSI row ; col H` | Cursor position (1-indexed) |
//! | `CSI n A` | Cursor up |
//! | `CSI n K` | Erase in line |
//! | `CSI n J` | Erase in display |
//! | `CSI n L` | Insert lines |
//! | `CSI top ; bottom r` | Set scroll region (DECSTBM) |
//! | `CSI ? 25 h/l` | Cursor visibility |
//! | `CSI ? 1049 h/l` | Alternate screen |
//! | `CSI ? 1002/1003/1006 h/l` | Mouse tracking (cell motion, all motion, SGR) |
//! | `CSI ? 2004 h/l` | Bracketed paste |
//! | `CSI ? 1004 h/l` | Focus reporting |
//! | `OSC 0 ; title BEL` | Window title |

use std::io::{self, Write};

// =============================================================================
// Cursor
// =============================================================================

/// Cursor to the top-left corner: `CSI H`
pub const CURSOR_HOME: &[u8] = b"\x1b[H";

/// Hide cursor: `CSI ? 25 l`
pub const CURSOR_HIDE: &[u8] = b"\x1b[?25l";

/// Show cursor: `CSI ? 25 h`
pub const CURSOR_SHOW: &[u8] = b"\x1b[?25h";

/// Move the cursor to a 1-indexed `row` and `col`: `CSI row ; col H`.
#[inline]
pub fn cursor_position<W: Write>(w: &mut W, row: u16, col: u16) -> io::Result<()> {
    write!(w, "\x1b[{row};{col}H")
}

/// Move the cursor up `n` rows: `CSI n A`. No-op for zero.
#[inline]
pub fn cursor_up<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}A")
}

/// Carriage return.
#[inline]
pub fn carriage_return<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\r")
}

// =============================================================================
// Erase
// =============================================================================

/// Erase from cursor to end of line: `CSI K`
pub const ERASE_LINE_RIGHT: &[u8] = b"\x1b[K";

/// Erase the whole line: `CSI 2 K`
pub const ERASE_LINE: &[u8] = b"\x1b[2K";

/// Erase from cursor to end of screen: `CSI J`
pub const ERASE_DOWN: &[u8] = b"\x1b[J";

/// Erase the whole screen: `CSI 2 J`
pub const ERASE_SCREEN: &[u8] = b"\x1b[2J";

/// Clear the screen and home the cursor: `CSI 2 J` then `CSI H`.
pub fn clear_screen<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(ERASE_SCREEN)?;
    w.write_all(CURSOR_HOME)
}

// =============================================================================
// Scroll region
// =============================================================================

/// Restrict scrolling to rows `top..=bottom` (1-indexed): `CSI top ; bottom r`.
#[inline]
pub fn set_scroll_region<W: Write>(w: &mut W, top: u16, bottom: u16) -> io::Result<()> {
    write!(w, "\x1b[{top};{bottom}r")
}

/// Return the scroll region to the full screen: `CSI 0 ; height r`.
#[inline]
pub fn reset_scroll_region<W: Write>(w: &mut W, height: u16) -> io::Result<()> {
    write!(w, "\x1b[0;{height}r")
}

/// Insert `n` blank lines at the cursor row: `CSI n L`.
#[inline]
pub fn insert_lines<W: Write>(w: &mut W, n: usize) -> io::Result<()> {
    write!(w, "\x1b[{n}L")
}

// =============================================================================
// Modes
// =============================================================================

/// Enter alternate screen: `CSI ? 1049 h`
pub const ALT_SCREEN_ENTER: &[u8] = b"\x1b[?1049h";

/// Leave alternate screen: `CSI ? 1049 l`
pub const ALT_SCREEN_LEAVE: &[u8] = b"\x1b[?1049l";

/// Button-event (cell motion) mouse tracking on: `CSI ? 1002 h`
pub const MOUSE_CELL_MOTION_ENABLE: &[u8] = b"\x1b[?1002h";

/// Button-event mouse tracking off: `CSI ? 1002 l`
pub const MOUSE_CELL_MOTION_DISABLE: &[u8] = b"\x1b[?1002l";

/// Any-event (all motion) mouse tracking on: `CSI ? 1003 h`
pub const MOUSE_ALL_MOTION_ENABLE: &[u8] = b"\x1b[?1003h";

/// Any-event mouse tracking off: `CSI ? 1003 l`
pub const MOUSE_ALL_MOTION_DISABLE: &[u8] = b"\x1b[?1003l";

/// SGR extended mouse coordinates on: `CSI ? 1006 h`
pub const MOUSE_SGR_ENABLE: &[u8] = b"\x1b[?1006h";

/// SGR extended mouse coordinates off: `CSI ? 1006 l`
pub const MOUSE_SGR_DISABLE: &[u8] = b"\x1b[?1006l";

/// Bracketed paste on: `CSI ? 2004 h`
pub const BRACKETED_PASTE_ENABLE: &[u8] = b"\x1b[?2004h";

/// Bracketed paste off: `CSI ? 2004 l`
pub const BRACKETED_PASTE_DISABLE: &[u8] = b"\x1b[?2004l";

/// Focus reporting on: `CSI ? 1004 h`
pub const FOCUS_ENABLE: &[u8] = b"\x1b[?1004h";

/// Focus reporting off: `CSI ? 1004 l`
pub const FOCUS_DISABLE: &[u8] = b"\x1b[?1004l";

/// Set the window title: `OSC 0 ; title BEL`.
///
/// Control characters in `title` are dropped so the sequence cannot be
/// terminated early.
pub fn set_window_title<W: Write>(w: &mut W, title: &str) -> io::Result<()> {
    w.write_all(b"\x1b]0;")?;
    for c in title.chars().filter(|c| !c.is_control()) {
        let mut buf = [0u8; 4];
        w.write_all(c.encode_utf8(&mut buf).as_bytes())?;
    }
    w.write_all(b"\x07")
}
