#![forbid(unsafe_code)]

//! Incremental terminal input decoder.
//!
//! [`InputParser`] consumes raw bytes one at a time and produces [`Event`]s.
//! Partial sequences are buffered across calls, so a read boundary that splits
//! `ESC [ 1 ; 5 A` in the middle yields the same events as a single read.
//!
//! # State machine
//!
//! ```text
//! Ground --ESC--> Escape --[--> Csi --final--> Ground
//!                    |   --]--> Osc --BEL/ST--> Ground
//!                    |   --O--> Ss3 --any--> Ground
//!                    +---other--> Ground (Alt+key)
//! Csi --"200~"--> Paste --"ESC[201~"--> Ground (one Paste event)
//! ```
//!
//! # Limits
//!
//! The CSI buffer, OSC payload and paste payload are all bounded. An oversized
//! CSI sequence is reported as [`Event::Unknown`]; an oversized OSC payload is
//! abandoned; paste bytes past the limit are dropped while the end marker is
//! still recognised.

use crate::event::{Event, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent, MouseEventKind};

/// Maximum CSI parameter bytes buffered before the sequence is abandoned.
const MAX_CSI_LEN: usize = 256;

/// Maximum OSC payload length skipped before returning to ground.
const MAX_OSC_LEN: usize = 4096;

/// Maximum paste payload retained (1 MiB).
const MAX_PASTE_LEN: usize = 1024 * 1024;

/// Bracketed paste terminator.
const PASTE_END: &[u8] = b"\x1b[201~";

const ESC: u8 = 0x1B;
const BEL: u8 = 0x07;

/// Decoder state tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Between sequences.
    #[default]
    Ground,
    /// Saw `ESC`.
    Escape,
    /// Saw `ESC O`.
    Ss3,
    /// Inside `ESC [`, collecting parameter bytes.
    Csi,
    /// Inside `ESC ]`, skipping the payload.
    Osc,
    /// Saw `ESC` inside an OSC payload (possible `ST`).
    OscEscape,
    /// Inside a bracketed paste.
    Paste,
    /// Collecting the continuation bytes of a UTF-8 character.
    Utf8,
}

/// Incremental byte-stream decoder.
#[derive(Debug, Default)]
pub struct InputParser {
    state: ParserState,
    /// CSI parameter and intermediate bytes (without `ESC [` or the final byte).
    buffer: Vec<u8>,
    osc_len: usize,
    utf8: Vec<u8>,
    utf8_expected: usize,
    /// An `ESC` prefixed the multi-byte character currently being collected.
    utf8_alt: bool,
    paste: Vec<u8>,
    /// How many bytes of [`PASTE_END`] have been matched so far.
    paste_end_matched: usize,
}

impl InputParser {
    /// Create a parser in the ground state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state tag.
    #[must_use]
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// True when a partial sequence is buffered.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state != ParserState::Ground
    }

    /// Bytes currently held in internal buffers.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.utf8.len() + self.paste.len()
    }

    /// Drop any partial sequence and return to ground.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Decode a chunk of bytes, returning every event it completes.
    pub fn parse(&mut self, input: &[u8]) -> Vec<Event> {
        let mut events = Vec::new();
        for &byte in input {
            self.advance(byte, &mut events);
        }
        events
    }

    /// Resolve a dangling `ESC` into the Escape key.
    ///
    /// Terminals deliver escape sequences in a single write, so a read that
    /// returns nothing but `ESC` is the Escape key itself. Callers invoke this
    /// only in that situation; the parser never guesses on its own.
    pub fn resolve_escape(&mut self) -> Option<Event> {
        if self.state == ParserState::Escape {
            self.state = ParserState::Ground;
            Some(Event::Key(KeyEvent::new(KeyCode::Escape)))
        } else {
            None
        }
    }

    fn advance(&mut self, byte: u8, out: &mut Vec<Event>) {
        match self.state {
            ParserState::Ground => self.ground(byte, out),
            ParserState::Escape => self.escape(byte, out),
            ParserState::Ss3 => self.ss3(byte, out),
            ParserState::Csi => self.csi(byte, out),
            ParserState::Osc => self.osc(byte),
            ParserState::OscEscape => self.osc_escape(byte, out),
            ParserState::Paste => self.paste_byte(byte, out),
            ParserState::Utf8 => self.utf8_continue(byte, out),
        }
    }

    fn ground(&mut self, byte: u8, out: &mut Vec<Event>) {
        match byte {
            ESC => self.state = ParserState::Escape,
            0x00..=0x1F | 0x7F => out.push(Event::Key(control_key(byte))),
            0x20..=0x7E => out.push(Event::Key(KeyEvent::new(KeyCode::Char(byte as char)))),
            _ => self.utf8_begin(byte, false, out),
        }
    }

    fn escape(&mut self, byte: u8, out: &mut Vec<Event>) {
        self.state = ParserState::Ground;
        match byte {
            b'[' => {
                self.buffer.clear();
                self.state = ParserState::Csi;
            }
            b']' => {
                self.osc_len = 0;
                self.state = ParserState::Osc;
            }
            b'O' => self.state = ParserState::Ss3,
            0x00..=0x1F | 0x7F => {
                let key = control_key(byte);
                out.push(Event::Key(key.with_modifiers(key.modifiers | Modifiers::ALT)));
            }
            0x20..=0x7E => out.push(Event::Key(
                KeyEvent::new(KeyCode::Char(byte as char)).with_modifiers(Modifiers::ALT),
            )),
            _ => self.utf8_begin(byte, true, out),
        }
    }

    fn ss3(&mut self, byte: u8, out: &mut Vec<Event>) {
        self.state = ParserState::Ground;
        let code = match byte {
            b'P' => KeyCode::F(1),
            b'Q' => KeyCode::F(2),
            b'R' => KeyCode::F(3),
            b'S' => KeyCode::F(4),
            b'A' => KeyCode::Up,
            b'B' => KeyCode::Down,
            b'C' => KeyCode::Right,
            b'D' => KeyCode::Left,
            b'H' => KeyCode::Home,
            b'F' => KeyCode::End,
            _ => {
                out.push(Event::Unknown(vec![ESC, b'O', byte]));
                return;
            }
        };
        out.push(Event::Key(KeyEvent::new(code)));
    }

    fn csi(&mut self, byte: u8, out: &mut Vec<Event>) {
        match byte {
            0x40..=0x7E => {
                self.state = ParserState::Ground;
                let event = self.finish_csi(byte);
                if let Some(event) = event {
                    out.push(event);
                }
                self.buffer.clear();
            }
            0x20..=0x3F => {
                if self.buffer.len() >= MAX_CSI_LEN {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(len = self.buffer.len(), "csi sequence exceeded limit");
                    out.push(Event::Unknown(self.raw_csi(None)));
                    self.buffer.clear();
                    self.state = ParserState::Ground;
                } else {
                    self.buffer.push(byte);
                }
            }
            _ => {
                // A control or non-ASCII byte interrupts the sequence.
                out.push(Event::Unknown(self.raw_csi(None)));
                self.buffer.clear();
                self.state = ParserState::Ground;
                self.ground(byte, out);
            }
        }
    }

    fn raw_csi(&self, final_byte: Option<u8>) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.buffer.len() + 3);
        raw.extend_from_slice(&[ESC, b'[']);
        raw.extend_from_slice(&self.buffer);
        raw.extend(final_byte);
        raw
    }

    /// Decode a complete CSI sequence. Returns `None` only when the sequence
    /// switched the parser into paste mode.
    fn finish_csi(&mut self, final_byte: u8) -> Option<Event> {
        let decoded = match (self.buffer.as_slice(), final_byte) {
            (b"200", b'~') => {
                self.paste.clear();
                self.paste_end_matched = 0;
                self.state = ParserState::Paste;
                return None;
            }
            (b"", b'I') => Some(Event::Focus),
            (b"", b'O') => Some(Event::Blur),
            ([b'<', rest @ ..], b'M' | b'm') => parse_sgr_mouse(rest, final_byte == b'M'),
            (params, b'A' | b'B' | b'C' | b'D' | b'H' | b'F' | b'P' | b'Q' | b'R' | b'S') => {
                cursor_key(params, final_byte)
            }
            (b"", b'Z') => Some(Event::Key(KeyEvent::new(KeyCode::BackTab))),
            (params, b'~') => tilde_key(params),
            _ => None,
        };
        Some(decoded.unwrap_or_else(|| Event::Unknown(self.raw_csi(Some(final_byte)))))
    }

    fn osc(&mut self, byte: u8) {
        match byte {
            BEL => self.state = ParserState::Ground,
            ESC => self.state = ParserState::OscEscape,
            _ => {
                self.osc_len += 1;
                if self.osc_len > MAX_OSC_LEN {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(len = self.osc_len, "osc payload exceeded limit");
                    self.state = ParserState::Ground;
                }
            }
        }
    }

    fn osc_escape(&mut self, byte: u8, out: &mut Vec<Event>) {
        if byte == b'\\' {
            self.state = ParserState::Ground;
        } else {
            // Unterminated OSC; the ESC starts a new sequence.
            self.state = ParserState::Escape;
            self.escape(byte, out);
        }
    }

    fn paste_byte(&mut self, byte: u8, out: &mut Vec<Event>) {
        if byte == PASTE_END[self.paste_end_matched] {
            self.paste_end_matched += 1;
            if self.paste_end_matched == PASTE_END.len() {
                let text = String::from_utf8_lossy(&self.paste).into_owned();
                self.paste = Vec::new();
                self.paste_end_matched = 0;
                self.state = ParserState::Ground;
                out.push(Event::Paste(text));
            }
            return;
        }

        // The partial terminator was content after all.
        let matched = std::mem::take(&mut self.paste_end_matched);
        self.push_paste(&PASTE_END[..matched]);
        if byte == PASTE_END[0] {
            self.paste_end_matched = 1;
        } else {
            self.push_paste(&[byte]);
        }
    }

    fn push_paste(&mut self, bytes: &[u8]) {
        let room = MAX_PASTE_LEN.saturating_sub(self.paste.len());
        self.paste.extend_from_slice(&bytes[..bytes.len().min(room)]);
    }

    fn utf8_begin(&mut self, byte: u8, alt: bool, out: &mut Vec<Event>) {
        let expected = match byte {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => {
                out.push(replacement_key(alt));
                return;
            }
        };
        self.utf8.clear();
        self.utf8.push(byte);
        self.utf8_expected = expected;
        self.utf8_alt = alt;
        self.state = ParserState::Utf8;
    }

    fn utf8_continue(&mut self, byte: u8, out: &mut Vec<Event>) {
        if byte & 0xC0 != 0x80 {
            // Truncated character: report it and reprocess the byte.
            out.push(replacement_key(self.utf8_alt));
            self.utf8.clear();
            self.state = ParserState::Ground;
            self.ground(byte, out);
            return;
        }

        self.utf8.push(byte);
        if self.utf8.len() < self.utf8_expected {
            return;
        }

        let key = match std::str::from_utf8(&self.utf8).ok().and_then(|s| s.chars().next()) {
            Some(c) => {
                let mods = if self.utf8_alt {
                    Modifiers::ALT
                } else {
                    Modifiers::NONE
                };
                Event::Key(KeyEvent::new(KeyCode::Char(c)).with_modifiers(mods))
            }
            None => replacement_key(self.utf8_alt),
        };
        self.utf8.clear();
        self.state = ParserState::Ground;
        out.push(key);
    }
}

/// Key for a C0 control byte or DEL.
fn control_key(byte: u8) -> KeyEvent {
    let ctrl = |c: char| KeyEvent::new(KeyCode::Char(c)).with_modifiers(Modifiers::CTRL);
    match byte {
        0x00 => ctrl(' '),
        0x08 => KeyEvent::new(KeyCode::Backspace),
        0x7F => KeyEvent::new(KeyCode::Delete),
        0x09 => KeyEvent::new(KeyCode::Tab),
        0x0A | 0x0D => KeyEvent::new(KeyCode::Enter),
        0x1B => KeyEvent::new(KeyCode::Escape),
        0x01..=0x1A => ctrl((b'a' + byte - 1) as char),
        0x1C => ctrl('\\'),
        0x1D => ctrl(']'),
        0x1E => ctrl('^'),
        _ => ctrl('_'),
    }
}

fn replacement_key(alt: bool) -> Event {
    let mods = if alt { Modifiers::ALT } else { Modifiers::NONE };
    Event::Key(KeyEvent::new(KeyCode::Char(char::REPLACEMENT_CHARACTER)).with_modifiers(mods))
}

/// Split `1;5` style parameters. Empty fields read as 0.
fn parse_params(params: &[u8]) -> Option<Vec<u32>> {
    if params.is_empty() {
        return Some(Vec::new());
    }
    params
        .split(|&b| b == b';')
        .map(|field| {
            if field.is_empty() {
                return Some(0);
            }
            std::str::from_utf8(field).ok()?.parse::<u32>().ok()
        })
        .collect()
}

/// xterm modifier parameter: 1 + bitmask (shift=1, alt=2, ctrl=4).
fn xterm_modifiers(param: Option<&u32>) -> Modifiers {
    let Some(&value) = param else {
        return Modifiers::NONE;
    };
    let bits = value.saturating_sub(1);
    let mut mods = Modifiers::NONE;
    if bits & 1 != 0 {
        mods |= Modifiers::SHIFT;
    }
    if bits & 2 != 0 {
        mods |= Modifiers::ALT;
    }
    if bits & 4 != 0 {
        mods |= Modifiers::CTRL;
    }
    mods
}

fn cursor_key(params: &[u8], final_byte: u8) -> Option<Event> {
    let params = parse_params(params)?;
    if params.len() > 2 {
        return None;
    }
    let code = match final_byte {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        // Modified F1-F4 (`CSI 1;5P`); unmodified they arrive via SS3.
        b'P' if !params.is_empty() => KeyCode::F(1),
        b'Q' if !params.is_empty() => KeyCode::F(2),
        b'R' if !params.is_empty() => KeyCode::F(3),
        b'S' if !params.is_empty() => KeyCode::F(4),
        _ => return None,
    };
    let mods = xterm_modifiers(params.get(1));
    Some(Event::Key(KeyEvent::new(code).with_modifiers(mods)))
}

fn tilde_key(params: &[u8]) -> Option<Event> {
    let params = parse_params(params)?;
    let code = match *params.first()? {
        1 | 7 => KeyCode::Home,
        2 => KeyCode::Insert,
        3 => KeyCode::Delete,
        4 | 8 => KeyCode::End,
        5 => KeyCode::PageUp,
        6 => KeyCode::PageDown,
        n @ 11..=15 => KeyCode::F((n - 10) as u8),
        n @ 17..=21 => KeyCode::F((n - 11) as u8),
        n @ 23..=24 => KeyCode::F((n - 12) as u8),
        _ => return None,
    };
    let mods = xterm_modifiers(params.get(1));
    Some(Event::Key(KeyEvent::new(code).with_modifiers(mods)))
}

/// Decode `CSI < code ; x ; y (M|m)`.
fn parse_sgr_mouse(params: &[u8], pressed: bool) -> Option<Event> {
    let params = parse_params(params)?;
    let [code, x, y] = params.as_slice() else {
        return None;
    };
    let code = *code;

    let mut mods = Modifiers::NONE;
    let mod_bits = (code >> 2) & 0b111;
    if mod_bits & 0b001 != 0 {
        mods |= Modifiers::SHIFT;
    }
    if mod_bits & 0b010 != 0 {
        mods |= Modifiers::ALT;
    }
    if mod_bits & 0b100 != 0 {
        mods |= Modifiers::CTRL;
    }

    let button = match code & 0b11 {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Middle),
        2 => Some(MouseButton::Right),
        _ => None,
    };

    let kind = if code & 64 != 0 {
        match code & 0b11 {
            0 => MouseEventKind::ScrollUp,
            1 => MouseEventKind::ScrollDown,
            2 => MouseEventKind::ScrollLeft,
            _ => MouseEventKind::ScrollRight,
        }
    } else if code & 32 != 0 {
        match button {
            Some(button) => MouseEventKind::Drag(button),
            None => MouseEventKind::Moved,
        }
    } else if pressed {
        MouseEventKind::Press(button?)
    } else {
        MouseEventKind::Release(button?)
    };

    let x = u16::try_from(x.saturating_sub(1)).unwrap_or(u16::MAX);
    let y = u16::try_from(y.saturating_sub(1)).unwrap_or(u16::MAX);
    Some(Event::Mouse(MouseEvent::new(kind, x, y).with_modifiers(mods)))
}
