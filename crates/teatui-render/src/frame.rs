#![forbid(unsafe_code)]

//! Frame cache and line-diff engine.
//!
//! A view is a string; a frame is that string split into lines, truncated
//! to the terminal width and clipped to the terminal height. [`FrameWriter`]
//! keeps the last frame it emitted and, given a new view, writes only the
//! operations needed to get the screen from one to the other.
//!
//! # Strategy
//!
//! - **Inline** (main screen): every flush is a full redraw. The cursor goes
//!   back to the first row of the previous frame with carriage return and
//!   cursor-up rather than `CSI H`, since the view does not own the top of
//!   the screen. Each line is rewritten and erased to the right, and
//!   leftover rows are erased below.
//! - **Alt screen**: the first frame (or a forced one) is a full redraw from
//!   the home position. Later frames repaint only the rows that changed.
//!
//! [`FrameWriter`] is pure: it never spawns threads or sleeps, and writes
//! into any [`Write`]. The threaded coalescing lives in
//! [`crate::renderer`].

use std::borrow::Cow;
use std::io::{self, Write};
use std::ops::Range;

use unicode_width::UnicodeWidthChar;

use crate::ansi;

/// Terminal size assumed until one is set explicitly.
pub const DEFAULT_WIDTH: u16 = 80;
/// See [`DEFAULT_WIDTH`].
pub const DEFAULT_HEIGHT: u16 = 24;

// =============================================================================
// Width
// =============================================================================

/// Display columns occupied by `line`, not counting escape sequences.
#[must_use]
pub fn display_width(line: &str) -> usize {
    let mut width = 0;
    for segment in Segments::new(line) {
        if let Segment::Text(c) = segment {
            width += c.width().unwrap_or(0);
        }
    }
    width
}

/// Cut `line` so it occupies at most `width` columns.
///
/// Escape sequences are kept, including those past the cut, so style resets
/// at the end of a line still reach the terminal. A wide character that
/// would straddle the edge is dropped.
#[must_use]
pub fn truncate_line(line: &str, width: usize) -> Cow<'_, str> {
    if display_width(line) <= width {
        return Cow::Borrowed(line);
    }
    let mut out = String::with_capacity(line.len());
    let mut used = 0;
    for segment in Segments::new(line) {
        match segment {
            Segment::Escape(seq) => out.push_str(seq),
            Segment::Text(c) => {
                let w = c.width().unwrap_or(0);
                if used + w <= width {
                    used += w;
                    out.push(c);
                } else {
                    used = width;
                }
            }
        }
    }
    Cow::Owned(out)
}

enum Segment<'a> {
    Text(char),
    Escape(&'a str),
}

/// Splits a line into printable characters and CSI/OSC sequences.
struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn escape_len(s: &str) -> usize {
        let bytes = s.as_bytes();
        match bytes.get(1) {
            Some(b'[') => bytes[2..]
                .iter()
                .position(|b| (0x40..=0x7E).contains(b))
                .map_or(bytes.len(), |i| i + 3),
            Some(b']') => {
                let mut i = 2;
                while i < bytes.len() {
                    match bytes[i] {
                        0x07 => return i + 1,
                        0x1B if bytes.get(i + 1) == Some(&b'\\') => return i + 2,
                        _ => i += 1,
                    }
                }
                bytes.len()
            }
            Some(_) => 2,
            None => 1,
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.rest.chars().next()?;
        if c == '\x1b' {
            let mut len = Self::escape_len(self.rest);
            while !self.rest.is_char_boundary(len) {
                len += 1;
            }
            let (seq, rest) = self.rest.split_at(len);
            self.rest = rest;
            Some(Segment::Escape(seq))
        } else {
            self.rest = &self.rest[c.len_utf8()..];
            Some(Segment::Text(c))
        }
    }
}

// =============================================================================
// LineFrame
// =============================================================================

/// A view cut into the lines that fit the terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineFrame {
    lines: Vec<String>,
}

impl LineFrame {
    /// Split `view` on newlines, truncate each line to `width` columns and
    /// keep only the last `height` lines.
    #[must_use]
    pub fn from_view(view: &str, width: u16, height: u16) -> Self {
        let all: Vec<&str> = view.split('\n').collect();
        let skip = all.len().saturating_sub(usize::from(height));
        let lines = all[skip..]
            .iter()
            .map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                truncate_line(line, usize::from(width)).into_owned()
            })
            .collect();
        Self { lines }
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn get(&self, row: usize) -> Option<&str> {
        self.lines.get(row).map(String::as_str)
    }
}

// =============================================================================
// IgnoredLines
// =============================================================================

/// Rows the diff may leave alone when they change on their own.
///
/// Rows are zero-based. A row is ignored when it falls in a registered range
/// or when its new content contains a registered pattern.
#[derive(Debug, Clone, Default)]
pub struct IgnoredLines {
    ranges: Vec<Range<usize>>,
    patterns: Vec<String>,
}

impl IgnoredLines {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore rows in `rows` (zero-based, end exclusive).
    pub fn add_range(&mut self, rows: Range<usize>) {
        if !rows.is_empty() {
            self.ranges.push(rows);
        }
    }

    /// Ignore any row whose content contains `pattern`.
    pub fn add_pattern(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        if !pattern.is_empty() {
            self.patterns.push(pattern);
        }
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
        self.patterns.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && self.patterns.is_empty()
    }

    /// Whether `row`, holding `content`, is ignored.
    #[must_use]
    pub fn contains(&self, row: usize, content: &str) -> bool {
        self.ranges.iter().any(|r| r.contains(&row))
            || self.patterns.iter().any(|p| content.contains(p.as_str()))
    }
}

// =============================================================================
// ScrollOp
// =============================================================================

/// Scroll-region operation. Boundaries are one-based terminal rows,
/// inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollOp {
    /// Replace the whole region with `lines`.
    Sync {
        lines: Vec<String>,
        top: u16,
        bottom: u16,
    },
    /// Push `lines` in at the top of the region; content moves down.
    InsertTop {
        lines: Vec<String>,
        top: u16,
        bottom: u16,
    },
    /// Push `lines` in at the bottom of the region; content moves up.
    InsertBottom {
        lines: Vec<String>,
        top: u16,
        bottom: u16,
    },
    /// Forget the region and repaint normally.
    Clear,
}

// =============================================================================
// FrameWriter
// =============================================================================

/// Line-diff engine over a cached frame.
#[derive(Debug)]
pub struct FrameWriter {
    last: Option<LineFrame>,
    last_view: Option<String>,
    width: u16,
    height: u16,
    alt_screen: bool,
    /// Rows the inline view currently occupies.
    lines_rendered: usize,
    /// `lines_rendered` of the main screen while the alt screen is up.
    inline_rows_saved: usize,
    ignored: IgnoredLines,
    queued: Vec<String>,
    force_full: bool,
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl FrameWriter {
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            last: None,
            last_view: None,
            width: width.max(1),
            height: height.max(1),
            alt_screen: false,
            lines_rendered: 0,
            inline_rows_saved: 0,
            ignored: IgnoredLines::new(),
            queued: Vec::new(),
            force_full: true,
        }
    }

    #[must_use]
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Set the terminal size. The next flush redraws everything.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.force_full = true;
    }

    #[must_use]
    pub fn alt_screen(&self) -> bool {
        self.alt_screen
    }

    /// Record an alt-screen switch. The caller emits the sequence.
    pub fn set_alt_screen(&mut self, on: bool) {
        if self.alt_screen == on {
            return;
        }
        if on {
            self.inline_rows_saved = self.lines_rendered;
            self.lines_rendered = 0;
        } else {
            self.lines_rendered = self.inline_rows_saved;
            self.inline_rows_saved = 0;
        }
        self.alt_screen = on;
        self.last = None;
        self.force_full = true;
    }

    /// Drop the frame cache so the next flush is a full redraw.
    pub fn invalidate(&mut self) {
        self.last = None;
        self.force_full = true;
    }

    /// Treat `view` as already on screen.
    pub fn mark_clean(&mut self, view: &str) {
        self.force_full = false;
        self.last_view = Some(view.to_owned());
    }

    /// Forget the inline view's position, as after the screen was cleared
    /// and the cursor homed.
    pub fn reset_position(&mut self) {
        self.lines_rendered = 0;
        self.invalidate();
    }

    #[must_use]
    pub fn ignored(&self) -> &IgnoredLines {
        &self.ignored
    }

    pub fn ignored_mut(&mut self) -> &mut IgnoredLines {
        &mut self.ignored
    }

    /// The last frame written, if any.
    #[must_use]
    pub fn last_frame(&self) -> Option<&LineFrame> {
        self.last.as_ref()
    }

    #[must_use]
    pub fn lines_rendered(&self) -> usize {
        self.lines_rendered
    }

    /// Queue lines to print above the inline view on the next flush.
    ///
    /// Ignored while the alt screen is active.
    pub fn queue_print(&mut self, text: &str) {
        if self.alt_screen {
            return;
        }
        self.queued.extend(text.split('\n').map(str::to_owned));
    }

    #[must_use]
    pub fn has_queued(&self) -> bool {
        !self.queued.is_empty()
    }

    /// True when flushing `view` would write something.
    #[must_use]
    pub fn is_dirty(&self, view: &str) -> bool {
        self.force_full || !self.queued.is_empty() || self.last_view.as_deref() != Some(view)
    }

    /// Write whatever is needed to show `view`. Returns false when nothing
    /// changed.
    pub fn flush<W: Write>(&mut self, w: &mut W, view: &str) -> io::Result<bool> {
        if !self.is_dirty(view) {
            return Ok(false);
        }
        let frame = LineFrame::from_view(view, self.width, self.height);

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "teatui.render.flush",
            lines = frame.len(),
            alt_screen = self.alt_screen
        )
        .entered();

        match self.last.take() {
            Some(prev) if self.alt_screen && !self.force_full => {
                self.write_diff(w, &prev, &frame)?;
            }
            prev => self.write_full(w, prev.as_ref(), &frame)?,
        }

        self.force_full = false;
        self.last_view = Some(view.to_owned());
        self.last = Some(frame);
        Ok(true)
    }

    fn write_full<W: Write>(
        &mut self,
        w: &mut W,
        prev: Option<&LineFrame>,
        frame: &LineFrame,
    ) -> io::Result<()> {
        let prev_rows = if self.alt_screen {
            prev.map_or(0, LineFrame::len)
        } else {
            self.lines_rendered
        };

        if self.alt_screen {
            w.write_all(ansi::CURSOR_HOME)?;
        } else {
            ansi::carriage_return(w)?;
            let up = u16::try_from(self.lines_rendered.saturating_sub(1)).unwrap_or(u16::MAX);
            ansi::cursor_up(w, up)?;
        }

        let printed = std::mem::take(&mut self.queued);
        for line in &printed {
            w.write_all(truncate_line(line, usize::from(self.width)).as_bytes())?;
            w.write_all(ansi::ERASE_LINE_RIGHT)?;
            w.write_all(b"\r\n")?;
        }

        for (i, line) in frame.lines().iter().enumerate() {
            if i > 0 {
                w.write_all(b"\r\n")?;
            }
            w.write_all(line.as_bytes())?;
            w.write_all(ansi::ERASE_LINE_RIGHT)?;
        }

        if printed.len() + frame.len() < prev_rows {
            w.write_all(ansi::ERASE_DOWN)?;
        }
        self.lines_rendered = frame.len();
        Ok(())
    }

    fn write_diff<W: Write>(
        &mut self,
        w: &mut W,
        prev: &LineFrame,
        frame: &LineFrame,
    ) -> io::Result<()> {
        let rows = prev.len().max(frame.len()).min(usize::from(self.height));
        let changed = |row: usize| prev.get(row) != frame.get(row);

        for row in 0..rows {
            if !changed(row) {
                continue;
            }
            let isolated = (row == 0 || !changed(row - 1)) && !changed(row + 1);
            if isolated && self.ignored.contains(row, frame.get(row).unwrap_or("")) {
                continue;
            }
            let term_row = u16::try_from(row + 1).unwrap_or(u16::MAX);
            ansi::cursor_position(w, term_row, 1)?;
            w.write_all(ansi::ERASE_LINE)?;
            if let Some(line) = frame.get(row) {
                w.write_all(line.as_bytes())?;
            }
        }
        self.lines_rendered = frame.len();
        Ok(())
    }

    /// Apply a scroll-region operation immediately.
    ///
    /// The region rows are registered as ignored so the next diff does not
    /// undo the scroll. [`ScrollOp::Clear`] drops them and forces a redraw.
    pub fn scroll<W: Write>(&mut self, w: &mut W, op: ScrollOp) -> io::Result<()> {
        let (lines, top, bottom) = match op {
            ScrollOp::Clear => {
                self.ignored.clear();
                self.invalidate();
                return Ok(());
            }
            ScrollOp::Sync {
                ref lines,
                top,
                bottom,
            }
            | ScrollOp::InsertTop {
                ref lines,
                top,
                bottom,
            }
            | ScrollOp::InsertBottom {
                ref lines,
                top,
                bottom,
            } => (lines, top, bottom),
        };

        let top = top.max(1);
        let bottom = bottom.min(self.height);
        if top > bottom {
            return Ok(());
        }
        // Inserting nothing must not shift the region.
        if lines.is_empty() && !matches!(op, ScrollOp::Sync { .. }) {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("teatui.render.scroll", top, bottom, lines = lines.len())
            .entered();

        let width = usize::from(self.width);
        let region_rows = usize::from(bottom - top) + 1;
        ansi::set_scroll_region(w, top, bottom)?;

        match op {
            ScrollOp::Sync { .. } => {
                self.ignored.clear();
                for offset in 0..region_rows {
                    let row = top + u16::try_from(offset).unwrap_or(u16::MAX);
                    ansi::cursor_position(w, row, 1)?;
                    w.write_all(ansi::ERASE_LINE)?;
                    if let Some(line) = lines.get(offset) {
                        w.write_all(truncate_line(line, width).as_bytes())?;
                    }
                }
            }
            ScrollOp::InsertTop { .. } => {
                let shown = &lines[..lines.len().min(region_rows)];
                ansi::cursor_position(w, top, 1)?;
                ansi::insert_lines(w, shown.len())?;
                write_joined(w, shown, width)?;
            }
            ScrollOp::InsertBottom { .. } => {
                let shown = &lines[lines.len().saturating_sub(region_rows)..];
                ansi::cursor_position(w, bottom, 1)?;
                w.write_all(b"\r\n")?;
                write_joined(w, shown, width)?;
            }
            ScrollOp::Clear => {}
        }

        ansi::reset_scroll_region(w, self.height)?;
        let park = u16::try_from(self.lines_rendered.max(1)).unwrap_or(u16::MAX);
        ansi::cursor_position(w, park, 1)?;

        self.ignored
            .add_range(usize::from(top - 1)..usize::from(bottom));
        Ok(())
    }
}

fn write_joined<W: Write>(w: &mut W, lines: &[String], width: usize) -> io::Result<()> {
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            w.write_all(b"\r\n")?;
        }
        w.write_all(truncate_line(line, width).as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn flush(fw: &mut FrameWriter, view: &str) -> Vec<u8> {
        let mut out = Vec::new();
        fw.flush(&mut out, view).unwrap();
        out
    }

    fn alt_writer(w: u16, h: u16) -> FrameWriter {
        let mut fw = FrameWriter::new(w, h);
        fw.set_alt_screen(true);
        fw
    }

    // --- width ---

    #[test]
    fn width_skips_escape_sequences() {
        assert_eq!(display_width("\x1b[31mred\x1b[0m"), 3);
        assert_eq!(display_width("\x1b]0;title\x07ok"), 2);
        assert_eq!(display_width("日本"), 4);
    }

    #[test]
    fn truncate_counts_columns_not_bytes() {
        assert_eq!(truncate_line("hello world", 5), "hello");
        assert_eq!(truncate_line("日本語", 5), "日本");
        assert_eq!(truncate_line("short", 80), "short");
    }

    #[test]
    fn truncate_keeps_trailing_reset() {
        let line = "\x1b[1mbold text\x1b[0m";
        assert_eq!(truncate_line(line, 4), "\x1b[1mbold\x1b[0m");
    }

    #[test]
    fn frame_keeps_last_height_lines() {
        let view: Vec<String> = (0..20).map(|i| format!("line {i}")).collect();
        let frame = LineFrame::from_view(&view.join("\n"), 80, 10);
        assert_eq!(frame.len(), 10);
        assert_eq!(frame.lines()[0], "line 10");
        assert_eq!(frame.lines()[9], "line 19");
    }

    // --- inline ---

    #[test]
    fn first_inline_frame_is_full_redraw() {
        let mut fw = FrameWriter::new(80, 24);
        let out = flush(&mut fw, "a\nb");
        assert_eq!(out, b"\ra\x1b[K\r\nb\x1b[K");
        assert_eq!(fw.lines_rendered(), 2);
    }

    #[test]
    fn inline_redraw_moves_up_and_clears_stale_rows() {
        let mut fw = FrameWriter::new(80, 24);
        flush(&mut fw, "a\nb\nc");
        let out = flush(&mut fw, "x");
        assert!(out.starts_with(b"\r\x1b[2A"));
        assert!(contains(&out, b"x\x1b[K"));
        assert!(out.ends_with(ansi::ERASE_DOWN));
    }

    #[test]
    fn unchanged_view_writes_nothing() {
        let mut fw = FrameWriter::new(80, 24);
        flush(&mut fw, "same");
        assert!(flush(&mut fw, "same").is_empty());
    }

    #[test]
    fn queued_prints_go_above_view() {
        let mut fw = FrameWriter::new(80, 24);
        flush(&mut fw, "view");
        fw.queue_print("log line");
        let out = flush(&mut fw, "view");
        let text = String::from_utf8(out).unwrap();
        let log = text.find("log line").unwrap();
        let view = text.find("view").unwrap();
        assert!(log < view);
        assert_eq!(fw.lines_rendered(), 1);
        assert!(!fw.has_queued());
    }

    #[test]
    fn prints_are_dropped_in_alt_screen() {
        let mut fw = alt_writer(80, 24);
        fw.queue_print("hidden");
        assert!(!fw.has_queued());
    }

    // --- alt screen ---

    #[test]
    fn alt_screen_first_frame_starts_home() {
        let mut fw = alt_writer(80, 24);
        let out = flush(&mut fw, "one\ntwo");
        assert!(out.starts_with(ansi::CURSOR_HOME));
    }

    #[test]
    fn changing_one_line_repositions_to_that_row() {
        let mut fw = alt_writer(80, 24);
        flush(&mut fw, "l0\nl1\nl2\nl3\nl4");
        let out = flush(&mut fw, "l0\nl1\nCHANGED\nl3\nl4");

        assert!(contains(&out, b"\x1b[3;1H"));
        assert!(contains(&out, b"CHANGED"));
        assert!(!contains(&out, ansi::ERASE_SCREEN));
        assert!(!contains(&out, b"l0"));
        assert!(!contains(&out, b"l4"));
    }

    #[test]
    fn removed_rows_are_erased() {
        let mut fw = alt_writer(80, 24);
        flush(&mut fw, "a\nb\nc");
        let out = flush(&mut fw, "a");
        assert_eq!(out, b"\x1b[2;1H\x1b[2K\x1b[3;1H\x1b[2K");
    }

    #[test]
    fn isolated_change_on_ignored_row_is_skipped() {
        let mut fw = alt_writer(80, 24);
        flush(&mut fw, "a\nb\nc\nd");
        fw.ignored_mut().add_range(1..2);
        let out = flush(&mut fw, "a\nB\nc\nd");
        assert!(out.is_empty());
    }

    #[test]
    fn ignored_row_with_changed_neighbour_is_painted() {
        let mut fw = alt_writer(80, 24);
        flush(&mut fw, "a\nb\nc\nd");
        fw.ignored_mut().add_range(1..2);
        let out = flush(&mut fw, "a\nB\nC\nd");
        assert!(contains(&out, b"\x1b[2;1H"));
        assert!(contains(&out, b"\x1b[3;1H"));
    }

    #[test]
    fn ignored_pattern_matches_content() {
        let mut fw = alt_writer(80, 24);
        flush(&mut fw, "a\nclock 1\nc");
        fw.ignored_mut().add_pattern("clock");
        assert!(flush(&mut fw, "a\nclock 2\nc").is_empty());
    }

    #[test]
    fn resize_forces_full_redraw() {
        let mut fw = alt_writer(80, 24);
        flush(&mut fw, "a\nb");
        fw.resize(40, 12);
        let out = flush(&mut fw, "a\nb");
        assert!(out.starts_with(ansi::CURSOR_HOME));
        assert_eq!(fw.size(), (40, 12));
    }

    #[test]
    fn small_terminal_bounds_rows() {
        let mut fw = alt_writer(80, 10);
        let view: Vec<String> = (0..20).map(|i| format!("row {i}")).collect();
        flush(&mut fw, &view.join("\n"));
        let changed: Vec<String> = (0..20).map(|i| format!("new {i}")).collect();
        let out = flush(&mut fw, &changed.join("\n"));
        assert!(!contains(&out, b"\x1b[11;1H"));
        assert_eq!(count(&out, ansi::ERASE_LINE), 10);
    }

    // --- scroll ---

    #[test]
    fn insert_top_uses_region_and_insert_line() {
        let mut fw = alt_writer(80, 24);
        flush(&mut fw, "header\nbody");
        let mut out = Vec::new();
        fw.scroll(
            &mut out,
            ScrollOp::InsertTop {
                lines: vec!["new".into()],
                top: 2,
                bottom: 10,
            },
        )
        .unwrap();
        assert_eq!(out, b"\x1b[2;10r\x1b[2;1H\x1b[1Lnew\x1b[0;24r\x1b[2;1H");
        assert!(fw.ignored().contains(1, ""));
        assert!(fw.ignored().contains(9, ""));
        assert!(!fw.ignored().contains(10, ""));
    }

    #[test]
    fn insert_bottom_scrolls_with_newline() {
        let mut fw = alt_writer(80, 24);
        let mut out = Vec::new();
        fw.scroll(
            &mut out,
            ScrollOp::InsertBottom {
                lines: vec!["x".into(), "y".into()],
                top: 1,
                bottom: 5,
            },
        )
        .unwrap();
        assert_eq!(out, b"\x1b[1;5r\x1b[5;1H\r\nx\r\ny\x1b[0;24r\x1b[1;1H");
    }

    #[test]
    fn empty_inserts_write_nothing() {
        let mut fw = alt_writer(80, 24);
        for op in [
            ScrollOp::InsertTop {
                lines: Vec::new(),
                top: 2,
                bottom: 10,
            },
            ScrollOp::InsertBottom {
                lines: Vec::new(),
                top: 2,
                bottom: 10,
            },
        ] {
            let mut out = Vec::new();
            fw.scroll(&mut out, op).unwrap();
            assert!(out.is_empty(), "{out:?}");
        }
        assert!(!fw.ignored().contains(1, ""));
    }

    #[test]
    fn sync_rewrites_every_region_row() {
        let mut fw = alt_writer(80, 24);
        let mut out = Vec::new();
        fw.scroll(
            &mut out,
            ScrollOp::Sync {
                lines: vec!["a".into()],
                top: 3,
                bottom: 4,
            },
        )
        .unwrap();
        assert!(contains(&out, b"\x1b[3;1H\x1b[2Ka"));
        assert!(contains(&out, b"\x1b[4;1H\x1b[2K\x1b[0;24r"));
    }

    #[test]
    fn clear_forgets_region_and_forces_redraw() {
        let mut fw = alt_writer(80, 24);
        flush(&mut fw, "a");
        let mut out = Vec::new();
        fw.scroll(
            &mut out,
            ScrollOp::InsertTop {
                lines: vec!["x".into()],
                top: 1,
                bottom: 3,
            },
        )
        .unwrap();
        fw.scroll(&mut out, ScrollOp::Clear).unwrap();
        assert!(fw.ignored().is_empty());
        assert!(flush(&mut fw, "a").starts_with(ansi::CURSOR_HOME));
    }

    #[test]
    fn inverted_region_is_ignored() {
        let mut fw = alt_writer(80, 24);
        let mut out = Vec::new();
        fw.scroll(
            &mut out,
            ScrollOp::InsertTop {
                lines: vec!["x".into()],
                top: 9,
                bottom: 3,
            },
        )
        .unwrap();
        assert!(out.is_empty());
    }
}
