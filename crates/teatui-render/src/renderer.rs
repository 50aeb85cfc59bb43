#![forbid(unsafe_code)]

//! The [`Renderer`] seam and its two implementations.
//!
//! [`StandardRenderer`] owns the output stream behind a mutex. Views are
//! submitted with [`Renderer::write`] and flushed by a background ticker
//! thread, either when a short deferral after the last submission runs out
//! or on the next frame-rate tick, whichever comes first. Rapid submissions
//! therefore collapse into one physical write. Mode toggles and scroll
//! operations are written straight away.
//!
//! [`NilRenderer`] tracks modes and discards everything else.

use std::io::{self, Write};
use std::ops::Range;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::frame::{FrameWriter, ScrollOp};
use crate::modes::{MouseMode, TerminalModes};

/// Frame rate used when none is configured.
pub const DEFAULT_FPS: u32 = 60;
/// Highest accepted frame rate.
pub const MAX_FPS: u32 = 120;

/// Delay between a submission and its flush.
const FLUSH_DEFERRAL: Duration = Duration::from_millis(16);

/// Clamp a requested frame rate to `1..=MAX_FPS`.
#[must_use]
pub fn clamp_fps(fps: u32) -> u32 {
    fps.clamp(1, MAX_FPS)
}

/// Everything the runtime asks of a renderer.
///
/// Methods that write to the terminal return the write error; the caller
/// decides whether it matters.
pub trait Renderer: Send {
    /// Begin flushing submitted views.
    fn start(&mut self) -> io::Result<()>;
    /// Flush the last view and stop. The cursor is left on a fresh line
    /// below an inline view, and a later start draws from there.
    fn stop(&mut self) -> io::Result<()>;
    /// Stop without flushing.
    fn kill(&mut self);
    /// Submit a view. It reaches the terminal on a later flush.
    fn write(&mut self, view: String);
    /// Redraw everything now.
    fn repaint(&mut self) -> io::Result<()>;
    /// Erase the screen and redraw.
    fn clear_screen(&mut self) -> io::Result<()>;
    fn enter_alt_screen(&mut self) -> io::Result<()>;
    fn exit_alt_screen(&mut self) -> io::Result<()>;
    fn show_cursor(&mut self) -> io::Result<()>;
    fn hide_cursor(&mut self) -> io::Result<()>;
    fn set_mouse_mode(&mut self, mode: MouseMode) -> io::Result<()>;
    fn set_bracketed_paste(&mut self, on: bool) -> io::Result<()>;
    fn set_report_focus(&mut self, on: bool) -> io::Result<()>;
    fn set_window_title(&mut self, title: &str) -> io::Result<()>;
    /// Record the terminal size used to bound the next frames.
    fn resize(&mut self, width: u16, height: u16);
    /// Print `text` above the inline view. Ignored in the alt screen.
    fn print_lines(&mut self, text: &str);
    fn scroll(&mut self, op: ScrollOp) -> io::Result<()>;
    /// Modes currently in effect.
    fn modes(&self) -> TerminalModes;
    /// Move the terminal to `modes`, writing only the differences.
    fn apply_modes(&mut self, modes: &TerminalModes) -> io::Result<()>;
    /// Flush the last view, then turn every mode off.
    fn reset_modes(&mut self) -> io::Result<()>;
}

// =============================================================================
// StandardRenderer
// =============================================================================

struct State<W> {
    out: W,
    frame: FrameWriter,
    modes: TerminalModes,
    view: String,
    deadline: Option<Instant>,
    shutdown: bool,
}

impl<W: Write> State<W> {
    /// Write the current view if it differs from what is on screen.
    fn flush(&mut self) -> io::Result<()> {
        self.deadline = None;
        let mut buf = Vec::new();
        if self.frame.flush(&mut buf, &self.view)? {
            self.emit(&buf)?;
        }
        Ok(())
    }

    fn emit(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.out.write_all(bytes)?;
        self.out.flush()
    }

    /// Run a mode toggle against a scratch buffer and write the result.
    fn toggle<F>(&mut self, f: F) -> io::Result<bool>
    where
        F: FnOnce(&mut TerminalModes, &mut Vec<u8>) -> io::Result<bool>,
    {
        let mut buf = Vec::new();
        let changed = f(&mut self.modes, &mut buf)?;
        self.emit(&buf)?;
        Ok(changed)
    }
}

type Shared<W> = Arc<(Mutex<State<W>>, Condvar)>;

fn lock<W>(shared: &Shared<W>) -> MutexGuard<'_, State<W>> {
    shared.0.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(feature = "tracing")]
fn report(err: &io::Error) {
    tracing::warn!(error = %err, "renderer flush failed");
}

#[cfg(not(feature = "tracing"))]
fn report(_err: &io::Error) {}

/// Threaded renderer writing to `W`.
pub struct StandardRenderer<W: Write + Send + 'static> {
    shared: Shared<W>,
    interval: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl<W: Write + Send + 'static> std::fmt::Debug for StandardRenderer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardRenderer")
            .field("interval", &self.interval)
            .field("running", &self.ticker.is_some())
            .finish()
    }
}

impl<W: Write + Send + 'static> StandardRenderer<W> {
    /// Renderer over `out` flushing at most `fps` times a second (clamped).
    pub fn new(out: W, fps: u32) -> Self {
        let state = State {
            out,
            frame: FrameWriter::default(),
            modes: TerminalModes::new(),
            view: String::new(),
            deadline: None,
            shutdown: false,
        };
        Self {
            shared: Arc::new((Mutex::new(state), Condvar::new())),
            interval: Duration::from_secs(1) / clamp_fps(fps),
            ticker: None,
        }
    }

    /// Time between periodic flushes.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Skip rows in `rows` (zero-based) when they change on their own.
    pub fn ignore_rows(&self, rows: Range<usize>) {
        lock(&self.shared).frame.ignored_mut().add_range(rows);
    }

    /// Skip rows containing `pattern` when they change on their own.
    pub fn ignore_pattern(&self, pattern: &str) {
        lock(&self.shared).frame.ignored_mut().add_pattern(pattern);
    }

    pub fn clear_ignored(&self) {
        lock(&self.shared).frame.ignored_mut().clear();
    }

    /// Flush now if anything is pending.
    pub fn flush(&self) -> io::Result<()> {
        lock(&self.shared).flush()
    }

    fn halt(&mut self) {
        let Some(ticker) = self.ticker.take() else {
            return;
        };
        lock(&self.shared).shutdown = true;
        self.shared.1.notify_all();
        if ticker.join().is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!("render ticker panicked");
        }
    }
}

fn tick_loop<W: Write>(shared: &Shared<W>, interval: Duration) {
    let mut next_tick = Instant::now() + interval;
    let mut state = lock(shared);
    loop {
        if state.shutdown {
            return;
        }
        let now = Instant::now();
        let due = state.deadline.is_some_and(|d| d <= now) || next_tick <= now;
        if due {
            if next_tick <= now {
                next_tick = now + interval;
            }
            if let Err(err) = state.flush() {
                report(&err);
            }
            continue;
        }
        let wake = state.deadline.map_or(next_tick, |d| d.min(next_tick));
        let timeout = wake.saturating_duration_since(now);
        state = shared
            .1
            .wait_timeout(state, timeout)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
}

impl<W: Write + Send + 'static> Renderer for StandardRenderer<W> {
    fn start(&mut self) -> io::Result<()> {
        if self.ticker.is_some() {
            return Ok(());
        }
        lock(&self.shared).shutdown = false;
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        let ticker = std::thread::Builder::new()
            .name("teatui-render".into())
            .spawn(move || tick_loop(&shared, interval))?;
        self.ticker = Some(ticker);
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        self.halt();
        let mut state = lock(&self.shared);
        state.flush()?;
        if !state.frame.alt_screen() && state.frame.lines_rendered() > 0 {
            state.emit(b"\r\n")?;
        }
        state.frame.reset_position();
        Ok(())
    }

    fn kill(&mut self) {
        self.halt();
    }

    fn write(&mut self, view: String) {
        let mut state = lock(&self.shared);
        state.view = view;
        state.deadline = Some(Instant::now() + FLUSH_DEFERRAL);
        drop(state);
        self.shared.1.notify_all();
    }

    fn repaint(&mut self) -> io::Result<()> {
        let mut state = lock(&self.shared);
        state.frame.invalidate();
        state.flush()
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        let mut state = lock(&self.shared);
        let mut buf = Vec::new();
        crate::ansi::clear_screen(&mut buf)?;
        state.emit(&buf)?;
        state.frame.reset_position();
        state.flush()
    }

    fn enter_alt_screen(&mut self) -> io::Result<()> {
        let mut state = lock(&self.shared);
        if state.toggle(|m, w| m.set_alt_screen(w, true))? {
            state.frame.set_alt_screen(true);
        }
        Ok(())
    }

    fn exit_alt_screen(&mut self) -> io::Result<()> {
        let mut state = lock(&self.shared);
        if state.toggle(|m, w| m.set_alt_screen(w, false))? {
            state.frame.set_alt_screen(false);
        }
        Ok(())
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        lock(&self.shared)
            .toggle(|m, w| m.set_cursor_hidden(w, false))
            .map(drop)
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        lock(&self.shared)
            .toggle(|m, w| m.set_cursor_hidden(w, true))
            .map(drop)
    }

    fn set_mouse_mode(&mut self, mode: MouseMode) -> io::Result<()> {
        lock(&self.shared)
            .toggle(|m, w| m.set_mouse(w, mode))
            .map(drop)
    }

    fn set_bracketed_paste(&mut self, on: bool) -> io::Result<()> {
        lock(&self.shared)
            .toggle(|m, w| m.set_bracketed_paste(w, on))
            .map(drop)
    }

    fn set_report_focus(&mut self, on: bool) -> io::Result<()> {
        lock(&self.shared)
            .toggle(|m, w| m.set_report_focus(w, on))
            .map(drop)
    }

    fn set_window_title(&mut self, title: &str) -> io::Result<()> {
        lock(&self.shared)
            .toggle(|m, w| m.set_title(w, title))
            .map(drop)
    }

    fn resize(&mut self, width: u16, height: u16) {
        let mut state = lock(&self.shared);
        if state.frame.size() != (width, height) {
            state.frame.resize(width, height);
            state.deadline = Some(Instant::now());
            drop(state);
            self.shared.1.notify_all();
        }
    }

    fn print_lines(&mut self, text: &str) {
        let mut state = lock(&self.shared);
        state.frame.queue_print(text);
        if state.frame.has_queued() {
            state.deadline = Some(Instant::now() + FLUSH_DEFERRAL);
            drop(state);
            self.shared.1.notify_all();
        }
    }

    fn scroll(&mut self, op: ScrollOp) -> io::Result<()> {
        let mut state = lock(&self.shared);
        let mut buf = Vec::new();
        state.frame.scroll(&mut buf, op)?;
        state.emit(&buf)
    }

    fn modes(&self) -> TerminalModes {
        lock(&self.shared).modes.clone()
    }

    fn apply_modes(&mut self, modes: &TerminalModes) -> io::Result<()> {
        let mut state = lock(&self.shared);
        let was_alt = state.modes.alt_screen();
        state.toggle(|m, w| m.apply(w, modes))?;
        if state.modes.alt_screen() != was_alt {
            let alt = state.modes.alt_screen();
            state.frame.set_alt_screen(alt);
        }
        Ok(())
    }

    fn reset_modes(&mut self) -> io::Result<()> {
        let mut state = lock(&self.shared);
        state.flush()?;
        state.toggle(|m, w| m.reset(w).map(|()| true))?;
        state.frame.set_alt_screen(false);
        let view = std::mem::take(&mut state.view);
        state.frame.mark_clean(&view);
        state.view = view;
        Ok(())
    }
}

impl<W: Write + Send + 'static> Drop for StandardRenderer<W> {
    fn drop(&mut self) {
        self.halt();
    }
}

// =============================================================================
// NilRenderer
// =============================================================================

/// Renderer that writes nothing. Mode state is still tracked so callers can
/// inspect it.
#[derive(Debug, Default)]
pub struct NilRenderer {
    modes: TerminalModes,
}

impl NilRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for NilRenderer {
    fn start(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn kill(&mut self) {}

    fn write(&mut self, _view: String) {}

    fn repaint(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn enter_alt_screen(&mut self) -> io::Result<()> {
        self.modes.set_alt_screen(&mut io::sink(), true).map(drop)
    }

    fn exit_alt_screen(&mut self) -> io::Result<()> {
        self.modes.set_alt_screen(&mut io::sink(), false).map(drop)
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        self.modes.set_cursor_hidden(&mut io::sink(), false).map(drop)
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        self.modes.set_cursor_hidden(&mut io::sink(), true).map(drop)
    }

    fn set_mouse_mode(&mut self, mode: MouseMode) -> io::Result<()> {
        self.modes.set_mouse(&mut io::sink(), mode).map(drop)
    }

    fn set_bracketed_paste(&mut self, on: bool) -> io::Result<()> {
        self.modes.set_bracketed_paste(&mut io::sink(), on).map(drop)
    }

    fn set_report_focus(&mut self, on: bool) -> io::Result<()> {
        self.modes.set_report_focus(&mut io::sink(), on).map(drop)
    }

    fn set_window_title(&mut self, title: &str) -> io::Result<()> {
        self.modes.set_title(&mut io::sink(), title).map(drop)
    }

    fn resize(&mut self, _width: u16, _height: u16) {}

    fn print_lines(&mut self, _text: &str) {}

    fn scroll(&mut self, _op: ScrollOp) -> io::Result<()> {
        Ok(())
    }

    fn modes(&self) -> TerminalModes {
        self.modes.clone()
    }

    fn apply_modes(&mut self, modes: &TerminalModes) -> io::Result<()> {
        self.modes.apply(&mut io::sink(), modes).map(drop)
    }

    fn reset_modes(&mut self) -> io::Result<()> {
        self.modes.reset(&mut io::sink())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Output buffer the test keeps a handle to.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn take(&self) -> Vec<u8> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn fps_is_clamped() {
        assert_eq!(clamp_fps(0), 1);
        assert_eq!(clamp_fps(60), 60);
        assert_eq!(clamp_fps(1000), MAX_FPS);
        let r = StandardRenderer::new(Vec::new(), 0);
        assert_eq!(r.frame_interval(), Duration::from_secs(1));
    }

    #[test]
    fn write_is_deferred_until_flush() {
        let capture = Capture::default();
        let mut r = StandardRenderer::new(capture.clone(), 60);
        r.write("hello".into());
        assert!(capture.take().is_empty());
        r.flush().unwrap();
        assert!(contains(&capture.take(), b"hello"));
    }

    #[test]
    fn rapid_writes_coalesce_into_last_view() {
        let capture = Capture::default();
        let mut r = StandardRenderer::new(capture.clone(), 60);
        r.start().unwrap();
        for i in 0..50 {
            r.write(format!("frame {i}"));
        }
        std::thread::sleep(Duration::from_millis(100));
        r.stop().unwrap();
        let out = capture.take();
        assert!(contains(&out, b"frame 49"));
        assert!(count(&out, b"frame ") < 5);
    }

    #[test]
    fn ticker_flushes_without_explicit_repaint() {
        let capture = Capture::default();
        let mut r = StandardRenderer::new(capture.clone(), 120);
        r.start().unwrap();
        r.write("tick".into());
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut seen = Vec::new();
        while Instant::now() < deadline && !contains(&seen, b"tick") {
            std::thread::sleep(Duration::from_millis(10));
            seen.extend(capture.take());
        }
        assert!(contains(&seen, b"tick"));
        r.kill();
    }

    #[test]
    fn repaint_flushes_immediately() {
        let capture = Capture::default();
        let mut r = StandardRenderer::new(capture.clone(), 60);
        r.write("now".into());
        r.repaint().unwrap();
        assert!(contains(&capture.take(), b"now"));
    }

    #[test]
    fn enter_alt_screen_twice_emits_once() {
        let capture = Capture::default();
        let mut r = StandardRenderer::new(capture.clone(), 60);
        r.enter_alt_screen().unwrap();
        r.enter_alt_screen().unwrap();
        assert_eq!(count(&capture.take(), b"\x1b[?1049h"), 1);
        assert!(r.modes().alt_screen());
    }

    #[test]
    fn changing_one_row_in_alt_screen_is_a_diff() {
        let capture = Capture::default();
        let mut r = StandardRenderer::new(capture.clone(), 60);
        r.enter_alt_screen().unwrap();
        r.write("a\nb\nc".into());
        r.flush().unwrap();
        capture.take();

        r.write("a\nB\nc".into());
        r.flush().unwrap();
        let out = capture.take();
        assert!(contains(&out, b"\x1b[2;1H"));
        assert!(!contains(&out, b"\x1b[2J"));
    }

    #[test]
    fn clear_screen_erases_and_redraws() {
        let capture = Capture::default();
        let mut r = StandardRenderer::new(capture.clone(), 60);
        r.write("view".into());
        r.flush().unwrap();
        capture.take();
        r.clear_screen().unwrap();
        let out = capture.take();
        assert!(out.starts_with(b"\x1b[2J\x1b[H"));
        assert!(contains(&out, b"view"));
    }

    #[test]
    fn printed_lines_precede_view() {
        let capture = Capture::default();
        let mut r = StandardRenderer::new(capture.clone(), 60);
        r.write("view".into());
        r.print_lines("printed");
        r.flush().unwrap();
        let out = String::from_utf8(capture.take()).unwrap();
        assert!(out.find("printed").unwrap() < out.find("view").unwrap());
    }

    #[test]
    fn reset_modes_flushes_then_restores() {
        let capture = Capture::default();
        let mut r = StandardRenderer::new(capture.clone(), 60);
        r.hide_cursor().unwrap();
        r.set_mouse_mode(MouseMode::AllMotion).unwrap();
        r.set_bracketed_paste(true).unwrap();
        r.write("final".into());
        capture.take();

        r.reset_modes().unwrap();
        r.stop().unwrap();
        let out = capture.take();
        let view_at = out.windows(5).position(|w| w == b"final").unwrap();
        let show_at = out.windows(6).position(|w| w == b"\x1b[?25h").unwrap();
        assert!(view_at < show_at);
        assert_eq!(count(&out, b"final"), 1);
        assert!(contains(&out, b"\x1b[?1003l"));
        assert!(contains(&out, b"\x1b[?2004l"));
    }

    #[test]
    fn ignored_rows_are_honoured() {
        let capture = Capture::default();
        let mut r = StandardRenderer::new(capture.clone(), 60);
        r.enter_alt_screen().unwrap();
        r.write("a\nb\nc".into());
        r.flush().unwrap();
        capture.take();

        r.ignore_rows(1..2);
        r.write("a\nX\nc".into());
        r.flush().unwrap();
        assert!(capture.take().is_empty());

        r.clear_ignored();
        r.write("a\nY\nc".into());
        r.flush().unwrap();
        assert!(contains(&capture.take(), b"Y"));
    }

    #[test]
    fn nil_renderer_tracks_modes_silently() {
        let mut r = NilRenderer::new();
        r.enter_alt_screen().unwrap();
        r.set_mouse_mode(MouseMode::CellMotion).unwrap();
        r.write("ignored".into());
        let modes = r.modes();
        assert!(modes.alt_screen());
        assert_eq!(modes.mouse(), MouseMode::CellMotion);
        r.reset_modes().unwrap();
        assert!(!r.modes().alt_screen());
    }
}
