#![forbid(unsafe_code)]

//! Program configuration.
//!
//! [`ProgramOptions`] holds the plain settings read once when a program
//! starts. Hooks and stream overrides live on the
//! [`Program`](crate::Program) builder instead.
//!
//! # Environment overrides
//!
//! [`ProgramOptions::from_env`] starts from the defaults and applies:
//!
//! | Variable | Values | Effect |
//! |----------|--------|--------|
//! | `TEATUI_FPS` | integer | frame rate (clamped to 1..=120) |
//! | `TEATUI_ALT_SCREEN` | `1`/`true`/`0`/`false` | start in the alt screen |
//! | `TEATUI_MOUSE` | `cell`/`all`/`off` | mouse mode |
//! | `TEATUI_FORCE_TTY` | bool | open `/dev/tty` even with overridden input |
//! | `TEATUI_NO_SIGNALS` | bool | do not install signal handlers |
//! | `TEATUI_NO_CATCH_PANICS` | bool | let panics unwind out of `run` |

use std::time::Duration;

use teatui_render::{DEFAULT_FPS, MouseMode, clamp_fps};

/// How long in-flight commands get to finish at shutdown by default.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOptions {
    /// Start in the alternate screen.
    pub alt_screen: bool,
    /// Initial mouse tracking mode.
    pub mouse: MouseMode,
    /// Flushes per second, always within `1..=120`.
    fps: u32,
    /// Enable bracketed paste.
    pub bracketed_paste: bool,
    /// Report focus gained/lost.
    pub report_focus: bool,
    /// Convert panics in `init`/`update`/`view`/commands into
    /// [`ProgramError::Panic`](crate::ProgramError::Panic).
    pub catch_panics: bool,
    /// Turn INT/TSTP/CONT/WINCH/TERM into program messages.
    pub handle_signals: bool,
    /// Open the controlling terminal even when input is overridden.
    pub force_tty: bool,
    /// Render nothing.
    pub without_renderer: bool,
    /// How long in-flight commands get to finish at shutdown.
    pub shutdown_grace: Duration,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            alt_screen: false,
            mouse: MouseMode::Disabled,
            fps: DEFAULT_FPS,
            bracketed_paste: true,
            report_focus: false,
            catch_panics: true,
            handle_signals: true,
            force_tty: false,
            without_renderer: false,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl ProgramOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with `TEATUI_*` environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides read through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(raw) = lookup("TEATUI_FPS") {
            match raw.trim().parse::<u32>() {
                Ok(fps) => options.fps = clamp_fps(fps),
                Err(_) => tracing::warn!(value = %raw, "ignoring malformed TEATUI_FPS"),
            }
        }
        if let Some(on) = flag(&lookup, "TEATUI_ALT_SCREEN") {
            options.alt_screen = on;
        }
        if let Some(raw) = lookup("TEATUI_MOUSE") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "cell" => options.mouse = MouseMode::CellMotion,
                "all" => options.mouse = MouseMode::AllMotion,
                "off" | "none" | "" => options.mouse = MouseMode::Disabled,
                _ => tracing::warn!(value = %raw, "ignoring malformed TEATUI_MOUSE"),
            }
        }
        if let Some(on) = flag(&lookup, "TEATUI_FORCE_TTY") {
            options.force_tty = on;
        }
        if let Some(on) = flag(&lookup, "TEATUI_NO_SIGNALS") {
            options.handle_signals = !on;
        }
        if let Some(on) = flag(&lookup, "TEATUI_NO_CATCH_PANICS") {
            options.catch_panics = !on;
        }
        options
    }

    #[must_use]
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Set the frame rate, clamped to `1..=120`.
    pub fn set_fps(&mut self, fps: u32) {
        self.fps = clamp_fps(fps);
    }

    #[must_use]
    pub fn with_alt_screen(mut self) -> Self {
        self.alt_screen = true;
        self
    }

    #[must_use]
    pub fn with_mouse(mut self, mode: MouseMode) -> Self {
        self.mouse = mode;
        self
    }

    #[must_use]
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.set_fps(fps);
        self
    }

    #[must_use]
    pub fn without_bracketed_paste(mut self) -> Self {
        self.bracketed_paste = false;
        self
    }

    #[must_use]
    pub fn with_report_focus(mut self) -> Self {
        self.report_focus = true;
        self
    }

    #[must_use]
    pub fn without_catch_panics(mut self) -> Self {
        self.catch_panics = false;
        self
    }

    #[must_use]
    pub fn without_signal_handler(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    #[must_use]
    pub fn with_force_tty(mut self) -> Self {
        self.force_tty = true;
        self
    }

    #[must_use]
    pub fn without_renderer(mut self) -> Self {
        self.without_renderer = true;
        self
    }

    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

fn flag<F>(lookup: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring malformed boolean");
            None
        }
    }
}
