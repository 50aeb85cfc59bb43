#![forbid(unsafe_code)]
//! Terminal controller for teatui.
//!
//! Owns everything that touches the controlling terminal directly:
//!
//! - [`terminal`]: geometry, termios snapshot, raw mode ([`Tty`], [`HeadlessTerminal`])
//! - [`signals`]: the process-wide [`SignalDispatcher`]
//! - [`input`]: the [`InputReader`] thread that feeds bytes through the decoder
//!
//! Unix-first. On other platforms raw mode reports [`TerminalError::Unsupported`].

pub mod error;
pub mod input;
pub mod signals;
pub mod terminal;

pub use error::{Result, TerminalError};
pub use input::{InputReader, InputSource};
pub use signals::{SignalDispatcher, SignalKind, suspend_process};
pub use terminal::{DEFAULT_SIZE, HeadlessTerminal, TerminalControl, Tty};
