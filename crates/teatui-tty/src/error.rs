#![forbid(unsafe_code)]

//! Terminal controller errors.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerminalError {
    /// The stream is not attached to a terminal and no TTY device could be opened.
    #[error("not a terminal")]
    NotATty,

    /// Another program in this process already controls the terminal.
    #[error("the terminal is already owned by a running program")]
    AlreadyRunning,

    /// Reading or applying termios attributes failed.
    #[error("failed to change terminal mode: {0}")]
    RawModeFailure(#[source] io::Error),

    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Raw mode is only implemented for Unix terminals.
    #[error("raw mode is not supported on this platform")]
    Unsupported,
}

/// Result alias for terminal controller operations.
pub type Result<T> = std::result::Result<T, TerminalError>;
