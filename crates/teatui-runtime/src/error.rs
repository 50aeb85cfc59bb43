#![forbid(unsafe_code)]

//! How a run can end other than with a quit.

use std::fmt;

use teatui_tty::TerminalError;
use thiserror::Error;

/// Why a program was killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KillCause {
    /// [`ProgramHandle::kill`](crate::ProgramHandle::kill) was called.
    Handle,
    /// The process received `SIGTERM`.
    Terminated,
    /// The program's [`CancelToken`](crate::CancelToken) was cancelled.
    Cancelled,
}

impl fmt::Display for KillCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Handle => "killed by handle",
            Self::Terminated => "terminated by signal",
            Self::Cancelled => "cancelled",
        })
    }
}

#[derive(Error, Debug)]
pub enum ProgramError {
    /// `init`, `update`, `view` or a command panicked. The terminal was
    /// restored before this was returned.
    #[error("program panicked: {message}")]
    Panic { message: String },

    #[error("program killed: {0}")]
    Killed(KillCause),

    /// An interrupt message or `SIGINT` ended the run.
    #[error("program interrupted")]
    Interrupted,

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

impl ProgramError {
    /// True for every kill, regardless of cause.
    #[must_use]
    pub fn is_killed(&self) -> bool {
        matches!(self, Self::Killed(_))
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
