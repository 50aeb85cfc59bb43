#![forbid(unsafe_code)]

//! teatui runtime
//!
//! The Elm-style program loop that ties the input decoder, the renderer and
//! the terminal controller together.
//!
//! # Key Components
//!
//! - [`Program`] - owns the model and the message queue, runs the loop
//! - [`Model`] - trait for application state, update and view
//! - [`Msg`] - input events, control messages and application payloads
//! - [`Cmd`] - deferred work yielding at most one message
//! - [`ProgramHandle`] - send, quit or kill from other threads
//! - [`ProgramSimulator`] - threadless, terminal-free driver for tests

pub mod command;
pub mod error;
pub mod exec;
pub mod message;
pub mod options;
pub mod program;
pub mod simulator;

pub use command::{Cmd, Task};
pub use error::{KillCause, ProgramError};
pub use exec::{ExecCallback, ExecCommand, ExecError, ExecFn, ExecRequest, ProcessCommand};
pub use message::Msg;
pub use options::{DEFAULT_SHUTDOWN_GRACE, ProgramOptions};
pub use program::{CancelToken, Model, Program, ProgramHandle};
pub use simulator::{CmdRecord, ProgramSimulator};
