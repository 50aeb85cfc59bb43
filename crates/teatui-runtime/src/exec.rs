#![forbid(unsafe_code)]

//! Handing the terminal to an external command.
//!
//! An [`ExecCommand`] runs while the program has released the terminal:
//! raw mode off, renderer stopped, input reader parked. Its outcome reaches
//! the model only through the completion callback of the [`ExecRequest`].

use std::fmt;
use std::io;
use std::process::Command;

use thiserror::Error;

use crate::message::Msg;

#[derive(Error, Debug)]
pub enum ExecError {
    /// The command ran and exited unsuccessfully. `code` is `None` when it
    /// was ended by a signal.
    #[error("command exited unsuccessfully (code {code:?})")]
    NonZeroExit { code: Option<i32> },

    #[error("failed to start command: {0}")]
    Spawn(#[source] io::Error),
}

/// Something that can run with the terminal to itself.
pub trait ExecCommand: Send {
    /// Run to completion on the calling thread.
    fn run(&mut self) -> Result<(), ExecError>;
}

/// A child process with inherited stdio.
pub struct ProcessCommand {
    command: Command,
}

impl ProcessCommand {
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command }
    }

    /// The underlying command, for adding arguments or environment.
    pub fn command_mut(&mut self) -> &mut Command {
        &mut self.command
    }
}

impl From<Command> for ProcessCommand {
    fn from(command: Command) -> Self {
        Self::new(command)
    }
}

impl fmt::Debug for ProcessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProcessCommand").field(&self.command).finish()
    }
}

impl ExecCommand for ProcessCommand {
    fn run(&mut self) -> Result<(), ExecError> {
        let status = self.command.status().map_err(ExecError::Spawn)?;
        if status.success() {
            Ok(())
        } else {
            Err(ExecError::NonZeroExit {
                code: status.code(),
            })
        }
    }
}

/// A closure run in place of a process.
pub struct ExecFn<F>(pub F);

impl<F> ExecCommand for ExecFn<F>
where
    F: FnMut() -> Result<(), ExecError> + Send,
{
    fn run(&mut self) -> Result<(), ExecError> {
        (self.0)()
    }
}

/// Turns the outcome of an exec into a message.
pub type ExecCallback<M> = Box<dyn FnOnce(Result<(), ExecError>) -> Option<Msg<M>> + Send>;

/// An [`ExecCommand`] plus what to do when it finishes.
pub struct ExecRequest<M> {
    command: Box<dyn ExecCommand>,
    on_done: Option<ExecCallback<M>>,
}

impl<M> ExecRequest<M> {
    pub fn new(command: impl ExecCommand + 'static) -> Self {
        Self {
            command: Box::new(command),
            on_done: None,
        }
    }

    /// Deliver the outcome to the model as an application message.
    #[must_use]
    pub fn on_done<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Result<(), ExecError>) -> M + Send + 'static,
    {
        self.on_done = Some(Box::new(move |result| Some(Msg::App(f(result)))));
        self
    }

    /// Like [`on_done`](Self::on_done), but the callback picks the message
    /// (or none).
    #[must_use]
    pub fn on_done_with(mut self, f: ExecCallback<M>) -> Self {
        self.on_done = Some(f);
        self
    }

    /// Run the command and produce the completion message, if any.
    ///
    /// Errors with no callback to receive them are logged and dropped.
    pub(crate) fn run(mut self) -> Option<Msg<M>> {
        let result = self.command.run();
        match self.on_done {
            Some(on_done) => on_done(result),
            None => {
                if let Err(err) = result {
                    tracing::warn!(error = %err, "exec command failed");
                }
                None
            }
        }
    }
}

impl<M> fmt::Debug for ExecRequest<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecRequest")
            .field("has_callback", &self.on_done.is_some())
            .finish()
    }
}
