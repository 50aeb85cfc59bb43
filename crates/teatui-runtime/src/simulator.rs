#![forbid(unsafe_code)]

//! Deterministic program simulator for testing.
//!
//! `ProgramSimulator` runs a [`Model`] with no terminal and no threads.
//! Commands are evaluated synchronously in the order they are produced, and
//! every view is captured after each update.
//!
//! # Example
//!
//! ```ignore
//! use teatui_runtime::simulator::ProgramSimulator;
//!
//! let mut sim = ProgramSimulator::new(Counter(0));
//! sim.init();
//! sim.send(Inc);
//! assert_eq!(sim.model().0, 1);
//! assert_eq!(sim.last_view(), Some("count: 1"));
//! ```

use std::collections::VecDeque;

use teatui_core::event::Event;

use crate::command::Cmd;
use crate::message::Msg;
use crate::program::Model;

/// Record of a command handled during simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdRecord {
    None,
    Quit,
    /// A message, by [`Msg::kind`].
    Msg(&'static str),
    /// A task, run synchronously.
    Task,
    /// A batch with this many members.
    Batch(usize),
    /// A sequence with this many members.
    Sequence(usize),
}

/// Deterministic simulator for [`Model`] testing.
pub struct ProgramSimulator<T: Model> {
    model: T,
    queue: VecDeque<Msg<T::Message>>,
    views: Vec<String>,
    printed: Vec<String>,
    command_log: Vec<CmdRecord>,
    running: bool,
}

impl<T: Model> ProgramSimulator<T> {
    /// The model is not initialized until [`init`](Self::init) is called.
    pub fn new(model: T) -> Self {
        Self {
            model,
            queue: VecDeque::new(),
            views: Vec::new(),
            printed: Vec::new(),
            command_log: Vec::new(),
            running: true,
        }
    }

    /// Call `Model::init` and drain whatever it produces.
    pub fn init(&mut self) {
        let cmd = self.model.init();
        self.execute_cmd(cmd);
        self.capture_view();
        self.drain();
    }

    /// Feed decoded terminal events, in order.
    pub fn inject_events(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.send_msg(Msg::from(event));
        }
    }

    /// Deliver an application message.
    pub fn send(&mut self, msg: T::Message) {
        self.send_msg(Msg::App(msg));
    }

    /// Deliver any message and everything it leads to. Ignored after a quit.
    pub fn send_msg(&mut self, msg: Msg<T::Message>) {
        if !self.running {
            return;
        }
        self.queue.push_back(msg);
        self.drain();
    }

    pub fn model(&self) -> &T {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut T {
        &mut self.model
    }

    /// False once a quit or interrupt has been handled.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Every view captured, oldest first.
    pub fn views(&self) -> &[String] {
        &self.views
    }

    pub fn last_view(&self) -> Option<&str> {
        self.views.last().map(String::as_str)
    }

    /// Text printed with `Cmd::println`/`Cmd::printf`.
    pub fn printed(&self) -> &[String] {
        &self.printed
    }

    pub fn command_log(&self) -> &[CmdRecord] {
        &self.command_log
    }

    fn drain(&mut self) {
        while self.running {
            let Some(msg) = self.queue.pop_front() else {
                return;
            };
            match msg {
                Msg::Quit | Msg::Interrupt => {
                    self.running = false;
                    self.queue.clear();
                }
                Msg::PrintLine(text) | Msg::PrintFormatted(text) => self.printed.push(text),
                Msg::Batch(cmds) => self.execute_cmd(Cmd::Batch(cmds)),
                Msg::Sequence(cmds) => self.execute_cmd(Cmd::Sequence(cmds)),
                Msg::Exec(_) => {
                    tracing::debug!("exec is not simulated");
                }
                msg if msg.is_system() => {}
                msg => {
                    let cmd = self.model.update(msg);
                    self.execute_cmd(cmd);
                    self.capture_view();
                }
            }
        }
    }

    fn capture_view(&mut self) {
        self.views.push(self.model.view());
    }

    fn execute_cmd(&mut self, cmd: Cmd<T::Message>) {
        match cmd {
            Cmd::None => self.command_log.push(CmdRecord::None),
            Cmd::Quit => {
                self.command_log.push(CmdRecord::Quit);
                self.queue.push_back(Msg::Quit);
            }
            Cmd::Msg(msg) => {
                self.command_log.push(CmdRecord::Msg(msg.kind()));
                self.queue.push_back(msg);
            }
            Cmd::Task(task) => {
                self.command_log.push(CmdRecord::Task);
                if let Some(msg) = task() {
                    self.queue.push_back(msg);
                }
            }
            Cmd::Batch(cmds) => {
                self.command_log.push(CmdRecord::Batch(cmds.len()));
                for cmd in cmds {
                    self.execute_cmd(cmd);
                }
            }
            Cmd::Sequence(cmds) => {
                self.command_log.push(CmdRecord::Sequence(cmds.len()));
                for cmd in cmds {
                    let before = self.queue.len();
                    self.execute_cmd(cmd);
                    if self.queue.len() > before {
                        break;
                    }
                }
            }
        }
    }
}
