#![forbid(unsafe_code)]

//! teatui public facade crate.
//!
//! Re-exports the types an application needs from the internal crates and
//! offers a prelude for day-to-day use.

// --- Core re-exports -------------------------------------------------------

pub use teatui_core::{
    Event, InputParser, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent, MouseEventKind,
};

// --- Render re-exports -----------------------------------------------------

pub use teatui_render::{MouseMode, NilRenderer, Renderer, StandardRenderer, TerminalModes};

// --- Terminal re-exports ---------------------------------------------------

pub use teatui_tty::{HeadlessTerminal, SignalDispatcher, TerminalControl, TerminalError, Tty};

// --- Runtime re-exports ----------------------------------------------------

pub use teatui_runtime::{
    CancelToken, Cmd, ExecCommand, ExecError, ExecFn, KillCause, Model, Msg, ProcessCommand,
    Program, ProgramError, ProgramHandle, ProgramOptions, ProgramSimulator,
};

/// Standard result type for teatui programs.
pub type Result<T> = std::result::Result<T, ProgramError>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Cmd, Event, KeyCode, KeyEvent, Model, Modifiers, MouseMode, Msg, Program, ProgramError,
        ProgramOptions, Result,
    };

    pub use crate::{core, render, runtime, tty};
}

pub use teatui_core as core;
pub use teatui_render as render;
pub use teatui_runtime as runtime;
pub use teatui_tty as tty;

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::ProgramSimulator;

    struct Hello;

    impl Model for Hello {
        type Message = ();

        fn update(&mut self, msg: Msg<()>) -> Cmd<()> {
            match msg {
                Msg::Key(KeyEvent {
                    code: KeyCode::Escape, ..
                }) => Cmd::quit(),
                _ => Cmd::none(),
            }
        }

        fn view(&self) -> String {
            "hello".to_owned()
        }
    }

    #[test]
    fn prelude_is_enough_for_a_model() {
        let mut sim = ProgramSimulator::new(Hello);
        sim.init();
        sim.inject_events([Event::Key(KeyEvent::new(KeyCode::Escape))]);
        assert!(!sim.is_running());
        assert_eq!(sim.last_view(), Some("hello"));
    }
}
