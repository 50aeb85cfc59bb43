#![forbid(unsafe_code)]

//! The message catalog.
//!
//! [`Msg`] carries both terminal input and the runtime's own control
//! messages; application messages ride in [`Msg::App`]. The runtime handles
//! the control variants itself (see [`Msg::is_system`]) and hands the rest
//! to [`Model::update`](crate::program::Model::update).

use teatui_core::event::{Event, KeyEvent, MouseEvent};

use crate::command::Cmd;
use crate::exec::ExecRequest;

/// A message consumed, in queue order, by the program loop.
pub enum Msg<M> {
    // --- input ---
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Bracketed paste content.
    Paste(String),
    /// The terminal gained focus.
    Focus,
    /// The terminal lost focus.
    Blur,
    /// Terminal size in columns and rows.
    WindowSize { width: u16, height: u16 },
    /// A complete escape sequence the decoder does not understand.
    UnknownSequence(Vec<u8>),
    /// Application-defined payload.
    App(M),

    // --- lifecycle ---
    /// Stop the program and return the model.
    Quit,
    /// Stop the program with [`ProgramError::Interrupted`](crate::ProgramError::Interrupted).
    Interrupt,
    /// Release the terminal and stop the process until it is continued.
    Suspend,
    /// Delivered to `update` after a suspended program is continued.
    Resume,

    // --- terminal modes ---
    SetWindowTitle(String),
    ClearScreen,
    EnterAltScreen,
    ExitAltScreen,
    ShowCursor,
    HideCursor,
    EnableReportFocus,
    DisableReportFocus,
    EnableBracketedPaste,
    DisableBracketedPaste,
    EnableMouseCellMotion,
    EnableMouseAllMotion,
    DisableMouse,

    // --- output ---
    /// Print a line above the inline view.
    PrintLine(String),
    /// Print preformatted text above the inline view.
    PrintFormatted(String),
    /// Replace the scroll region `top..=bottom` with `lines`.
    ScrollSync {
        lines: Vec<String>,
        top: u16,
        bottom: u16,
    },
    /// Insert `lines` at the top of the region.
    ScrollUp {
        lines: Vec<String>,
        top: u16,
        bottom: u16,
    },
    /// Insert `lines` at the bottom of the region.
    ScrollDown {
        lines: Vec<String>,
        top: u16,
        bottom: u16,
    },
    ClearScrollArea,
    Repaint,
    /// Query the terminal size and deliver a [`Msg::WindowSize`].
    RequestWindowSize,

    // --- commands ---
    /// Run every command concurrently.
    Batch(Vec<Cmd<M>>),
    /// Run commands in order, stopping at the first one that yields.
    Sequence(Vec<Cmd<M>>),
    /// Hand the terminal to an external command.
    Exec(ExecRequest<M>),
}

impl<M> Msg<M> {
    /// True for messages the runtime handles without calling `update`.
    #[must_use]
    pub fn is_system(&self) -> bool {
        !matches!(
            self,
            Self::Key(_)
                | Self::Mouse(_)
                | Self::Paste(_)
                | Self::Focus
                | Self::Blur
                | Self::WindowSize { .. }
                | Self::UnknownSequence(_)
                | Self::App(_)
                | Self::Resume
        )
    }

    /// Stable name for logs and spans.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Key(_) => "Key",
            Self::Mouse(_) => "Mouse",
            Self::Paste(_) => "Paste",
            Self::Focus => "Focus",
            Self::Blur => "Blur",
            Self::WindowSize { .. } => "WindowSize",
            Self::UnknownSequence(_) => "UnknownSequence",
            Self::App(_) => "App",
            Self::Quit => "Quit",
            Self::Interrupt => "Interrupt",
            Self::Suspend => "Suspend",
            Self::Resume => "Resume",
            Self::SetWindowTitle(_) => "SetWindowTitle",
            Self::ClearScreen => "ClearScreen",
            Self::EnterAltScreen => "EnterAltScreen",
            Self::ExitAltScreen => "ExitAltScreen",
            Self::ShowCursor => "ShowCursor",
            Self::HideCursor => "HideCursor",
            Self::EnableReportFocus => "EnableReportFocus",
            Self::DisableReportFocus => "DisableReportFocus",
            Self::EnableBracketedPaste => "EnableBracketedPaste",
            Self::DisableBracketedPaste => "DisableBracketedPaste",
            Self::EnableMouseCellMotion => "EnableMouseCellMotion",
            Self::EnableMouseAllMotion => "EnableMouseAllMotion",
            Self::DisableMouse => "DisableMouse",
            Self::PrintLine(_) => "PrintLine",
            Self::PrintFormatted(_) => "PrintFormatted",
            Self::ScrollSync { .. } => "ScrollSync",
            Self::ScrollUp { .. } => "ScrollUp",
            Self::ScrollDown { .. } => "ScrollDown",
            Self::ClearScrollArea => "ClearScrollArea",
            Self::Repaint => "Repaint",
            Self::RequestWindowSize => "RequestWindowSize",
            Self::Batch(_) => "Batch",
            Self::Sequence(_) => "Sequence",
            Self::Exec(_) => "Exec",
        }
    }

    /// The application payload, if this is one.
    #[must_use]
    pub fn into_app(self) -> Option<M> {
        match self {
            Self::App(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_app(&self) -> Option<&M> {
        match self {
            Self::App(m) => Some(m),
            _ => None,
        }
    }
}

impl<M> From<Event> for Msg<M> {
    fn from(event: Event) -> Self {
        match event {
            Event::Key(key) => Self::Key(key),
            Event::Mouse(mouse) => Self::Mouse(mouse),
            Event::Paste(text) => Self::Paste(text),
            Event::Focus => Self::Focus,
            Event::Blur => Self::Blur,
            Event::Unknown(bytes) => Self::UnknownSequence(bytes),
        }
    }
}

impl<M: std::fmt::Debug> std::fmt::Debug for Msg<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(k) => f.debug_tuple("Key").field(k).finish(),
            Self::Mouse(m) => f.debug_tuple("Mouse").field(m).finish(),
            Self::Paste(s) => f.debug_tuple("Paste").field(s).finish(),
            Self::WindowSize { width, height } => f
                .debug_struct("WindowSize")
                .field("width", width)
                .field("height", height)
                .finish(),
            Self::UnknownSequence(b) => f.debug_tuple("UnknownSequence").field(b).finish(),
            Self::App(m) => f.debug_tuple("App").field(m).finish(),
            Self::SetWindowTitle(t) => f.debug_tuple("SetWindowTitle").field(t).finish(),
            Self::PrintLine(s) => f.debug_tuple("PrintLine").field(s).finish(),
            Self::PrintFormatted(s) => f.debug_tuple("PrintFormatted").field(s).finish(),
            Self::ScrollSync { lines, top, bottom }
            | Self::ScrollUp { lines, top, bottom }
            | Self::ScrollDown { lines, top, bottom } => f
                .debug_struct(self.kind())
                .field("lines", lines)
                .field("top", top)
                .field("bottom", bottom)
                .finish(),
            Self::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Self::Sequence(cmds) => f.debug_tuple("Sequence").field(cmds).finish(),
            Self::Exec(_) => f.write_str("Exec(..)"),
            other => f.write_str(other.kind()),
        }
    }
}

impl<M: PartialEq> PartialEq for Msg<M> {
    /// Structural equality for data-carrying variants. Command-carrying
    /// variants (`Batch`, `Sequence`, `Exec`) never compare equal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Key(a), Self::Key(b)) => a == b,
            (Self::Mouse(a), Self::Mouse(b)) => a == b,
            (Self::Paste(a), Self::Paste(b))
            | (Self::SetWindowTitle(a), Self::SetWindowTitle(b))
            | (Self::PrintLine(a), Self::PrintLine(b))
            | (Self::PrintFormatted(a), Self::PrintFormatted(b)) => a == b,
            (
                Self::WindowSize {
                    width: w1,
                    height: h1,
                },
                Self::WindowSize {
                    width: w2,
                    height: h2,
                },
            ) => w1 == w2 && h1 == h2,
            (Self::UnknownSequence(a), Self::UnknownSequence(b)) => a == b,
            (Self::App(a), Self::App(b)) => a == b,
            (
                Self::ScrollSync {
                    lines: l1,
                    top: t1,
                    bottom: b1,
                },
                Self::ScrollSync {
                    lines: l2,
                    top: t2,
                    bottom: b2,
                },
            )
            | (
                Self::ScrollUp {
                    lines: l1,
                    top: t1,
                    bottom: b1,
                },
                Self::ScrollUp {
                    lines: l2,
                    top: t2,
                    bottom: b2,
                },
            )
            | (
                Self::ScrollDown {
                    lines: l1,
                    top: t1,
                    bottom: b1,
                },
                Self::ScrollDown {
                    lines: l2,
                    top: t2,
                    bottom: b2,
                },
            ) => l1 == l2 && t1 == t2 && b1 == b2,
            (Self::Batch(_), _) | (Self::Sequence(_), _) | (Self::Exec(_), _) => false,
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teatui_core::event::KeyCode;

    type M = Msg<u32>;

    #[test]
    fn decoder_events_map_to_messages() {
        let key = KeyEvent::new(KeyCode::Enter);
        assert_eq!(M::from(Event::Key(key)), Msg::Key(key));
        assert_eq!(M::from(Event::Focus), Msg::Focus);
        assert_eq!(
            M::from(Event::Unknown(b"\x1b[99x".to_vec())),
            Msg::UnknownSequence(b"\x1b[99x".to_vec())
        );
    }

    #[test]
    fn system_classification() {
        assert!(M::Quit.is_system());
        assert!(M::EnterAltScreen.is_system());
        assert!(M::Batch(Vec::new()).is_system());
        assert!(!M::App(1).is_system());
        assert!(!M::Resume.is_system());
        assert!(
            !M::WindowSize {
                width: 1,
                height: 1
            }
            .is_system()
        );
    }

    #[test]
    fn command_carrying_messages_never_compare_equal() {
        assert_ne!(M::Batch(Vec::new()), M::Batch(Vec::new()));
        assert_eq!(M::Quit, M::Quit);
        assert_ne!(M::Quit, M::Interrupt);
    }

    #[test]
    fn debug_names_variant() {
        assert_eq!(format!("{:?}", M::ClearScreen), "ClearScreen");
        assert_eq!(format!("{:?}", M::App(7)), "App(7)");
    }
}
