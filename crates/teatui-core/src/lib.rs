#![forbid(unsafe_code)]

//! Core: terminal input events and the incremental input decoder.
//!
//! This crate has no knowledge of terminals, threads, or the runtime. It turns
//! bytes into [`Event`]s and nothing else.

pub mod event;
pub mod input_parser;

pub use event::{Event, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent, MouseEventKind};
pub use input_parser::{InputParser, ParserState};
