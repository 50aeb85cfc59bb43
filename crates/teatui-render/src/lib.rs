#![forbid(unsafe_code)]

//! Render: turns view strings into minimal terminal output.
//!
//! # Layers
//!
//! - [`ansi`]: pure escape-sequence emitters
//! - [`frame`]: the cached frame, line truncation, and the diff engine
//!   ([`FrameWriter`]) including scroll-region operations
//! - [`modes`]: terminal mode bookkeeping with idempotent toggles
//! - [`renderer`]: the [`Renderer`] trait, the threaded
//!   [`StandardRenderer`] that coalesces flushes to a frame rate, and the
//!   no-op [`NilRenderer`]
//!
//! Nothing here reads input or knows about the program runtime.

pub mod ansi;
pub mod frame;
pub mod modes;
pub mod renderer;

pub use frame::{FrameWriter, IgnoredLines, ScrollOp};
pub use modes::{MouseMode, TerminalModes};
pub use renderer::{DEFAULT_FPS, MAX_FPS, NilRenderer, Renderer, StandardRenderer, clamp_fps};
