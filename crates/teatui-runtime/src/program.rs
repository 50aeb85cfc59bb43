#![forbid(unsafe_code)]

//! The program runtime.
//!
//! A [`Program`] owns one [`Model`] and a single FIFO queue. Terminal input,
//! command results, signals and [`ProgramHandle`] sends all land on that
//! queue; the run loop takes one message at a time, lets the runtime handle
//! the control messages, hands the rest to [`Model::update`], schedules the
//! returned [`Cmd`] and submits the new view to the renderer.
//!
//! # Example
//!
//! ```ignore
//! use teatui_runtime::{Cmd, Model, Msg, Program, ProgramOptions};
//!
//! struct Counter(u32);
//!
//! impl Model for Counter {
//!     type Message = ();
//!
//!     fn update(&mut self, msg: Msg<()>) -> Cmd<()> {
//!         match msg {
//!             Msg::Key(_) => Cmd::quit(),
//!             _ => {
//!                 self.0 += 1;
//!                 Cmd::none()
//!             }
//!         }
//!     }
//!
//!     fn view(&self) -> String {
//!         format!("count: {}", self.0)
//!     }
//! }
//!
//! let model = Program::new(Counter(0)).run()?;
//! ```
//!
//! # Shutdown
//!
//! However the run ends (quit, interrupt, kill, cancellation, panic), the
//! same cleanup runs exactly once: the input reader stops, signals are
//! unsubscribed, terminal modes are reset, the renderer stops, the saved
//! terminal state is restored, and in-flight commands get
//! [`ProgramOptions::shutdown_grace`] to finish before they are abandoned.

use std::cell::Cell;
use std::io::{self, Read, Write};
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use teatui_render::{
    MouseMode, NilRenderer, Renderer, ScrollOp, StandardRenderer, TerminalModes,
};
use teatui_tty::{
    DEFAULT_SIZE, HeadlessTerminal, InputReader, InputSource, SignalDispatcher, SignalKind,
    TerminalControl, TerminalError, Tty, suspend_process,
};
use tracing::{debug_span, info_span};

use crate::command::Cmd;
use crate::error::{KillCause, ProgramError, panic_message};
use crate::exec::ExecRequest;
use crate::message::Msg;
use crate::options::ProgramOptions;

/// Application state driven by the runtime.
pub trait Model {
    /// Application-defined message payload, delivered as [`Msg::App`].
    type Message: Send + 'static;

    /// Called once after the terminal is set up. The returned command is
    /// scheduled before the first render.
    fn init(&mut self) -> Cmd<Self::Message> {
        Cmd::none()
    }

    /// Apply one message.
    fn update(&mut self, msg: Msg<Self::Message>) -> Cmd<Self::Message>;

    /// Render the current state as text, one terminal row per line.
    fn view(&self) -> String;
}

type Filter<T> = Box<
    dyn FnMut(&T, Msg<<T as Model>::Message>) -> Option<Msg<<T as Model>::Message>> + Send,
>;

type FinishHook<T> = Box<dyn FnOnce(&T)>;

/// What travels on the program queue.
enum Envelope<M> {
    Msg(Msg<M>),
    /// Re-check the kill flag.
    Wake,
    /// A command panicked with panics caught.
    Panic(String),
    Signal(SignalKind),
}

// =============================================================================
// ProgramHandle
// =============================================================================

/// Cloneable sender into a program's queue.
///
/// Obtainable before [`Program::run`]; anything sent early is delivered, in
/// order, once the loop starts.
pub struct ProgramHandle<M> {
    tx: Sender<Envelope<M>>,
    killed: Arc<OnceLock<KillCause>>,
}

impl<M> Clone for ProgramHandle<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            killed: Arc::clone(&self.killed),
        }
    }
}

impl<M> std::fmt::Debug for ProgramHandle<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramHandle")
            .field("killed", &self.killed.get())
            .finish()
    }
}

impl<M> ProgramHandle<M> {
    /// Queue an application message. Returns false once the program is gone.
    pub fn send(&self, msg: M) -> bool {
        self.send_msg(Msg::App(msg))
    }

    /// Queue any message.
    pub fn send_msg(&self, msg: Msg<M>) -> bool {
        self.tx.send(Envelope::Msg(msg)).is_ok()
    }

    /// Queue a quit. Messages already queued are handled first.
    pub fn quit(&self) -> bool {
        self.send_msg(Msg::Quit)
    }

    /// Stop the program before it handles any further message.
    /// `run` returns [`ProgramError::Killed`].
    pub fn kill(&self) {
        self.stop(KillCause::Handle);
    }

    fn stop(&self, cause: KillCause) {
        let _ = self.killed.set(cause);
        let _ = self.tx.send(Envelope::Wake);
    }
}

// =============================================================================
// CancelToken
// =============================================================================

type Waker = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct CancelState {
    cancelled: bool,
    wakers: Vec<Waker>,
}

/// External cancellation shared between a program and its owner.
///
/// Cancelling kills every program the token was given to, with
/// [`KillCause::Cancelled`].
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Mutex<CancelState>>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let wakers = {
            let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            std::mem::take(&mut state.wakers)
        };
        for wake in wakers {
            wake();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancelled
    }

    /// Run `f` on cancellation, or right away if already cancelled.
    pub fn on_cancel<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if state.cancelled {
            drop(state);
            f();
        } else {
            state.wakers.push(Box::new(f));
        }
    }
}

// =============================================================================
// Program
// =============================================================================

/// Builder and entry point for a run.
pub struct Program<T: Model> {
    model: T,
    options: ProgramOptions,
    filter: Option<Filter<T>>,
    input: Option<Box<dyn Read + Send>>,
    output: Option<Box<dyn Write + Send>>,
    terminal: Option<Box<dyn TerminalControl>>,
    renderer: Option<Box<dyn Renderer>>,
    signals: Option<Arc<SignalDispatcher>>,
    cancel: Option<CancelToken>,
    on_finish: Option<FinishHook<T>>,
    handle: ProgramHandle<T::Message>,
    rx: Receiver<Envelope<T::Message>>,
}

impl<T: Model> std::fmt::Debug for Program<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("options", &self.options)
            .field("has_filter", &self.filter.is_some())
            .field("input_override", &self.input.is_some())
            .field("output_override", &self.output.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Model> Program<T> {
    pub fn new(model: T) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            model,
            options: ProgramOptions::default(),
            filter: None,
            input: None,
            output: None,
            terminal: None,
            renderer: None,
            signals: None,
            cancel: None,
            on_finish: None,
            handle: ProgramHandle {
                tx,
                killed: Arc::default(),
            },
            rx,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ProgramOptions) -> Self {
        self.options = options;
        self
    }

    /// Inspect every message before the runtime sees it. Return `None` to
    /// drop it or a different message to replace it.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: FnMut(&T, Msg<T::Message>) -> Option<Msg<T::Message>> + Send + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Read input from `input` instead of the terminal. Unless
    /// [`ProgramOptions::force_tty`] is set, no terminal is opened.
    #[must_use]
    pub fn with_input<R: Read + Send + 'static>(mut self, input: R) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// Render into `output` instead of stdout.
    #[must_use]
    pub fn with_output<W: Write + Send + 'static>(mut self, output: W) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    #[must_use]
    pub fn with_terminal(mut self, terminal: Box<dyn TerminalControl>) -> Self {
        self.terminal = Some(terminal);
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Use `dispatcher` instead of installing one. Ignored when signal
    /// handling is off.
    #[must_use]
    pub fn with_signal_dispatcher(mut self, dispatcher: Arc<SignalDispatcher>) -> Self {
        self.signals = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Called with the final model after cleanup, on every exit path.
    #[must_use]
    pub fn on_finish<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&T) + 'static,
    {
        self.on_finish = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn handle(&self) -> ProgramHandle<T::Message> {
        self.handle.clone()
    }

    /// Take over the terminal and run until the program ends.
    ///
    /// Returns the final model after a quit.
    pub fn run(self) -> Result<T, ProgramError> {
        let Program {
            model,
            options,
            filter,
            input,
            output,
            terminal,
            renderer,
            signals,
            cancel,
            on_finish,
            handle,
            rx,
        } = self;

        let terminal: Box<dyn TerminalControl> = match terminal {
            Some(terminal) => terminal,
            None if input.is_some() && !options.force_tty => {
                Box::new(HeadlessTerminal::new(DEFAULT_SIZE.0, DEFAULT_SIZE.1))
            }
            None => Box::new(Tty::open(options.force_tty)?),
        };
        let renderer: Box<dyn Renderer> = match (renderer, output) {
            (Some(renderer), _) => renderer,
            _ if options.without_renderer => Box::new(NilRenderer::new()),
            (None, Some(out)) => Box::new(StandardRenderer::new(out, options.fps())),
            (None, None) => Box::new(StandardRenderer::new(io::stdout(), options.fps())),
        };
        let signals = if options.handle_signals {
            match signals.map_or_else(SignalDispatcher::install, Ok) {
                Ok(dispatcher) => Some(dispatcher),
                Err(err) => {
                    tracing::warn!(error = %err, "signal handlers unavailable");
                    None
                }
            }
        } else {
            None
        };
        if let Some(token) = &cancel {
            let handle = handle.clone();
            token.on_cancel(move || handle.stop(KillCause::Cancelled));
        }

        let _hook = options.catch_panics.then(PanicHookGuard::install);
        let mut runtime = Runtime {
            model,
            options,
            filter,
            terminal,
            renderer,
            signals,
            reader: None,
            reads_terminal: false,
            parked: None,
            tasks: Vec::new(),
            handle,
            rx,
        };

        tracing::info!(
            alt_screen = runtime.options.alt_screen,
            fps = runtime.options.fps(),
            "program starting"
        );
        let exit = match runtime.start(input) {
            Ok(ControlFlow::Continue(())) => runtime.event_loop(),
            Ok(ControlFlow::Break(exit)) => exit,
            Err(err) => Exit::Failed(err),
        };
        tracing::info!(reason = exit.reason(), "program stopping");

        let catch = runtime.options.catch_panics;
        let model = runtime.shutdown(&exit);
        let exit = match on_finish {
            Some(on_finish) => match guarded(catch, || on_finish(&model)) {
                Ok(()) => exit,
                Err(message) => Exit::Panic(message),
            },
            None => exit,
        };
        exit.into_result(model)
    }
}

// =============================================================================
// Runtime
// =============================================================================

enum Exit {
    Quit,
    Interrupted,
    Killed(KillCause),
    Panic(String),
    Failed(TerminalError),
}

impl Exit {
    fn reason(&self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Interrupted => "interrupted",
            Self::Killed(_) => "killed",
            Self::Panic(_) => "panic",
            Self::Failed(_) => "terminal error",
        }
    }

    fn is_graceful(&self) -> bool {
        matches!(self, Self::Quit | Self::Interrupted)
    }

    fn into_result<T>(self, model: T) -> Result<T, ProgramError> {
        match self {
            Self::Quit => Ok(model),
            Self::Interrupted => Err(ProgramError::Interrupted),
            Self::Killed(cause) => Err(ProgramError::Killed(cause)),
            Self::Panic(message) => Err(ProgramError::Panic { message }),
            Self::Failed(err) => Err(ProgramError::Terminal(err)),
        }
    }
}

/// Modes in effect before the terminal was handed away.
struct Released {
    modes: TerminalModes,
}

struct Runtime<T: Model> {
    model: T,
    options: ProgramOptions,
    filter: Option<Filter<T>>,
    terminal: Box<dyn TerminalControl>,
    renderer: Box<dyn Renderer>,
    signals: Option<Arc<SignalDispatcher>>,
    reader: Option<InputReader>,
    /// The reader owns the terminal device rather than a plain stream.
    reads_terminal: bool,
    /// Terminal input source held while the terminal is released.
    parked: Option<InputSource>,
    tasks: Vec<JoinHandle<()>>,
    handle: ProgramHandle<T::Message>,
    rx: Receiver<Envelope<T::Message>>,
}

impl<T: Model> Runtime<T> {
    fn start(
        &mut self,
        input: Option<Box<dyn Read + Send>>,
    ) -> Result<ControlFlow<Exit>, TerminalError> {
        self.terminal.save_state()?;
        self.terminal.enter_raw_mode()?;
        self.renderer.start()?;

        let mut target = self.renderer.modes();
        let mut sink = io::sink();
        target.set_alt_screen(&mut sink, self.options.alt_screen)?;
        target.set_mouse(&mut sink, self.options.mouse)?;
        target.set_bracketed_paste(&mut sink, self.options.bracketed_paste)?;
        target.set_report_focus(&mut sink, self.options.report_focus)?;
        target.set_cursor_hidden(&mut sink, true)?;
        self.renderer.apply_modes(&target)?;
        self.renderer.clear_screen()?;

        if let Some(dispatcher) = &self.signals {
            let handle = self.handle.clone();
            dispatcher.subscribe(move |kind| {
                if kind == SignalKind::Terminate {
                    handle.stop(KillCause::Terminated);
                } else {
                    let _ = handle.tx.send(Envelope::Signal(kind));
                }
            });
        }

        let source = match input {
            Some(stream) => Some(InputSource::Stream(stream)),
            None => self.terminal.reader()?.map(InputSource::Terminal),
        };
        if let Some(source) = source {
            self.spawn_reader(source)?;
        }

        self.enqueue_window_size();

        let catch = self.options.catch_panics;
        let init = {
            let _span = info_span!("teatui.program.init").entered();
            let model = &mut self.model;
            guarded(catch, || model.init())
        };
        match init {
            Ok(cmd) => self.schedule(cmd),
            Err(message) => return Ok(ControlFlow::Break(Exit::Panic(message))),
        }
        Ok(self.render())
    }

    fn event_loop(&mut self) -> Exit {
        loop {
            self.reap_finished_tasks();
            if let Some(cause) = self.handle.killed.get() {
                return Exit::Killed(*cause);
            }
            let Ok(envelope) = self.rx.recv() else {
                return Exit::Quit;
            };
            let flow = match envelope {
                Envelope::Msg(msg) => self.dispatch(msg),
                Envelope::Wake => ControlFlow::Continue(()),
                Envelope::Panic(message) => ControlFlow::Break(Exit::Panic(message)),
                Envelope::Signal(kind) => self.on_signal(kind),
            };
            if let ControlFlow::Break(exit) = flow {
                return exit;
            }
        }
    }

    fn dispatch(&mut self, msg: Msg<T::Message>) -> ControlFlow<Exit> {
        let msg = match self.filter.as_mut() {
            Some(filter) => {
                let model = &self.model;
                match guarded(self.options.catch_panics, || filter(model, msg)) {
                    Ok(Some(msg)) => msg,
                    Ok(None) => return ControlFlow::Continue(()),
                    Err(message) => return ControlFlow::Break(Exit::Panic(message)),
                }
            }
            None => msg,
        };

        if msg.is_system() {
            tracing::debug!(msg = msg.kind(), "system message");
        }
        let written = match msg {
            Msg::Quit => return ControlFlow::Break(Exit::Quit),
            Msg::Interrupt => return ControlFlow::Break(Exit::Interrupted),
            Msg::Suspend => {
                self.suspend();
                Ok(())
            }
            Msg::SetWindowTitle(title) => self.renderer.set_window_title(&title),
            Msg::ClearScreen => self.renderer.clear_screen(),
            Msg::EnterAltScreen => self.renderer.enter_alt_screen(),
            Msg::ExitAltScreen => self.renderer.exit_alt_screen(),
            Msg::ShowCursor => self.renderer.show_cursor(),
            Msg::HideCursor => self.renderer.hide_cursor(),
            Msg::EnableReportFocus => self.renderer.set_report_focus(true),
            Msg::DisableReportFocus => self.renderer.set_report_focus(false),
            Msg::EnableBracketedPaste => self.renderer.set_bracketed_paste(true),
            Msg::DisableBracketedPaste => self.renderer.set_bracketed_paste(false),
            Msg::EnableMouseCellMotion => self.renderer.set_mouse_mode(MouseMode::CellMotion),
            Msg::EnableMouseAllMotion => self.renderer.set_mouse_mode(MouseMode::AllMotion),
            Msg::DisableMouse => self.renderer.set_mouse_mode(MouseMode::Disabled),
            Msg::PrintLine(text) | Msg::PrintFormatted(text) => {
                self.renderer.print_lines(&text);
                Ok(())
            }
            Msg::ScrollSync { lines, top, bottom } => {
                self.renderer.scroll(ScrollOp::Sync { lines, top, bottom })
            }
            Msg::ScrollUp { lines, top, bottom } => {
                self.renderer
                    .scroll(ScrollOp::InsertTop { lines, top, bottom })
            }
            Msg::ScrollDown { lines, top, bottom } => {
                self.renderer
                    .scroll(ScrollOp::InsertBottom { lines, top, bottom })
            }
            Msg::ClearScrollArea => self.renderer.scroll(ScrollOp::Clear),
            Msg::Repaint => self.renderer.repaint(),
            Msg::RequestWindowSize => {
                self.enqueue_window_size();
                Ok(())
            }
            Msg::Batch(cmds) => {
                self.schedule(Cmd::Batch(cmds));
                Ok(())
            }
            Msg::Sequence(cmds) => {
                self.schedule(Cmd::Sequence(cmds));
                Ok(())
            }
            Msg::Exec(request) => {
                self.exec(request);
                Ok(())
            }
            msg => return self.update(msg),
        };
        if let Err(err) = written {
            tracing::warn!(error = %err, "terminal write failed");
        }
        ControlFlow::Continue(())
    }

    fn update(&mut self, msg: Msg<T::Message>) -> ControlFlow<Exit> {
        if let Msg::WindowSize { width, height } = msg {
            self.renderer.resize(width, height);
        }
        let catch = self.options.catch_panics;
        let result = {
            let _span = debug_span!(
                "teatui.program.update",
                msg_type = msg.kind(),
                duration_us = tracing::field::Empty
            )
            .entered();
            let start = Instant::now();
            let model = &mut self.model;
            let result = guarded(catch, || model.update(msg));
            tracing::Span::current().record(
                "duration_us",
                u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
            );
            result
        };
        match result {
            Ok(cmd) => {
                self.schedule(cmd);
                self.render()
            }
            Err(message) => ControlFlow::Break(Exit::Panic(message)),
        }
    }

    fn render(&mut self) -> ControlFlow<Exit> {
        let model = &self.model;
        match guarded(self.options.catch_panics, || model.view()) {
            Ok(view) => {
                self.renderer.write(view);
                ControlFlow::Continue(())
            }
            Err(message) => ControlFlow::Break(Exit::Panic(message)),
        }
    }

    fn on_signal(&mut self, kind: SignalKind) -> ControlFlow<Exit> {
        tracing::debug!(signal = ?kind, "handling signal");
        match kind {
            SignalKind::Interrupt => return ControlFlow::Break(Exit::Interrupted),
            SignalKind::Terminate => return ControlFlow::Break(Exit::Killed(KillCause::Terminated)),
            SignalKind::Suspend => self.suspend(),
            SignalKind::Continue => {
                if let Err(err) = self.renderer.repaint() {
                    tracing::warn!(error = %err, "repaint after continue failed");
                }
            }
            SignalKind::WindowChange => self.enqueue_window_size(),
        }
        ControlFlow::Continue(())
    }

    fn enqueue_window_size(&self) {
        let (width, height) = match self.terminal.size() {
            Ok(size) => size,
            Err(err) => {
                tracing::warn!(error = %err, "terminal size unavailable, using default");
                DEFAULT_SIZE
            }
        };
        let _ = self
            .handle
            .tx
            .send(Envelope::Msg(Msg::WindowSize { width, height }));
    }

    // --- commands ---

    fn schedule(&mut self, cmd: Cmd<T::Message>) {
        match cmd {
            Cmd::None => {}
            Cmd::Quit => self.enqueue(Msg::Quit),
            Cmd::Msg(msg) => self.enqueue(msg),
            Cmd::Task(task) => self.spawn_task(task),
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    self.schedule(cmd);
                }
            }
            Cmd::Sequence(cmds) => {
                self.spawn_task(Box::new(move || cmds.into_iter().find_map(Cmd::execute)));
            }
        }
    }

    fn enqueue(&self, msg: Msg<T::Message>) {
        let _ = self.handle.tx.send(Envelope::Msg(msg));
    }

    fn spawn_task(&mut self, task: crate::command::Task<T::Message>) {
        let tx = self.handle.tx.clone();
        let catch = self.options.catch_panics;
        let spawned = std::thread::Builder::new()
            .name("teatui-cmd".into())
            .spawn(move || match guarded(catch, task) {
                Ok(Some(msg)) => {
                    let _ = tx.send(Envelope::Msg(msg));
                }
                Ok(None) => {}
                Err(message) => {
                    let _ = tx.send(Envelope::Panic(message));
                }
            });
        match spawned {
            Ok(handle) => {
                tracing::debug!(in_flight = self.tasks.len() + 1, "command spawned");
                self.tasks.push(handle);
            }
            Err(err) => tracing::warn!(error = %err, "failed to spawn command"),
        }
    }

    fn reap_finished_tasks(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let mut remaining = Vec::with_capacity(self.tasks.len());
        for handle in self.tasks.drain(..) {
            if handle.is_finished() {
                if let Err(payload) = handle.join() {
                    let msg = panic_message(&*payload);
                    tracing::error!("command panicked: {msg}");
                }
            } else {
                remaining.push(handle);
            }
        }
        self.tasks = remaining;
    }

    // --- terminal hand-off ---

    fn spawn_reader(&mut self, source: InputSource) -> io::Result<()> {
        let tx = self.handle.tx.clone();
        self.reads_terminal = matches!(source, InputSource::Terminal(_));
        let reader = InputReader::spawn(source, move |event| {
            tx.send(Envelope::Msg(Msg::from(event))).is_ok()
        })?;
        self.reader = Some(reader);
        Ok(())
    }

    /// Give the terminal back to the shell, keeping enough to take it again.
    fn release_terminal(&mut self) -> Released {
        let modes = self.renderer.modes();
        if let Err(err) = self.renderer.reset_modes() {
            tracing::warn!(error = %err, "failed to reset terminal modes");
        }
        if let Err(err) = self.renderer.stop() {
            tracing::warn!(error = %err, "failed to stop renderer");
        }
        // A stream reader cannot be interrupted and keeps feeding the queue.
        if self.reads_terminal
            && let Some(reader) = self.reader.take()
        {
            self.parked = reader.stop();
        }
        if let Err(err) = self.terminal.exit_raw_mode() {
            tracing::warn!(error = %err, "failed to leave raw mode");
        }
        Released { modes }
    }

    fn reacquire_terminal(&mut self, released: Released) {
        if let Err(err) = self.terminal.enter_raw_mode() {
            tracing::warn!(error = %err, "failed to re-enter raw mode");
        }
        if let Err(err) = self.renderer.start() {
            tracing::warn!(error = %err, "failed to restart renderer");
        }
        if let Err(err) = self.renderer.apply_modes(&released.modes) {
            tracing::warn!(error = %err, "failed to restore terminal modes");
        }
        if let Err(err) = self.renderer.repaint() {
            tracing::warn!(error = %err, "repaint failed");
        }
        if let Some(source) = self.parked.take()
            && let Err(err) = self.spawn_reader(source)
        {
            tracing::warn!(error = %err, "failed to restart input reader");
        }
    }

    fn exec(&mut self, request: ExecRequest<T::Message>) {
        let _span = info_span!("teatui.program.exec").entered();
        let released = self.release_terminal();
        let outcome = guarded(self.options.catch_panics, || request.run());
        self.reacquire_terminal(released);
        match outcome {
            Ok(Some(msg)) => self.enqueue(msg),
            Ok(None) => {}
            Err(message) => {
                let _ = self.handle.tx.send(Envelope::Panic(message));
            }
        }
    }

    fn suspend(&mut self) {
        let released = self.release_terminal();
        if let Err(err) = suspend_process() {
            tracing::warn!(error = %err, "failed to suspend process");
        }
        self.reacquire_terminal(released);
        self.enqueue(Msg::Resume);
    }

    // --- shutdown ---

    fn shutdown(mut self, exit: &Exit) -> T {
        if let Some(reader) = self.reader.take() {
            let _ = reader.stop();
        }
        self.parked = None;
        if let Some(dispatcher) = self.signals.take() {
            dispatcher.unsubscribe();
        }

        if exit.is_graceful() {
            if let Err(err) = self.renderer.reset_modes() {
                tracing::warn!(error = %err, "failed to reset terminal modes");
            }
            if let Err(err) = self.renderer.stop() {
                tracing::warn!(error = %err, "failed to stop renderer");
            }
        } else {
            self.renderer.kill();
            if let Err(err) = self.renderer.apply_modes(&TerminalModes::new()) {
                tracing::warn!(error = %err, "failed to reset terminal modes");
            }
        }
        if let Err(err) = self.terminal.restore_state() {
            tracing::warn!(error = %err, "failed to restore terminal state");
        }

        self.await_tasks();
        self.model
    }

    fn await_tasks(&mut self) {
        let deadline = Instant::now() + self.options.shutdown_grace;
        loop {
            self.reap_finished_tasks();
            if self.tasks.is_empty() {
                return;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    abandoned = self.tasks.len(),
                    "commands still running after shutdown grace period"
                );
                return;
            }
            std::thread::sleep(TASK_POLL_INTERVAL);
        }
    }
}

const TASK_POLL_INTERVAL: Duration = Duration::from_millis(5);

// =============================================================================
// Panic handling
// =============================================================================

thread_local! {
    static CATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Run `f`, turning a panic into its message when `catch` is set.
fn guarded<R>(catch: bool, f: impl FnOnce() -> R) -> Result<R, String> {
    if !catch {
        return Ok(f());
    }
    let was = CATCHING.with(|c| c.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CATCHING.with(|c| c.set(was));
    result.map_err(|payload| panic_message(&*payload))
}

type Hook = Arc<dyn Fn(&PanicHookInfo<'_>) + Send + Sync>;

struct HookState {
    users: usize,
    previous: Option<Hook>,
}

static PANIC_HOOK: Mutex<HookState> = Mutex::new(HookState {
    users: 0,
    previous: None,
});

/// Silences the panic hook for panics the runtime catches. Shared by every
/// program running in the process; the last one out restores the hook.
struct PanicHookGuard;

impl PanicHookGuard {
    fn install() -> Self {
        let mut state = PANIC_HOOK.lock().unwrap_or_else(PoisonError::into_inner);
        // A hook left behind by an unwinding run is still the silencing one.
        if state.users == 0 && state.previous.is_none() {
            let previous: Hook = Arc::from(panic::take_hook());
            let delegate = Arc::clone(&previous);
            panic::set_hook(Box::new(move |info| {
                if !CATCHING.with(Cell::get) {
                    delegate(info);
                }
            }));
            state.previous = Some(previous);
        }
        state.users += 1;
        Self
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        let mut state = PANIC_HOOK.lock().unwrap_or_else(PoisonError::into_inner);
        state.users = state.users.saturating_sub(1);
        // The hook cannot be swapped from a panicking thread.
        if state.users == 0
            && !std::thread::panicking()
            && let Some(previous) = state.previous.take()
        {
            drop(panic::take_hook());
            panic::set_hook(Box::new(move |info| previous(info)));
        }
    }
}
