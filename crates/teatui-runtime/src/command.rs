#![forbid(unsafe_code)]

//! Commands: deferred work that yields at most one message.
//!
//! [`Cmd`] is what `init` and `update` return. The program loop schedules
//! it; [`Cmd::execute`] evaluates it on the calling thread, which is what
//! tests and composite commands use.
//!
//! # Composition
//!
//! - [`Cmd::batch`]: members run concurrently. Evaluated standalone, the
//!   first message produced wins. Scheduled by the program, every member's
//!   message is delivered.
//! - [`Cmd::sequence`]: members run in order and the sequence stops at the
//!   first member that yields a message. Later members never run.

use std::process::Command;
use std::sync::mpsc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::exec::{ExecCommand, ExecError, ExecRequest, ProcessCommand};
use crate::message::Msg;

/// Deferred work producing zero or one message.
pub type Task<M> = Box<dyn FnOnce() -> Option<Msg<M>> + Send>;

#[derive(Default)]
pub enum Cmd<M> {
    /// No operation.
    #[default]
    None,
    /// Quit the program.
    Quit,
    /// A message that is already known.
    Msg(Msg<M>),
    /// Work to run off the program thread.
    Task(Task<M>),
    /// Run concurrently.
    Batch(Vec<Cmd<M>>),
    /// Run in order until one yields.
    Sequence(Vec<Cmd<M>>),
}

impl<M: std::fmt::Debug> std::fmt::Debug for Cmd<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Quit => write!(f, "Quit"),
            Self::Msg(m) => f.debug_tuple("Msg").field(m).finish(),
            Self::Task(_) => write!(f, "Task(..)"),
            Self::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Self::Sequence(cmds) => f.debug_tuple("Sequence").field(cmds).finish(),
        }
    }
}

impl<M> Cmd<M> {
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    #[inline]
    pub fn quit() -> Self {
        Self::Quit
    }

    /// Deliver an application message.
    #[inline]
    pub fn msg(m: M) -> Self {
        Self::Msg(Msg::App(m))
    }

    /// Deliver any message, including the runtime's own.
    #[inline]
    pub fn message(msg: Msg<M>) -> Self {
        Self::Msg(msg)
    }

    /// Run `f` off the program thread and deliver its result.
    pub fn task<F>(f: F) -> Self
    where
        F: FnOnce() -> M + Send + 'static,
    {
        Self::Task(Box::new(move || Some(Msg::App(f()))))
    }

    /// Like [`task`](Self::task), but `f` may yield nothing or a runtime
    /// message.
    pub fn task_with<F>(f: F) -> Self
    where
        F: FnOnce() -> Option<Msg<M>> + Send + 'static,
    {
        Self::Task(Box::new(f))
    }

    /// Concurrent composition. Empty collapses to `None`, one to itself.
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or_default(),
            _ => Self::Batch(cmds),
        }
    }

    /// Ordered, short-circuiting composition. Empty collapses to `None`,
    /// one to itself.
    pub fn sequence(cmds: Vec<Self>) -> Self {
        let mut cmds = cmds;
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or_default(),
            _ => Self::Sequence(cmds),
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Stable name for logs and spans.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Quit => "Quit",
            Self::Msg(_) => "Msg",
            Self::Task(_) => "Task",
            Self::Batch(_) => "Batch",
            Self::Sequence(_) => "Sequence",
        }
    }

    /// Number of leaf commands, counting through batches and sequences.
    pub fn count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Batch(cmds) | Self::Sequence(cmds) => cmds.iter().map(Self::count).sum(),
            _ => 1,
        }
    }

    // --- lifecycle ---

    pub fn interrupt() -> Self {
        Self::Msg(Msg::Interrupt)
    }

    pub fn suspend() -> Self {
        Self::Msg(Msg::Suspend)
    }

    // --- timers ---

    /// Fire once after `duration`. `f` receives the firing time.
    pub fn tick<F>(duration: Duration, f: F) -> Self
    where
        F: FnOnce(SystemTime) -> M + Send + 'static,
    {
        Self::task(move || {
            std::thread::sleep(duration);
            f(SystemTime::now())
        })
    }

    /// Fire once at the next wall-clock multiple of `interval`, so
    /// independent timers with the same interval tick together. Return
    /// another `every` from `update` to keep ticking.
    pub fn every<F>(interval: Duration, f: F) -> Self
    where
        F: FnOnce(SystemTime) -> M + Send + 'static,
    {
        Self::task(move || {
            std::thread::sleep(until_next_multiple(SystemTime::now(), interval));
            f(SystemTime::now())
        })
    }

    // --- terminal ---

    /// Ask for a [`Msg::WindowSize`] with the current size.
    pub fn window_size() -> Self {
        Self::Msg(Msg::RequestWindowSize)
    }

    pub fn set_window_title(title: impl Into<String>) -> Self {
        Self::Msg(Msg::SetWindowTitle(title.into()))
    }

    pub fn clear_screen() -> Self {
        Self::Msg(Msg::ClearScreen)
    }

    pub fn enter_alt_screen() -> Self {
        Self::Msg(Msg::EnterAltScreen)
    }

    pub fn exit_alt_screen() -> Self {
        Self::Msg(Msg::ExitAltScreen)
    }

    pub fn show_cursor() -> Self {
        Self::Msg(Msg::ShowCursor)
    }

    pub fn hide_cursor() -> Self {
        Self::Msg(Msg::HideCursor)
    }

    pub fn enable_report_focus() -> Self {
        Self::Msg(Msg::EnableReportFocus)
    }

    pub fn disable_report_focus() -> Self {
        Self::Msg(Msg::DisableReportFocus)
    }

    pub fn enable_bracketed_paste() -> Self {
        Self::Msg(Msg::EnableBracketedPaste)
    }

    pub fn disable_bracketed_paste() -> Self {
        Self::Msg(Msg::DisableBracketedPaste)
    }

    pub fn enable_mouse_cell_motion() -> Self {
        Self::Msg(Msg::EnableMouseCellMotion)
    }

    pub fn enable_mouse_all_motion() -> Self {
        Self::Msg(Msg::EnableMouseAllMotion)
    }

    pub fn disable_mouse() -> Self {
        Self::Msg(Msg::DisableMouse)
    }

    pub fn repaint() -> Self {
        Self::Msg(Msg::Repaint)
    }

    // --- output ---

    /// Print `line` above the program. Ignored in the alt screen.
    pub fn println(line: impl Into<String>) -> Self {
        Self::Msg(Msg::PrintLine(line.into()))
    }

    /// Print preformatted text above the program, e.g.
    /// `Cmd::printf(format!("{n} files"))`. Ignored in the alt screen.
    pub fn printf(text: impl Into<String>) -> Self {
        Self::Msg(Msg::PrintFormatted(text.into()))
    }

    pub fn scroll_sync(lines: Vec<String>, top: u16, bottom: u16) -> Self {
        Self::Msg(Msg::ScrollSync { lines, top, bottom })
    }

    pub fn scroll_up(lines: Vec<String>, top: u16, bottom: u16) -> Self {
        Self::Msg(Msg::ScrollUp { lines, top, bottom })
    }

    pub fn scroll_down(lines: Vec<String>, top: u16, bottom: u16) -> Self {
        Self::Msg(Msg::ScrollDown { lines, top, bottom })
    }

    pub fn clear_scroll_area() -> Self {
        Self::Msg(Msg::ClearScrollArea)
    }

    // --- exec ---

    /// Release the terminal, run `command`, restore the terminal, then
    /// deliver `on_done(result)`.
    pub fn exec<C, F>(command: C, on_done: F) -> Self
    where
        C: ExecCommand + 'static,
        F: FnOnce(Result<(), ExecError>) -> M + Send + 'static,
    {
        Self::Msg(Msg::Exec(ExecRequest::new(command).on_done(on_done)))
    }

    /// [`exec`](Self::exec) for a child process with inherited stdio.
    pub fn exec_process<F>(command: Command, on_done: F) -> Self
    where
        F: FnOnce(Result<(), ExecError>) -> M + Send + 'static,
    {
        Self::exec(ProcessCommand::new(command), on_done)
    }
}

impl<M: Send + 'static> Cmd<M> {
    /// Evaluate on the calling thread and return the message produced.
    ///
    /// Batch members each get a thread and the first message wins; the
    /// others are left to finish and their results are dropped. A sequence
    /// returns the first message any member produces without running the
    /// rest.
    pub fn execute(self) -> Option<Msg<M>> {
        match self {
            Self::None => None,
            Self::Quit => Some(Msg::Quit),
            Self::Msg(msg) => Some(msg),
            Self::Task(task) => task(),
            Self::Batch(cmds) => first_of(cmds),
            Self::Sequence(cmds) => cmds.into_iter().find_map(Self::execute),
        }
    }
}

fn first_of<M: Send + 'static>(cmds: Vec<Cmd<M>>) -> Option<Msg<M>> {
    let (tx, rx) = mpsc::channel();
    for cmd in cmds {
        let tx = tx.clone();
        let spawned = std::thread::Builder::new()
            .name("teatui-cmd".into())
            .spawn(move || {
                let _ = tx.send(cmd.execute());
            });
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "failed to spawn batch member");
        }
    }
    drop(tx);
    rx.iter().flatten().next()
}

/// Time from `now` to the next multiple of `interval` since the epoch.
fn until_next_multiple(now: SystemTime, interval: Duration) -> Duration {
    let interval_ns = interval.as_nanos();
    if interval_ns == 0 {
        return Duration::ZERO;
    }
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let wait = interval_ns - since_epoch.as_nanos() % interval_ns;
    Duration::from_nanos(u64::try_from(wait).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    #[derive(Debug, PartialEq)]
    enum TestMsg {
        A,
        B,
        C,
    }

    #[test]
    fn batch_collapses_trivial_cases() {
        assert!(Cmd::<TestMsg>::batch(vec![]).is_none());
        assert!(Cmd::<TestMsg>::batch(vec![Cmd::None, Cmd::None]).is_none());
        assert!(matches!(
            Cmd::batch(vec![Cmd::None, Cmd::msg(TestMsg::A)]),
            Cmd::Msg(Msg::App(TestMsg::A))
        ));
        assert!(matches!(
            Cmd::<TestMsg>::batch(vec![Cmd::Quit, Cmd::Quit]),
            Cmd::Batch(v) if v.len() == 2
        ));
    }

    #[test]
    fn sequence_collapses_trivial_cases() {
        assert!(Cmd::<TestMsg>::sequence(vec![]).is_none());
        assert!(matches!(
            Cmd::<TestMsg>::sequence(vec![Cmd::Quit]),
            Cmd::Quit
        ));
    }

    #[test]
    fn batch_returns_exactly_one_member_message() {
        let cmd = Cmd::Batch(vec![
            Cmd::task(|| TestMsg::A),
            Cmd::task(|| TestMsg::B),
            Cmd::task(|| TestMsg::C),
        ]);
        let got = cmd.execute().and_then(Msg::into_app).unwrap();
        assert!(matches!(got, TestMsg::A | TestMsg::B | TestMsg::C));
    }

    #[test]
    fn empty_batch_yields_nothing() {
        assert!(Cmd::<TestMsg>::Batch(vec![]).execute().is_none());
        assert!(Cmd::<TestMsg>::batch(vec![]).execute().is_none());
    }

    #[test]
    fn batch_skips_silent_members() {
        let cmd = Cmd::Batch(vec![
            Cmd::task_with(|| None),
            Cmd::task(|| TestMsg::B),
            Cmd::None,
        ]);
        assert_eq!(cmd.execute(), Some(Msg::App(TestMsg::B)));
    }

    #[test]
    fn sequence_short_circuits() {
        let ran_b = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran_b);
        let cmd = Cmd::Sequence(vec![
            Cmd::None,
            Cmd::task(|| TestMsg::A),
            Cmd::task(move || {
                flag.store(true, Ordering::SeqCst);
                TestMsg::B
            }),
        ]);
        assert_eq!(cmd.execute(), Some(Msg::App(TestMsg::A)));
        assert!(!ran_b.load(Ordering::SeqCst));
    }

    #[test]
    fn nested_sequence_in_batch_keeps_its_semantics() {
        let cmd = Cmd::Batch(vec![Cmd::Sequence(vec![
            Cmd::task_with(|| None),
            Cmd::msg(TestMsg::C),
            Cmd::msg(TestMsg::A),
        ])]);
        assert_eq!(cmd.execute(), Some(Msg::App(TestMsg::C)));
    }

    #[test]
    fn quit_executes_to_quit_message() {
        assert_eq!(Cmd::<TestMsg>::quit().execute(), Some(Msg::Quit));
    }

    #[test]
    fn count_walks_composites() {
        let cmd: Cmd<TestMsg> = Cmd::Batch(vec![
            Cmd::Quit,
            Cmd::Sequence(vec![Cmd::msg(TestMsg::A), Cmd::msg(TestMsg::B)]),
            Cmd::None,
        ]);
        assert_eq!(cmd.count(), 3);
        assert_eq!(cmd.type_name(), "Batch");
    }

    #[test]
    fn tick_waits_at_least_duration() {
        let start = Instant::now();
        let msg = Cmd::tick(Duration::from_millis(30), |_| TestMsg::A).execute();
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(msg, Some(Msg::App(TestMsg::A)));
    }

    #[test]
    fn every_aligns_to_wall_clock() {
        let interval = Duration::from_secs(1);
        let at = UNIX_EPOCH + Duration::from_millis(10_250);
        assert_eq!(until_next_multiple(at, interval), Duration::from_millis(750));
        let exact = UNIX_EPOCH + Duration::from_secs(10);
        assert_eq!(until_next_multiple(exact, interval), interval);
        assert_eq!(until_next_multiple(at, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn helpers_build_system_messages() {
        assert_eq!(
            Cmd::<TestMsg>::println("hi").execute(),
            Some(Msg::PrintLine("hi".into()))
        );
        assert_eq!(
            Cmd::<TestMsg>::window_size().execute(),
            Some(Msg::RequestWindowSize)
        );
        assert_eq!(
            Cmd::<TestMsg>::scroll_up(vec!["x".into()], 1, 5).execute(),
            Some(Msg::ScrollUp {
                lines: vec!["x".into()],
                top: 1,
                bottom: 5
            })
        );
    }
}
