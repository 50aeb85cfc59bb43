//! End-to-end runs of `Program` against a headless terminal.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use teatui_core::event::{KeyCode, KeyEvent};
use teatui_runtime::{
    CancelToken, Cmd, ExecFn, KillCause, Model, Msg, Program, ProgramError, ProgramOptions,
};
use teatui_tty::{TerminalControl, TerminalError};

// ---------- fixtures ----------

#[derive(Default)]
struct Counts {
    saves: AtomicUsize,
    raw_enters: AtomicUsize,
    raw_exits: AtomicUsize,
    restores: AtomicUsize,
}

struct CountingTerminal {
    counts: Arc<Counts>,
    size: (u16, u16),
}

impl CountingTerminal {
    fn new() -> (Self, Arc<Counts>) {
        let counts = Arc::new(Counts::default());
        let terminal = Self {
            counts: Arc::clone(&counts),
            size: (100, 30),
        };
        (terminal, counts)
    }
}

impl TerminalControl for CountingTerminal {
    fn is_terminal(&self) -> bool {
        false
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        Ok(self.size)
    }

    fn save_state(&mut self) -> Result<(), TerminalError> {
        self.counts.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn enter_raw_mode(&mut self) -> Result<(), TerminalError> {
        self.counts.raw_enters.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn exit_raw_mode(&mut self) -> Result<(), TerminalError> {
        self.counts.raw_exits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn restore_state(&mut self) -> Result<(), TerminalError> {
        self.counts.restores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reader(&self) -> io::Result<Option<std::fs::File>> {
        Ok(None)
    }
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Record(u32),
    Quit,
    Interrupt,
    Panic,
    PanicInTask,
    Spawn(u32),
    Sequence,
    Exec,
    ExecDone(bool),
}

#[derive(Debug, Default)]
struct Script {
    seen: Vec<u32>,
    keys: Vec<KeyCode>,
    size: Option<(u16, u16)>,
    exec_ok: Option<bool>,
    init: Option<Step>,
}

impl Model for Script {
    type Message = Step;

    fn init(&mut self) -> Cmd<Step> {
        match self.init.take() {
            Some(step) => Cmd::msg(step),
            None => Cmd::none(),
        }
    }

    fn update(&mut self, msg: Msg<Step>) -> Cmd<Step> {
        match msg {
            Msg::WindowSize { width, height } => self.size = Some((width, height)),
            Msg::Key(KeyEvent {
                code: KeyCode::Char('q'),
                ..
            }) => return Cmd::quit(),
            Msg::Key(key) => self.keys.push(key.code),
            Msg::App(Step::Record(n)) => self.seen.push(n),
            Msg::App(Step::Quit) => return Cmd::quit(),
            Msg::App(Step::Interrupt) => return Cmd::interrupt(),
            Msg::App(Step::Panic) => panic!("boom"),
            Msg::App(Step::PanicInTask) => {
                return Cmd::task(|| -> Step { panic!("task boom") });
            }
            Msg::App(Step::Spawn(n)) => {
                return Cmd::task(move || Step::Record(n * 10));
            }
            Msg::App(Step::Sequence) => {
                return Cmd::sequence(vec![
                    Cmd::task_with(|| None),
                    Cmd::msg(Step::Record(1)),
                    Cmd::msg(Step::Record(2)),
                ]);
            }
            Msg::App(Step::Exec) => {
                return Cmd::exec(ExecFn(|| Ok(())), |result| Step::ExecDone(result.is_ok()));
            }
            Msg::App(Step::ExecDone(ok)) => {
                self.exec_ok = Some(ok);
                return Cmd::quit();
            }
            _ => {}
        }
        Cmd::none()
    }

    fn view(&self) -> String {
        format!("seen {:?}\nkeys {}", self.seen, self.keys.len())
    }
}

fn options() -> ProgramOptions {
    ProgramOptions::new()
        .without_signal_handler()
        .with_shutdown_grace(Duration::from_millis(500))
}

/// Surface runtime spans with `RUST_LOG=teatui_runtime=debug cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn program(model: Script, input: &'static [u8]) -> (Program<Script>, Arc<Counts>, Capture) {
    init_tracing();
    let (terminal, counts) = CountingTerminal::new();
    let out = Capture::default();
    let program = Program::new(model)
        .with_options(options())
        .with_terminal(Box::new(terminal))
        .with_input(input)
        .with_output(out.clone());
    (program, counts, out)
}

// ---------- restore-once law ----------

#[test]
fn quit_restores_terminal_once() {
    let (program, counts, _) = program(Script::default(), b"q");
    program.run().unwrap();
    assert_eq!(counts.saves.load(Ordering::SeqCst), 1);
    assert_eq!(counts.restores.load(Ordering::SeqCst), 1);
}

#[test]
fn kill_restores_terminal_once() {
    let (program, counts, _) = program(Script::default(), b"");
    program.handle().kill();
    let err = program.run().unwrap_err();
    assert!(matches!(err, ProgramError::Killed(KillCause::Handle)));
    assert_eq!(counts.restores.load(Ordering::SeqCst), 1);
}

#[test]
fn panic_restores_terminal_once() {
    let (program, counts, _) = program(Script::default(), b"");
    program.handle().send(Step::Panic);
    match program.run() {
        Err(ProgramError::Panic { message }) => assert_eq!(message, "boom"),
        other => panic!("expected panic error, got {:?}", other.err()),
    }
    assert_eq!(counts.restores.load(Ordering::SeqCst), 1);
}

#[test]
fn panic_in_command_is_reported() {
    let (program, counts, _) = program(Script::default(), b"");
    program.handle().send(Step::PanicInTask);
    match program.run() {
        Err(ProgramError::Panic { message }) => assert_eq!(message, "task boom"),
        other => panic!("expected panic error, got {:?}", other.err()),
    }
    assert_eq!(counts.restores.load(Ordering::SeqCst), 1);
}

#[test]
fn panic_in_filter_restores_terminal_once() {
    let (program, counts, _) = program(Script::default(), b"");
    let program = program.with_filter(|_model, msg| match msg {
        Msg::App(Step::Record(7)) => panic!("filter boom"),
        other => Some(other),
    });
    let handle = program.handle();
    handle.send(Step::Record(1));
    handle.send(Step::Record(7));
    handle.send(Step::Quit);
    match program.run() {
        Err(ProgramError::Panic { message }) => assert_eq!(message, "filter boom"),
        other => panic!("expected panic error, got {:?}", other.err()),
    }
    assert_eq!(counts.restores.load(Ordering::SeqCst), 1);
}

#[test]
fn panic_in_on_finish_is_reported_after_restore() {
    let (program, counts, _) = program(Script::default(), b"");
    let restores = Arc::clone(&counts);
    let program = program.on_finish(move |_model: &Script| {
        assert_eq!(restores.restores.load(Ordering::SeqCst), 1);
        panic!("finish boom");
    });
    program.handle().send(Step::Quit);
    match program.run() {
        Err(ProgramError::Panic { message }) => assert_eq!(message, "finish boom"),
        other => panic!("expected panic error, got {:?}", other.err()),
    }
    assert_eq!(counts.restores.load(Ordering::SeqCst), 1);
}

// ---------- outcomes ----------

#[test]
fn messages_sent_before_run_arrive_in_order() {
    let (program, _, _) = program(Script::default(), b"");
    let handle = program.handle();
    for n in [4, 2, 9] {
        handle.send(Step::Record(n));
    }
    handle.send(Step::Quit);
    let model = program.run().unwrap();
    assert_eq!(model.seen, vec![4, 2, 9]);
}

#[test]
fn interrupt_is_distinct_from_quit_and_kill() {
    let (program, _, _) = program(Script::default(), b"");
    program.handle().send(Step::Interrupt);
    assert!(matches!(program.run(), Err(ProgramError::Interrupted)));
}

#[test]
fn cancel_token_kills_with_cancelled_cause() {
    let token = CancelToken::new();
    let (program, counts, _) = program(Script::default(), b"");
    let program = program.with_cancel_token(token.clone());
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        token.cancel();
    });
    let err = program.run().unwrap_err();
    canceller.join().unwrap();
    assert!(matches!(err, ProgramError::Killed(KillCause::Cancelled)));
    assert_eq!(counts.restores.load(Ordering::SeqCst), 1);
}

#[test]
fn on_finish_sees_final_model_on_kill() {
    let finished = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&finished);
    let (program, _, _) = program(Script::default(), b"");
    let handle = program.handle();
    let program = program.on_finish(move |model: &Script| {
        *slot.lock().unwrap() = Some(model.seen.clone());
    });
    handle.kill();
    assert!(program.run().is_err());
    assert_eq!(*finished.lock().unwrap(), Some(Vec::new()));
}

// ---------- message flow ----------

#[test]
fn filter_drops_and_rewrites() {
    let (program, _, _) = program(Script::default(), b"");
    let program = program.with_filter(|_model, msg| match msg {
        Msg::App(Step::Record(1)) => None,
        Msg::App(Step::Record(2)) => Some(Msg::App(Step::Record(20))),
        other => Some(other),
    });
    let handle = program.handle();
    for n in [1, 2, 3] {
        handle.send(Step::Record(n));
    }
    handle.send(Step::Quit);
    assert_eq!(program.run().unwrap().seen, vec![20, 3]);
}

#[test]
fn input_bytes_become_key_messages() {
    let (program, _, _) = program(Script::default(), b"ab\x1b[Aq");
    let model = program.run().unwrap();
    assert_eq!(
        model.keys,
        vec![KeyCode::Char('a'), KeyCode::Char('b'), KeyCode::Up]
    );
}

#[test]
fn initial_window_size_comes_from_terminal() {
    let (program, _, _) = program(Script::default(), b"");
    let handle = program.handle();
    let quitter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        handle.send(Step::Quit);
    });
    let model = program.run().unwrap();
    quitter.join().unwrap();
    assert_eq!(model.size, Some((100, 30)));
}

#[test]
fn task_results_reenter_the_queue() {
    let model = Script {
        init: Some(Step::Spawn(7)),
        ..Script::default()
    };
    let (program, _, _) = program(model, b"");
    let handle = program.handle();
    let quitter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        handle.send(Step::Quit);
    });
    let model = program.run().unwrap();
    quitter.join().unwrap();
    assert_eq!(model.seen, vec![70]);
}

#[test]
fn sequence_delivers_only_first_result() {
    let (program, _, _) = program(Script::default(), b"");
    let handle = program.handle();
    handle.send(Step::Sequence);
    let quitter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        handle.send(Step::Quit);
    });
    let model = program.run().unwrap();
    quitter.join().unwrap();
    assert_eq!(model.seen, vec![1]);
}

#[test]
fn exec_releases_and_reacquires_terminal() {
    let (program, counts, _) = program(Script::default(), b"");
    program.handle().send(Step::Exec);
    let model = program.run().unwrap();
    assert_eq!(model.exec_ok, Some(true));
    assert_eq!(counts.raw_exits.load(Ordering::SeqCst), 1);
    assert_eq!(counts.raw_enters.load(Ordering::SeqCst), 2);
    assert_eq!(counts.restores.load(Ordering::SeqCst), 1);
}

// ---------- terminal output ----------

#[test]
fn output_sets_and_resets_modes() {
    let (program, _, out) = program(Script::default(), b"");
    let program = program.with_options(options().with_alt_screen());
    let handle = program.handle();
    handle.send(Step::Record(5));
    let quitter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        handle.send(Step::Quit);
    });
    program.run().unwrap();
    quitter.join().unwrap();

    let text = out.text();
    let enter = text.find("\x1b[?1049h").expect("alt screen entered");
    let leave = text.rfind("\x1b[?1049l").expect("alt screen left");
    assert!(enter < leave);
    assert!(text.contains("\x1b[?25l"));
    assert!(text.contains("\x1b[?2004h"));
    assert!(text.contains("\x1b[?25h"));
    assert!(text.contains("\x1b[?2004l"));
    assert!(text.contains("seen [5]"));
    let clear = text.find("\x1b[2J\x1b[H").expect("screen cleared at startup");
    assert!(enter < clear);
    assert!(clear < text.find("seen").expect("view drawn"));
}

#[test]
fn inline_startup_clears_before_first_view() {
    let (program, _, out) = program(Script::default(), b"");
    program.handle().send(Step::Quit);
    program.run().unwrap();

    let text = out.text();
    let hide = text.find("\x1b[?25l").expect("cursor hidden");
    let clear = text.find("\x1b[2J\x1b[H").expect("screen cleared");
    let view = text.find("seen []").expect("view drawn");
    assert!(hide < clear);
    assert!(clear < view);
}
