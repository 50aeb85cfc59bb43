//! A counter driven by keys and a one-second clock.
//!
//! `+`/`-` change the count, `p` prints it above the view, `a` toggles the
//! alt screen, `s` opens a shell, `q` or `ctrl+c` quits.
//!
//! Run with `RUST_LOG=teatui_runtime=debug cargo run -p teatui --example counter 2>trace.log`.

use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use teatui::prelude::*;

#[derive(Debug)]
enum Tick {
    Clock(SystemTime),
    ShellExited(bool),
}

struct Counter {
    count: i64,
    seconds: u64,
    alt: bool,
    status: String,
}

fn every_second() -> Cmd<Tick> {
    Cmd::every(Duration::from_secs(1), Tick::Clock)
}

impl Model for Counter {
    type Message = Tick;

    fn init(&mut self) -> Cmd<Tick> {
        Cmd::batch(vec![Cmd::set_window_title("teatui counter"), every_second()])
    }

    fn update(&mut self, msg: Msg<Tick>) -> Cmd<Tick> {
        match msg {
            Msg::Key(key) if key.ctrl() && key.code == KeyCode::Char('c') => Cmd::quit(),
            Msg::Key(key) => match key.code {
                KeyCode::Char('q') | KeyCode::Escape => Cmd::quit(),
                KeyCode::Char('+') | KeyCode::Up => {
                    self.count += 1;
                    Cmd::none()
                }
                KeyCode::Char('-') | KeyCode::Down => {
                    self.count -= 1;
                    Cmd::none()
                }
                KeyCode::Char('p') => Cmd::println(format!("count is {}", self.count)),
                KeyCode::Char('a') => {
                    self.alt = !self.alt;
                    if self.alt {
                        Cmd::enter_alt_screen()
                    } else {
                        Cmd::exit_alt_screen()
                    }
                }
                KeyCode::Char('s') => {
                    let shell = std::env::var("SHELL").unwrap_or_else(|_| "sh".to_owned());
                    Cmd::exec_process(Command::new(shell), |result| {
                        Tick::ShellExited(result.is_ok())
                    })
                }
                _ => Cmd::none(),
            },
            Msg::App(Tick::Clock(at)) => {
                self.seconds = at
                    .duration_since(UNIX_EPOCH)
                    .map_or(0, |d| d.as_secs() % 60);
                every_second()
            }
            Msg::App(Tick::ShellExited(ok)) => {
                self.status = if ok { "shell ok" } else { "shell failed" }.to_owned();
                Cmd::none()
            }
            Msg::Resume => {
                self.status = "resumed".to_owned();
                Cmd::none()
            }
            _ => Cmd::none(),
        }
    }

    fn view(&self) -> String {
        format!(
            "count: {}\nclock: :{:02}\n{}\n(+/- change, p print, a alt screen, s shell, q quit)",
            self.count, self.seconds, self.status
        )
    }
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let counter = Counter {
        count: 0,
        seconds: 0,
        alt: false,
        status: String::new(),
    };
    let model = Program::new(counter)
        .with_options(ProgramOptions::from_env())
        .run()?;
    println!("final count: {}", model.count);
    Ok(())
}
