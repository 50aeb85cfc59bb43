#![forbid(unsafe_code)]

//! Input reader thread.
//!
//! [`InputReader`] owns an [`InputSource`] on a background thread, feeds
//! every chunk through an [`InputParser`], and hands decoded events to a
//! callback. A terminal source is polled so the reader can be stopped and
//! the source handed back (needed to give stdin to a child process). A plain
//! stream blocks in `read` and is abandoned when stopped.

use std::fs::File;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use teatui_core::event::Event;
use teatui_core::input_parser::InputParser;

/// How long a terminal read waits before re-checking for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const READ_BUFFER_SIZE: usize = 1024;

/// Where input bytes come from.
pub enum InputSource {
    /// A terminal device (or anything pollable). Reads can be interrupted.
    Terminal(File),
    /// An arbitrary byte stream, read with blocking calls.
    Stream(Box<dyn Read + Send>),
}

impl std::fmt::Debug for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminal(file) => f.debug_tuple("Terminal").field(file).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Background decoder feeding events to a callback.
#[derive(Debug)]
pub struct InputReader {
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<Option<InputSource>>>,
    joinable: bool,
}

impl InputReader {
    /// Start reading `source` on a new thread.
    ///
    /// `on_event` is called for every decoded event, in order. Returning
    /// `false` stops the reader.
    pub fn spawn<F>(source: InputSource, on_event: F) -> io::Result<Self>
    where
        F: FnMut(Event) -> bool + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let joinable = matches!(source, InputSource::Terminal(_));
        let flag = Arc::clone(&cancel);
        let thread = std::thread::Builder::new()
            .name("teatui-input".into())
            .spawn(move || read_loop(source, &flag, on_event))?;
        Ok(Self {
            cancel,
            thread: Some(thread),
            joinable,
        })
    }

    /// True once the reader thread has exited (EOF, error, or stop).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop reading.
    ///
    /// A terminal source is joined and returned so it can be reused. A
    /// stream source cannot be interrupted; its thread is left to finish on
    /// its own and `None` is returned.
    pub fn stop(mut self) -> Option<InputSource> {
        self.cancel.store(true, Ordering::Release);
        let thread = self.thread.take()?;
        if self.joinable || thread.is_finished() {
            match thread.join() {
                Ok(source) => source,
                Err(_) => {
                    tracing::warn!("input reader thread panicked");
                    None
                }
            }
        } else {
            None
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
    }
}

fn read_loop<F>(source: InputSource, cancel: &AtomicBool, mut on_event: F) -> Option<InputSource>
where
    F: FnMut(Event) -> bool,
{
    let mut parser = InputParser::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];
    match source {
        InputSource::Terminal(mut file) => {
            while !cancel.load(Ordering::Acquire) {
                match wait_readable(&file, POLL_INTERVAL) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(err) => {
                        tracing::warn!(error = %err, "polling terminal input failed");
                        break;
                    }
                }
                match file.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if !feed(&mut parser, &buf[..n], &mut on_event) {
                            break;
                        }
                    }
                    Err(err) if is_transient(&err) => continue,
                    Err(err) => {
                        tracing::warn!(error = %err, "reading terminal input failed");
                        break;
                    }
                }
            }
            Some(InputSource::Terminal(file))
        }
        InputSource::Stream(mut stream) => {
            while !cancel.load(Ordering::Acquire) {
                match stream.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if cancel.load(Ordering::Acquire)
                            || !feed(&mut parser, &buf[..n], &mut on_event)
                        {
                            break;
                        }
                    }
                    Err(err) if is_transient(&err) => continue,
                    Err(err) => {
                        tracing::warn!(error = %err, "reading input stream failed");
                        break;
                    }
                }
            }
            tracing::debug!("input stream closed");
            Some(InputSource::Stream(stream))
        }
    }
}

/// Decode one read. Returns false when the consumer asked to stop.
fn feed<F>(parser: &mut InputParser, chunk: &[u8], on_event: &mut F) -> bool
where
    F: FnMut(Event) -> bool,
{
    let mut events = parser.parse(chunk);
    if chunk == [0x1B] {
        events.extend(parser.resolve_escape());
    }
    events.into_iter().all(|event| on_event(event))
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

#[cfg(unix)]
fn wait_readable(file: &File, timeout: Duration) -> io::Result<bool> {
    use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
    use std::os::fd::AsFd;

    let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
    let timeout_ms: u16 = timeout.as_millis().try_into().unwrap_or(u16::MAX);
    match poll(&mut fds, PollTimeout::from(timeout_ms)) {
        Ok(n) => Ok(n > 0),
        Err(nix::errno::Errno::EINTR) => Ok(false),
        Err(errno) => Err(errno.into()),
    }
}

#[cfg(not(unix))]
fn wait_readable(_file: &File, _timeout: Duration) -> io::Result<bool> {
    Ok(true)
}
