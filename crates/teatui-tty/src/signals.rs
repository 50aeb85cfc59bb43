#![forbid(unsafe_code)]

//! Process-wide signal dispatch.
//!
//! The runtime consumes five signals: interrupt, suspend, continue,
//! window-change and terminate. A single [`SignalDispatcher`] per process
//! owns the OS registration (a `signal-hook` iterator on a dedicated thread)
//! and forwards each signal to at most one subscriber. Subscribing again
//! replaces the previous handler.
//!
//! The dispatcher is created explicitly with [`SignalDispatcher::install`]
//! and handed to whoever needs it. While one is alive, `install` returns the
//! same instance.

use std::io;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::JoinHandle;

#[cfg(unix)]
use signal_hook::consts::signal::{SIGCONT, SIGINT, SIGTERM, SIGTSTP, SIGWINCH};
#[cfg(unix)]
use signal_hook::iterator::Signals;

/// A signal the runtime reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// `SIGINT`.
    Interrupt,
    /// `SIGTSTP`.
    Suspend,
    /// `SIGCONT`.
    Continue,
    /// `SIGWINCH`.
    WindowChange,
    /// `SIGTERM`.
    Terminate,
}

impl SignalKind {
    #[cfg(unix)]
    fn from_raw(signal: i32) -> Option<Self> {
        match signal {
            SIGINT => Some(Self::Interrupt),
            SIGTSTP => Some(Self::Suspend),
            SIGCONT => Some(Self::Continue),
            SIGWINCH => Some(Self::WindowChange),
            SIGTERM => Some(Self::Terminate),
            _ => None,
        }
    }
}

type Handler = Box<dyn Fn(SignalKind) + Send + Sync>;

/// The live dispatcher, if any.
static ACTIVE: Mutex<Weak<SignalDispatcher>> = Mutex::new(Weak::new());

/// Single subscriber fan-in point for process signals.
pub struct SignalDispatcher {
    handler: Arc<Mutex<Option<Handler>>>,
    #[cfg(unix)]
    handle: signal_hook::iterator::Handle,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SignalDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalDispatcher")
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

impl SignalDispatcher {
    /// Register the signal handlers, or return the dispatcher that already
    /// holds them.
    pub fn install() -> io::Result<Arc<Self>> {
        let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = active.upgrade() {
            return Ok(existing);
        }
        let dispatcher = Arc::new(Self::spawn()?);
        *active = Arc::downgrade(&dispatcher);
        Ok(dispatcher)
    }

    #[cfg(unix)]
    fn spawn() -> io::Result<Self> {
        let handler: Arc<Mutex<Option<Handler>>> = Arc::default();
        let mut signals = Signals::new([SIGINT, SIGTSTP, SIGCONT, SIGWINCH, SIGTERM])?;
        let handle = signals.handle();
        let shared = Arc::clone(&handler);
        let thread = std::thread::Builder::new()
            .name("teatui-signals".into())
            .spawn(move || {
                for raw in signals.forever() {
                    if let Some(kind) = SignalKind::from_raw(raw) {
                        tracing::debug!(signal = ?kind, "signal received");
                        deliver(&shared, kind);
                    }
                }
            })?;
        Ok(Self {
            handler,
            handle,
            thread: Mutex::new(Some(thread)),
        })
    }

    #[cfg(not(unix))]
    fn spawn() -> io::Result<Self> {
        Ok(Self {
            handler: Arc::default(),
            thread: Mutex::new(None),
        })
    }

    /// Route every signal to `handler`, replacing any previous subscriber.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(SignalKind) + Send + Sync + 'static,
    {
        *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(handler));
    }

    /// Drop the current subscriber. Signals arriving afterwards are ignored.
    pub fn unsubscribe(&self) {
        *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// True when a handler is registered.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Deliver `kind` to the subscriber as if the OS had raised it.
    ///
    /// Returns false when nobody is subscribed.
    pub fn dispatch(&self, kind: SignalKind) -> bool {
        deliver(&self.handler, kind)
    }
}

fn deliver(handler: &Mutex<Option<Handler>>, kind: SignalKind) -> bool {
    let guard = handler.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.as_ref() {
        Some(handler) => {
            handler(kind);
            true
        }
        None => false,
    }
}

impl Drop for SignalDispatcher {
    fn drop(&mut self) {
        #[cfg(unix)]
        self.handle.close();
        let thread = self
            .thread
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread {
            let _ = thread.join();
        }
    }
}

/// Stop the current process the way an unhandled `SIGTSTP` would.
///
/// Returns once the process has been continued. The caller is expected to
/// have released the terminal first.
#[cfg(unix)]
pub fn suspend_process() -> io::Result<()> {
    signal_hook::low_level::emulate_default_handler(SIGTSTP)
}

/// Job control does not exist off Unix; this returns immediately.
#[cfg(not(unix))]
pub fn suspend_process() -> io::Result<()> {
    Ok(())
}
