#![forbid(unsafe_code)]

//! Terminal geometry, raw mode, and the saved termios snapshot.
//!
//! [`Tty`] is the production [`TerminalControl`]. It snapshots the termios
//! attributes once, switches to raw mode, and puts the snapshot back exactly
//! once: either through [`TerminalControl::restore_state`] or, failing that,
//! on drop.
//!
//! [`HeadlessTerminal`] is the no-op implementation used when input and
//! output are redirected (tests, pipes). It never touches termios.

use std::fs::File;
use std::io;

use crate::error::Result;

/// Size reported when no real terminal is available, as `(columns, rows)`.
pub const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Operations the runtime needs from the controlling terminal.
pub trait TerminalControl: Send {
    /// True when backed by a real terminal device.
    fn is_terminal(&self) -> bool;

    /// Current size as `(columns, rows)`.
    fn size(&self) -> io::Result<(u16, u16)>;

    /// Snapshot the current attributes. Only the first call records anything.
    fn save_state(&mut self) -> Result<()>;

    /// Switch to raw mode.
    fn enter_raw_mode(&mut self) -> Result<()>;

    /// Return to the saved attributes, keeping the snapshot for a later
    /// [`enter_raw_mode`](Self::enter_raw_mode). Used around exec and suspend.
    fn exit_raw_mode(&mut self) -> Result<()>;

    /// Apply the saved attributes and discard the snapshot. Subsequent calls
    /// are no-ops.
    fn restore_state(&mut self) -> Result<()>;

    /// A readable handle on the terminal for the input reader, if any.
    fn reader(&self) -> io::Result<Option<File>>;
}

// ── Headless ─────────────────────────────────────────────────────────────

/// Terminal stand-in for redirected streams.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessTerminal {
    width: u16,
    height: u16,
}

impl HeadlessTerminal {
    /// A headless terminal of the given size.
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl Default for HeadlessTerminal {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE.0, DEFAULT_SIZE.1)
    }
}

impl TerminalControl for HeadlessTerminal {
    fn is_terminal(&self) -> bool {
        false
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        Ok((self.width, self.height))
    }

    fn save_state(&mut self) -> Result<()> {
        Ok(())
    }

    fn enter_raw_mode(&mut self) -> Result<()> {
        Ok(())
    }

    fn exit_raw_mode(&mut self) -> Result<()> {
        Ok(())
    }

    fn restore_state(&mut self) -> Result<()> {
        Ok(())
    }

    fn reader(&self) -> io::Result<Option<File>> {
        Ok(None)
    }
}

// ── Unix TTY ─────────────────────────────────────────────────────────────

#[cfg(unix)]
pub use unix::Tty;

#[cfg(unix)]
mod unix {
    use std::fs::{File, OpenOptions};
    use std::io::{self, IsTerminal};
    use std::os::fd::{AsFd, BorrowedFd};
    use std::sync::atomic::{AtomicBool, Ordering};

    use nix::sys::termios::{
        self, ControlFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices, Termios,
    };

    use super::TerminalControl;
    use crate::error::{Result, TerminalError};

    /// Set while a [`Tty`] opened with [`Tty::open`] is alive.
    static CONTROLLING_TTY_OWNED: AtomicBool = AtomicBool::new(false);

    /// Exclusive claim on the process's controlling terminal.
    #[derive(Debug)]
    struct TerminalLease;

    impl TerminalLease {
        fn acquire() -> Result<Self> {
            CONTROLLING_TTY_OWNED
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .map(|_| Self)
                .map_err(|_| TerminalError::AlreadyRunning)
        }
    }

    impl Drop for TerminalLease {
        fn drop(&mut self) {
            CONTROLLING_TTY_OWNED.store(false, Ordering::Release);
        }
    }

    #[derive(Debug)]
    enum Device {
        Stdin(io::Stdin),
        Dedicated(File),
    }

    impl Device {
        fn as_fd(&self) -> BorrowedFd<'_> {
            match self {
                Self::Stdin(stdin) => stdin.as_fd(),
                Self::Dedicated(file) => file.as_fd(),
            }
        }
    }

    /// The controlling terminal.
    #[derive(Debug)]
    pub struct Tty {
        device: Device,
        saved: Option<Termios>,
        raw: bool,
        _lease: Option<TerminalLease>,
    }

    impl Tty {
        /// Open the controlling terminal.
        ///
        /// Uses stdin when it is a terminal, otherwise (or when `force_tty`
        /// is set) opens `/dev/tty`. Only one `Tty` opened this way may
        /// exist per process.
        pub fn open(force_tty: bool) -> Result<Self> {
            let lease = TerminalLease::acquire()?;
            let stdin = io::stdin();
            let device = if !force_tty && stdin.is_terminal() {
                Device::Stdin(stdin)
            } else {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open("/dev/tty")
                    .map_err(|_| TerminalError::NotATty)?;
                Device::Dedicated(file)
            };
            Self::with_device(device, Some(lease))
        }

        /// Wrap an already-open terminal device, such as a pseudo-terminal.
        pub fn from_device(file: File) -> Result<Self> {
            Self::with_device(Device::Dedicated(file), None)
        }

        fn with_device(device: Device, lease: Option<TerminalLease>) -> Result<Self> {
            if !rustix::termios::isatty(device.as_fd()) {
                return Err(TerminalError::NotATty);
            }
            Ok(Self {
                device,
                saved: None,
                raw: false,
                _lease: lease,
            })
        }

        /// True while raw mode is applied.
        #[must_use]
        pub fn is_raw(&self) -> bool {
            self.raw
        }

        fn apply(&self, attrs: &Termios) -> Result<()> {
            termios::tcsetattr(self.device.as_fd(), SetArg::TCSAFLUSH, attrs)
                .map_err(|errno| TerminalError::RawModeFailure(errno.into()))
        }
    }

    /// Raw attributes derived from `saved`: no canonical mode, echo,
    /// signal keys or output processing; 8-bit characters; reads return
    /// after one byte with no timeout.
    fn raw_attributes(saved: &Termios) -> Termios {
        let mut raw = saved.clone();
        raw.local_flags
            .remove(LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::ISIG);
        raw.output_flags.remove(OutputFlags::OPOST);
        raw.control_flags.remove(ControlFlags::CSIZE);
        raw.control_flags.insert(ControlFlags::CS8);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        raw
    }

    impl TerminalControl for Tty {
        fn is_terminal(&self) -> bool {
            true
        }

        fn size(&self) -> io::Result<(u16, u16)> {
            let ws = rustix::termios::tcgetwinsize(self.device.as_fd())?;
            Ok((ws.ws_col, ws.ws_row))
        }

        fn save_state(&mut self) -> Result<()> {
            if self.saved.is_none() {
                let attrs = termios::tcgetattr(self.device.as_fd())
                    .map_err(|errno| TerminalError::RawModeFailure(errno.into()))?;
                self.saved = Some(attrs);
            }
            Ok(())
        }

        fn enter_raw_mode(&mut self) -> Result<()> {
            self.save_state()?;
            let Some(saved) = &self.saved else {
                return Err(TerminalError::NotATty);
            };
            self.apply(&raw_attributes(saved))?;
            self.raw = true;
            Ok(())
        }

        fn exit_raw_mode(&mut self) -> Result<()> {
            if let Some(saved) = &self.saved {
                self.apply(saved)?;
            }
            self.raw = false;
            Ok(())
        }

        fn restore_state(&mut self) -> Result<()> {
            let Some(saved) = self.saved.take() else {
                return Ok(());
            };
            self.raw = false;
            self.apply(&saved)
        }

        fn reader(&self) -> io::Result<Option<File>> {
            let owned = self.device.as_fd().try_clone_to_owned()?;
            Ok(Some(File::from(owned)))
        }
    }

    impl Drop for Tty {
        fn drop(&mut self) {
            if self.saved.is_some() {
                if let Err(err) = self.restore_state() {
                    tracing::warn!(error = %err, "failed to restore terminal state on drop");
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use nix::pty::{Winsize, openpty};

        fn pty(cols: u16, rows: u16) -> (File, File) {
            let size = Winsize {
                ws_row: rows,
                ws_col: cols,
                ws_xpixel: 0,
                ws_ypixel: 0,
            };
            let pair = openpty(&size, None).expect("openpty");
            (File::from(pair.master), File::from(pair.slave))
        }

        fn current(tty: &Tty) -> Termios {
            termios::tcgetattr(tty.device.as_fd()).expect("tcgetattr")
        }

        #[test]
        fn size_reads_window_size() {
            let (_master, slave) = pty(132, 43);
            let tty = Tty::from_device(slave).unwrap();
            assert_eq!(tty.size().unwrap(), (132, 43));
            assert!(tty.is_terminal());
        }

        #[test]
        fn raw_mode_clears_cooked_flags() {
            let (_master, slave) = pty(80, 24);
            let mut tty = Tty::from_device(slave).unwrap();
            tty.save_state().unwrap();
            tty.enter_raw_mode().unwrap();
            assert!(tty.is_raw());

            let attrs = current(&tty);
            assert!(!attrs.local_flags.contains(LocalFlags::ICANON));
            assert!(!attrs.local_flags.contains(LocalFlags::ECHO));
            assert!(!attrs.local_flags.contains(LocalFlags::ISIG));
            assert!(!attrs.output_flags.contains(OutputFlags::OPOST));
            assert!(attrs.control_flags.contains(ControlFlags::CS8));
            assert_eq!(attrs.control_chars[SpecialCharacterIndices::VMIN as usize], 1);
            assert_eq!(attrs.control_chars[SpecialCharacterIndices::VTIME as usize], 0);
        }

        #[test]
        fn restore_brings_back_saved_attributes_once() {
            let (_master, slave) = pty(80, 24);
            let mut tty = Tty::from_device(slave).unwrap();
            let before = current(&tty);
            assert!(before.local_flags.contains(LocalFlags::ICANON));

            tty.enter_raw_mode().unwrap();
            tty.restore_state().unwrap();
            let after = current(&tty);
            assert_eq!(after.local_flags, before.local_flags);
            assert_eq!(after.output_flags, before.output_flags);
            assert!(!tty.is_raw());

            // Snapshot is gone; a second restore does nothing.
            tty.restore_state().unwrap();
            assert!(tty.saved.is_none());
        }

        #[test]
        fn exit_raw_mode_keeps_snapshot() {
            let (_master, slave) = pty(80, 24);
            let mut tty = Tty::from_device(slave).unwrap();
            tty.enter_raw_mode().unwrap();
            tty.exit_raw_mode().unwrap();
            assert!(current(&tty).local_flags.contains(LocalFlags::ICANON));
            assert!(tty.saved.is_some());

            tty.enter_raw_mode().unwrap();
            assert!(!current(&tty).local_flags.contains(LocalFlags::ICANON));
        }

        #[test]
        fn drop_restores_when_not_restored_explicitly() {
            let (_master, slave) = pty(80, 24);
            let probe = slave.try_clone().unwrap();
            {
                let mut tty = Tty::from_device(slave).unwrap();
                tty.enter_raw_mode().unwrap();
            }
            let attrs = termios::tcgetattr(&probe).unwrap();
            assert!(attrs.local_flags.contains(LocalFlags::ICANON));
        }

        #[test]
        fn non_terminal_is_rejected() {
            let (a, _b) = std::os::unix::net::UnixStream::pair().unwrap();
            let file = File::from(std::os::fd::OwnedFd::from(a));
            assert!(matches!(
                Tty::from_device(file),
                Err(TerminalError::NotATty)
            ));
        }

        #[test]
        fn reader_is_a_separate_handle() {
            let (_master, slave) = pty(80, 24);
            let tty = Tty::from_device(slave).unwrap();
            let reader = tty.reader().unwrap();
            assert!(reader.is_some());
        }

        #[test]
        fn lease_is_exclusive() {
            let first = TerminalLease::acquire().unwrap();
            assert!(matches!(
                TerminalLease::acquire(),
                Err(TerminalError::AlreadyRunning)
            ));
            drop(first);
            assert!(TerminalLease::acquire().is_ok());
        }
    }
}

// ── Other platforms ──────────────────────────────────────────────────────

/// Placeholder controller; raw mode is not implemented off Unix.
#[cfg(not(unix))]
#[derive(Debug)]
pub struct Tty {
    _private: (),
}

#[cfg(not(unix))]
impl Tty {
    /// Always fails with [`TerminalError::Unsupported`](crate::TerminalError::Unsupported).
    pub fn open(_force_tty: bool) -> Result<Self> {
        Err(crate::TerminalError::Unsupported)
    }
}

#[cfg(not(unix))]
impl TerminalControl for Tty {
    fn is_terminal(&self) -> bool {
        false
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        Ok(DEFAULT_SIZE)
    }

    fn save_state(&mut self) -> Result<()> {
        Err(crate::TerminalError::Unsupported)
    }

    fn enter_raw_mode(&mut self) -> Result<()> {
        Err(crate::TerminalError::Unsupported)
    }

    fn exit_raw_mode(&mut self) -> Result<()> {
        Err(crate::TerminalError::Unsupported)
    }

    fn restore_state(&mut self) -> Result<()> {
        Ok(())
    }

    fn reader(&self) -> io::Result<Option<File>> {
        Ok(None)
    }
}
