// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode, size queries, and RAII restoration.
//
// Safety: `unsafe` is confined to the `Stdio` device's libc calls, each on
// a descriptor the device holds for its whole lifetime:
//   tcgetattr / tcsetattr  pointer to a live, fully initialized `termios`
//   ioctl(TIOCGWINSZ)      pointer to a zeroed `winsize` on the stack
//   read / write           pointer and length taken from one Rust slice
#![allow(unsafe_code)]
//
// Everything above the device goes through the `Tty` trait, so the raw
// mode guard and the size probe are the same code whether they drive a
// real terminal or a scripted one in tests.
//
// Raw mode is a scoped acquisition. `RawMode::enable` captures the
// original attributes before touching anything, and the returned guard
// puts them back exactly once: explicitly through `restore`, or from
// `Drop` on any other way out (early `?` return, panic unwind). The
// guard holds `&mut` to the device, so one handle cannot enter raw mode
// twice. The controlling terminal has only one handle at a time:
// `Stdio::claim` fails while another is live, otherwise a second guard
// would capture the raw settings as its "original".
//
// A panic prints its message before unwinding reaches the guard. While
// the terminal is claimed, the panic hook turns output processing back
// on first, so the message is not staircased; the guard then restores
// the rest. Under `panic = "abort"` nothing unwinds and only output
// processing comes back.

use std::io::{self, Read, Write};
#[cfg(unix)]
use std::os::fd::RawFd;
#[cfg(all(unix, test))]
use std::os::fd::{AsRawFd, OwnedFd};
#[cfg(unix)]
use std::sync::Once;
#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::error::{Error, Result};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

// ─── Read Timeout ───────────────────────────────────────────────────────────

/// How long a single read waits for input before returning empty-handed.
///
/// The terminal driver counts in deciseconds (`VTIME`), so millisecond
/// values round up to the next tenth of a second and saturate at 25.5s.
/// [`ReadTimeout::BLOCKING`] turns the timeout off: reads wait until a
/// byte arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTimeout {
    deciseconds: u8,
}

impl ReadTimeout {
    /// Reads block until at least one byte is available.
    pub const BLOCKING: Self = Self { deciseconds: 0 };

    /// 100ms, one tick of the terminal driver's timer.
    pub const DEFAULT: Self = Self { deciseconds: 1 };

    /// Build a timeout from milliseconds. `0` means [`BLOCKING`](Self::BLOCKING).
    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        Self {
            deciseconds: u8::try_from(ms.div_ceil(100)).unwrap_or(u8::MAX),
        }
    }

    /// Timeout in deciseconds; `0` when blocking.
    #[inline]
    #[must_use]
    pub const fn deciseconds(self) -> u8 {
        self.deciseconds
    }

    #[inline]
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        self.deciseconds == 0
    }

    /// The `(VMIN, VTIME)` pair for this timeout.
    ///
    /// Timed reads use `VMIN = 0`: `read()` returns as soon as one byte is
    /// in, or with nothing once `VTIME` expires. Blocking reads use
    /// `VMIN = 1, VTIME = 0`.
    #[must_use]
    pub const fn vmin_vtime(self) -> (u8, u8) {
        if self.is_blocking() {
            (1, 0)
        } else {
            (0, self.deciseconds)
        }
    }
}

impl Default for ReadTimeout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ─── Tty ────────────────────────────────────────────────────────────────────

/// A terminal device: a byte stream plus a line discipline to configure.
///
/// `read` follows raw-mode semantics: `Ok(0)` means the read timeout
/// expired with no input.
pub trait Tty: Read + Write {
    /// Opaque snapshot of the device configuration.
    type Attributes: Clone;

    /// Query the current configuration.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the device cannot be queried.
    fn attributes(&self) -> io::Result<Self::Attributes>;

    /// Apply a configuration, discarding unread input.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the device rejects the configuration.
    fn set_attributes(&mut self, attrs: &Self::Attributes) -> io::Result<()>;

    /// Derive the raw-mode configuration from `original`.
    fn raw_attributes(original: &Self::Attributes, timeout: ReadTimeout) -> Self::Attributes;

    /// Query the current geometry.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the device cannot report its size.
    fn size(&self) -> io::Result<Size>;
}

// ─── Window Size ────────────────────────────────────────────────────────────

/// Probe the terminal geometry.
///
/// # Errors
///
/// [`Error::GeometryUnavailable`] if the query fails or reports zero
/// columns. Both mean the same thing to the caller: the size is unknown.
pub fn window_size(tty: &impl Tty) -> Result<Size> {
    match tty.size() {
        Ok(size) if size.cols > 0 => Ok(size),
        Ok(size) => {
            debug!(rows = size.rows, "terminal reported zero columns");
            Err(Error::GeometryUnavailable)
        }
        Err(e) => {
            debug!(error = %e, "window size query failed");
            Err(Error::GeometryUnavailable)
        }
    }
}

// ─── Attribute Store ────────────────────────────────────────────────────────

/// Holds the original terminal configuration for a single restoration.
///
/// The snapshot is captured once and handed out once. After [`take`]
/// the store is spent: it neither gives the snapshot out again nor
/// accepts a new one.
///
/// [`take`]: AttributeStore::take
#[derive(Debug)]
pub struct AttributeStore<A> {
    original: Option<A>,
    captured: bool,
}

impl<A> AttributeStore<A> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            original: None,
            captured: false,
        }
    }

    /// Store the original configuration.
    ///
    /// # Panics
    ///
    /// Panics if a snapshot was already captured. Overwriting it would
    /// make the true original unrecoverable.
    pub fn capture(&mut self, original: A) {
        assert!(!self.captured, "terminal attributes captured twice");
        self.original = Some(original);
        self.captured = true;
    }

    /// Hand out the snapshot for restoration. Returns `None` ever after.
    pub const fn take(&mut self) -> Option<A> {
        self.original.take()
    }

    /// Whether a snapshot is held and still awaits restoration.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.original.is_some()
    }
}

// ─── Raw Mode ───────────────────────────────────────────────────────────────

/// Raw mode held on a terminal device.
///
/// Created by [`enable`](Self::enable); the original configuration is put
/// back by [`restore`](Self::restore) or, failing that, on drop.
///
/// # Example
///
/// ```no_run
/// # #[cfg(unix)] {
/// use tilde_term::terminal::{RawMode, ReadTimeout, Stdio};
///
/// let mut tty = Stdio::claim()?;
/// let raw = RawMode::enable(&mut tty, ReadTimeout::default())?;
/// // ... read keys, paint frames through raw.tty_mut() ...
/// raw.restore()?;
/// # }
/// # Ok::<(), tilde_term::Error>(())
/// ```
pub struct RawMode<'t, T: Tty> {
    tty: &'t mut T,
    store: AttributeStore<T::Attributes>,
}

impl<'t, T: Tty> RawMode<'t, T> {
    /// Capture the current configuration, then switch the device to raw
    /// mode with the given read timeout.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigurationRead`] if the current configuration cannot be
    /// read (nothing has been changed). [`Error::ConfigurationWrite`] if the
    /// raw configuration is rejected; the original is reapplied before
    /// this returns.
    pub fn enable(tty: &'t mut T, timeout: ReadTimeout) -> Result<Self> {
        let original = tty.attributes().map_err(Error::ConfigurationRead)?;
        let raw = T::raw_attributes(&original, timeout);

        let mut store = AttributeStore::new();
        store.capture(original);

        // The guard owns the original before the first mutation.
        let guard = Self { tty, store };
        guard.tty.set_attributes(&raw).map_err(Error::ConfigurationWrite)?;

        debug!(
            vtime = timeout.deciseconds(),
            blocking = timeout.is_blocking(),
            "raw mode enabled"
        );
        Ok(guard)
    }

    /// The device, for size queries.
    #[inline]
    #[must_use]
    pub const fn tty(&self) -> &T {
        &*self.tty
    }

    /// The device, for reading keys and writing frames.
    #[inline]
    pub const fn tty_mut(&mut self) -> &mut T {
        &mut *self.tty
    }

    /// Reapply the original configuration and release the device.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigurationWrite`] if the device rejects the original.
    /// The restoration is not retried on drop.
    pub fn restore(mut self) -> Result<()> {
        self.restore_original()
    }

    fn restore_original(&mut self) -> Result<()> {
        if let Some(original) = self.store.take() {
            self.tty
                .set_attributes(&original)
                .map_err(Error::ConfigurationWrite)?;
            debug!("terminal attributes restored");
        }
        Ok(())
    }
}

impl<T: Tty> Drop for RawMode<'_, T> {
    fn drop(&mut self) {
        if !self.store.is_pending() {
            return;
        }
        debug!("restoring terminal attributes on drop");
        if let Err(e) = self.restore_original() {
            warn!(error = %e, "could not restore terminal attributes");
        }
    }
}

// ─── Stdio Device ───────────────────────────────────────────────────────────

/// Set while a `Stdio` handle on the process's stdin/stdout is live.
#[cfg(unix)]
static CLAIMED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
static PANIC_HOOK: Once = Once::new();

/// The controlling terminal: configuration and input on stdin, geometry
/// and output on stdout.
///
/// Reads and writes go straight to the file descriptors, bypassing the
/// standard library's buffers, so each `read` returns what the line
/// discipline delivered and honors `VMIN`/`VTIME`.
#[cfg(unix)]
#[derive(Debug)]
pub struct Stdio {
    input: RawFd,
    output: RawFd,
    source: Source,
}

#[cfg(unix)]
#[derive(Debug)]
enum Source {
    /// Stdin and stdout, under the process-wide claim.
    Process,
    /// A pseudo-terminal the handle owns outright.
    #[cfg(test)]
    Owned { _fd: OwnedFd },
}

#[cfg(unix)]
impl Stdio {
    /// Take the controlling terminal.
    ///
    /// # Errors
    ///
    /// [`Error::TerminalInUse`] while an earlier handle is still live.
    pub fn claim() -> Result<Self> {
        if CLAIMED.swap(true, Ordering::AcqRel) {
            return Err(Error::TerminalInUse);
        }
        PANIC_HOOK.call_once(install_panic_hook);
        Ok(Self {
            input: libc::STDIN_FILENO,
            output: libc::STDOUT_FILENO,
            source: Source::Process,
        })
    }

    /// A device on one end of a pseudo-terminal, outside the claim.
    #[cfg(test)]
    fn on_pty(fd: OwnedFd) -> Self {
        Self {
            input: fd.as_raw_fd(),
            output: fd.as_raw_fd(),
            source: Source::Owned { _fd: fd },
        }
    }
}

#[cfg(unix)]
impl Drop for Stdio {
    fn drop(&mut self) {
        if matches!(self.source, Source::Process) {
            CLAIMED.store(false, Ordering::Release);
        }
    }
}

#[cfg(unix)]
impl Read for Stdio {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.input, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }
}

#[cfg(unix)]
impl Write for Stdio {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.output, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Unbuffered.
        Ok(())
    }
}

#[cfg(unix)]
impl Tty for Stdio {
    type Attributes = libc::termios;

    fn attributes(&self) -> io::Result<libc::termios> {
        get_termios(self.input)
    }

    fn set_attributes(&mut self, attrs: &libc::termios) -> io::Result<()> {
        set_termios(self.input, libc::TCSAFLUSH, attrs)
    }

    fn raw_attributes(original: &libc::termios, timeout: ReadTimeout) -> libc::termios {
        make_raw(*original, timeout)
    }

    fn size(&self) -> io::Result<Size> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let result = unsafe { libc::ioctl(self.output, libc::TIOCGWINSZ, &raw mut ws) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    }
}

#[cfg(unix)]
fn get_termios(fd: RawFd) -> io::Result<libc::termios> {
    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &raw mut termios) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(termios)
    }
}

#[cfg(unix)]
fn set_termios(fd: RawFd, when: libc::c_int, termios: &libc::termios) -> io::Result<()> {
    if unsafe { libc::tcsetattr(fd, when, termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Turn output post-processing back on and leave everything else as is.
#[cfg(unix)]
fn resume_output_processing(fd: RawFd) -> io::Result<()> {
    let mut termios = get_termios(fd)?;
    termios.c_oflag |= libc::OPOST;
    set_termios(fd, libc::TCSANOW, &termios)
}

/// Chain a hook in front of the current one that makes the claimed
/// terminal print newlines properly again.
#[cfg(unix)]
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if CLAIMED.load(Ordering::Acquire) {
            let _ = resume_output_processing(libc::STDIN_FILENO);
        }
        previous(info);
    }));
}

/// Turn a cooked configuration into a raw one.
///
/// Input: no break-to-SIGINT, no parity check, no 8th-bit strip, no
/// CR-to-NL translation, no XON/XOFF. Output: no post-processing, so
/// `\n` is not expanded to `\r\n`. Local: no echo, no line buffering, no
/// Ctrl-C/Ctrl-Z signals, no Ctrl-V literal-next. Characters are 8 bits.
#[cfg(unix)]
#[must_use]
pub fn make_raw(mut termios: libc::termios, timeout: ReadTimeout) -> libc::termios {
    termios.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !libc::CSIZE;
    termios.c_cflag |= libc::CS8;

    let (vmin, vtime) = timeout.vmin_vtime();
    termios.c_cc[libc::VMIN] = vmin;
    termios.c_cc[libc::VTIME] = vtime;
    termios
}

// ─── Tests ───────────────────────────────────────────────────────────────────
