// SPDX-License-Identifier: MIT
//
// Event loop — the heartbeat of the terminal application.
//
// One thread, one loop: paint a frame, read a keystroke, hand it to the
// application, repeat. The only place the loop waits is inside the key
// read, and that wait is bounded by the raw-mode read timeout.
//
// # Phases
//
//   Initializing  raw mode on, window size probed
//   Running       refresh → read_key → on_key, until the app says Quit
//   Terminating   clear the screen, restore the terminal
//
// A failure while initializing skips Running entirely. A failure while
// running still goes through Terminating, so the terminal is restored on
// every way out; the error is then handed back to the caller, which owns
// the decision to exit the process.
//
// # Session
//
// Everything the loop knows about the terminal lives in one `Session`
// value created per run: the raw-mode guard (which owns the original
// configuration), the probed geometry, and the reusable frame buffer.
// The geometry is read once; resizes are not tracked.

use std::io;

use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::output::OutputBuffer;
use crate::reader;
use crate::screen;
use crate::terminal::{self, RawMode, ReadTimeout, Size, Tty};

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the event loop to do after a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue running.
    Continue,
    /// Exit the event loop cleanly.
    Quit,
}

/// Application interface for the event loop.
///
/// Each frame the loop clears the screen, homes the cursor, calls
/// [`draw_rows`](App::draw_rows), homes the cursor again, then waits for
/// a key and passes it to [`on_key`](App::on_key).
pub trait App {
    /// Handle one raw keystroke.
    ///
    /// Return [`Action::Quit`] to leave the loop.
    fn on_key(&mut self, key: u8) -> Action;

    /// Paint the rows of the frame.
    ///
    /// The default paints placeholder rows.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    fn draw_rows(&mut self, out: &mut OutputBuffer, size: Size) -> io::Result<()> {
        screen::draw_rows(out, size.rows)
    }
}

// ─── Loop Config ─────────────────────────────────────────────────────────────

/// Configuration for the event loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopConfig {
    /// How long each read waits before retrying. Default: 100ms.
    pub read_timeout: ReadTimeout,
}

// ─── Phase ───────────────────────────────────────────────────────────────────

/// Lifecycle phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Initializing,
    Running,
    Terminating,
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// A terminal held in raw mode, with its geometry.
pub struct Session<'t, T: Tty> {
    raw: RawMode<'t, T>,
    size: Size,
    frame: OutputBuffer,
}

impl<'t, T: Tty> Session<'t, T> {
    /// Enter raw mode and probe the window size.
    ///
    /// # Errors
    ///
    /// Any raw-mode or size error. The terminal is restored before this
    /// returns.
    pub fn start(tty: &'t mut T, config: LoopConfig) -> Result<Self> {
        let raw = RawMode::enable(tty, config.read_timeout)?;
        let size = terminal::window_size(raw.tty())?;
        info!(rows = size.rows, cols = size.cols, "session started");

        Ok(Self {
            raw,
            size,
            frame: OutputBuffer::new(),
        })
    }

    /// Geometry probed at start.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Repaint the whole screen in one write.
    ///
    /// # Errors
    ///
    /// [`Error::Output`] if painting or writing the frame fails.
    pub fn refresh(&mut self, app: &mut impl App) -> Result<()> {
        let size = self.size();
        self.frame.clear();
        screen::refresh_with(&mut self.frame, |out| app.draw_rows(out, size))
            .map_err(Error::Output)?;
        self.frame
            .flush_to(self.raw.tty_mut())
            .map_err(Error::Output)
    }

    /// Wait for the next keystroke.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedRead`] on a read failure other than a timeout.
    pub fn read_key(&mut self) -> Result<u8> {
        reader::read_key(self.raw.tty_mut())
    }

    /// Clear the screen and restore the original configuration.
    ///
    /// Clearing is best-effort; only the restore can fail.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigurationWrite`] if the original configuration is
    /// rejected.
    pub fn finish(mut self) -> Result<()> {
        if let Err(e) = self.farewell() {
            debug!(error = %e, "could not clear the screen on exit");
        }
        self.raw.restore()
    }

    fn farewell(&mut self) -> io::Result<()> {
        self.frame.clear();
        screen::clear_screen(&mut self.frame)?;
        screen::home_cursor(&mut self.frame)?;
        self.frame.flush_to(self.raw.tty_mut())
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop.
///
/// Owns the terminal device. Call [`run`](Self::run) to enter the loop —
/// it returns when the application signals [`Action::Quit`] or a fatal
/// error occurs, with the terminal restored either way.
///
/// # Example
///
/// ```no_run
/// # #[cfg(unix)] {
/// use tilde_term::event_loop::{Action, App, EventLoop, LoopConfig};
/// use tilde_term::key;
///
/// struct MyApp;
///
/// impl App for MyApp {
///     fn on_key(&mut self, byte: u8) -> Action {
///         if byte == key::QUIT {
///             return Action::Quit;
///         }
///         Action::Continue
///     }
/// }
///
/// let result = EventLoop::with_config(LoopConfig::default())
///     .and_then(|mut event_loop| event_loop.run(&mut MyApp));
/// std::process::exit(tilde_term::event_loop::exit_code(&result));
/// # }
/// ```
pub struct EventLoop<T: Tty> {
    tty: T,
    config: LoopConfig,
    phase: Phase,
}

#[cfg(unix)]
impl EventLoop<terminal::Stdio> {
    /// Event loop on the controlling terminal.
    ///
    /// # Errors
    ///
    /// [`Error::TerminalInUse`] if another handle on the controlling
    /// terminal is still live.
    pub fn with_config(config: LoopConfig) -> Result<Self> {
        Ok(Self::with_tty(terminal::Stdio::claim()?, config))
    }
}

impl<T: Tty> EventLoop<T> {
    /// Event loop on an arbitrary device.
    #[must_use]
    pub const fn with_tty(tty: T, config: LoopConfig) -> Self {
        Self {
            tty,
            config,
            phase: Phase::Initializing,
        }
    }

    /// The phase the last (or current) run reached.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The underlying device.
    #[inline]
    #[must_use]
    pub const fn tty(&self) -> &T {
        &self.tty
    }

    /// Run until the application quits or something fails.
    ///
    /// # Errors
    ///
    /// The first fatal error: raw mode, window size, read, frame output,
    /// or the final restore. The terminal has been restored by the time
    /// this returns.
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        enter(&mut self.phase, Phase::Initializing);

        let result = match Session::start(&mut self.tty, self.config) {
            Ok(mut session) => {
                enter(&mut self.phase, Phase::Running);
                let outcome = Self::frames(&mut session, app);
                enter(&mut self.phase, Phase::Terminating);
                outcome.and(session.finish())
            }
            Err(e) => {
                enter(&mut self.phase, Phase::Terminating);
                Err(e)
            }
        };

        if let Err(e) = &result {
            debug!(error = %e, "run failed");
        }
        result
    }

    /// The Running phase: one frame and one keystroke per iteration.
    fn frames(session: &mut Session<'_, T>, app: &mut impl App) -> Result<()> {
        loop {
            session.refresh(app)?;
            let key = session.read_key()?;
            trace!(key, "dispatch");
            if app.on_key(key) == Action::Quit {
                info!("quit requested");
                return Ok(());
            }
        }
    }
}

fn enter(slot: &mut Phase, phase: Phase) {
    debug!(?phase, "entering phase");
    *slot = phase;
}

/// Process exit status for the outcome of [`EventLoop::run`].
///
/// `0` for a requested quit, `1` for any fatal error.
#[must_use]
pub const fn exit_code(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
