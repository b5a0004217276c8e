// SPDX-License-Identifier: MIT
//
// tilde — the skeleton of a terminal text editor.
//
// This is the main binary that wires the editor to tilde-term:
//
//   tilde-term → raw mode, keystroke reads, full-frame repaint, event loop
//
// The Editor struct implements tilde-term's App trait. Each keypress
// flows through:
//
//   stdin → read_key → on_key → dispatch (Ctrl-Q quits, the rest is ignored)
//   refresh → clear + home + placeholder rows + home → terminal
//
// There is no text buffer yet, so the screen is a column of `~` rows
// and the only command is quit.
//
// Logging goes to a file or nowhere: stdout is the terminal itself, in
// raw mode, and a stray log line would land in the middle of a frame.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::{error, info, trace};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tilde_term::event_loop::{Action, App};
use tilde_term::key::{self, Key};

// ─── Command line ───────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tilde")]
#[command(about = "The skeleton of a terminal text editor. Ctrl-Q quits.")]
#[command(version)]
struct Cli {
    /// How long each read waits for a key before retrying, in
    /// milliseconds (rounded up to tenths of a second; 0 waits forever)
    #[arg(long, value_name = "MS", default_value_t = 100)]
    read_timeout_ms: u64,

    /// Write logs to this file; filter with RUST_LOG (default: info)
    #[arg(long, value_name = "PATH", env = "TILDE_LOG")]
    log_file: Option<PathBuf>,
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Send tracing output to `path`. Without a path, logging stays off.
fn init_tracing(path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };

    let file = match File::create(path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("tilde: {}: {e}", path.display());
            return;
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();
}

// ─── Editor ─────────────────────────────────────────────────────────────────

/// The editor application state.
///
/// Nothing to edit yet: it counts keystrokes and knows how to quit.
#[cfg_attr(not(unix), allow(dead_code))]
#[derive(Debug, Default)]
struct Editor {
    keystrokes: u64,
}

#[cfg_attr(not(unix), allow(dead_code))]
impl Editor {
    const QUIT: Key = Key::ctrl('q');

    fn new() -> Self {
        Self::default()
    }
}

impl App for Editor {
    fn on_key(&mut self, byte: u8) -> Action {
        self.keystrokes += 1;
        let pressed = Key::from_byte(byte);
        trace!(code = %key::describe(byte), key = %pressed, "keystroke");

        if pressed == Self::QUIT {
            info!(keystrokes = self.keystrokes, "quit");
            return Action::Quit;
        }
        Action::Continue
    }
}

// ─── Entry point ────────────────────────────────────────────────────────────

#[cfg(unix)]
fn main() {
    use tilde_term::event_loop::{EventLoop, LoopConfig, exit_code};
    use tilde_term::terminal::ReadTimeout;

    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref());

    let config = LoopConfig {
        read_timeout: ReadTimeout::from_millis(cli.read_timeout_ms),
    };
    let mut editor = Editor::new();

    let result =
        EventLoop::with_config(config).and_then(|mut event_loop| event_loop.run(&mut editor));
    if let Err(e) = &result {
        error!(error = %e, "fatal");
        eprintln!("tilde: {e}");
    }
    process::exit(exit_code(&result));
}

#[cfg(not(unix))]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref());

    error!(read_timeout_ms = cli.read_timeout_ms, "unsupported platform");
    eprintln!("tilde: raw terminal mode needs a unix terminal");
    process::exit(1);
}

// ─── Tests ──────────────────────────────────────────────────────────────────
