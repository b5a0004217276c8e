// SPDX-License-Identifier: MIT
//
// tilde-term — Terminal foundation for tilde.
//
// Takes the terminal out of cooked mode, reads keystrokes one byte at a
// time, and repaints the whole screen every frame. Direct termios and
// ANSI escape sequences, no TUI framework in between: every byte sent to
// the terminal is accounted for.
//
//   terminal   raw mode guard, attribute store, size probe, stdio device
//   reader     one-byte reads with timeout retry
//   key        control chords and keystroke decoding
//   screen     clear / home / placeholder rows / full refresh
//   event_loop session lifecycle: initialize, run, terminate

pub mod ansi;
pub mod error;
pub mod event_loop;
pub mod key;
pub mod output;
pub mod reader;
pub mod screen;
pub mod terminal;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
