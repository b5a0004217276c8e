// SPDX-License-Identifier: MIT
//
// Error taxonomy for the terminal session.
//
// Every variant is fatal. The only recoverable condition, a read that
// times out with no data, never leaves `reader::read_key` and so has no
// variant here. Each message names the failing operation the way a
// `perror` diagnostic would, so the top-level handler can print it as-is.

use std::io;

/// A fatal terminal-session failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Querying the terminal configuration failed.
    #[error("tcgetattr: {0}")]
    ConfigurationRead(#[source] io::Error),

    /// Applying a terminal configuration (raw or original) failed.
    #[error("tcsetattr: {0}")]
    ConfigurationWrite(#[source] io::Error),

    /// Another handle on the controlling terminal is still live.
    #[error("terminal already claimed by this process")]
    TerminalInUse,

    /// The size query failed or reported zero columns.
    #[error("window size unavailable")]
    GeometryUnavailable,

    /// A read failed for a reason other than the bounded timeout.
    #[error("read: {0}")]
    UnexpectedRead(#[source] io::Error),

    /// Writing a frame to the terminal failed.
    #[error("write: {0}")]
    Output(#[source] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
