// SPDX-License-Identifier: MIT
//
// Keystroke reader — one byte per call, timeouts absorbed.
//
// In raw mode with `VMIN = 0, VTIME > 0`, a read returns after the
// timeout even if nothing was typed. That is not an error, so the reader
// simply reads again: from the caller's side `read_key` blocks until a
// key arrives. Some platforms report the empty read as `EAGAIN` instead
// of a zero-length read, and a signal (e.g. SIGWINCH) can interrupt the
// call with `EINTR`; both are retried the same way.
//
// Everything else is fatal and surfaces as `Error::UnexpectedRead`.

use std::io::{self, Read};

use tracing::trace;

use crate::error::{Error, Result};

/// Read exactly one byte, retrying through timeouts.
///
/// # Errors
///
/// [`Error::UnexpectedRead`] if the read fails for any reason other than
/// the timeout expiring or the call being interrupted.
pub fn read_key(input: &mut impl Read) -> Result<u8> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => trace!("read timed out"),
            Ok(_) => return Ok(byte[0]),
            Err(e) if is_transient(&e) => trace!(kind = ?e.kind(), "read retried"),
            Err(e) => return Err(Error::UnexpectedRead(e)),
        }
    }
}

/// Whether a read error just means "no byte yet".
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

// ─── Tests ───────────────────────────────────────────────────────────────────
