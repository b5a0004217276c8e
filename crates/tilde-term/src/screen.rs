// SPDX-License-Identifier: MIT
//
// Screen renderer — full repaint, every frame.
//
// A frame is: clear the display, home the cursor, paint the rows, home
// the cursor again so the next frame starts from the top-left no matter
// where painting left it. There is no diffing and no retained state, so
// the same geometry always produces the same bytes.
//
// Until there is a text buffer to show, rows are placeholders: a blank
// first line, then a `~` per line, `rows - 1` markers in all. The last
// marker gets no line break, otherwise the terminal would scroll the
// whole frame up by one line.

use std::io::{self, Write};

use crate::ansi;

/// Glyph painted at the start of each placeholder row.
pub const PLACEHOLDER: &[u8] = b"~";

/// Erase the entire display.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
#[inline]
pub fn clear_screen(out: &mut impl Write) -> io::Result<()> {
    ansi::clear_screen(out)
}

/// Move the cursor to row 1, column 1.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
#[inline]
pub fn home_cursor(out: &mut impl Write) -> io::Result<()> {
    ansi::cursor_home(out)
}

/// Paint `rows - 1` placeholder rows below a leading blank line.
///
/// Rows are separated by `\r\n`; nothing follows the last row. A screen
/// of zero or one rows gets nothing.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn draw_rows(out: &mut impl Write, rows: u16) -> io::Result<()> {
    let markers = rows.saturating_sub(1);
    if markers == 0 {
        return Ok(());
    }

    out.write_all(b"\r\n")?;
    for y in 0..markers {
        out.write_all(PLACEHOLDER)?;
        if y + 1 < markers {
            out.write_all(b"\r\n")?;
        }
    }
    Ok(())
}

/// Compose a full placeholder frame for a screen of `rows` lines.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn refresh(out: &mut impl Write, rows: u16) -> io::Result<()> {
    refresh_with(out, |out| draw_rows(out, rows))
}

/// Compose a full frame with a caller-supplied row painter.
///
/// # Errors
///
/// Returns an error if writing to `out` fails or `paint` fails.
pub fn refresh_with<W: Write>(
    out: &mut W,
    paint: impl FnOnce(&mut W) -> io::Result<()>,
) -> io::Result<()> {
    clear_screen(out)?;
    home_cursor(out)?;
    paint(out)?;
    home_cursor(out)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows(n: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        draw_rows(&mut buf, n).unwrap();
        buf
    }

    fn frame(n: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        refresh(&mut buf, n).unwrap();
        buf
    }

    // ── Primitives ──────────────────────────────────────────────────────

    #[test]
    fn clear_and_home_are_byte_exact() {
        let mut buf = Vec::new();
        clear_screen(&mut buf).unwrap();
        home_cursor(&mut buf).unwrap();
        assert_eq!(buf, b"\x1b[2J\x1b[H");
    }

    // ── Placeholder rows ────────────────────────────────────────────────

    #[test]
    fn four_rows() {
        assert_eq!(rows(4), b"\r\n~\r\n~\r\n~");
    }

    #[test]
    fn two_rows() {
        assert_eq!(rows(2), b"\r\n~");
    }

    #[test]
    fn degenerate_heights_draw_nothing() {
        assert!(rows(0).is_empty());
        assert!(rows(1).is_empty());
    }

    #[test]
    fn marker_count_is_rows_minus_one() {
        for n in 2..=60u16 {
            let out = rows(n);
            let markers = out.iter().filter(|&&b| b == b'~').count();
            assert_eq!(markers, usize::from(n - 1));
        }
    }

    #[test]
    fn no_trailing_line_break() {
        for n in 2..=60u16 {
            assert!(!rows(n).ends_with(b"\r\n"), "{n} rows");
        }
    }

    #[test]
    fn fills_exactly_the_screen_height() {
        // One leading blank line plus `n - 1` markers: `n - 1` line breaks
        // leave the cursor on the last line without scrolling.
        let out = rows(24);
        let breaks = out.windows(2).filter(|w| w == b"\r\n").count();
        assert_eq!(breaks, 23);
    }

    // ── Frames ──────────────────────────────────────────────────────────

    #[test]
    fn frame_layout() {
        assert_eq!(frame(3), b"\x1b[2J\x1b[H\r\n~\r\n~\x1b[H");
    }

    #[test]
    fn frame_is_idempotent() {
        let mut out = crate::output::OutputBuffer::new();
        refresh(&mut out, 24).unwrap();
        let first = out.as_bytes().to_vec();
        out.clear();
        refresh(&mut out, 24).unwrap();
        assert_eq!(out.as_bytes(), first.as_slice());
    }

    #[test]
    fn frame_clears_exactly_once() {
        let out = frame(24);
        let clears = out.windows(4).filter(|w| w == b"\x1b[2J").count();
        assert_eq!(clears, 1);
    }

    #[test]
    fn frame_ends_home() {
        assert!(frame(24).ends_with(b"\x1b[H"));
        assert!(frame(1).ends_with(b"\x1b[H"));
    }

    #[test]
    fn refresh_with_custom_painter() {
        let mut buf = Vec::new();
        refresh_with(&mut buf, |out| out.write_all(b"hello")).unwrap();
        assert_eq!(buf, b"\x1b[2J\x1b[Hhello\x1b[H");
    }

    #[test]
    fn refresh_with_propagates_painter_error() {
        let mut buf = Vec::new();
        let err = refresh_with(&mut buf, |_| Err(io::Error::other("paint"))).unwrap_err();
        assert_eq!(err.to_string(), "paint");
    }
}
