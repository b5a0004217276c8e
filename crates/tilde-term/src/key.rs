// SPDX-License-Identifier: MIT
//
// Keystroke decoding.
//
// In raw mode every keypress arrives as a byte. Holding Ctrl with a
// letter clears the top three bits of the letter's code, so Ctrl-Q is
// `b'q' & 0x1F == 0x11`. `ctrl` computes that mapping for dispatch
// tables; `Key::from_byte` goes the other way and names the key a byte
// stands for, which is what logs and future command tables want.
//
// Escape sequences (arrows, function keys) span several bytes and are
// not decoded here: a lone ESC byte is reported as `Escape`.

use std::fmt;

use bitflags::bitflags;

/// Byte a letter produces when typed with the Ctrl modifier.
#[inline]
#[must_use]
pub const fn ctrl(k: u8) -> u8 {
    k & 0x1F
}

/// Ctrl-Q, the quit chord.
pub const QUIT: u8 = ctrl(b'q');

bitflags! {
    /// Keyboard modifier flags.
    ///
    /// Bit values follow the Kitty keyboard protocol bitmask. A single
    /// raw byte can only carry Ctrl.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const CTRL = 0b0000_0100;
    }
}

/// Identity of a key decoded from one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable ASCII character, or the letter of a Ctrl chord.
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    /// Anything else: the remaining C0 controls and non-ASCII bytes.
    Byte(u8),
}

/// A decoded keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl Key {
    /// An unmodified key.
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// Ctrl plus a character, e.g. `Key::ctrl('q')`.
    #[must_use]
    pub const fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: Modifiers::CTRL,
        }
    }

    /// Decode a raw-mode byte.
    ///
    /// Tab (0x09), Enter (0x0A, 0x0D) and Backspace (0x08, 0x7F) win over
    /// their Ctrl-letter aliases because that is what the key on the
    /// keyboard says.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::ctrl('@'),
            0x08 | 0x7F => Self::plain(KeyCode::Backspace),
            0x09 => Self::plain(KeyCode::Tab),
            0x0A | 0x0D => Self::plain(KeyCode::Enter),
            0x1B => Self::plain(KeyCode::Escape),
            b @ 0x01..=0x1A => Self::ctrl((b + b'a' - 1) as char),
            b @ 0x20..=0x7E => Self::plain(KeyCode::Char(b as char)),
            b => Self::plain(KeyCode::Byte(b)),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(Modifiers::CTRL) {
            f.write_str("Ctrl-")?;
        }
        match self.code {
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Escape => f.write_str("Esc"),
            KeyCode::Byte(b) => write!(f, "0x{b:02X}"),
        }
    }
}

/// Human-readable code display for a keystroke.
///
/// Control and non-ASCII bytes show their decimal code alone (`17`);
/// printable bytes show the code and the glyph (`120 ('x')`).
#[must_use]
pub fn describe(byte: u8) -> String {
    if byte.is_ascii_graphic() || byte == b' ' {
        format!("{byte} ('{}')", byte as char)
    } else {
        format!("{byte}")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
