// SPDX-License-Identifier: MIT
//
// Scripted terminal device for unit tests.
//
// `FakeTty` plays back a list of read outcomes, records every byte
// written, and tracks the configuration it was given, so tests can check
// the whole session lifecycle without a real terminal.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use crate::terminal::{ReadTimeout, Size, Tty};

/// Line discipline state of the fake device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeAttributes {
    pub echo: bool,
    pub canonical: bool,
    pub signals: bool,
    pub vmin: u8,
    pub vtime: u8,
    /// Stands in for every field raw mode leaves alone.
    pub speed: u32,
}

impl FakeAttributes {
    pub const fn cooked() -> Self {
        Self {
            echo: true,
            canonical: true,
            signals: true,
            vmin: 1,
            vtime: 0,
            speed: 38_400,
        }
    }
}

/// One scripted result of a `read` call.
#[derive(Debug, Clone, Copy)]
pub enum Input {
    Byte(u8),
    /// `VTIME` expired: `Ok(0)`.
    Timeout,
    /// `EAGAIN`.
    WouldBlock,
    /// `EINTR`.
    Interrupted,
    Fail(io::ErrorKind),
}

#[derive(Debug)]
pub struct FakeTty {
    pub input: VecDeque<Input>,
    pub output: Vec<u8>,
    pub reads: usize,
    pub current: FakeAttributes,
    /// Every configuration successfully applied, in order.
    pub applied: Vec<FakeAttributes>,
    pub set_calls: usize,
    /// `attributes()` fails while set.
    pub fail_get: bool,
    /// 1-based `set_attributes()` call numbers that fail.
    pub fail_sets: Vec<usize>,
    pub fail_writes: bool,
    /// `None` makes the size query fail.
    pub size: Option<Size>,
}

impl FakeTty {
    /// A cooked 80×24 terminal with no input.
    pub fn new() -> Self {
        Self::with_size(Size { cols: 80, rows: 24 })
    }

    pub fn with_size(size: Size) -> Self {
        Self {
            input: VecDeque::new(),
            output: Vec::new(),
            reads: 0,
            current: FakeAttributes::cooked(),
            applied: Vec::new(),
            set_calls: 0,
            fail_get: false,
            fail_sets: Vec::new(),
            fail_writes: false,
            size: Some(size),
        }
    }

    /// Queue keystrokes.
    pub fn with_keys(mut self, keys: &[u8]) -> Self {
        self.input.extend(keys.iter().copied().map(Input::Byte));
        self
    }

    /// Queue arbitrary read outcomes.
    pub fn with_input(mut self, input: impl IntoIterator<Item = Input>) -> Self {
        self.input.extend(input);
        self
    }
}

impl Read for FakeTty {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        // An exhausted script fails loudly instead of spinning forever.
        match self.input.pop_front() {
            Some(Input::Byte(b)) => {
                buf[0] = b;
                Ok(1)
            }
            Some(Input::Timeout) => Ok(0),
            Some(Input::WouldBlock) => Err(io::ErrorKind::WouldBlock.into()),
            Some(Input::Interrupted) => Err(io::ErrorKind::Interrupted.into()),
            Some(Input::Fail(kind)) => Err(kind.into()),
            None => Err(io::ErrorKind::UnexpectedEof.into()),
        }
    }
}

impl Write for FakeTty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Tty for FakeTty {
    type Attributes = FakeAttributes;

    fn attributes(&self) -> io::Result<FakeAttributes> {
        if self.fail_get {
            return Err(io::Error::other("not a terminal"));
        }
        Ok(self.current)
    }

    fn set_attributes(&mut self, attrs: &FakeAttributes) -> io::Result<()> {
        self.set_calls += 1;
        if self.fail_sets.contains(&self.set_calls) {
            return Err(io::Error::other("rejected"));
        }
        self.current = *attrs;
        self.applied.push(*attrs);
        Ok(())
    }

    fn raw_attributes(original: &FakeAttributes, timeout: ReadTimeout) -> FakeAttributes {
        let (vmin, vtime) = timeout.vmin_vtime();
        FakeAttributes {
            echo: false,
            canonical: false,
            signals: false,
            vmin,
            vtime,
            ..*original
        }
    }

    fn size(&self) -> io::Result<Size> {
        self.size.ok_or_else(|| io::Error::other("no window"))
    }
}
