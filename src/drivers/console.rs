//! Line-Buffered Console
//!
//! The console is where `write(STDOUT_FILENO, ...)` and kernel log lines
//! end up. Output is collected per line and handed to the byte sink one full
//! line at a time, so lines from concurrent writers do not interleave.
//!
//! # Security Considerations
//! - A single spinlock serializes all writers
//! - The line buffer is fixed-size; a long line is flushed in pieces, never
//!   overrun

use core::fmt;
use spin::Mutex;

/// Bytes buffered before a forced flush.
pub const LINE_CAPACITY: usize = 128;

/// Console output facility.
pub trait Console: Sync {
    /// Write all of `buf` to the console.
    fn putbuf(&self, buf: &[u8]);
}

/// The device underneath a console (serial port, VGA text buffer, ...).
pub trait ByteSink: Send {
    /// Emit a run of bytes.
    fn put_bytes(&mut self, bytes: &[u8]);
}

struct Inner<S> {
    sink: S,
    line: [u8; LINE_CAPACITY],
    len: usize,
}

impl<S: ByteSink> Inner<S> {
    fn push(&mut self, byte: u8) {
        self.line[self.len] = byte;
        self.len += 1;
        if byte == b'\n' || self.len == LINE_CAPACITY {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.len > 0 {
            self.sink.put_bytes(&self.line[..self.len]);
            self.len = 0;
        }
    }
}

/// A [`Console`] that buffers up to one line in front of a [`ByteSink`].
pub struct LineConsole<S> {
    inner: Mutex<Inner<S>>,
}

impl<S: ByteSink> LineConsole<S> {
    pub const fn new(sink: S) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sink,
                line: [0; LINE_CAPACITY],
                len: 0,
            }),
        }
    }

    /// Push out a partial line.
    pub fn flush(&self) {
        self.inner.lock().flush();
    }

    /// Run `f` with exclusive access to the sink, after flushing.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut inner = self.inner.lock();
        inner.flush();
        f(&mut inner.sink)
    }
}

impl<S: ByteSink> Console for LineConsole<S> {
    fn putbuf(&self, buf: &[u8]) {
        let mut inner = self.inner.lock();
        for &byte in buf {
            inner.push(byte);
        }
    }
}

impl<S: ByteSink> fmt::Write for &LineConsole<S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.putbuf(s.as_bytes());
        Ok(())
    }
}
