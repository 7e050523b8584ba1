//! Kernel Logging
//!
//! Backend for the `log` facade. Each record is formatted into a stack
//! buffer (no allocation, no lock held while formatting) and written to the
//! console as one line:
//!
//! ```text
//! [WARN trapgate::syscall::handler] [SYSCALL] syscall number 25 out of range ...
//! ```

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Once;

use crate::drivers::console::Console;

/// Longest rendered log line, including the trailing newline.
pub const LOG_LINE_MAX: usize = 192;

/// Fixed-size formatting buffer. Output past the end is dropped.
struct LineBuffer {
    data: [u8; LOG_LINE_MAX],
    len: usize,
}

impl LineBuffer {
    const fn new() -> Self {
        Self {
            data: [0; LOG_LINE_MAX],
            len: 0,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Terminate the line, overwriting the last byte if the buffer is full.
    fn finish(&mut self) {
        if self.len == LOG_LINE_MAX {
            self.len -= 1;
        }
        self.data[self.len] = b'\n';
        self.len += 1;
    }
}

impl Write for LineBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let n = bytes.len().min(LOG_LINE_MAX - self.len);
        self.data[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
        Ok(())
    }
}

fn render(record: &Record<'_>, buf: &mut LineBuffer) {
    let _ = write!(
        buf,
        "[{} {}] {}",
        record.level(),
        record.target(),
        record.args()
    );
    buf.finish();
}

/// Kernel logger implementation
struct KernelLogger {
    console: Once<&'static dyn Console>,
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(console) = self.console.get() {
            let mut buf = LineBuffer::new();
            render(record, &mut buf);
            console.putbuf(buf.as_bytes());
        }
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger {
    console: Once::new(),
};

/// Route `log` output to `console` at `level` and above.
///
/// Fails if a logger is already installed.
pub fn init(console: &'static dyn Console, level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    LOGGER.console.call_once(|| console);
    log::set_max_level(level);
    Ok(())
}
