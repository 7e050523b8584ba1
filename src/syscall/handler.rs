//! System Call Handler
//!
//! Dispatches system calls and implements individual syscall handlers.
//!
//! # Security Considerations
//! - The syscall number is fetched through the fault-tolerant marshaller
//! - Numbers are bounds-checked before the table is indexed
//! - Any malformed trap ends in termination of the caller, never the kernel

use core::fmt;

use super::args::{ArgError, Args};
use super::numbers::{Syscall, SYSCALL_COUNT};
use super::uaccess::{copy_from_user, AccessError, UserAccess};
use crate::drivers::console::Console;
use crate::mm::palloc::ScratchPage;
use crate::trap::IntrFrame;

/// File descriptor of the console output stream.
pub const STDOUT_FILENO: i32 = 1;

/// Exit status used when a process is killed for a malformed trap, and the
/// status `exit` reports when its argument cannot be read.
pub const EXIT_ABNORMAL: i32 = -1;

/// Value returned to user code by a failed call.
pub const SYSCALL_FAILURE: i32 = -1;

/// Services the trap boundary needs from the rest of the kernel.
pub trait Kernel: Sync {
    /// Accessor for the current process's memory.
    fn user_memory(&self) -> &dyn UserAccess;

    /// Console output sink.
    fn console(&self) -> &dyn Console;

    /// Borrow one scratch page, or `None` if none are free.
    fn scratch_page(&self) -> Option<ScratchPage<'_>>;

    /// Terminate the current process with `status`. Does not return on real
    /// hardware.
    fn exit_thread(&self, status: i32);

    /// Power the machine off. Does not return on real hardware.
    fn power_off(&self);
}

/// What the trap path does once a handler finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Resume the caller with this value in EAX.
    Return(i32),
    /// Terminate the caller with this status.
    Exit(i32),
    /// Shut the machine down.
    PowerOff,
}

/// Failed handler execution, reported to the caller as [`SYSCALL_FAILURE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// An argument could not be fetched.
    Args(ArgError),
    /// Bad file descriptor
    BadFd(i32),
    /// No scratch memory available.
    NoMemory,
    /// Bad address in a user buffer
    Fault(AccessError),
}

impl From<ArgError> for SyscallError {
    fn from(e: ArgError) -> Self {
        SyscallError::Args(e)
    }
}

impl From<AccessError> for SyscallError {
    fn from(e: AccessError) -> Self {
        SyscallError::Fault(e)
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyscallError::Args(e) => write!(f, "{}", e),
            SyscallError::BadFd(fd) => write!(f, "bad file descriptor {}", fd),
            SyscallError::NoMemory => write!(f, "out of scratch pages"),
            SyscallError::Fault(e) => write!(f, "{}", e),
        }
    }
}

/// Reason a trap could not be routed to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The syscall number itself could not be read.
    Unreadable(ArgError),
    /// Number outside the dispatchable range.
    OutOfRange(i32),
    /// Number in range, but no handler is registered.
    Unimplemented(Syscall),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Unreadable(e) => write!(f, "unreadable syscall number: {}", e),
            DispatchError::OutOfRange(n) => write!(f, "syscall number {} out of range", n),
            DispatchError::Unimplemented(sc) => write!(f, "syscall {} not implemented", sc.name()),
        }
    }
}

/// State handed to a handler for one trap.
pub struct SyscallCtx<'a> {
    pub frame: &'a mut IntrFrame,
    pub kernel: &'a dyn Kernel,
}

impl<'a> SyscallCtx<'a> {
    pub fn new(frame: &'a mut IntrFrame, kernel: &'a dyn Kernel) -> Self {
        Self { frame, kernel }
    }

    /// Argument view over the caller's stack.
    pub fn args(&self) -> Args<'a> {
        let kernel: &'a dyn Kernel = self.kernel;
        Args::new(self.frame, kernel.user_memory())
    }
}

/// A syscall implementation.
pub type Handler = fn(&mut SyscallCtx<'_>) -> Outcome;

/// Mapping from syscall number to handler. Empty slots are inert.
pub struct SyscallTable([Option<Handler>; SYSCALL_COUNT]);

impl SyscallTable {
    const fn new() -> Self {
        let mut slots: [Option<Handler>; SYSCALL_COUNT] = [None; SYSCALL_COUNT];
        slots[Syscall::Halt as usize] = Some(sys_halt as Handler);
        slots[Syscall::Exit as usize] = Some(sys_exit as Handler);
        slots[Syscall::Write as usize] = Some(sys_write as Handler);
        Self(slots)
    }

    #[inline]
    pub fn get(&self, syscall: Syscall) -> Option<Handler> {
        self.0[syscall as usize]
    }
}

/// The syscall descriptor table.
pub static SYSCALL_TABLE: SyscallTable = SyscallTable::new();

/// Whether `num` passes the dispatch range check.
///
/// Both ends are exclusive, so HALT and INUMBER are never dispatched.
#[inline]
pub const fn in_dispatch_range(num: i32) -> bool {
    num > Syscall::Halt.number() && num < Syscall::Inumber.number()
}

/// Resolve a raw syscall number to its handler.
pub fn lookup(num: i32) -> Result<(Syscall, Handler), DispatchError> {
    if !in_dispatch_range(num) {
        return Err(DispatchError::OutOfRange(num));
    }
    let syscall = Syscall::from_number(num)
        .ok_or(DispatchError::OutOfRange(num))?;
    let handler = SYSCALL_TABLE
        .get(syscall)
        .ok_or(DispatchError::Unimplemented(syscall))?;
    Ok((syscall, handler))
}

fn decode(ctx: &SyscallCtx<'_>) -> Result<(Syscall, Handler), DispatchError> {
    let num = ctx.args().int(0).map_err(DispatchError::Unreadable)?;
    lookup(num)
}

/// Dispatch the trapped system call in `ctx`.
///
/// A `Return` value is stored in the frame's EAX.
pub fn dispatch(ctx: &mut SyscallCtx<'_>) -> Outcome {
    let (syscall, handler) = match decode(ctx) {
        Ok(resolved) => resolved,
        Err(e) => {
            log::warn!(
                "[SYSCALL] {} (esp={:#010x}), killing caller",
                e,
                ctx.frame.esp
            );
            return Outcome::Exit(EXIT_ABNORMAL);
        }
    };

    log::trace!("[SYSCALL] {}", syscall.name());
    let outcome = handler(ctx);
    if let Outcome::Return(value) = outcome {
        ctx.frame.eax = value as u32;
    }
    outcome
}

/// Halt system call
///
/// Powers the machine off. Takes no arguments.
fn sys_halt(_ctx: &mut SyscallCtx<'_>) -> Outcome {
    log::debug!("[SYSCALL] halt()");
    Outcome::PowerOff
}

/// Exit system call
///
/// Terminates the caller with the status in argument 1. An unreadable
/// status becomes [`EXIT_ABNORMAL`].
fn sys_exit(ctx: &mut SyscallCtx<'_>) -> Outcome {
    let status = ctx.args().int(1).unwrap_or(EXIT_ABNORMAL);
    log::debug!("[SYSCALL] exit({})", status);
    Outcome::Exit(status)
}

/// Write system call
///
/// `write(fd, buffer, size)`. Only the console stream is supported.
///
/// # Returns
/// 0 on success, [`SYSCALL_FAILURE`] on any error
fn sys_write(ctx: &mut SyscallCtx<'_>) -> Outcome {
    match write(ctx) {
        Ok(()) => Outcome::Return(0),
        Err(e) => {
            log::debug!("[SYSCALL] write failed: {}", e);
            Outcome::Return(SYSCALL_FAILURE)
        }
    }
}

fn write(ctx: &SyscallCtx<'_>) -> Result<(), SyscallError> {
    let args = ctx.args();
    let fd = args.int(1)?;
    let buffer = args.ptr(2)?;
    let size = args.uint(3)?;

    if fd != STDOUT_FILENO {
        return Err(SyscallError::BadFd(fd));
    }
    if size == 0 {
        return Ok(());
    }

    let mut page = ctx.kernel.scratch_page().ok_or(SyscallError::NoMemory)?;
    let len = usize::try_from(size)
        .map_or(page.capacity(), |n| n.min(page.capacity()));
    if len < size as usize {
        log::debug!("[SYSCALL] write of {} bytes clamped to {}", size, len);
    }

    let staged = &mut page.as_mut_slice()[..len];
    copy_from_user(ctx.kernel.user_memory(), staged, buffer)?;
    ctx.kernel.console().putbuf(staged);
    Ok(())
}
