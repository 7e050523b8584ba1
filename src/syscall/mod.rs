//! System Call Interface
//!
//! The trap boundary between user processes and the kernel.
//!
//! # Security Model
//! - Whitelist approach: only registered handlers are reachable
//! - Every argument is copied out of user memory through a fault-tolerant
//!   accessor before use
//! - Invalid inputs terminate the caller, never panic the kernel
//!
//! # Current Syscalls
//! - 0: halt() - power off (registered, excluded by the range check)
//! - 1: exit(status) - terminate the current process
//! - 9: write(fd, buf, size) - write to the console

pub mod args;
pub mod handler;
pub mod numbers;
pub mod uaccess;

pub use args::{ArgError, Args};
pub use handler::{dispatch, Kernel, Outcome, SyscallCtx, EXIT_ABNORMAL, STDOUT_FILENO};
pub use numbers::Syscall;
pub use uaccess::{copy_from_user, read_user_byte, AccessError, UserAccess};
