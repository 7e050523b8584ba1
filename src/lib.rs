//! trapgate - System Call Trap Boundary
//!
//! The layer of the i386 teaching kernel that receives `int $0x30` from a
//! user process, pulls the syscall number and arguments off the user stack,
//! and dispatches to a handler.
//!
//! # Security Features
//! - Every user-supplied pointer or integer is treated as hostile
//! - User memory is read only through a fault-tolerant accessor
//! - Bounds-checked address types instead of raw pointer arithmetic
//! - Immutable, statically built syscall table
//! - Any malformed trap terminates the caller, never the kernel
//!
//! # Architecture
//! - Target: i386 (`int $0x30`, DPL 3)
//! - ABI: syscall number at `[esp]`, 32-bit arguments above it, result in EAX
//! - Host: builds as a normal library so the boundary can be unit tested

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod drivers;
pub mod logging;
pub mod mm;
pub mod security;
pub mod syscall;
pub mod trap;

#[cfg(test)]
mod testing;

pub use syscall::{dispatch, Kernel, Outcome, Syscall, SyscallCtx};
pub use trap::{complete, handle_syscall, syscall_init, IntrFrame};
