//! Fault-Tolerant User Memory Access
//!
//! Reads from addresses chosen by user code without letting a bad address
//! fault the kernel.
//!
//! # Security Principles
//! - Addresses at or above `PHYS_BASE` are rejected before any access
//! - A fault inside the user half becomes an ordinary error value
//! - Data is copied into kernel memory; nothing aliases user pages afterwards

use core::fmt;

use crate::mm::address::{range_below_split, UserAddr, UserPtr};

/// The primitive single-byte read from user memory.
///
/// # Safety
/// Implementors guarantee that `get_user` never crashes the kernel for any
/// `UserAddr`: an access that would fault must yield `None`. For the
/// hardware implementation this depends on the page-fault handler applying
/// [`crate::trap::redirect_user_access_fault`] to kernel-mode faults.
pub unsafe trait UserAccess {
    /// Read the byte at `addr`, or `None` if the access faults.
    fn get_user(&self, addr: UserAddr) -> Option<u8>;
}

/// User memory access error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Zero-length copy requested.
    EmptyRange,
    /// Null source pointer.
    NullPointer,
    /// Range reaches into kernel space (or wraps around).
    KernelAddress,
    /// The access faulted at `addr`.
    Fault { addr: UserAddr },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::EmptyRange => write!(f, "empty user range"),
            AccessError::NullPointer => write!(f, "null user pointer"),
            AccessError::KernelAddress => write!(f, "range reaches kernel space"),
            AccessError::Fault { addr } => write!(f, "user access faulted at {}", addr),
        }
    }
}

/// Read one byte at a raw user-supplied address.
///
/// `raw >= PHYS_BASE` fails without calling into `mem`.
pub fn read_user_byte(mem: &dyn UserAccess, raw: u32) -> Result<u8, AccessError> {
    let addr = UserAddr::new(raw).ok_or(AccessError::KernelAddress)?;
    mem.get_user(addr).ok_or(AccessError::Fault { addr })
}

/// Copy `dst.len()` bytes from user memory at `src` into `dst`.
///
/// Fails before touching memory if `dst` is empty, `src` is null, or
/// `src + dst.len()` reaches `PHYS_BASE`. Otherwise copies byte by byte and
/// stops at the first fault. Bytes copied before the fault stay in `dst`.
pub fn copy_from_user(
    mem: &dyn UserAccess,
    dst: &mut [u8],
    src: UserPtr,
) -> Result<(), AccessError> {
    if dst.is_empty() {
        return Err(AccessError::EmptyRange);
    }
    if src.is_null() {
        return Err(AccessError::NullPointer);
    }
    let len = u32::try_from(dst.len())
        .map_err(|_| AccessError::KernelAddress)?;
    if !range_below_split(src.as_u32(), len) {
        return Err(AccessError::KernelAddress);
    }

    // Every address in the range is below the split, checked above.
    let start = src.to_user_addr().ok_or(AccessError::KernelAddress)?;
    for (offset, slot) in (0u32..).zip(dst.iter_mut()) {
        let addr = start.checked_add(offset).ok_or(AccessError::KernelAddress)?;
        *slot = mem.get_user(addr).ok_or(AccessError::Fault { addr })?;
    }
    Ok(())
}

/// Hardware accessor for the i386 target.
///
/// The load is written so the page-fault handler can recognize it: EAX
/// holds the resume address when `movzbl` executes. On a kernel-mode fault
/// the handler sets EIP to EAX and EAX to `0xFFFF_FFFF`, and execution
/// continues at the label with the failure value.
#[cfg(all(target_arch = "x86", target_os = "none"))]
pub struct HardwareUserAccess;

#[cfg(all(target_arch = "x86", target_os = "none"))]
// SAFETY: A fault at the `movzbl` is redirected by the page-fault handler
// to the resume label with EAX = -1 (see `trap::redirect_user_access_fault`).
unsafe impl UserAccess for HardwareUserAccess {
    #[inline(never)]
    fn get_user(&self, addr: UserAddr) -> Option<u8> {
        let result: i32;
        // SAFETY: `addr` is below PHYS_BASE, and a fault is recovered as
        // described above instead of being taken as a kernel oops.
        unsafe {
            core::arch::asm!(
                "movl $2f, %eax",
                "movzbl ({addr}), %eax",
                "2:",
                addr = in(reg) addr.as_u32(),
                out("eax") result,
                options(att_syntax, nostack, readonly),
            );
        }
        if result == -1 {
            None
        } else {
            Some(result as u8)
        }
    }
}
