//! System Call Argument Marshalling
//!
//! Arguments live on the user stack: the syscall number at `[esp]`, then
//! one 32-bit little-endian word per argument at `[esp + 4 * n]`. Each word
//! is fetched through the fault-tolerant copy, so a corrupted stack pointer
//! yields an error, never a kernel fault.

use core::fmt;

use super::uaccess::{copy_from_user, AccessError, UserAccess};
use crate::mm::address::{UserPtr, PHYS_BASE, WORD_SIZE};
use crate::trap::IntrFrame;

/// Argument fetch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgError {
    /// Index not retrievable through this accessor.
    BadIndex(i32),
    /// Slot address rejected or the read faulted.
    Address(AccessError),
}

impl From<AccessError> for ArgError {
    fn from(e: AccessError) -> Self {
        ArgError::Address(e)
    }
}

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgError::BadIndex(n) => write!(f, "argument index {} not allowed", n),
            ArgError::Address(e) => write!(f, "argument fetch failed: {}", e),
        }
    }
}

/// Read-only view of the arguments of one trapped syscall.
#[derive(Clone, Copy)]
pub struct Args<'a> {
    esp: u32,
    mem: &'a dyn UserAccess,
}

impl<'a> Args<'a> {
    pub fn new(frame: &IntrFrame, mem: &'a dyn UserAccess) -> Self {
        Self {
            esp: frame.esp,
            mem,
        }
    }

    /// Fetch slot `n` as a signed integer. Index 0 (the syscall number) is
    /// allowed.
    pub fn int(&self, n: i32) -> Result<i32, ArgError> {
        if n < 0 {
            return Err(ArgError::BadIndex(n));
        }
        self.word(n).map(|w| w as i32)
    }

    /// Fetch slot `n >= 1` as an unsigned integer.
    pub fn uint(&self, n: i32) -> Result<u32, ArgError> {
        if n <= 0 {
            return Err(ArgError::BadIndex(n));
        }
        self.word(n)
    }

    /// Fetch slot `n >= 1` as an untrusted user pointer.
    pub fn ptr(&self, n: i32) -> Result<UserPtr, ArgError> {
        if n <= 0 {
            return Err(ArgError::BadIndex(n));
        }
        self.word(n).map(UserPtr::new)
    }

    /// Address of slot `n`, if it is below the split.
    fn slot_addr(&self, n: u32) -> Result<u32, ArgError> {
        let addr = n
            .checked_mul(WORD_SIZE)
            .and_then(|off| self.esp.checked_add(off))
            .ok_or(AccessError::KernelAddress)?;
        if addr >= PHYS_BASE {
            return Err(AccessError::KernelAddress.into());
        }
        Ok(addr)
    }

    fn word(&self, n: i32) -> Result<u32, ArgError> {
        // Callers reject negative indices first.
        let n = u32::try_from(n).map_err(|_| ArgError::BadIndex(n))?;
        let addr = self.slot_addr(n)?;
        let mut bytes = [0u8; WORD_SIZE as usize];
        copy_from_user(self.mem, &mut bytes, UserPtr::new(addr))?;
        Ok(u32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::address::UserAddr;
    use crate::mm::space::{AddressSpace, PageFlags};
    use crate::testing::{stack_frame, CountingAccess};

    const ESP: u32 = 0xBFFF_FF00;

    fn stack(words: &[u32]) -> AddressSpace {
        let mut space = AddressSpace::new();
        space.map(ESP, PageFlags::USER_RW).unwrap();
        for (i, &w) in words.iter().enumerate() {
            space.write_word(ESP + 4 * i as u32, w).unwrap();
        }
        space
    }

    #[test]
    fn test_typed_views_share_slot() {
        let space = stack(&[9, 0xFFFF_FFFE, 0x0804_a000]);
        let args = Args::new(&stack_frame(ESP), &space);
        assert_eq!(args.int(0), Ok(9));
        assert_eq!(args.int(1), Ok(-2));
        assert_eq!(args.uint(1), Ok(0xFFFF_FFFE));
        assert_eq!(args.ptr(2), Ok(UserPtr::new(0x0804_a000)));
    }

    #[test]
    fn test_index_asymmetry() {
        let mem = CountingAccess::new();
        let args = Args::new(&stack_frame(ESP), &mem);
        assert_eq!(args.int(-1), Err(ArgError::BadIndex(-1)));
        assert_eq!(args.uint(0), Err(ArgError::BadIndex(0)));
        assert_eq!(args.ptr(0), Err(ArgError::BadIndex(0)));
        assert_eq!(args.ptr(i32::MIN), Err(ArgError::BadIndex(i32::MIN)));
        assert_eq!(mem.reads(), 0);
    }

    #[test]
    fn test_slot_past_split_rejected() {
        let mem = CountingAccess::new();
        let kernel = ArgError::Address(AccessError::KernelAddress);

        // Stack pointer itself in kernel space.
        let args = Args::new(&stack_frame(PHYS_BASE), &mem);
        assert_eq!(args.int(0), Err(kernel));

        // Large index walks off the user half, or overflows outright.
        let args = Args::new(&stack_frame(ESP), &mem);
        assert_eq!(args.int(64), Err(kernel));
        assert_eq!(args.int(i32::MAX), Err(kernel));
        assert_eq!(mem.reads(), 0);
    }

    #[test]
    fn test_last_word_before_split_rejected() {
        // The copy requires `src + 4 < PHYS_BASE`, so the topmost slot
        // cannot be fetched even though it is mapped.
        let mut space = AddressSpace::new();
        space.map(PHYS_BASE - 4, PageFlags::USER_RW).unwrap();
        let args = Args::new(&stack_frame(PHYS_BASE - 8), &space);
        assert!(args.int(0).is_ok());
        assert_eq!(
            args.int(1),
            Err(ArgError::Address(AccessError::KernelAddress))
        );
    }

    #[test]
    fn test_unmapped_stack_faults() {
        let space = AddressSpace::new();
        let args = Args::new(&stack_frame(0x1000), &space);
        let addr = UserAddr::new(0x1004).unwrap();
        assert_eq!(
            args.uint(1),
            Err(ArgError::Address(AccessError::Fault { addr }))
        );
    }

    #[test]
    fn test_fetch_is_deterministic() {
        let space = stack(&[1, 42]);
        let frame = stack_frame(ESP);
        let args = Args::new(&frame, &space);
        for _ in 0..4 {
            assert_eq!(args.int(1), Ok(42));
            assert!(args.int(7).is_ok());
        }

        let empty = AddressSpace::new();
        let args = Args::new(&frame, &empty);
        let first = args.int(1);
        assert!(first.is_err());
        assert_eq!(args.int(1), first);
    }
}
