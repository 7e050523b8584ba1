//! User Address Types
//!
//! Type-safe wrappers for addresses handed to the kernel by user code.
//!
//! # Security Properties
//! - A raw value read from user memory is a [`UserPtr`] and cannot be
//!   dereferenced by anything in the kernel
//! - The only way to obtain a [`UserAddr`] is a fallible conversion that
//!   checks the user/kernel split
//! - Offset arithmetic is checked; wrapping around the address space fails

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: u32 = PAGE_SIZE as u32 - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: u32 = 12;

/// Base of kernel virtual memory. Everything below belongs to the process.
pub const PHYS_BASE: u32 = 0xC000_0000;

/// Size of one argument slot on the user stack.
pub const WORD_SIZE: u32 = 4;

/// An untrusted pointer-sized value supplied by user code.
///
/// Nothing can be read through a `UserPtr`. Convert it with
/// [`UserPtr::to_user_addr`] first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct UserPtr(u32);

impl UserPtr {
    /// The null user pointer.
    pub const NULL: Self = Self(0);

    /// Wrap a raw value.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Validate this pointer against the user/kernel split.
    #[inline]
    pub const fn to_user_addr(self) -> Option<UserAddr> {
        UserAddr::new(self.0)
    }
}

impl fmt::Debug for UserPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserPtr({:#010x})", self.0)
    }
}

/// A user virtual address known to lie strictly below [`PHYS_BASE`].
///
/// This says nothing about whether the address is mapped. Only the
/// accessor can find that out.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct UserAddr(u32);

impl UserAddr {
    /// Create a user address, rejecting anything at or above the split.
    #[inline]
    pub const fn new(addr: u32) -> Option<Self> {
        if addr < PHYS_BASE {
            Some(Self(addr))
        } else {
            None
        }
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Get the virtual page number.
    #[inline]
    pub const fn page_number(self) -> u32 {
        self.0 >> PAGE_SHIFT
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        (self.0 & PAGE_MASK) as usize
    }

    /// Add an offset, failing on overflow or on crossing into kernel space.
    #[inline]
    pub const fn checked_add(self, offset: u32) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Self::new(addr),
            None => None,
        }
    }
}

impl fmt::Debug for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAddr({:#010x})", self.0)
    }
}

impl fmt::Display for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Check that `[start, start + len)` ends strictly below the split.
///
/// A range whose end lands exactly on [`PHYS_BASE`] is rejected too.
#[inline]
pub const fn range_below_split(start: u32, len: u32) -> bool {
    match start.checked_add(len) {
        Some(end) => end < PHYS_BASE,
        None => false,
    }
}
