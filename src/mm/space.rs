//! Software User Address Space
//!
//! A page map for one process, kept entirely in kernel memory. It backs the
//! hosted form of the user memory accessor: every read first asks the map
//! whether the page is present and user-accessible, and only then touches
//! it. An unmapped or kernel-only page reports a fault instead of being read.
//!
//! # Security Properties
//! - Nothing at or above `PHYS_BASE` can be mapped
//! - Loader writes go through the same presence check as user reads
//! - Unmapping drops the page contents immediately

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use core::fmt;

use bitflags::bitflags;

use super::address::{UserAddr, PAGE_SIZE, PHYS_BASE};
use crate::syscall::uaccess::UserAccess;

bitflags! {
    /// Page table entry flags, in the i386 PTE bit positions.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PageFlags: u32 {
        /// Entry is valid.
        const PRESENT = 1 << 0;
        /// Page may be written.
        const WRITABLE = 1 << 1;
        /// Page is reachable from ring 3.
        const USER = 1 << 2;

        /// Read-only user page (code, rodata).
        const USER_RO = Self::PRESENT.bits() | Self::USER.bits();
        /// Read-write user page (data, stack).
        const USER_RW = Self::PRESENT.bits() | Self::USER.bits() | Self::WRITABLE.bits();
    }
}

/// Error type for address space operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// The address is not in the user half.
    KernelAddress,
    /// The page is already mapped.
    AlreadyMapped,
    /// The page is not mapped.
    NotMapped,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::KernelAddress => write!(f, "address is in kernel space"),
            MapError::AlreadyMapped => write!(f, "page already mapped"),
            MapError::NotMapped => write!(f, "page not mapped"),
        }
    }
}

struct Page {
    flags: PageFlags,
    data: Box<[u8; PAGE_SIZE]>,
}

/// The user half of one process's virtual memory.
#[derive(Default)]
pub struct AddressSpace {
    pages: BTreeMap<u32, Page>,
}

impl AddressSpace {
    /// Create an empty address space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a zero-filled page at the page containing `addr`.
    pub fn map(&mut self, addr: u32, flags: PageFlags) -> Result<(), MapError> {
        let vpn = UserAddr::new(addr)
            .ok_or(MapError::KernelAddress)?
            .page_number();
        if self.pages.contains_key(&vpn) {
            return Err(MapError::AlreadyMapped);
        }
        self.pages.insert(
            vpn,
            Page {
                flags: flags | PageFlags::PRESENT,
                data: Box::new([0; PAGE_SIZE]),
            },
        );
        Ok(())
    }

    /// Map every page overlapping `[addr, addr + len)`.
    ///
    /// Pages that are already mapped are left untouched.
    pub fn map_range(&mut self, addr: u32, len: u32, flags: PageFlags) -> Result<(), MapError> {
        if len == 0 {
            return Ok(());
        }
        let last = addr.checked_add(len - 1).ok_or(MapError::KernelAddress)?;
        if last >= PHYS_BASE {
            return Err(MapError::KernelAddress);
        }
        let step = PAGE_SIZE as u32;
        let mut page = UserAddr::new(addr)
            .ok_or(MapError::KernelAddress)?
            .align_down();
        loop {
            match self.map(page.as_u32(), flags) {
                Ok(()) | Err(MapError::AlreadyMapped) => {}
                Err(e) => return Err(e),
            }
            match page.checked_add(step) {
                Some(next) if next.as_u32() <= last => page = next,
                _ => break,
            }
        }
        Ok(())
    }

    /// Remove the page containing `addr`.
    pub fn unmap(&mut self, addr: u32) -> Result<(), MapError> {
        let vpn = UserAddr::new(addr)
            .ok_or(MapError::KernelAddress)?
            .page_number();
        self.pages.remove(&vpn).map(|_| ()).ok_or(MapError::NotMapped)
    }

    /// Flags of the page containing `addr`, if mapped.
    pub fn query(&self, addr: UserAddr) -> Option<PageFlags> {
        self.pages.get(&addr.page_number()).map(|page| page.flags)
    }

    /// Copy `bytes` into mapped pages starting at `addr`, as a loader would.
    ///
    /// Ignores the writable bit: the kernel may fill read-only user pages.
    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), MapError> {
        let mut cursor = UserAddr::new(addr).ok_or(MapError::KernelAddress)?;
        for (i, &byte) in bytes.iter().enumerate() {
            let page = self
                .pages
                .get_mut(&cursor.page_number())
                .ok_or(MapError::NotMapped)?;
            page.data[cursor.page_offset()] = byte;
            if i + 1 < bytes.len() {
                cursor = cursor.checked_add(1).ok_or(MapError::KernelAddress)?;
            }
        }
        Ok(())
    }

    /// Store one 32-bit little-endian word, the way the user ABI lays out
    /// stack slots.
    pub fn write_word(&mut self, addr: u32, word: u32) -> Result<(), MapError> {
        self.write_bytes(addr, &word.to_le_bytes())
    }

    /// Number of mapped pages.
    pub fn mapped_pages(&self) -> usize {
        self.pages.len()
    }
}

// SAFETY: `get_user` never dereferences a raw pointer. It returns `None`
// for any page that is absent or not user-accessible, so no access faults.
unsafe impl UserAccess for AddressSpace {
    fn get_user(&self, addr: UserAddr) -> Option<u8> {
        let page = self.pages.get(&addr.page_number())?;
        if !page.flags.contains(PageFlags::PRESENT | PageFlags::USER) {
            return None;
        }
        Some(page.data[addr.page_offset()])
    }
}
