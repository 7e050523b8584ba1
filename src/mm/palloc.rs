//! Scratch Page Pool
//!
//! Hands out page-sized, page-aligned kernel buffers used to stage data
//! on its way from user memory to a kernel sink.
//!
//! # Design
//! - Backed by `linked_list_allocator` over a region supplied at boot
//! - Pages are zeroed before they are handed out
//! - [`ScratchPage`] is an RAII guard: dropping it scrubs the page and
//!   returns it to the pool, so release happens on every exit path

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use linked_list_allocator::LockedHeap;

use super::address::PAGE_SIZE;
use crate::security::Zeroize;

/// Layout of one scratch page.
const PAGE_LAYOUT: Layout = match Layout::from_size_align(PAGE_SIZE, PAGE_SIZE) {
    Ok(layout) => layout,
    Err(_) => panic!("page layout"),
};

/// A pool of scratch pages.
pub struct PagePool {
    heap: LockedHeap,
    in_use: AtomicUsize,
}

impl PagePool {
    /// Create a pool with no backing memory. Every allocation fails
    /// until [`PagePool::init`] is called.
    pub const fn empty() -> Self {
        Self {
            heap: LockedHeap::empty(),
            in_use: AtomicUsize::new(0),
        }
    }

    /// Hand the pool its backing region.
    ///
    /// # Safety
    /// - `start..start + size` must be valid for reads and writes
    /// - the region must not be used by anything else for as long as the
    ///   pool lives
    /// - must be called at most once
    pub unsafe fn init(&self, start: *mut u8, size: usize) {
        // SAFETY: Forwarded from the caller's contract.
        unsafe { self.heap.lock().init(start, size) };
        log::debug!("scratch pool: {} KiB at {:p}", size / 1024, start);
    }

    /// Acquire one zeroed scratch page.
    ///
    /// Returns `None` if the pool is exhausted or was never initialized.
    pub fn get_page(&self) -> Option<ScratchPage<'_>> {
        let ptr = self.heap.lock().allocate_first_fit(PAGE_LAYOUT).ok()?;
        self.in_use.fetch_add(1, Ordering::Relaxed);

        let mut page = ScratchPage { pool: self, ptr };
        page.as_mut_slice().zeroize();
        Some(page)
    }

    /// Number of pages currently handed out.
    pub fn pages_in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }

    fn release(&self, ptr: NonNull<u8>) {
        // SAFETY: `ptr` came from `allocate_first_fit` with PAGE_LAYOUT on
        // this heap, and each ScratchPage releases exactly once.
        unsafe { self.heap.lock().deallocate(ptr, PAGE_LAYOUT) };
        self.in_use.fetch_sub(1, Ordering::Relaxed);
    }
}

/// One page borrowed from a [`PagePool`].
pub struct ScratchPage<'pool> {
    pool: &'pool PagePool,
    ptr: NonNull<u8>,
}

impl ScratchPage<'_> {
    /// Page capacity in bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        PAGE_SIZE
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` is a live PAGE_SIZE allocation owned by this guard.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), PAGE_SIZE) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` makes the borrow exclusive.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), PAGE_SIZE) }
    }
}

impl core::fmt::Debug for ScratchPage<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ScratchPage({:p})", self.ptr.as_ptr())
    }
}

impl Drop for ScratchPage<'_> {
    fn drop(&mut self) {
        self.as_mut_slice().zeroize();
        self.pool.release(self.ptr);
    }
}
