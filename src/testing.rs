//! Test doubles shared by the unit tests.

use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use crate::drivers::console::Console;
use crate::mm::address::{UserAddr, PAGE_SIZE};
use crate::mm::palloc::{PagePool, ScratchPage};
use crate::mm::space::{AddressSpace, PageFlags};
use crate::syscall::handler::Kernel;
use crate::syscall::uaccess::UserAccess;
use crate::trap::IntrFrame;

/// Default user stack pointer for test traps.
pub const ESP: u32 = 0xBFFF_FF00;

/// Frame for a syscall trapped with the given stack pointer.
pub fn stack_frame(esp: u32) -> IntrFrame {
    IntrFrame::syscall(esp)
}

/// A pool holding exactly `pages` scratch pages. Keep the returned region
/// alive as long as the pool.
pub fn pool_with_pages(pages: usize) -> (Vec<u8>, PagePool) {
    let mut region = vec![0u8; (pages + 1) * PAGE_SIZE];
    let base = region.as_mut_ptr();
    let skip = base.align_offset(PAGE_SIZE);
    let pool = PagePool::empty();
    // SAFETY: `skip < PAGE_SIZE`, so the aligned sub-range fits in `region`,
    // which the caller keeps alive and otherwise untouched.
    unsafe { pool.init(base.add(skip), pages * PAGE_SIZE) };
    (region, pool)
}

/// Accessor that counts calls and reports every access as faulting.
pub struct CountingAccess {
    reads: Cell<usize>,
}

impl CountingAccess {
    pub fn new() -> Self {
        Self {
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

// SAFETY: Never touches memory.
unsafe impl UserAccess for CountingAccess {
    fn get_user(&self, _addr: UserAddr) -> Option<u8> {
        self.reads.set(self.reads.get() + 1);
        None
    }
}

/// Console that keeps everything written to it.
pub struct RecordingConsole {
    bytes: Mutex<Vec<u8>>,
}

impl RecordingConsole {
    pub const fn new() -> Self {
        Self {
            bytes: Mutex::new(Vec::new()),
        }
    }

    pub fn output(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }
}

impl Console for RecordingConsole {
    fn putbuf(&self, buf: &[u8]) {
        self.bytes.lock().extend_from_slice(buf);
    }
}

/// A kernel with one process: a software address space, two scratch pages,
/// a recording console, and lifecycle hooks that only record.
pub struct TestKernel {
    pub space: Mutex<AddressSpace>,
    pub pool: PagePool,
    pub console: RecordingConsole,
    esp: u32,
    exits: Mutex<Vec<i32>>,
    power_offs: AtomicUsize,
    _region: Vec<u8>,
}

impl TestKernel {
    pub fn new() -> Self {
        Self::with_stack_at(ESP)
    }

    /// Kernel whose stack page contains `esp`; argument slots past the end
    /// of that page are unmapped.
    pub fn with_stack_at(esp: u32) -> Self {
        let (region, pool) = pool_with_pages(2);
        let mut space = AddressSpace::new();
        space.map(esp, PageFlags::USER_RW).unwrap();
        Self {
            space: Mutex::new(space),
            pool,
            console: RecordingConsole::new(),
            esp,
            exits: Mutex::new(Vec::new()),
            power_offs: AtomicUsize::new(0),
            _region: region,
        }
    }

    /// Kernel whose scratch pool is empty.
    pub fn without_pool() -> Self {
        Self {
            pool: PagePool::empty(),
            ..Self::new()
        }
    }

    pub fn frame(&self) -> IntrFrame {
        stack_frame(self.esp)
    }

    /// Lay out a syscall number and its arguments at the stack pointer.
    pub fn push_call(&self, words: &[u32]) {
        let mut space = self.space.lock();
        for (i, &w) in words.iter().enumerate() {
            space.write_word(self.esp + 4 * i as u32, w).unwrap();
        }
    }

    /// Map and fill a user buffer.
    pub fn put_bytes(&self, addr: u32, bytes: &[u8]) {
        let mut space = self.space.lock();
        space
            .map_range(addr, bytes.len() as u32, PageFlags::USER_RW)
            .unwrap();
        space.write_bytes(addr, bytes).unwrap();
    }

    pub fn console_output(&self) -> Vec<u8> {
        self.console.output()
    }

    pub fn exits(&self) -> Vec<i32> {
        self.exits.lock().clone()
    }

    pub fn power_offs(&self) -> usize {
        self.power_offs.load(Ordering::Relaxed)
    }
}

impl Kernel for TestKernel {
    fn user_memory(&self) -> &dyn UserAccess {
        self
    }

    fn console(&self) -> &dyn Console {
        &self.console
    }

    fn scratch_page(&self) -> Option<ScratchPage<'_>> {
        self.pool.get_page()
    }

    fn exit_thread(&self, status: i32) {
        self.exits.lock().push(status);
    }

    fn power_off(&self) {
        self.power_offs.fetch_add(1, Ordering::Relaxed);
    }
}

// SAFETY: Delegates to `AddressSpace`, which never faults.
unsafe impl UserAccess for TestKernel {
    fn get_user(&self, addr: UserAddr) -> Option<u8> {
        self.space.lock().get_user(addr)
    }
}
