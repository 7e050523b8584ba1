//! Memory management module
//!
//! Provides:
//! - User address types and the user/kernel split
//! - Scratch page allocation
//! - A software user address space
//!
//! # Security Principles
//! - User-supplied addresses are never used as pointers without validation
//! - Scratch memory is zeroed on acquire and release
//! - Unsafe code is minimal and audited

pub mod address;
pub mod palloc;
pub mod space;

pub use address::{UserAddr, UserPtr, PAGE_SIZE, PHYS_BASE};
pub use palloc::{PagePool, ScratchPage};
pub use space::{AddressSpace, MapError, PageFlags};
