//! Scrubbing of Kernel Buffers
//!
//! Scratch pages carry bytes copied out of one process. Before a page goes
//! back to the pool it is cleared so the next borrower (possibly serving a
//! different process) never observes them.
//!
//! Volatile writes followed by a compiler fence keep the clearing from being
//! elided as a dead store.

use core::ptr;
use core::sync::atomic::{compiler_fence, Ordering};

/// Types whose contents can be overwritten with zeros.
pub trait Zeroize {
    /// Overwrite this value with zeros.
    fn zeroize(&mut self);
}

impl Zeroize for [u8] {
    fn zeroize(&mut self) {
        let base = self.as_mut_ptr();
        for i in 0..self.len() {
            // SAFETY: `i < self.len()`, so the write stays inside the slice.
            unsafe { ptr::write_volatile(base.add(i), 0) };
        }
        compiler_fence(Ordering::SeqCst);
    }
}

impl<const N: usize> Zeroize for [u8; N] {
    fn zeroize(&mut self) {
        self.as_mut_slice().zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroize_slice() {
        let mut data = [0x42u8; 16];
        data[3..9].zeroize();
        assert!(data[3..9].iter().all(|&b| b == 0));
        assert_eq!(data[2], 0x42);
        assert_eq!(data[9], 0x42);
    }

    #[test]
    fn test_zeroize_array() {
        let mut data = [0xA5u8; 64];
        data.zeroize();
        assert!(data.iter().all(|&b| b == 0));
    }
}
