//! Security Primitives Module
//!
//! # Security Properties
//! - Kernel scratch memory is cleared before reuse
//! - Clearing uses volatile writes so it cannot be optimized away

pub mod zeroize;

pub use zeroize::Zeroize;
