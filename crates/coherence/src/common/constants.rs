//! Global system constants.
//!
//! This module defines the fixed properties of the memory model. The page
//! geometry is a property of the model, not a configuration knob: the
//! first-touch page map always operates on 4 KiB pages.

/// Page size in bytes (4 KiB).
pub const PAGE_SIZE: u64 = 4096;

/// Number of bits to shift to convert between byte addresses and pages.
pub const PAGE_SHIFT: u32 = 12;

/// One kibibyte, for readable cache-size configuration.
pub const KILO: usize = 1024;

/// One mebibyte, for readable cache-size configuration.
pub const MEGA: usize = KILO * KILO;
