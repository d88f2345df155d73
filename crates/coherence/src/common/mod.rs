//! Common utilities and types used throughout the coherence simulator.
//!
//! This module provides fundamental building blocks shared across all
//! components. It includes:
//! 1. **Bit Math:** Power-of-two and integer-log helpers for address decoding.
//! 2. **Constants:** Page geometry and size units.
//! 3. **Memory Access:** Classification of observed references (Load/Store)
//!    and the ordered coherence-state enumeration.
//! 4. **Error Handling:** The fatal error taxonomy for the simulation core.

/// Power-of-two and integer-logarithm helpers.
pub mod bits;

/// System-wide constants (page geometry, size units).
pub mod constants;

/// Access types and coherence states.
pub mod data;

/// Fatal error definitions.
pub mod error;

pub use constants::{PAGE_SHIFT, PAGE_SIZE};
pub use data::{AccessType, CoherenceState};
pub use error::SimError;
