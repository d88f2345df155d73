//! Memory access classification and coherence states.
//!
//! This module defines the two enumerations the whole protocol is written
//! in terms of:
//! 1. **Access Types:** Whether an observed reference reads or writes.
//! 2. **Coherence States:** The MESI-style line states, whose declaration
//!    order carries the protocol's total order.

/// Type of observed memory reference.
///
/// The instrumentation driver classifies every intercepted reference as a
/// load or a store before dispatching it to the owning thread's cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    /// Data read. Any valid line state satisfies a load.
    Load,

    /// Data write. Requires the line in `Exclusive` or better.
    Store,
}

/// Coherence state of a cache line.
///
/// The declaration order is load-bearing: the directory guarantees it grants
/// at least the requested state (`granted >= requested`), and the cache
/// detects a partial hit by comparing the held state against `Exclusive`.
/// Any re-encoding must preserve `Invalid < Shared < Exclusive < Modified`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum CoherenceState {
    /// Line not present. All other line fields are meaningless.
    #[default]
    Invalid,

    /// Read-only copy, possibly replicated in other caches.
    Shared,

    /// Read-only copy, sole holder.
    Exclusive,

    /// Writable copy, sole holder, dirty.
    Modified,
}

impl CoherenceState {
    /// Returns `true` for the states a store can be satisfied from locally.
    #[inline]
    pub fn is_write_owned(self) -> bool {
        self >= Self::Exclusive
    }
}
