//! Cache line storage and introspection views.

use crate::common::CoherenceState;

/// One way of one set: the unit of storage and coherence.
///
/// When `state` is `Invalid` the remaining fields are meaningless. Within a
/// set, no two non-`Invalid` lines may share a `tag`.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CacheLine {
    /// High-order address bits identifying which aligned line this way holds.
    pub(crate) tag: u64,
    /// Coherence state granted by the directory (or promoted locally).
    pub(crate) state: CoherenceState,
    /// LRU counter; bumped on every use of the set, reset on use of this way.
    pub(crate) age: u64,
    /// Safety bit from the most recent directory response for this line.
    pub(crate) safe: bool,
}

/// Read-only view of one resident line, for statistics and invariant checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineView {
    /// Set index the line resides in.
    pub set: usize,
    /// Way index within the set.
    pub way: usize,
    /// Tag bits of the held line.
    pub tag: u64,
    /// Current coherence state (never `Invalid` in a view).
    pub state: CoherenceState,
    /// LRU age of the way.
    pub age: u64,
    /// Safety bit last returned by the directory.
    pub safe: bool,
}
