//! Per-line coherence metadata held at a home site.

use crate::cache::CacheRef;
use crate::common::CoherenceState;

/// Directory entry for one coherence line.
///
/// Created lazily on the first request for the line and kept for the rest
/// of the run. `owner`, `shared`, and `read_only` are the sticky ownership
/// history the safety bit is derived from; the sharer list and `modified`
/// flag track the live protocol state.
///
/// Invariant: `modified` implies the sharer list has exactly one element.
#[derive(Debug, Default)]
pub struct DirectoryEntry {
    /// Caches currently holding a valid copy, in arrival order.
    pub(crate) sharers: Vec<CacheRef>,
    /// True while a single cache holds the line in `Modified`.
    pub(crate) modified: bool,
    /// First cache that ever requested the line; sticky unless reverse
    /// transitions are enabled and the sharer list empties.
    pub(crate) owner: Option<CacheRef>,
    /// False once any request asked for `Modified` state.
    pub(crate) read_only: bool,
    /// True once a cache other than `owner` made a request.
    pub(crate) shared: bool,
}

impl DirectoryEntry {
    /// A line is safe iff only one cache has ever touched it, or no cache
    /// has ever asked for write permission.
    pub fn is_safe(&self) -> bool {
        !self.shared || self.read_only
    }

    /// Classifies the entry's ownership history.
    pub fn kind(&self) -> EntryKind {
        match (&self.owner, self.shared, self.read_only) {
            (None, _, _) => EntryKind::Untouched,
            (Some(_), false, true) => EntryKind::PrivateReadOnly,
            (Some(_), false, false) => EntryKind::PrivateReadWrite,
            (Some(_), true, true) => EntryKind::SharedReadOnly,
            (Some(_), true, false) => EntryKind::SharedReadWrite,
        }
    }

    /// Applies the ownership/safety bookkeeping for a request from
    /// `requester` asking for `req_state`, and returns the resulting
    /// safety bit.
    pub(crate) fn note_request(&mut self, requester: &CacheRef, req_state: CoherenceState) -> bool {
        match &self.owner {
            None => {
                self.owner = Some(requester.clone());
                self.read_only = req_state < CoherenceState::Modified;
            }
            Some(owner) => {
                self.shared = self.shared || (owner != requester);
                self.read_only = self.read_only && (req_state < CoherenceState::Modified);
            }
        }
        self.is_safe()
    }

    /// Forgets the ownership history (reverse transition): the next
    /// requester becomes a fresh first owner.
    pub(crate) fn reset_history(&mut self) {
        self.owner = None;
        self.shared = false;
        self.read_only = true;
    }
}

/// Ownership-history class of a directory entry.
///
/// Derived from the sticky `owner`/`shared`/`read_only` fields; the safe
/// classes are exactly `PrivateReadOnly`, `PrivateReadWrite`, and
/// `SharedReadOnly`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// No cache has ever requested the line (only reachable after a
    /// reverse transition cleared the history).
    Untouched,
    /// One cache, never written.
    PrivateReadOnly,
    /// One cache, written.
    PrivateReadWrite,
    /// Several caches, never written.
    SharedReadOnly,
    /// Several caches and written: the unsafe class.
    SharedReadWrite,
}

/// Read-only snapshot of one entry, for tests and reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryView {
    /// Whether a first owner is recorded.
    pub has_owner: bool,
    /// Sticky shared bit.
    pub shared: bool,
    /// Sticky read-only bit.
    pub read_only: bool,
    /// Live modified flag.
    pub modified: bool,
    /// Number of caches in the sharer list.
    pub sharers: usize,
}

impl EntryView {
    /// Safety bit this entry would return with its next response.
    pub fn is_safe(&self) -> bool {
        !self.shared || self.read_only
    }
}

impl From<&DirectoryEntry> for EntryView {
    fn from(entry: &DirectoryEntry) -> Self {
        Self {
            has_owner: entry.owner.is_some(),
            shared: entry.shared,
            read_only: entry.read_only,
            modified: entry.modified,
            sharers: entry.sharers.len(),
        }
    }
}
