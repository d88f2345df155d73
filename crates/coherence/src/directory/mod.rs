//! Home-site directories mediating all cross-cache state transitions.
//!
//! A `Directory` is one home site: it owns the coherence metadata for every
//! line homed at it, keyed by line address. All traffic a cache cannot
//! satisfy locally arrives here as a request for a state; the site updates
//! its ownership bookkeeping, downgrades copies in other caches where the
//! protocol demands it, and answers with a granted state (at least the one
//! requested) plus the line's safety bit. Writebacks arrive as requests for
//! `Invalid`.

/// Per-line coherence metadata and classification.
pub mod entry;
/// Bank of home sites plus the page-to-site map.
pub mod set;

use std::collections::HashMap;

use tracing::trace;

use crate::cache::CacheRef;
use crate::common::data::CoherenceState;
use crate::common::{SimError, bits};
use crate::stats::SiteReport;

pub use entry::{DirectoryEntry, EntryKind, EntryView};
pub use set::DirectorySet;

/// A directory's response to a request: the granted state and the safety
/// bit computed after the request's ownership bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grant {
    /// State the requester now holds the line in; never below the
    /// requested state.
    pub state: CoherenceState,
    /// Whether the line is safe under the RSC policy.
    pub safe: bool,
}

/// One home site.
#[derive(Debug)]
pub struct Directory {
    addr_shift: u32,
    entries: HashMap<u64, DirectoryEntry>,
    allow_reverse_transition: bool,
}

impl Directory {
    /// Creates an empty home site for lines of `line_bytes` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when `line_bytes` is not a
    /// non-zero power of two.
    pub fn new(line_bytes: usize) -> Result<Self, SimError> {
        if !bits::is_power_of_two(line_bytes as u64) {
            return Err(SimError::config(format!(
                "line size must be a non-zero power of two, got {line_bytes}"
            )));
        }
        let addr_shift = bits::floor_log2(line_bytes as u64)
            .ok_or_else(|| SimError::config("line size must be non-zero"))?;
        Ok(Self {
            addr_shift,
            entries: HashMap::new(),
            allow_reverse_transition: false,
        })
    }

    /// Enables or disables reverse transitions for this site.
    pub fn set_allow_reverse_transition(&mut self, allow: bool) {
        self.allow_reverse_transition = allow;
    }

    /// Processes a coherence request from `requester` for the line holding
    /// `addr`.
    ///
    /// `req_state` selects the protocol action: `Shared` and `Modified` are
    /// the ordinary read/write requests, `Exclusive` behaves like `Modified`
    /// without setting the dirty flag, and `Invalid` signals a writeback
    /// (the requester is relinquishing its copy during eviction).
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ProtocolInvariantViolation`] when the entry's
    /// `modified ⇒ single sharer` precondition fails or a downgrade target
    /// turns out to be the requester itself, and propagates
    /// [`SimError::DowngradeOnMissingLine`] from downgraded caches.
    pub fn request(
        &mut self,
        requester: &CacheRef,
        addr: u64,
        req_state: CoherenceState,
    ) -> Result<Grant, SimError> {
        let entry = self.entries.entry(addr >> self.addr_shift).or_default();

        if entry.modified && entry.sharers.len() != 1 {
            return Err(SimError::protocol(
                addr,
                format!("modified entry with {} sharers", entry.sharers.len()),
            ));
        }

        let is_safe = entry.note_request(requester, req_state);

        match req_state {
            CoherenceState::Shared => {
                if entry.modified {
                    // The sole modified copy loses write ownership.
                    if let Some(holder) = entry.sharers.first() {
                        downgrade_target(holder, addr, CoherenceState::Shared, is_safe)?;
                    }
                    entry.modified = false;
                } else if let [holder] = entry.sharers.as_slice() {
                    // A single holder may have an Exclusive copy.
                    downgrade_target(holder, addr, CoherenceState::Shared, is_safe)?;
                }

                entry.sharers.push(requester.clone());

                // An unshared read is silently promoted to Exclusive so a
                // later store by the same cache needs no upgrade.
                let state = if entry.sharers.len() == 1 {
                    CoherenceState::Exclusive
                } else {
                    CoherenceState::Shared
                };
                Ok(Grant { state, safe: is_safe })
            }

            CoherenceState::Exclusive | CoherenceState::Modified => {
                for sharer in &entry.sharers {
                    if sharer != requester {
                        downgrade_target(sharer, addr, CoherenceState::Invalid, is_safe)?;
                    }
                }
                entry.sharers.clear();
                entry.sharers.push(requester.clone());
                entry.modified = req_state == CoherenceState::Modified;
                Ok(Grant {
                    state: req_state,
                    safe: is_safe,
                })
            }

            CoherenceState::Invalid => {
                if entry.modified {
                    // The sole modified copy is the one being evicted.
                    entry.modified = false;
                    entry.sharers.clear();
                } else if let Some(pos) = entry.sharers.iter().position(|s| s == requester) {
                    let _ = entry.sharers.remove(pos);
                }

                if self.allow_reverse_transition && entry.sharers.is_empty() {
                    trace!(addr, "sharer list empty, resetting ownership history");
                    entry.reset_history();
                }
                Ok(Grant {
                    state: CoherenceState::Invalid,
                    safe: is_safe,
                })
            }
        }
    }

    /// Snapshot of the entry for `addr`, if one exists.
    pub fn probe(&self, addr: u64) -> Option<EntryView> {
        self.entries.get(&(addr >> self.addr_shift)).map(EntryView::from)
    }

    /// Snapshot of every entry at this site, keyed by line base address.
    pub fn line_entries(&self) -> Vec<(u64, EntryView)> {
        self.entries
            .iter()
            .map(|(&key, entry)| (key << self.addr_shift, EntryView::from(entry)))
            .collect()
    }

    /// Number of entries ever created at this site.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Classifies every entry at this site.
    pub fn site_report(&self) -> SiteReport {
        let mut report = SiteReport::default();
        for entry in self.entries.values() {
            report.record(entry.kind());
        }
        report
    }
}

/// Reaches into a sharer's cache and applies a downgrade.
///
/// Handles that no longer resolve are skipped: the owning driver dropped
/// that cache during teardown, after its last access. A handle that
/// resolves but cannot be borrowed is the requester appearing in its own
/// sharer list, which no legal protocol run produces.
fn downgrade_target(
    target: &CacheRef,
    addr: u64,
    new_state: CoherenceState,
    safe: bool,
) -> Result<(), SimError> {
    let Some(cell) = target.upgrade() else {
        return Ok(());
    };
    let mut cache = cell
        .try_borrow_mut()
        .map_err(|_| SimError::protocol(addr, "downgrade target is the requesting cache"))?;
    trace!(addr, ?new_state, safe, "downgrading sharer");
    cache.downgrade(addr, new_state, safe)
}
