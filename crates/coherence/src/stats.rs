//! Statistics collection and report types.
//!
//! This module tracks what the simulation is for: per-cache access
//! outcomes and safety counts, and the directory-side classification of
//! every line's ownership history. It provides:
//! 1. **Cache counters:** hits, partial hits, misses, safe accesses,
//!    multi-line accesses, downgrades, and RSC flushes, with derived rates.
//! 2. **Downgrade histogram:** per-line downgrade counts with a top-N query
//!    for hot-line reporting.
//! 3. **Directory reports:** per-site and aggregate entry-kind breakdowns.
//!
//! Everything here is plain data; rendering lives in the driver.

use std::collections::HashMap;

use serde::Serialize;

use crate::directory::EntryKind;

/// Counters accumulated by one cache.
///
/// `accesses = hits + partial_hits + misses`; every line an access touches
/// contributes to exactly one of the three. `safe_accesses` counts only
/// full hits whose resident line carried a true safety bit; misses and
/// partial hits never contribute, even when the line they install is safe.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CacheStats {
    /// Full hits (loads on any valid line, stores on a write-owned line).
    pub hits: u64,
    /// Stores that found the line resident but only `Shared`.
    pub partial_hits: u64,
    /// Accesses that found no matching way.
    pub misses: u64,
    /// Full hits on a line whose safety bit was set.
    pub safe_accesses: u64,
    /// Top-level accesses that crossed at least one line boundary.
    pub multiline_accesses: u64,
    /// Downgrade callbacks received from home sites.
    pub downgrades: u64,
    /// Downgrades that took a line from safe to unsafe.
    pub rsc_flushes: u64,
    /// Downgrade counts keyed by line number (`addr >> log2(line_size)`).
    pub downgrades_by_line: HashMap<u64, u64>,
}

impl CacheStats {
    /// Total accesses this cache has classified.
    pub fn accesses(&self) -> u64 {
        self.hits + self.partial_hits + self.misses
    }

    /// Fraction of accesses that were full hits, in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.accesses())
    }

    /// Fraction of accesses that touched a safe line, in `[0, 1]`.
    pub fn safe_rate(&self) -> f64 {
        ratio(self.safe_accesses, self.accesses())
    }

    /// The `n` most-downgraded lines, as `(line_number, count)` pairs in
    /// descending count order (ties broken by line number for determinism).
    pub fn top_downgrades(&self, n: usize) -> Vec<(u64, u64)> {
        let mut entries: Vec<_> = self
            .downgrades_by_line
            .iter()
            .map(|(&line, &count)| (line, count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }
}

/// Guarded division for rate reporting.
fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Entry-kind breakdown of one home site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SiteReport {
    /// Entries with no recorded owner.
    pub untouched: u64,
    /// Entries touched by one cache and never written.
    pub private_read_only: u64,
    /// Entries touched by one cache and written.
    pub private_read_write: u64,
    /// Entries touched by several caches, never written.
    pub shared_read_only: u64,
    /// Entries touched by several caches and written.
    pub shared_read_write: u64,
}

impl SiteReport {
    /// Adds one entry of the given kind.
    pub fn record(&mut self, kind: EntryKind) {
        match kind {
            EntryKind::Untouched => self.untouched += 1,
            EntryKind::PrivateReadOnly => self.private_read_only += 1,
            EntryKind::PrivateReadWrite => self.private_read_write += 1,
            EntryKind::SharedReadOnly => self.shared_read_only += 1,
            EntryKind::SharedReadWrite => self.shared_read_write += 1,
        }
    }

    /// Total entries classified at this site.
    pub fn entries(&self) -> u64 {
        self.untouched
            + self.private_read_only
            + self.private_read_write
            + self.shared_read_only
            + self.shared_read_write
    }

    /// Accumulates another site's counts into this one.
    pub fn merge(&mut self, other: &Self) {
        self.untouched += other.untouched;
        self.private_read_only += other.private_read_only;
        self.private_read_write += other.private_read_write;
        self.shared_read_only += other.shared_read_only;
        self.shared_read_write += other.shared_read_write;
    }
}

/// Entry-kind breakdown across a whole directory set.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DirectoryReport {
    /// Per-site breakdowns, in site order.
    pub sites: Vec<SiteReport>,
    /// Aggregate over all sites.
    pub total: SiteReport,
}

impl DirectoryReport {
    /// Builds a report from per-site breakdowns.
    pub fn from_sites(sites: Vec<SiteReport>) -> Self {
        let mut total = SiteReport::default();
        for site in &sites {
            total.merge(site);
        }
        Self { sites, total }
    }
}
