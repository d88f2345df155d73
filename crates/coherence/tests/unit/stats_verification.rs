//! Statistics Verification.
//!
//! Ensures the counter arithmetic, the top-N downgrade query, and the
//! report assembly behave, including the divide-by-zero guards a report
//! on an idle cache relies on.

use pretty_assertions::assert_eq;
use rscsim_core::directory::EntryKind;
use rscsim_core::stats::{CacheStats, DirectoryReport, SiteReport};

/// A fresh cache reports zero rates instead of NaN.
#[test]
fn idle_cache_rates_are_zero() {
    let stats = CacheStats::default();
    assert_eq!(stats.accesses(), 0);
    assert_eq!(stats.hit_rate(), 0.0);
    assert_eq!(stats.safe_rate(), 0.0);
}

/// Rates are plain fractions of the access identity.
#[test]
fn rates_are_fractions_of_accesses() {
    let stats = CacheStats {
        hits: 6,
        partial_hits: 1,
        misses: 3,
        safe_accesses: 5,
        ..CacheStats::default()
    };
    assert_eq!(stats.accesses(), 10);
    assert!((stats.hit_rate() - 0.6).abs() < 1e-12);
    assert!((stats.safe_rate() - 0.5).abs() < 1e-12);
}

/// Top-N is ordered by count descending, ties broken by line number, and
/// truncated to N.
#[test]
fn top_downgrades_orders_and_truncates() {
    let mut stats = CacheStats::default();
    let _ = stats.downgrades_by_line.insert(0x10, 3);
    let _ = stats.downgrades_by_line.insert(0x20, 7);
    let _ = stats.downgrades_by_line.insert(0x30, 3);
    let _ = stats.downgrades_by_line.insert(0x40, 1);

    assert_eq!(
        stats.top_downgrades(3),
        vec![(0x20, 7), (0x10, 3), (0x30, 3)]
    );
    assert_eq!(stats.top_downgrades(0), vec![]);
    assert_eq!(stats.top_downgrades(10).len(), 4);
}

/// Site reports count one entry per classification and sum correctly.
#[test]
fn site_report_records_each_kind() {
    let mut site = SiteReport::default();
    site.record(EntryKind::PrivateReadOnly);
    site.record(EntryKind::PrivateReadWrite);
    site.record(EntryKind::SharedReadOnly);
    site.record(EntryKind::SharedReadWrite);
    site.record(EntryKind::SharedReadWrite);
    site.record(EntryKind::Untouched);

    assert_eq!(site.entries(), 6);
    assert_eq!(site.shared_read_write, 2);
}

/// The aggregate row is the per-site sum.
#[test]
fn directory_report_totals_sum_sites() {
    let mut a = SiteReport::default();
    a.record(EntryKind::PrivateReadOnly);
    a.record(EntryKind::SharedReadWrite);
    let mut b = SiteReport::default();
    b.record(EntryKind::SharedReadWrite);

    let report = DirectoryReport::from_sites(vec![a, b]);
    assert_eq!(report.total.entries(), 3);
    assert_eq!(report.total.shared_read_write, 2);
    assert_eq!(report.sites.len(), 2);
}

/// Cache statistics serialize for the JSON report.
#[test]
fn stats_serialize_to_json() {
    let mut stats = CacheStats {
        hits: 2,
        misses: 1,
        ..CacheStats::default()
    };
    let _ = stats.downgrades_by_line.insert(8, 2);

    let value = serde_json::to_value(&stats).unwrap();
    assert_eq!(value["hits"], 2);
    assert_eq!(value["downgrades_by_line"]["8"], 2);
}
