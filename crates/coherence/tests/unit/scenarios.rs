//! End-to-end Scenarios.
//!
//! Concrete multi-step sequences exercising the whole protocol, all on the
//! small single-site world (512-byte caches, 64-byte lines, 2 ways, 4
//! sets) with reverse transitions off unless stated. Each scenario
//! finishes with the cross-component invariant check.

use crate::common::World;
use pretty_assertions::assert_eq;
use rscsim_core::common::AccessType;
use rscsim_core::common::CoherenceState::{Exclusive, Modified, Shared};

/// Scenario A: a cold load misses, is granted Exclusive, and installs a
/// safe line; the miss itself does not count as a safe access.
#[test]
fn scenario_a_cold_load() {
    let world = World::new(1, 1);

    let hit = world.load(0, 0x100);
    assert!(!hit);
    assert_eq!(world.state(0, 0x100), Some(Exclusive));
    assert_eq!(world.safe(0, 0x100), Some(true));

    let stats = world.stats(0);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.safe_accesses, 0, "safe is counted on full hits only");

    world.check_invariants();
}

/// Scenario B: the reload fully hits in Exclusive and counts one safe
/// access.
#[test]
fn scenario_b_reload_hits_safe() {
    let world = World::new(1, 1);

    let _ = world.load(0, 0x100);
    let hit = world.load(0, 0x100);
    assert!(hit);
    assert_eq!(world.state(0, 0x100), Some(Exclusive));
    assert_eq!(world.stats(0).safe_accesses, 1);

    world.check_invariants();
}

/// Scenario C: a store followed by another cache's load turns the line
/// unsafe; the writer sees one RSC flush.
#[test]
fn scenario_c_store_then_foreign_load_flushes() {
    let world = World::new(2, 1);

    let _ = world.store(0, 0x200);
    assert_eq!(world.safe(0, 0x200), Some(true));

    let _ = world.load(1, 0x200);

    // Cache 0 was downgraded to Shared with safe=false.
    assert_eq!(world.state(0, 0x200), Some(Shared));
    assert_eq!(world.safe(0, 0x200), Some(false));
    assert_eq!(world.stats(0).rsc_flushes, 1);
    assert_eq!(world.stats(0).downgrades, 1);

    let entry = world.probe(0x200).unwrap();
    assert!(entry.shared);
    assert!(!entry.read_only);

    world.check_invariants();
}

/// Scenario D: two loads of the same line stay safe (shared but
/// read-only); the downgrade to Shared is not an RSC flush.
#[test]
fn scenario_d_shared_reads_stay_safe() {
    let world = World::new(2, 1);

    let _ = world.load(0, 0x300);
    let _ = world.load(1, 0x300);

    assert_eq!(world.state(0, 0x300), Some(Shared));
    assert_eq!(world.state(1, 0x300), Some(Shared));
    assert_eq!(world.safe(0, 0x300), Some(true));
    assert_eq!(world.stats(0).rsc_flushes, 0);
    assert_eq!(world.stats(0).downgrades, 1, "Exclusive to Shared, no flush");

    world.check_invariants();
}

/// Scenario E: filling both ways of a set and touching a third line
/// evicts the oldest way and informs the directory.
#[test]
fn scenario_e_conflict_eviction() {
    let world = World::new(1, 1);

    // 0x000, 0x100, 0x200 all map to set 0 with distinct tags.
    let _ = world.load(0, 0x000);
    let _ = world.load(0, 0x100);
    let _ = world.load(0, 0x200);

    assert_eq!(world.state(0, 0x000), None, "oldest way evicted");
    assert_eq!(world.probe(0x000).unwrap().sharers, 0);

    world.check_invariants();
}

/// Scenario F: a load spanning lines 0 and 1 hits iff both sub-accesses
/// hit, and counts a multi-line access.
#[test]
fn scenario_f_spanning_load() {
    let world = World::new(1, 1);

    let hit = world.access(0, AccessType::Load, 0x3C, 8);
    assert!(!hit, "cold: neither line resident");
    assert!(world.stats(0).multiline_accesses >= 1);

    let hit = world.access(0, AccessType::Load, 0x3C, 8);
    assert!(hit, "warm: both lines resident");

    world.check_invariants();
}

/// After a store that misses, an immediate reload or re-store by the same
/// cache fully hits in a write-owned state.
#[test]
fn store_miss_then_same_cache_access_hits() {
    let world = World::new(1, 1);

    let hit = world.store(0, 0x140);
    assert!(!hit);
    assert_eq!(world.state(0, 0x140), Some(Modified));

    assert!(world.load(0, 0x140));
    assert!(world.store(0, 0x140));
    assert!(world.state(0, 0x140).is_some_and(|s| s >= Exclusive));

    world.check_invariants();
}

/// A cache running alone can never partially hit nor be flushed.
#[test]
fn isolated_cache_never_flushes() {
    let world = World::new(1, 1);

    for i in 0..64_u64 {
        let addr = (i * 24) % 0x800;
        let _ = world.store(0, addr);
        let _ = world.load(0, addr);
    }

    let stats = world.stats(0);
    assert_eq!(stats.partial_hits, 0);
    assert_eq!(stats.rsc_flushes, 0);

    world.check_invariants();
}
