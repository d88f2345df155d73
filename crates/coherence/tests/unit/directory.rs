//! Directory Protocol Unit Tests.
//!
//! Drives home sites both directly (through `Directory::request` with bare
//! cache handles, where no downgrade fan-out can occur) and through real
//! cache accesses (where downgrades must land in resident lines).

use crate::common::World;
use rscsim_core::SimError;
use rscsim_core::common::CoherenceState::{Exclusive, Invalid, Modified, Shared};
use rscsim_core::directory::Grant;

// ══════════════════════════════════════════════════════════
// 1. Grants
// ══════════════════════════════════════════════════════════

/// The first Shared request for a line is promoted to Exclusive, and the
/// untouched line is safe.
#[test]
fn unshared_read_promoted_to_exclusive() {
    let world = World::new(1, 1);
    let site = world.dirs.find(0x100);

    let grant = site
        .borrow_mut()
        .request(&world.handle(0), 0x100, Shared)
        .unwrap();
    assert_eq!(
        grant,
        Grant {
            state: Exclusive,
            safe: true
        }
    );
}

/// A second cache's Shared request is granted plain Shared.
#[test]
fn shared_read_stays_shared() {
    let world = World::new(2, 1);

    let _ = world.load(0, 0x100);
    let _ = world.load(1, 0x100);
    assert_eq!(world.state(1, 0x100), Some(Shared));
    assert_eq!(world.state(0, 0x100), Some(Shared), "first copy downgraded");

    let entry = world.probe(0x100).unwrap();
    assert_eq!(entry.sharers, 2);
    assert!(entry.shared);
    assert!(entry.read_only);
}

/// Modified requests are granted verbatim and set the dirty flag; the
/// grant never falls below the request.
#[test]
fn modified_request_granted_verbatim() {
    let world = World::new(1, 1);
    let site = world.dirs.find(0x300);

    let grant = site
        .borrow_mut()
        .request(&world.handle(0), 0x300, Modified)
        .unwrap();
    assert_eq!(grant.state, Modified);
    assert!(grant.safe, "sole owner's write is safe");

    let entry = world.probe(0x300).unwrap();
    assert!(entry.modified);
    assert_eq!(entry.sharers, 1);
}

// ══════════════════════════════════════════════════════════
// 2. Downgrade Fan-out
// ══════════════════════════════════════════════════════════

/// A write request invalidates every other sharer.
#[test]
fn write_invalidates_all_other_sharers() {
    let world = World::new(3, 1);

    let _ = world.load(0, 0x100);
    let _ = world.load(1, 0x100);
    let _ = world.load(2, 0x100);

    let _ = world.store(0, 0x100); // partial hit, upgrades through the site
    assert_eq!(world.state(0, 0x100), Some(Modified));
    assert_eq!(world.state(1, 0x100), None);
    assert_eq!(world.state(2, 0x100), None);

    let entry = world.probe(0x100).unwrap();
    assert!(entry.modified);
    assert_eq!(entry.sharers, 1);
}

/// A read request against a modified line downgrades the writer to Shared
/// and clears the dirty flag.
#[test]
fn read_downgrades_modified_writer() {
    let world = World::new(2, 1);

    let _ = world.store(0, 0x100);
    let _ = world.load(1, 0x100);

    assert_eq!(world.state(0, 0x100), Some(Shared));
    assert_eq!(world.state(1, 0x100), Some(Shared));

    let entry = world.probe(0x100).unwrap();
    assert!(!entry.modified);
    assert_eq!(entry.sharers, 2);
}

/// A downgrade aimed at a cache that no longer holds the line surfaces as
/// a fatal protocol divergence.
#[test]
fn stale_sharer_surfaces_missing_line() {
    let world = World::new(2, 1);

    // Register cache 0 as a sharer without installing the line.
    let site = world.dirs.find(0x100);
    let _ = site
        .borrow_mut()
        .request(&world.handle(0), 0x100, Shared)
        .unwrap();

    // Cache 1's read forces a downgrade into cache 0, which has nothing.
    let result = world.caches[1]
        .borrow_mut()
        .access(rscsim_core::common::AccessType::Load, 0x100, 1);
    assert!(matches!(
        result,
        Err(SimError::DowngradeOnMissingLine { addr: 0x100, .. })
    ));
}

// ══════════════════════════════════════════════════════════
// 3. Ownership and Safety Bookkeeping
// ══════════════════════════════════════════════════════════

/// The safety bit is `!shared || read_only`: a second cache's read keeps a
/// read-only line safe, and the first write by the owner keeps a private
/// line safe.
#[test]
fn safety_follows_sharing_history() {
    let world = World::new(2, 1);

    // Private read-write: safe.
    let _ = world.store(0, 0x100);
    assert_eq!(world.safe(0, 0x100), Some(true));

    // Shared read-only: safe.
    let _ = world.load(0, 0x200);
    let _ = world.load(1, 0x200);
    assert_eq!(world.safe(0, 0x200), Some(true));
    assert_eq!(world.safe(1, 0x200), Some(true));

    // Shared read-write: unsafe for everyone still holding it.
    let _ = world.load(1, 0x100);
    assert_eq!(world.safe(0, 0x100), Some(false));
    assert_eq!(world.safe(1, 0x100), Some(false));
}

/// `shared` latches on the first foreign request and stays set even after
/// the foreign copies disappear.
#[test]
fn shared_bit_is_sticky() {
    let world = World::new(2, 1);

    let _ = world.load(0, 0x100);
    let _ = world.load(1, 0x100);

    // Cache 1 relinquishes its copy.
    let site = world.dirs.find(0x100);
    let _ = site
        .borrow_mut()
        .request(&world.handle(1), 0x100, Invalid)
        .unwrap();

    let entry = world.probe(0x100).unwrap();
    assert_eq!(entry.sharers, 1);
    assert!(entry.shared, "history survives the sharer leaving");
}

// ══════════════════════════════════════════════════════════
// 4. Writebacks
// ══════════════════════════════════════════════════════════

/// A modified writeback clears the dirty flag and the sharer list.
#[test]
fn modified_writeback_clears_entry() {
    let world = World::new(1, 1);
    let site = world.dirs.find(0x100);
    let handle = world.handle(0);

    let _ = site.borrow_mut().request(&handle, 0x100, Modified).unwrap();
    let grant = site.borrow_mut().request(&handle, 0x100, Invalid).unwrap();
    assert_eq!(grant.state, Invalid);

    let entry = world.probe(0x100).unwrap();
    assert!(!entry.modified);
    assert_eq!(entry.sharers, 0);
}

/// A clean writeback removes only the evicting cache.
#[test]
fn clean_writeback_removes_one_sharer() {
    let world = World::new(2, 1);

    let _ = world.load(0, 0x100);
    let _ = world.load(1, 0x100);

    let site = world.dirs.find(0x100);
    let _ = site
        .borrow_mut()
        .request(&world.handle(0), 0x100, Invalid)
        .unwrap();

    let entry = world.probe(0x100).unwrap();
    assert_eq!(entry.sharers, 1);
}

// ══════════════════════════════════════════════════════════
// 5. Reverse Transitions
// ══════════════════════════════════════════════════════════

/// With reverse transitions enabled, an emptied entry forgets its history:
/// a fresh request from a different cache is a first-owner request again,
/// granted Exclusive and safe.
#[test]
fn reverse_transition_resets_ownership() {
    let world = World::with_reverse(2, 1);
    let site = world.dirs.find(0x100);

    let _ = site
        .borrow_mut()
        .request(&world.handle(0), 0x100, Modified)
        .unwrap();
    let _ = site
        .borrow_mut()
        .request(&world.handle(0), 0x100, Invalid)
        .unwrap();

    let entry = world.probe(0x100).unwrap();
    assert!(!entry.has_owner, "history cleared once the list emptied");

    let grant = site
        .borrow_mut()
        .request(&world.handle(1), 0x100, Modified)
        .unwrap();
    assert_eq!(
        grant,
        Grant {
            state: Modified,
            safe: true
        }
    );
}

/// With reverse transitions disabled the history is sticky for life: the
/// same sequence leaves the line unsafe for the second writer.
#[test]
fn sticky_history_without_reverse_transition() {
    let world = World::new(2, 1);
    let site = world.dirs.find(0x100);

    let _ = site
        .borrow_mut()
        .request(&world.handle(0), 0x100, Modified)
        .unwrap();
    let _ = site
        .borrow_mut()
        .request(&world.handle(0), 0x100, Invalid)
        .unwrap();

    let grant = site
        .borrow_mut()
        .request(&world.handle(1), 0x100, Modified)
        .unwrap();
    assert_eq!(grant.state, Modified, "grant still follows the protocol");
    assert!(!grant.safe, "sticky shared+written history is unsafe");

    let entry = world.probe(0x100).unwrap();
    assert!(entry.shared);
    assert!(!entry.read_only);
}

/// The reset only fires when the sharer list empties; a remaining sharer
/// keeps the history alive even with the toggle on.
#[test]
fn reverse_transition_waits_for_empty_list() {
    let world = World::with_reverse(2, 1);

    let _ = world.load(0, 0x100);
    let _ = world.load(1, 0x100);

    let site = world.dirs.find(0x100);
    let _ = site
        .borrow_mut()
        .request(&world.handle(0), 0x100, Invalid)
        .unwrap();

    let entry = world.probe(0x100).unwrap();
    assert!(entry.has_owner, "one sharer left, no reset");
    assert!(entry.shared);
}
