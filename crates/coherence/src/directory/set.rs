//! Bank of home sites plus the page-to-site map.
//!
//! Every address is homed by its virtual page: the first time a page is
//! seen it is assigned the next dense physical-page index, emulating a
//! first-touch allocator, and the home site is that index modulo the site
//! count. Homing is therefore deterministic but workload-dependent. The
//! page map only ever grows.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::trace;

use crate::common::constants::PAGE_SHIFT;
use crate::common::SimError;
use crate::directory::entry::EntryView;
use crate::directory::Directory;
use crate::stats::DirectoryReport;

/// The bank of home-site directories shared by every cache in a run.
///
/// Caches hold `Rc` handles to one `DirectorySet`; all interior state is
/// behind `RefCell` so the shared handle suffices under the single-threaded
/// cooperative scheduling contract (one access or downgrade in flight at a
/// time, serialised by the driver).
#[derive(Debug)]
pub struct DirectorySet {
    sites: Vec<RefCell<Directory>>,
    page_map: RefCell<HashMap<u64, usize>>,
    line_bytes: usize,
}

impl DirectorySet {
    /// Creates `num_sites` empty home sites for lines of `line_bytes` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when `num_sites` is zero or the
    /// line size is not a non-zero power of two.
    pub fn new(num_sites: usize, line_bytes: usize) -> Result<Self, SimError> {
        if num_sites == 0 {
            return Err(SimError::config("directory needs at least one site"));
        }
        let mut sites = Vec::with_capacity(num_sites);
        for _ in 0..num_sites {
            sites.push(RefCell::new(Directory::new(line_bytes)?));
        }
        Ok(Self {
            sites,
            page_map: RefCell::new(HashMap::new()),
            line_bytes,
        })
    }

    /// Line size in bytes this bank quantises addresses by.
    pub fn line_bytes(&self) -> usize {
        self.line_bytes
    }

    /// Number of distinct pages the run has touched so far.
    pub fn mapped_pages(&self) -> usize {
        self.page_map.borrow().len()
    }

    /// Returns the home site for `addr`, assigning the address's page a
    /// physical-page index on first sight.
    pub fn find(&self, addr: u64) -> &RefCell<Directory> {
        &self.sites[self.site_of(addr)]
    }

    /// Home-site index for `addr` (first-touch page index modulo sites).
    pub fn site_of(&self, addr: u64) -> usize {
        let vpn = addr >> PAGE_SHIFT;
        let mut map = self.page_map.borrow_mut();
        let next = map.len();
        let ppn = *map.entry(vpn).or_insert_with(|| {
            trace!(vpn, ppn = next, "first touch of page");
            next
        });
        ppn % self.sites.len()
    }

    /// Propagates the reverse-transition toggle to every site.
    ///
    /// Configure before the first access; flipping mid-run only affects
    /// entries whose sharer lists empty afterwards.
    pub fn set_allow_reverse_transition(&self, allow: bool) {
        for site in &self.sites {
            site.borrow_mut().set_allow_reverse_transition(allow);
        }
    }

    /// Snapshot of the entry for `addr`, without perturbing the page map.
    ///
    /// Returns `None` when the address's page has never been homed (and so
    /// no site can hold an entry for it) or when the home site has no entry.
    pub fn probe(&self, addr: u64) -> Option<EntryView> {
        let vpn = addr >> PAGE_SHIFT;
        let ppn = *self.page_map.borrow().get(&vpn)?;
        self.sites[ppn % self.sites.len()].borrow().probe(addr)
    }

    /// Snapshot of every entry across all sites, as `(line address, view)`
    /// pairs, for invariant checks.
    pub fn line_entries(&self) -> Vec<(u64, EntryView)> {
        self.sites
            .iter()
            .flat_map(|site| site.borrow().line_entries())
            .collect()
    }

    /// Classifies every entry of every site, per site and in aggregate.
    pub fn report(&self) -> DirectoryReport {
        let sites: Vec<_> = self
            .sites
            .iter()
            .map(|site| site.borrow().site_report())
            .collect();
        DirectoryReport::from_sites(sites)
    }
}
