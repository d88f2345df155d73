//! Per-core set-associative cache with coherence and safety tracking.
//!
//! Each simulated thread owns one `Cache`. An access probes the ways of the
//! addressed set and resolves to a full hit, a partial hit (a store to a
//! `Shared` line), or a miss; the latter two go to the line's home-site
//! directory, which may downgrade copies in other caches before granting a
//! state and a safety bit. Evicting a valid victim sends a writeback to the
//! victim's own home site. Accesses that span a line boundary recurse onto
//! the tail.

/// Non-owning cache handles used in directory sharer lists.
pub mod handle;
/// Cache line storage and introspection views.
pub mod line;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::common::data::{AccessType, CoherenceState};
use crate::common::{SimError, bits};
use crate::config::CacheConfig;
use crate::directory::DirectorySet;
use crate::stats::CacheStats;

pub use handle::CacheRef;
pub use line::LineView;
use line::CacheLine;

/// Per-thread set-associative cache.
///
/// Construct with [`Cache::new`], which returns the shared handle the driver
/// keeps in its registry; the same handle form is what directory entries
/// store in their sharer lists.
#[derive(Debug)]
pub struct Cache {
    lines: Vec<CacheLine>,
    sets: usize,
    ways: usize,
    line_bytes: usize,

    offset_mask: u64,
    set_mask: u64,
    set_shift: u32,
    tag_mask: u64,
    tag_shift: u32,

    directory: Rc<DirectorySet>,
    self_ref: CacheRef,
    stats: CacheStats,
}

impl Cache {
    /// Creates a cache and registers nothing: the directory set learns about
    /// this cache only when its first request arrives.
    ///
    /// # Arguments
    ///
    /// * `config` - Cache geometry; validated before construction.
    /// * `directory` - The directory set shared by all caches in the run.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when the geometry is rejected by
    /// [`CacheConfig::validate`] or when `config.line_bytes` disagrees with
    /// the line size the directory set was built for (heterogeneous line
    /// sizes are not modelled).
    pub fn new(
        config: &CacheConfig,
        directory: Rc<DirectorySet>,
    ) -> Result<Rc<RefCell<Self>>, SimError> {
        config.validate()?;
        if config.line_bytes != directory.line_bytes() {
            return Err(SimError::config(format!(
                "cache line size {} differs from directory line size {}",
                config.line_bytes,
                directory.line_bytes()
            )));
        }

        let sets = config.sets();
        let set_shift = bits::floor_log2(config.line_bytes as u64)
            .ok_or_else(|| SimError::config("line size must be non-zero"))?;
        let set_bits = bits::floor_log2(sets as u64)
            .ok_or_else(|| SimError::config("geometry implies zero sets"))?;

        let offset_mask = config.line_bytes as u64 - 1;
        let set_mask = ((sets as u64) - 1) << set_shift;
        let tag_shift = set_shift + set_bits;
        let tag_mask = !(set_mask | offset_mask);

        let cache = Rc::new(RefCell::new(Self {
            lines: vec![CacheLine::default(); sets * config.ways],
            sets,
            ways: config.ways,
            line_bytes: config.line_bytes,
            offset_mask,
            set_mask,
            set_shift,
            tag_mask,
            tag_shift,
            directory,
            self_ref: CacheRef::dangling(),
            stats: CacheStats::default(),
        }));
        let handle = CacheRef::new(&cache);
        cache.borrow_mut().self_ref = handle;
        Ok(cache)
    }

    /// Coherence-line size in bytes.
    pub fn line_size(&self) -> usize {
        self.line_bytes
    }

    /// Number of sets.
    pub fn num_sets(&self) -> usize {
        self.sets
    }

    /// Associativity (ways per set).
    pub fn num_ways(&self) -> usize {
        self.ways
    }

    /// Identity handle for this cache, as stored in directory sharer lists.
    pub fn handle(&self) -> CacheRef {
        self.self_ref.clone()
    }

    /// Accumulated statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Delivers one observed memory reference.
    ///
    /// Returns `true` iff every line the reference touches was a full hit.
    /// A reference whose `[addr, addr + length)` range crosses a line
    /// boundary recurses onto the tail, and the results are conjoined.
    ///
    /// # Errors
    ///
    /// Propagates protocol-invariant violations and missing-line downgrades
    /// from the directory interaction; both are fatal to the run.
    pub fn access(&mut self, kind: AccessType, addr: u64, length: u64) -> Result<bool, SimError> {
        if self.spans_lines(addr, length) {
            self.stats.multiline_accesses += 1;
        }
        self.access_line(kind, addr, length)
    }

    /// Downgrade callback, invoked by a home site when another cache's
    /// request forces this line out of its current state.
    ///
    /// `new_state` is `Invalid` or `Shared`; `safe` is the entry's safety
    /// bit computed after the triggering request's bookkeeping. An RSC flush
    /// is recorded iff the line goes from safe to unsafe.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DowngradeOnMissingLine`] when the line is not
    /// resident: the directory believed this cache held a copy, so the two
    /// have diverged.
    pub fn downgrade(
        &mut self,
        addr: u64,
        new_state: CoherenceState,
        safe: bool,
    ) -> Result<(), SimError> {
        let set = self.set_of(addr);
        let tag = self.tag_of(addr);
        let Some(way) = self.find(set, tag) else {
            return Err(SimError::DowngradeOnMissingLine { addr, new_state });
        };

        let line = &mut self.lines[set * self.ways + way];
        if line.safe && !safe {
            self.stats.rsc_flushes += 1;
            debug!(addr, ?new_state, "line turned unsafe, RSC flush");
        }
        line.state = new_state;
        line.safe = safe;

        self.stats.downgrades += 1;
        *self
            .stats
            .downgrades_by_line
            .entry(addr >> self.set_shift)
            .or_insert(0) += 1;
        Ok(())
    }

    /// Coherence state of the line holding `addr`, if resident.
    pub fn line_state(&self, addr: u64) -> Option<CoherenceState> {
        let set = self.set_of(addr);
        self.find(set, self.tag_of(addr))
            .map(|way| self.lines[set * self.ways + way].state)
    }

    /// Safety bit of the line holding `addr`, if resident.
    pub fn line_safe(&self, addr: u64) -> Option<bool> {
        let set = self.set_of(addr);
        self.find(set, self.tag_of(addr))
            .map(|way| self.lines[set * self.ways + way].safe)
    }

    /// Returns `true` if `addr` is resident in any state.
    pub fn is_resident(&self, addr: u64) -> bool {
        self.line_state(addr).is_some()
    }

    /// Snapshot of every resident line, for invariant checks.
    pub fn resident_lines(&self) -> Vec<LineView> {
        let mut out = Vec::new();
        for set in 0..self.sets {
            for way in 0..self.ways {
                let line = &self.lines[set * self.ways + way];
                if line.state != CoherenceState::Invalid {
                    out.push(LineView {
                        set,
                        way,
                        tag: line.tag,
                        state: line.state,
                        age: line.age,
                        safe: line.safe,
                    });
                }
            }
        }
        out
    }

    /// Handles the line containing `addr`, then recurses onto any tail that
    /// falls beyond the line boundary.
    fn access_line(&mut self, kind: AccessType, addr: u64, length: u64) -> Result<bool, SimError> {
        let set = self.set_of(addr);
        let tag = self.tag_of(addr);

        // Classify: full hit, partial hit (store to a Shared line), or miss.
        let found = self.find(set, tag);
        let full_hit = found.is_some_and(|way| {
            kind == AccessType::Load || self.lines[set * self.ways + way].state.is_write_owned()
        });

        if full_hit {
            self.stats.hits += 1;
            // `found` is Some here by construction.
            if let Some(way) = found {
                let line = &mut self.lines[set * self.ways + way];
                if kind == AccessType::Store {
                    // Already write-owned; promote locally without traffic.
                    line.state = CoherenceState::Modified;
                }
                if line.safe {
                    self.stats.safe_accesses += 1;
                }
                self.touch(set, way);
            }
        } else {
            let req_state = match kind {
                AccessType::Load => CoherenceState::Shared,
                AccessType::Store => CoherenceState::Modified,
            };
            let grant = {
                let site = self.directory.find(addr);
                let response = site.borrow_mut().request(&self.self_ref, addr, req_state)?;
                response
            };
            if grant.state < req_state {
                return Err(SimError::protocol(
                    addr,
                    format!(
                        "directory granted {:?} below requested {:?}",
                        grant.state, req_state
                    ),
                ));
            }

            if let Some(way) = found {
                // Partial hit: the line is resident in Shared, no victim
                // selection; adopt the upgraded state and fresh safety bit.
                let line = &mut self.lines[set * self.ways + way];
                line.state = grant.state;
                line.safe = grant.safe;
                self.stats.partial_hits += 1;
                self.touch(set, way);
            } else {
                let victim = self.select_victim(set);
                self.evict(set, victim)?;

                self.lines[set * self.ways + victim] = CacheLine {
                    tag,
                    state: grant.state,
                    age: 0,
                    safe: grant.safe,
                };
                self.stats.misses += 1;
                self.touch(set, victim);
            }
        }

        // Tail recursion over the remaining bytes, if any cross the line end.
        let end = addr.saturating_add(length.saturating_sub(1));
        if self.line_base(end) != self.line_base(addr) {
            let next = self.line_base(addr) + self.line_bytes as u64;
            let consumed = self.line_bytes as u64 - (addr & self.offset_mask);
            let tail_hit = self.access_line(kind, next, length - consumed)?;
            return Ok(full_hit && tail_hit);
        }
        Ok(full_hit)
    }

    /// Notifies the victim's home site and frees the way, if it held a line.
    fn evict(&mut self, set: usize, way: usize) -> Result<(), SimError> {
        let line = self.lines[set * self.ways + way];
        if line.state == CoherenceState::Invalid {
            return Ok(());
        }

        let victim_addr = (line.tag << self.tag_shift) | ((set as u64) << self.set_shift);
        trace!(victim_addr, state = ?line.state, "evicting line, writeback to home site");
        let site = self.directory.find(victim_addr);
        let _ = site
            .borrow_mut()
            .request(&self.self_ref, victim_addr, CoherenceState::Invalid)?;
        Ok(())
    }

    /// Selects the way to install into: the first `Invalid` way if any,
    /// otherwise the way with the greatest age (earliest way wins ties).
    fn select_victim(&self, set: usize) -> usize {
        let mut victim = 0;
        let mut victim_age = 0;
        for way in 0..self.ways {
            let line = &self.lines[set * self.ways + way];
            if line.state == CoherenceState::Invalid {
                return way;
            }
            if line.age > victim_age {
                victim = way;
                victim_age = line.age;
            }
        }
        victim
    }

    /// Ages every way of `set` and marks `way` most recently used.
    fn touch(&mut self, set: usize, way: usize) {
        for w in 0..self.ways {
            self.lines[set * self.ways + w].age += 1;
        }
        self.lines[set * self.ways + way].age = 0;
    }

    /// First non-`Invalid` way of `set` holding `tag`.
    fn find(&self, set: usize, tag: u64) -> Option<usize> {
        (0..self.ways).find(|&way| {
            let line = &self.lines[set * self.ways + way];
            line.state != CoherenceState::Invalid && line.tag == tag
        })
    }

    /// Returns `true` when `[addr, addr + length)` crosses a line boundary.
    fn spans_lines(&self, addr: u64, length: u64) -> bool {
        let end = addr.saturating_add(length.saturating_sub(1));
        self.line_base(end) != self.line_base(addr)
    }

    fn set_of(&self, addr: u64) -> usize {
        ((addr & self.set_mask) >> self.set_shift) as usize
    }

    fn tag_of(&self, addr: u64) -> u64 {
        (addr & self.tag_mask) >> self.tag_shift
    }

    fn line_base(&self, addr: u64) -> u64 {
        addr & !self.offset_mask
    }
}
