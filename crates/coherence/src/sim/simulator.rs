//! Simulator: owns the per-thread cache registry and the shared directory
//! set side-by-side.
//!
//! The driver contract is single-threaded cooperative: at most one access
//! or downgrade is in flight across the whole simulator at any time. The
//! `&mut self` receiver on [`Simulator::access`] is that serialisation
//! point; a multi-threaded frontend wraps the whole `Simulator` in one
//! mutex held for the duration of each top-level access, which imposes a
//! total order across threads without constraining which order.

use std::cell::RefCell;
use std::io::BufRead;
use std::rc::Rc;

use crate::cache::Cache;
use crate::common::{AccessType, SimError};
use crate::config::{CacheConfig, Config};
use crate::directory::DirectorySet;
use crate::sim::trace::TraceReader;
use crate::stats::{CacheStats, DirectoryReport};

/// Top-level simulator: per-thread caches plus one shared directory set.
///
/// Caches are created lazily the first time a thread id appears, the way an
/// instrumentation frontend allocates a cache per started thread.
#[derive(Debug)]
pub struct Simulator {
    directory_set: Rc<DirectorySet>,
    caches: Vec<Option<Rc<RefCell<Cache>>>>,
    cache_config: CacheConfig,
}

impl Simulator {
    /// Builds a simulator from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when the cache geometry or
    /// directory parameters are rejected.
    pub fn new(config: &Config) -> Result<Self, SimError> {
        config.validate()?;
        let directory_set = DirectorySet::new(config.directory.sites, config.cache.line_bytes)?;
        directory_set.set_allow_reverse_transition(config.directory.allow_reverse_transition);
        Ok(Self {
            directory_set: Rc::new(directory_set),
            caches: Vec::new(),
            cache_config: config.cache.clone(),
        })
    }

    /// Dispatches one observed reference to the cache owned by `tid`,
    /// creating that cache on first sight of the thread id.
    ///
    /// Returns `true` iff the access was a full hit on every line it
    /// touched.
    ///
    /// # Errors
    ///
    /// Propagates fatal construction and protocol errors; statistics
    /// gathered before a protocol error may be invalid.
    pub fn access(
        &mut self,
        tid: usize,
        kind: AccessType,
        addr: u64,
        len: u64,
    ) -> Result<bool, SimError> {
        let cache = self.cache_for(tid)?;
        let outcome = cache.borrow_mut().access(kind, addr, len);
        outcome
    }

    /// Replays a whole trace stream, returning the number of events
    /// delivered.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Trace`] for unreadable or malformed input and
    /// propagates fatal simulation errors.
    pub fn replay<R: BufRead>(&mut self, reader: R) -> Result<u64, SimError> {
        let mut reader = TraceReader::new(reader);
        let mut events = 0;
        while let Some(event) = reader.next_event()? {
            let _ = self.access(event.tid, event.kind, event.addr, event.len)?;
            events += 1;
        }
        Ok(events)
    }

    /// The shared directory set (e.g. for introspection in tests).
    pub fn directory_set(&self) -> &Rc<DirectorySet> {
        &self.directory_set
    }

    /// Thread ids with a cache, in ascending order.
    pub fn thread_ids(&self) -> Vec<usize> {
        self.caches
            .iter()
            .enumerate()
            .filter_map(|(tid, slot)| slot.as_ref().map(|_| tid))
            .collect()
    }

    /// Statistics snapshot for `tid`'s cache, if that thread has appeared.
    pub fn cache_stats(&self, tid: usize) -> Option<CacheStats> {
        self.caches
            .get(tid)
            .and_then(Option::as_ref)
            .map(|cache| cache.borrow().stats().clone())
    }

    /// Entry-kind breakdown across all home sites.
    pub fn directory_report(&self) -> DirectoryReport {
        self.directory_set.report()
    }

    /// Returns `tid`'s cache, creating it on first sight.
    fn cache_for(&mut self, tid: usize) -> Result<Rc<RefCell<Cache>>, SimError> {
        if tid >= self.caches.len() {
            self.caches.resize_with(tid + 1, || None);
        }
        if let Some(cache) = &self.caches[tid] {
            return Ok(Rc::clone(cache));
        }
        let cache = Cache::new(&self.cache_config, Rc::clone(&self.directory_set))?;
        self.caches[tid] = Some(Rc::clone(&cache));
        Ok(cache)
    }
}
