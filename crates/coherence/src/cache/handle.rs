//! Non-owning cache handles used by the directory protocol.
//!
//! A directory entry records which caches hold a line, and reaches into them
//! to downgrade their copies when another cache's request demands it. Those
//! references are capabilities, not lifetimes: the driver owns every cache,
//! and a handle supports exactly two operations: identity comparison
//! ("same cache or another?") and invoking the downgrade callback.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::Cache;

/// Weak, identity-compared handle to a participating cache.
///
/// Equality is pointer identity of the referenced cache; two handles are
/// equal iff they designate the same cache instance.
#[derive(Clone)]
pub struct CacheRef {
    inner: Weak<RefCell<Cache>>,
}

impl CacheRef {
    /// Creates a handle to `cache`.
    pub fn new(cache: &Rc<RefCell<Cache>>) -> Self {
        Self {
            inner: Rc::downgrade(cache),
        }
    }

    /// Placeholder handle used only while a cache is being constructed;
    /// replaced with the real self-handle before the cache is visible.
    pub(crate) fn dangling() -> Self {
        Self { inner: Weak::new() }
    }

    /// Attempts to reach the referenced cache.
    ///
    /// Returns `None` once the owning driver has dropped the cache, which
    /// only happens at teardown when no further requests are issued.
    pub(crate) fn upgrade(&self) -> Option<Rc<RefCell<Cache>>> {
        self.inner.upgrade()
    }
}

impl PartialEq for CacheRef {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for CacheRef {}

impl fmt::Debug for CacheRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheRef({:p})", self.inner.as_ptr())
    }
}
