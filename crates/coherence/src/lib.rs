//! Multi-core cache-coherence simulator library.
//!
//! This crate models a set of private per-thread data caches kept coherent by
//! a bank of distributed home-site directories, and measures how often each
//! access touches a line that is *safe* under a Reactive Sequential
//! Consistency style policy. It provides:
//! 1. **Caches:** Set-associative storage with MESI-style line states, LRU
//!    victim selection, multi-line access spanning, and safety bookkeeping.
//! 2. **Directories:** Home sites mediating all cross-cache state
//!    transitions, issuing downgrade callbacks and tracking ownership
//!    history to decide line safety.
//! 3. **Homing:** A first-touch page map routing each address to its home
//!    site.
//! 4. **Simulation:** `Simulator` (cache registry + shared directory set),
//!    trace replay, configuration, and statistics.

/// Common types and helpers (access kinds, coherence states, bit math, errors).
pub mod common;
/// Simulator configuration (defaults and hierarchical config structures).
pub mod config;
/// Per-core set-associative cache with coherence-state and safety tracking.
pub mod cache;
/// Home-site directories and the page-mapped directory set.
pub mod directory;
/// Simulation: `Simulator`, trace format, and replay.
pub mod sim;
/// Statistics collection and report types.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Per-thread cache; construct with `Cache::new` and drive via `access`.
pub use crate::cache::Cache;
/// Bank of home-site directories shared by all caches.
pub use crate::directory::DirectorySet;
/// Top-level simulator; owns the cache registry and the directory set.
pub use crate::sim::Simulator;
/// Crate-wide fatal error type.
pub use crate::common::SimError;
