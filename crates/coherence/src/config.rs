//! Configuration system for the coherence simulator.
//!
//! This module defines all configuration structures used to parameterize a
//! run. It provides:
//! 1. **Defaults:** Baseline geometry for the reference measurement setup
//!    (256 KiB 8-way caches with 64-byte lines, two home sites).
//! 2. **Structures:** Hierarchical config for the per-thread caches and the
//!    directory set.
//! 3. **Validation:** Geometry checks that refuse to construct an
//!    undecodable cache.
//!
//! Configuration is supplied as JSON (CLI `--config`) or via `Config::default()`.

use serde::Deserialize;

use crate::common::SimError;
use crate::common::bits;

/// Default configuration constants.
mod defaults {
    use crate::common::constants::KILO;

    /// Default per-thread cache capacity in bytes (256 KiB).
    pub const CACHE_SIZE: usize = 256 * KILO;

    /// Default coherence-line size in bytes.
    ///
    /// Matches typical modern processor line sizes; all caches in a run
    /// share one line size.
    pub const CACHE_LINE: usize = 64;

    /// Default cache associativity (ways per set).
    pub const CACHE_WAYS: usize = 8;

    /// Default number of home-site directories.
    pub const DIRECTORY_SITES: usize = 2;
}

/// Root configuration structure for a simulation run.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use rscsim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.cache.line_bytes, 64);
/// assert_eq!(config.directory.sites, 2);
/// ```
///
/// Deserializing from JSON (typical CLI usage):
///
/// ```
/// use rscsim_core::config::Config;
///
/// let json = r#"{
///     "cache": { "size_bytes": 512, "line_bytes": 64, "ways": 2 },
///     "directory": { "sites": 1, "allow_reverse_transition": true }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.cache.size_bytes, 512);
/// assert!(config.directory.allow_reverse_transition);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Per-thread cache geometry.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Directory-set parameters.
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl Config {
    /// Validates the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when any geometry constraint is
    /// violated; see [`CacheConfig::validate`] and
    /// [`DirectoryConfig::validate`].
    pub fn validate(&self) -> Result<(), SimError> {
        self.cache.validate()?;
        self.directory.validate()
    }
}

/// Geometry of one per-thread cache.
///
/// All caches participating in a run are constructed from the same config
/// and therefore share one line size, which the directory set's line-address
/// quantisation depends on.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Total capacity in bytes.
    #[serde(default = "CacheConfig::default_size_bytes")]
    pub size_bytes: usize,

    /// Coherence-line size in bytes; must be a power of two.
    #[serde(default = "CacheConfig::default_line_bytes")]
    pub line_bytes: usize,

    /// Associativity (ways per set); must be at least 1.
    #[serde(default = "CacheConfig::default_ways")]
    pub ways: usize,
}

impl CacheConfig {
    /// Returns the default cache capacity.
    fn default_size_bytes() -> usize {
        defaults::CACHE_SIZE
    }

    /// Returns the default line size.
    fn default_line_bytes() -> usize {
        defaults::CACHE_LINE
    }

    /// Returns the default associativity.
    fn default_ways() -> usize {
        defaults::CACHE_WAYS
    }

    /// Number of sets implied by this geometry.
    ///
    /// Only meaningful after [`CacheConfig::validate`] has accepted the
    /// configuration.
    pub fn sets(&self) -> usize {
        self.size_bytes / (self.line_bytes * self.ways)
    }

    /// Validates the cache geometry.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when:
    /// - `size_bytes`, `line_bytes`, or `ways` is zero,
    /// - `line_bytes` is not a power of two,
    /// - `size_bytes` is not an integer multiple of `line_bytes * ways`,
    /// - the implied set count is not a power of two (set and tag masks
    ///   cannot be formed otherwise).
    pub fn validate(&self) -> Result<(), SimError> {
        if self.size_bytes == 0 {
            return Err(SimError::config("cache size must be non-zero"));
        }
        if self.line_bytes == 0 || !bits::is_power_of_two(self.line_bytes as u64) {
            return Err(SimError::config(format!(
                "line size must be a non-zero power of two, got {}",
                self.line_bytes
            )));
        }
        if self.ways == 0 {
            return Err(SimError::config("associativity must be at least 1"));
        }
        if self.size_bytes % (self.line_bytes * self.ways) != 0 {
            return Err(SimError::config(format!(
                "cache size {} is not divisible by line size {} x ways {}",
                self.size_bytes, self.line_bytes, self.ways
            )));
        }
        let sets = self.sets();
        if !bits::is_power_of_two(sets as u64) {
            return Err(SimError::config(format!(
                "geometry implies {sets} sets, which is not a power of two"
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size_bytes: defaults::CACHE_SIZE,
            line_bytes: defaults::CACHE_LINE,
            ways: defaults::CACHE_WAYS,
        }
    }
}

/// Parameters of the directory set.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Number of home-site directories addresses are distributed over.
    #[serde(default = "DirectoryConfig::default_sites")]
    pub sites: usize,

    /// When true, an entry whose sharer list empties through writebacks
    /// forgets its ownership history and can become safe again.
    #[serde(default)]
    pub allow_reverse_transition: bool,
}

impl DirectoryConfig {
    /// Returns the default site count.
    fn default_sites() -> usize {
        defaults::DIRECTORY_SITES
    }

    /// Validates the directory parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when `sites` is zero; homing
    /// reduces page numbers modulo the site count.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.sites == 0 {
            return Err(SimError::config("directory needs at least one site"));
        }
        Ok(())
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            sites: defaults::DIRECTORY_SITES,
            allow_reverse_transition: false,
        }
    }
}
