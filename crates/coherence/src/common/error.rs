//! Fatal error definitions for the simulation core.
//!
//! Misses, partial hits, evictions, writebacks, and RSC flushes are normal
//! operation and are counted, never raised. The variants here are the
//! conditions that terminate a run: construction-time geometry violations
//! and protocol states that can only be reached through a bug. None of them
//! is expected to be caught and recovered from by a driver; statistics
//! collected before a fatal error may be invalid.

use crate::common::data::CoherenceState;
use crate::sim::trace::TraceError;
use thiserror::Error;

/// Fatal simulation error.
#[derive(Debug, Error)]
pub enum SimError {
    /// Construction-time parameter violation: non-power-of-two line size,
    /// zero sizes, or a cache size not divisible into `sets x ways` lines.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which constraint the supplied parameters violate.
        reason: String,
    },

    /// A directory or cache observed a state no legal run can produce,
    /// e.g. a modified entry with more than one sharer.
    #[error("coherence protocol invariant violated at {addr:#x}: {detail}")]
    ProtocolInvariantViolation {
        /// Line address the violation was observed at.
        addr: u64,
        /// Which invariant failed.
        detail: String,
    },

    /// A directory downgraded a line the target cache no longer holds.
    /// The directory's sharer list and the cache's resident set have
    /// diverged, which is a protocol bug.
    #[error("downgrade to {new_state:?} for line {addr:#x} that is not resident")]
    DowngradeOnMissingLine {
        /// Line address of the failed downgrade.
        addr: u64,
        /// State the directory tried to impose.
        new_state: CoherenceState,
    },

    /// A trace record could not be read or parsed during replay.
    #[error(transparent)]
    Trace(#[from] TraceError),
}

impl SimError {
    /// Builds an `InvalidConfig` from anything displayable.
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Builds a `ProtocolInvariantViolation` for `addr`.
    pub(crate) fn protocol(addr: u64, detail: impl Into<String>) -> Self {
        Self::ProtocolInvariantViolation {
            addr,
            detail: detail.into(),
        }
    }
}
