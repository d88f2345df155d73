//! Simulation: the top-level `Simulator` and the trace format it replays.
//!
//! The instrumentation frontend that intercepts a program's memory
//! references is an external collaborator; what reaches this crate is its
//! observable output, a serialised stream of `(thread, Load|Store, addr,
//! len)` events. `trace` defines the on-disk form of that stream and
//! `simulator` owns the per-thread cache registry and shared directory set
//! that consume it.

/// Top-level simulator: cache registry + shared directory set.
pub mod simulator;
/// Memory-trace format, reader, and errors.
pub mod trace;

pub use simulator::Simulator;
pub use trace::{TraceError, TraceEvent, TraceReader};
