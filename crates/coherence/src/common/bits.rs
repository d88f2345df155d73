//! Power-of-two and integer-logarithm helpers.
//!
//! Address decoding derives shifts and masks from the cache geometry; these
//! helpers centralise the two bit-level questions that geometry validation
//! and mask construction ask.

/// Returns `true` if `n` is a non-zero power of two.
#[inline]
pub fn is_power_of_two(n: u64) -> bool {
    n.is_power_of_two()
}

/// Returns `floor(log2(n))`, or `None` when `n == 0`.
///
/// Geometry code calls this after validation, where the zero case has
/// already been rejected; the `Option` keeps the helper total.
#[inline]
pub fn floor_log2(n: u64) -> Option<u32> {
    if n == 0 { None } else { Some(n.ilog2()) }
}
