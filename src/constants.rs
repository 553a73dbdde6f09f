//! Tunable constants shared across the crate.

/// One cache line on essentially every mainstream x86_64/aarch64 part.
/// [`crate::atomic_cell::SequenceCell`] is padded to this size.
pub const CACHE_LINE_SIZE: usize = 64;

/// Minimum queue capacity, per §4.4: requesting less still yields this many
/// slots.
pub const MIN_CAPACITY: usize = 2;

/// Upper bound on requested capacity. Resolves the spec's open question on
/// capacity ceilings: comfortably inside the modular half-range safety
/// margin for a 64-bit signed sequence ID, and far beyond any plausible
/// in-process queue depth.
pub const MAX_CAPACITY: usize = 1 << 30;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_powers_of_two() {
        assert!(MIN_CAPACITY.is_power_of_two());
        assert!(MAX_CAPACITY.is_power_of_two());
        assert!(MIN_CAPACITY < MAX_CAPACITY);
    }
}
