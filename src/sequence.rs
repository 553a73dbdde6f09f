//! Modular sequence-ID arithmetic.
//!
//! Every cursor comparison in this crate must go through [`mod_lt`], [`mod_le`],
//! or [`mod_min`] — never a raw `<` or `>`. A cursor is a signed integer that
//! monotonically increases for the lifetime of the queue; comparisons are
//! defined modulo the full range of the type so that wraparound (reached only
//! after billions of published values) stays correct as long as the
//! outstanding distance between any two tracked cursors stays under half the
//! range. This is called out in the design notes as the sharpest correctness
//! edge in the whole protocol — get it wrong and slot-reuse safety silently
//! breaks near the wraparound boundary instead of failing loudly.

/// A monotonically increasing logical position in the stream.
pub type Sequence = i64;

/// The cursor value before the first valid ID. Its successor (`+1`) is `0`,
/// the first sequence ID ever claimed or published.
pub const INITIAL_SENTINEL: Sequence = -1;

/// `true` iff `a` precedes `b` in modular order, i.e. `b - a > 0` computed
/// with wrapping subtraction. Correct as long as the true distance between
/// `a` and `b` is less than half the range of [`Sequence`].
#[inline(always)]
pub fn mod_lt(a: Sequence, b: Sequence) -> bool {
    b.wrapping_sub(a) > 0
}

/// `true` iff `a` does not follow `b` in modular order (`a == b || mod_lt(a, b)`).
#[inline(always)]
pub fn mod_le(a: Sequence, b: Sequence) -> bool {
    a == b || mod_lt(a, b)
}

/// The modular minimum of `a` and `b`.
#[inline(always)]
pub fn mod_min(a: Sequence, b: Sequence) -> Sequence {
    if mod_le(a, b) {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_ordering_matches_raw_comparison() {
        assert!(mod_lt(0, 1));
        assert!(mod_lt(-1, 0));
        assert!(!mod_lt(5, 5));
        assert!(mod_le(5, 5));
        assert!(mod_le(5, 6));
        assert!(!mod_le(6, 5));
    }

    #[test]
    fn initial_sentinel_precedes_first_id() {
        assert!(mod_lt(INITIAL_SENTINEL, 0));
        assert_eq!(INITIAL_SENTINEL.wrapping_add(1), 0);
    }

    #[test]
    fn mod_min_picks_the_earlier_cursor() {
        assert_eq!(mod_min(3, 9), 3);
        assert_eq!(mod_min(9, 3), 3);
        assert_eq!(mod_min(7, 7), 7);
    }

    #[test]
    fn wraparound_near_type_boundary_is_still_correct() {
        let near_max = Sequence::MAX - 2;
        let wrapped = near_max.wrapping_add(5); // crosses the boundary
        assert!(mod_lt(near_max, wrapped));
        assert_eq!(mod_min(near_max, wrapped), near_max);
    }

    #[test]
    fn distances_past_2_pow_31_do_not_miscompare() {
        let base: Sequence = 1 << 31;
        let later = base + 1_000_000;
        assert!(mod_lt(base, later));
        assert!(mod_le(base, later));
        assert_eq!(mod_min(base, later), base);
    }
}
