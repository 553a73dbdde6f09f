//! The cache-line-padded atomic cell — the only synchronization primitive
//! the core uses. No mutex, condvar, or semaphore appears anywhere below
//! this module.

use std::sync::atomic::{AtomicI64, Ordering};

use static_assertions::const_assert_eq;

use crate::constants::CACHE_LINE_SIZE;
use crate::sequence::Sequence;

/// An atomic sequence cursor padded to a full cache line, so that two
/// cursors read/written by different threads never false-share a line.
///
/// Grounded on the teacher's `PaddedProducerSequence`/`PaddedConsumerSequence`
/// (`#[repr(align(128))]` wrapping an `AtomicU64` plus explicit padding
/// bytes); narrowed to 64 bytes here to match this crate's own
/// [`CACHE_LINE_SIZE`].
#[repr(align(64))]
pub struct SequenceCell {
    value: AtomicI64,
    _padding: [u8; CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>()],
}

const_assert_eq!(std::mem::size_of::<SequenceCell>(), CACHE_LINE_SIZE);

impl SequenceCell {
    pub fn new(initial: Sequence) -> Self {
        Self {
            value: AtomicI64::new(initial),
            _padding: [0u8; CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>()],
        }
    }

    #[inline(always)]
    pub fn load_acquire(&self) -> Sequence {
        self.value.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn store_release(&self, new: Sequence) {
        self.value.store(new, Ordering::Release);
    }

    /// Acquire-on-success, relaxed-on-failure compare-and-set. Returns
    /// whether the swap happened.
    #[inline(always)]
    pub fn compare_and_set(&self, current: Sequence, new: Sequence) -> bool {
        self.value
            .compare_exchange(current, new, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl std::fmt::Debug for SequenceCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceCell")
            .field("value", &self.load_acquire())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_exactly_one_cache_line() {
        assert_eq!(std::mem::size_of::<SequenceCell>(), CACHE_LINE_SIZE);
        assert_eq!(std::mem::align_of::<SequenceCell>(), CACHE_LINE_SIZE);
    }

    #[test]
    fn load_store_round_trips() {
        let cell = SequenceCell::new(41);
        assert_eq!(cell.load_acquire(), 41);
        cell.store_release(42);
        assert_eq!(cell.load_acquire(), 42);
    }

    #[test]
    fn compare_and_set_only_succeeds_on_match() {
        let cell = SequenceCell::new(10);
        assert!(!cell.compare_and_set(9, 11));
        assert_eq!(cell.load_acquire(), 10);
        assert!(cell.compare_and_set(10, 11));
        assert_eq!(cell.load_acquire(), 11);
    }
}
