//! The value-type capability and the in-band sentinel tokens carried
//! alongside every slot.

use std::mem::ManuallyDrop;

use crate::sequence::{Sequence, INITIAL_SENTINEL};

/// In-band control tokens a producer may stamp on a published slot.
///
/// `Hole` marks a value the consumer should silently skip. `Flush` is a
/// checkpoint barrier delivered to every consumer exactly once, in order.
/// `Eof` marks the end of one producer's stream; a consumer only treats the
/// whole queue as finished once it has seen as many `Eof`s as there are
/// attached producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    None,
    Hole,
    Flush,
    Eof,
}

/// A capability pair — `allocate`/`free` — plus a type identifier, used only
/// at queue construction and teardown. Never called on the claim/publish/next
/// hot path.
pub trait ValueType: Send + Sync {
    /// The value object stored in every slot.
    type Value: Send;

    /// A short identifier used only for diagnostics (construction/teardown
    /// tracing spans); it plays no role in the coordination protocol.
    fn type_id(&self) -> &'static str;

    /// Produces the initial value for one slot.
    fn allocate(&self) -> Self::Value;

    /// Releases a value at queue teardown. The default just lets Rust's own
    /// `Drop` run; override when a value type owns something `Drop` can't
    /// see on its own (e.g. a handle into an external allocator).
    fn free(&self, _value: Self::Value) {}
}

/// One entry in the ring: the reused value object, its current sequence ID,
/// and the special-token field.
///
/// The `value` field is wrapped in [`ManuallyDrop`] so that [`crate::queue::Queue`]'s
/// `Drop` impl can move it out and hand it to [`ValueType::free`] exactly
/// once at teardown, per §4.2's "allocate/free, called only at construction
/// and teardown" contract, rather than relying on an implicit field drop that
/// would bypass `free` entirely.
pub(crate) struct Slot<V> {
    pub value: ManuallyDrop<V>,
    pub sequence: Sequence,
    pub special: Special,
}

impl<V> Slot<V> {
    pub fn new(value: V) -> Self {
        Slot {
            value: ManuallyDrop::new(value),
            sequence: INITIAL_SENTINEL,
            special: Special::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter;

    impl ValueType for Counter {
        type Value = u64;

        fn type_id(&self) -> &'static str {
            "u64-counter"
        }

        fn allocate(&self) -> u64 {
            0
        }
    }

    #[test]
    fn fresh_slot_starts_at_initial_sentinel_and_none() {
        let slot = Slot::new(0u64);
        assert_eq!(slot.sequence, INITIAL_SENTINEL);
        assert_eq!(slot.special, Special::None);
    }

    #[test]
    fn value_type_allocates_expected_default() {
        let vt = Counter;
        assert_eq!(vt.allocate(), 0);
        assert_eq!(vt.type_id(), "u64-counter");
    }
}
