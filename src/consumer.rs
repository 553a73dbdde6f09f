//! The consumer: tracks its own progress cursor, waits for both the queue
//! and its declared upstream dependencies to advance, and processes the
//! stream in batches while transparently handling HOLE/FLUSH/EOF sentinels.
//!
//! Grounded on the Kaos sister file's `BroadcastRingBuffer` (per-consumer-
//! index cursor array, `advance_consumer`/`update_gating_sequence`) and on
//! `flux/src/disruptor/spsc/ring_consumer.rs`'s refresh-then-deliver batch
//! loop shape. The dependency list and EOF/FLUSH/HOLE handling are
//! spec-literal (§4.6); nothing in the retrieval pack models a consumer
//! dependency DAG or in-band stream-control sentinels.

use std::sync::Arc;

use crate::atomic_cell::SequenceCell;
use crate::error::{Result, VarontError};
use crate::queue::Queue;
use crate::sequence::{mod_le, mod_lt, mod_min, Sequence, INITIAL_SENTINEL};
use crate::value::{Special, ValueType};
use crate::wait_strategy::YieldStrategy;

/// What `next()` produced: a value, or one of the two stream-control
/// signals. Replaces the source boundary's `VRT_QUEUE_EOF`/`VRT_QUEUE_FLUSH`
/// return codes (§6) with a Rust-native enum.
pub enum Delivery<'a, V> {
    Value(&'a V),
    Flush,
    Eof,
}

/// A consumer handle. Borrows its queue rather than owning it — see
/// SPEC_FULL.md §3's Rust ownership mapping note.
pub struct Consumer<'q, VT: ValueType> {
    queue: &'q Queue<VT>,
    name: String,
    index: usize,
    cursor: Arc<SequenceCell>,
    last_available: Sequence,
    current: Sequence,
    eof_count: usize,
    dependencies: Vec<Arc<SequenceCell>>,
    producer_count: Option<usize>,
    yield_strategy: Box<dyn YieldStrategy>,
    started: bool,
    done: bool,
}

impl<'q, VT: ValueType> Consumer<'q, VT> {
    pub(crate) fn new(
        queue: &'q Queue<VT>,
        index: usize,
        name: String,
        cursor: Arc<SequenceCell>,
        yield_strategy: Box<dyn YieldStrategy>,
    ) -> Self {
        Consumer {
            queue,
            name,
            index,
            cursor,
            last_available: INITIAL_SENTINEL,
            current: INITIAL_SENTINEL,
            eof_count: 0,
            dependencies: Vec::new(),
            producer_count: None,
            yield_strategy,
            started: false,
            done: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn cursor(&self) -> Sequence {
        self.cursor.load_acquire()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Declares that this consumer must not deliver ID `k` until `other`
    /// has also reached `k`. Must be called before this consumer's first
    /// `next()` call.
    pub fn add_dependency(&mut self, other: &Consumer<'q, VT>) -> Result<()> {
        if self.started {
            return Err(VarontError::contract(format!(
                "consumer '{}' added a dependency after its first next()",
                self.name
            )));
        }
        debug_assert!(
            std::ptr::eq(self.queue, other.queue),
            "add_dependency called with a consumer from a different queue"
        );
        self.queue.register_dependency(self.index, other.index);
        Ok(())
    }

    fn ensure_started(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        let frozen = self.queue.freeze()?;
        self.producer_count = Some(frozen.producer_count);
        self.dependencies = self.queue.dependency_cursors(self.index);
        self.started = true;
        Ok(())
    }

    fn check_not_done(&self) -> Result<()> {
        if self.done {
            return Err(VarontError::contract(format!(
                "consumer '{}' called next() after EOF",
                self.name
            )));
        }
        Ok(())
    }

    fn refresh_available(&mut self) {
        let mut available = self.queue.get_cursor();
        for dep in &self.dependencies {
            available = mod_min(available, dep.load_acquire());
        }
        self.last_available = available;
    }

    fn publish_cursor(&self) {
        self.cursor.store_release(self.current);
    }

    /// Delivers the next value in ID order, transparently skipping HOLEs
    /// and surfacing FLUSH/EOF as [`Delivery`] variants instead of values.
    pub fn next(&mut self) -> Result<Delivery<'_, VT::Value>> {
        self.check_not_done()?;
        self.ensure_started()?;

        loop {
            if !mod_lt(self.current, self.last_available) {
                self.refresh_available();
                let mut first_wait = true;
                while !mod_le(self.current + 1, self.last_available) {
                    self.yield_strategy.on_wait(first_wait, self.queue.name(), &self.name);
                    first_wait = false;
                    self.refresh_available();
                }
            }

            self.current += 1;
            let run_end = self.current == self.last_available;
            // SAFETY: `self.current` was just proven `<= last_available`,
            // i.e. published (and, transitively, covered by every
            // dependency), and no other consumer shares this `current_id`.
            let slot = unsafe { self.queue.slot_ref(self.current) };

            match slot.special {
                Special::None => {
                    if run_end {
                        self.publish_cursor();
                    }
                    return Ok(Delivery::Value(&*slot.value));
                }
                Special::Hole => {
                    self.publish_cursor();
                }
                Special::Flush => {
                    self.publish_cursor();
                    return Ok(Delivery::Flush);
                }
                Special::Eof => {
                    self.eof_count += 1;
                    let producer_count = self.producer_count.unwrap_or(1);
                    if self.eof_count == producer_count {
                        self.publish_cursor();
                        self.done = true;
                        return Ok(Delivery::Eof);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueConfig;
    use crate::wait_strategy::SpinWait;

    struct Counter;
    impl ValueType for Counter {
        type Value = u64;
        fn type_id(&self) -> &'static str {
            "u64"
        }
        fn allocate(&self) -> u64 {
            0
        }
    }

    #[test]
    fn basic_produce_then_consume_in_order() {
        let q = Queue::new(QueueConfig::new("q", 8), Counter).unwrap();
        let mut p = q.new_producer("p", 0, Box::new(SpinWait::new()));
        let mut c = q.new_consumer("c", Box::new(SpinWait::new()));

        for i in 0..5u64 {
            *p.claim().unwrap() = i;
            p.publish().unwrap();
        }
        p.eof().unwrap();

        let mut seen = Vec::new();
        loop {
            match c.next().unwrap() {
                Delivery::Value(v) => seen.push(*v),
                Delivery::Flush => panic!("unexpected flush"),
                Delivery::Eof => break,
            }
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(c.is_done());
    }

    #[test]
    fn next_after_eof_is_a_contract_violation() {
        let q = Queue::new(QueueConfig::new("q", 4), Counter).unwrap();
        let mut p = q.new_producer("p", 0, Box::new(SpinWait::new()));
        let mut c = q.new_consumer("c", Box::new(SpinWait::new()));
        p.eof().unwrap();
        assert!(matches!(c.next().unwrap(), Delivery::Eof));
        assert!(matches!(c.next().unwrap_err(), VarontError::Contract { .. }));
    }

    #[test]
    fn holes_are_invisible_to_the_consumer() {
        let q = Queue::new(QueueConfig::new("q", 8), Counter).unwrap();
        let mut p = q.new_producer("p", 0, Box::new(SpinWait::new()));
        let mut c = q.new_consumer("c", Box::new(SpinWait::new()));

        for i in 0..6u64 {
            if i % 3 == 2 {
                *p.claim().unwrap() = 0;
                p.skip().unwrap();
            } else {
                *p.claim().unwrap() = i;
                p.publish().unwrap();
            }
        }
        p.eof().unwrap();

        let mut seen = Vec::new();
        loop {
            match c.next().unwrap() {
                Delivery::Value(v) => seen.push(*v),
                Delivery::Flush => panic!("unexpected flush"),
                Delivery::Eof => break,
            }
        }
        assert_eq!(seen, vec![0, 1, 3, 4]);
    }
}
