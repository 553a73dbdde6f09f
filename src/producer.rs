//! The producer: claims batches of slot IDs, hands them out one at a time
//! for mutation, then publishes them in order.
//!
//! Single-producer fast path grounded on `flux/src/disruptor/spsc/producer.rs`
//! (`try_claim_relaxed`/`publish_relaxed`: a private non-atomic cursor, a
//! lazily-refreshed gating check, one release store per publish).
//! Multi-producer claim grounded on `ring_buffer_core.rs`'s `MpscClaim`
//! CAS loop and the Kaos sister file's `try_claim_slots`. Multi-producer
//! publish (wait for the immediate predecessor, then release-store) is
//! spec-literal (§4.5) rather than the bitmap-based out-of-order release
//! some pack examples use for the same problem — this queue's contract
//! only needs in-order publication, so the simpler scheme is what's built.

use std::sync::Arc;

use crate::atomic_cell::SequenceCell;
use crate::error::{Result, VarontError};
use crate::queue::{self, ClaimMode, Queue};
use crate::sequence::{mod_le, Sequence, INITIAL_SENTINEL};
use crate::value::{Special, ValueType};
use crate::wait_strategy::YieldStrategy;

/// A producer handle. Borrows its queue rather than owning it — see
/// SPEC_FULL.md §3's Rust ownership mapping note.
pub struct Producer<'q, VT: ValueType> {
    queue: &'q Queue<VT>,
    name: String,
    index: usize,
    batch_size: Sequence,
    /// Upper bound of the currently reserved batch.
    last_claimed: Sequence,
    /// The most recently claimed (but not necessarily yet published) ID.
    current: Sequence,
    /// The most recently published ID.
    last_published: Sequence,
    yield_strategy: Box<dyn YieldStrategy>,
    mode: Option<ClaimMode>,
    /// Every consumer's cursor, snapshotted once at freeze (see
    /// `Frozen::consumer_cursors`). Read lock-free on every reuse-safety
    /// check instead of locking `Queue::consumers`.
    consumer_cursors: Option<&'q [Arc<SequenceCell>]>,
    done: bool,
}

impl<'q, VT: ValueType> Producer<'q, VT> {
    pub(crate) fn new(
        queue: &'q Queue<VT>,
        index: usize,
        name: String,
        batch_size: usize,
        yield_strategy: Box<dyn YieldStrategy>,
    ) -> Self {
        Producer {
            queue,
            name,
            index,
            batch_size: (if batch_size == 0 { 1 } else { batch_size }) as Sequence,
            last_claimed: INITIAL_SENTINEL,
            current: INITIAL_SENTINEL,
            last_published: INITIAL_SENTINEL,
            yield_strategy,
            mode: None,
            consumer_cursors: None,
            done: false,
        }
    }

    fn ensure_started(&mut self) -> Result<ClaimMode> {
        if let Some(mode) = self.mode {
            return Ok(mode);
        }
        let frozen = self.queue.freeze()?;
        let mode = frozen.claim_mode;
        self.mode = Some(mode);
        self.consumer_cursors = Some(frozen.consumer_cursors.as_ref());
        Ok(mode)
    }

    fn check_not_done(&self) -> Result<()> {
        if self.done {
            return Err(VarontError::contract(format!(
                "producer '{}' called claim/eof/flush after eof()",
                self.name
            )));
        }
        Ok(())
    }

    /// Reserves the next ID in the producer's current batch, requesting a
    /// fresh one (and waiting, via the yield strategy, for slot-reuse
    /// safety) if the batch is exhausted. Returns a mutable reference to the
    /// slot's value for the caller to write into.
    pub fn claim(&mut self) -> Result<&mut VT::Value> {
        self.check_not_done()?;
        let mode = self.ensure_started()?;
        self.claim_next_id(mode)?;
        let slot = unsafe { self.queue.slot_mut(self.current) };
        slot.sequence = self.current;
        slot.special = Special::None;
        Ok(&mut *slot.value)
    }

    fn claim_next_id(&mut self, mode: ClaimMode) -> Result<()> {
        if mod_le(self.current + 1, self.last_claimed) {
            self.current += 1;
            return Ok(());
        }
        match mode {
            ClaimMode::Single => self.claim_batch_single(),
            ClaimMode::Multi => self.claim_batch_multi(),
        }
        self.current += 1;
        Ok(())
    }

    /// Single-producer batch reservation: the ceiling only this producer
    /// ever writes, so no CAS is needed — just a safety wait on consumer
    /// progress before advancing it.
    fn claim_batch_single(&mut self) {
        let target_ceiling = self.last_claimed + self.batch_size;
        self.wait_for_reuse_safety(target_ceiling);
        self.last_claimed = target_ceiling;
    }

    /// Multi-producer batch reservation: a CAS loop on the queue's shared
    /// claimed cursor, re-checking reuse safety each attempt since another
    /// producer may have advanced the ceiling in the meantime.
    fn claim_batch_multi(&mut self) {
        let mut first_wait = true;
        loop {
            let claimed_now = self.queue.claimed_cursor.load_acquire();
            let target_ceiling = claimed_now + self.batch_size;

            while !self.reuse_is_safe(target_ceiling) {
                self.yield_strategy.on_wait(first_wait, self.queue.name(), &self.name);
                first_wait = false;
            }

            if self.queue.claimed_cursor.compare_and_set(claimed_now, target_ceiling) {
                self.last_claimed = target_ceiling;
                self.current = claimed_now;
                return;
            }
            // Lost the race to another producer; retry with fresh state.
        }
    }

    fn reuse_is_safe(&self, target_ceiling: Sequence) -> bool {
        let cursors = self.consumer_cursors.expect("reuse_is_safe called before ensure_started");
        let min_consumer = queue::min_consumer_cursor(cursors);
        mod_le(target_ceiling - self.queue.capacity as Sequence, min_consumer)
    }

    fn wait_for_reuse_safety(&self, target_ceiling: Sequence) {
        let mut first_wait = true;
        while !self.reuse_is_safe(target_ceiling) {
            self.yield_strategy.on_wait(first_wait, self.queue.name(), &self.name);
            first_wait = false;
        }
    }

    /// Publishes the most recently claimed ID.
    pub fn publish(&mut self) -> Result<()> {
        self.check_not_done()?;
        let mode = self.mode.ok_or_else(|| {
            VarontError::contract(format!("producer '{}' published before claiming", self.name))
        })?;
        match mode {
            ClaimMode::Single => {
                self.queue.published_cursor.store_release(self.current);
            }
            ClaimMode::Multi => {
                let mut first_wait = true;
                while self.queue.published_cursor.load_acquire() != self.current - 1 {
                    self.yield_strategy.on_wait(first_wait, self.queue.name(), &self.name);
                    first_wait = false;
                }
                self.queue.published_cursor.store_release(self.current);
            }
        }
        self.last_published = self.current;
        Ok(())
    }

    /// Marks the currently claimed value as a [`Special::Hole`] and
    /// publishes it. Consumers treat a hole as present-but-ignored.
    pub fn skip(&mut self) -> Result<()> {
        self.check_not_done()?;
        unsafe { self.queue.slot_mut(self.current) }.special = Special::Hole;
        self.publish()
    }

    /// Claims the next ID, stamps it [`Special::Flush`], and publishes it.
    /// Unlike [`Self::eof`], this does not mark the producer done: further
    /// claims are legal.
    pub fn flush(&mut self) -> Result<()> {
        self.check_not_done()?;
        let mode = self.ensure_started()?;
        self.claim_next_id(mode)?;
        let slot = unsafe { self.queue.slot_mut(self.current) };
        slot.sequence = self.current;
        slot.special = Special::Flush;
        self.publish()
    }

    /// Claims the next ID, stamps it [`Special::Eof`], publishes it, and
    /// marks the producer done. Any further `claim`/`eof`/`flush`/`skip`
    /// call is a contract violation.
    pub fn eof(&mut self) -> Result<()> {
        self.check_not_done()?;
        let mode = self.ensure_started()?;
        self.claim_next_id(mode)?;
        let slot = unsafe { self.queue.slot_mut(self.current) };
        slot.sequence = self.current;
        slot.special = Special::Eof;
        self.publish()?;
        self.done = true;
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn index(&self) -> usize {
        self.index
    }
}
