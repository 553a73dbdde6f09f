//! The ring buffer itself: slot storage, cursors, and the producer/consumer
//! registries that back the topology freeze.
//!
//! Grounded on `flux/src/disruptor/ring_buffer_core.rs` (`RingBufferCore`'s
//! slot array plus `unsafe impl Send/Sync`) for the storage shape, and on the
//! Kaos sister file's `BroadcastRingBuffer` (`update_gating_sequence`,
//! `advance_consumer`) for "producer gates on the minimum of every consumer's
//! cursor." The consumer dependency DAG and its freeze-time cycle check are
//! new: no file in the retrieval pack models anything beyond "all consumers
//! flatly gate the producer."

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::atomic_cell::SequenceCell;
use crate::consumer::Consumer;
use crate::constants::{MAX_CAPACITY, MIN_CAPACITY};
use crate::error::{Result, VarontError};
use crate::producer::Producer;
use crate::sequence::{mod_min, Sequence, INITIAL_SENTINEL};
use crate::value::{Slot, ValueType};
use crate::wait_strategy::YieldStrategy;

/// Construction parameters for a [`Queue`]. Grouped into one struct rather
/// than loose constructor arguments, per this crate's configuration
/// convention.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: String,
    pub capacity: usize,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        QueueConfig { name: name.into(), capacity }
    }
}

/// Which claim/publish strategy every producer uses, decided once at freeze
/// based on the final producer count (§4.5, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClaimMode {
    Single,
    Multi,
}

pub(crate) struct Frozen {
    pub producer_count: usize,
    pub claim_mode: ClaimMode,
    /// Every attached consumer's cursor, snapshotted once at freeze. A fixed
    /// slice of `Arc<SequenceCell>` rather than a re-lock of `consumers` on
    /// every hot-path call — the topology is closed by the time this exists,
    /// so no consumer can register (and invalidate the snapshot) afterward.
    pub consumer_cursors: Box<[Arc<SequenceCell>]>,
}

/// One consumer's registration: its published cursor (shared with anything
/// that depends on it) and the indices of the consumers it depends on.
pub(crate) struct ConsumerRegistration {
    pub name: String,
    pub cursor: Arc<SequenceCell>,
    pub dependency_indices: Vec<usize>,
}

/// The ring buffer: `N` reused value slots, the published and claimed
/// cursors, and the registries used to compute backpressure and dependency
/// horizons.
///
/// `Producer<'q, VT>`/`Consumer<'q, VT>` borrow `&'q Queue<VT>` rather than
/// owning it through an `Arc` — see SPEC_FULL.md §3's "Rust ownership
/// mapping" note. The queue stores only what the protocol needs from each
/// attached actor (a cursor cell, a dependency list, a count), not the
/// handle structs themselves.
pub struct Queue<VT: ValueType> {
    pub(crate) name: String,
    pub(crate) value_type: VT,
    pub(crate) capacity: usize,
    pub(crate) mask: usize,
    pub(crate) slots: Box<[UnsafeCell<Slot<VT::Value>>]>,
    pub(crate) published_cursor: SequenceCell,
    pub(crate) claimed_cursor: SequenceCell,
    pub(crate) producers_registered: AtomicUsize,
    pub(crate) consumers: Mutex<Vec<ConsumerRegistration>>,
    frozen: OnceCell<std::result::Result<Frozen, FreezeError>>,
}

/// Why freeze failed, cached verbatim so every subsequent caller gets the
/// same [`VarontError`] variant rather than a generic one reconstructed from
/// a string.
enum FreezeError {
    Config(String),
    DependencyCycle,
}

// SAFETY: slots are accessed through the claim/publish/next sequence-number
// protocol, which guarantees exclusive write access (only the producer
// claiming id `k` writes `slot[k & mask]`) and exclusive read access (only
// a consumer whose current_id == k reads it). `VT::Value: Send` is enough
// for the queue to move across threads; no field relies on `!Sync` access
// patterns outside of that protocol.
unsafe impl<VT: ValueType> Send for Queue<VT> where VT: Send, VT::Value: Send {}
unsafe impl<VT: ValueType> Sync for Queue<VT> where VT: Sync, VT::Value: Send {}

fn round_up_capacity(requested: usize) -> Result<usize> {
    let requested = requested.max(MIN_CAPACITY);
    let rounded = requested.next_power_of_two();
    if rounded > MAX_CAPACITY {
        return Err(VarontError::config(format!(
            "requested capacity {requested} rounds up to {rounded}, exceeding the maximum of {MAX_CAPACITY}"
        )));
    }
    Ok(rounded)
}

impl<VT: ValueType> Queue<VT> {
    /// Rounds `config.capacity` up to the next power of two (minimum 2),
    /// preallocates every slot via `value_type`, and starts with empty
    /// producer/consumer registries. See §4.4.
    pub fn new(config: QueueConfig, value_type: VT) -> Result<Self> {
        let capacity = round_up_capacity(config.capacity)?;
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(Slot::new(value_type.allocate())))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        tracing::debug!(
            queue = %config.name,
            requested = config.capacity,
            rounded = capacity,
            value_type = value_type.type_id(),
            "queue constructed"
        );

        Ok(Queue {
            name: config.name,
            value_type,
            capacity,
            mask: capacity - 1,
            slots,
            published_cursor: SequenceCell::new(INITIAL_SENTINEL),
            claimed_cursor: SequenceCell::new(INITIAL_SENTINEL),
            producers_registered: AtomicUsize::new(0),
            consumers: Mutex::new(Vec::new()),
            frozen: OnceCell::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `N`, the (power-of-two) slot count.
    pub fn size(&self) -> usize {
        self.capacity
    }

    /// Acquire load of the published cursor.
    pub fn get_cursor(&self) -> Sequence {
        self.published_cursor.load_acquire()
    }

    /// Returns the value currently stored at `id & mask`. Like the
    /// source's `get(id)`, this bypasses the claim/publish protocol and is
    /// meant for tests/diagnostics, not the hot path: nothing stops the
    /// slot from being reused between this call returning and the caller
    /// reading it.
    pub fn get(&self, id: Sequence) -> &VT::Value {
        let idx = (id as usize) & self.mask;
        unsafe { &*(*self.slots[idx].get()).value }
    }

    /// Attaches a new producer. Must happen before any claim/next call on
    /// any actor attached to this queue (§4.7).
    pub fn new_producer(
        &self,
        name: impl Into<String>,
        batch_size: usize,
        yield_strategy: Box<dyn YieldStrategy>,
    ) -> Producer<'_, VT> {
        let index = self.producers_registered.fetch_add(1, Ordering::AcqRel);
        Producer::new(self, index, name.into(), batch_size, yield_strategy)
    }

    /// Attaches a new consumer. Must happen before any claim/next call on
    /// any actor attached to this queue (§4.7).
    pub fn new_consumer(
        &self,
        name: impl Into<String>,
        yield_strategy: Box<dyn YieldStrategy>,
    ) -> Consumer<'_, VT> {
        let name = name.into();
        let cursor = Arc::new(SequenceCell::new(INITIAL_SENTINEL));
        let index = {
            let mut consumers = self.consumers.lock().unwrap();
            consumers.push(ConsumerRegistration {
                name: name.clone(),
                cursor: cursor.clone(),
                dependency_indices: Vec::new(),
            });
            consumers.len() - 1
        };
        Consumer::new(self, index, name, cursor, yield_strategy)
    }

    /// Records that consumer `from` depends on consumer `on`, by index.
    /// Must be called before freeze (i.e. before any claim/next call).
    pub(crate) fn register_dependency(&self, from: usize, on: usize) {
        let mut consumers = self.consumers.lock().unwrap();
        consumers[from].dependency_indices.push(on);
    }

    /// Snapshots `index`'s dependency cursors, resolved by index into `Arc`
    /// clones. Called lazily by a consumer's own first `next()`.
    pub(crate) fn dependency_cursors(&self, index: usize) -> Vec<Arc<SequenceCell>> {
        let consumers = self.consumers.lock().unwrap();
        consumers[index]
            .dependency_indices
            .iter()
            .map(|&i| consumers[i].cursor.clone())
            .collect()
    }

    pub(crate) fn consumer_count(&self) -> usize {
        self.consumers.lock().unwrap().len()
    }

    /// Finalizes the topology on first use: assigns the claim strategy
    /// based on the final producer count, and checks for configuration
    /// errors (zero producers/consumers, dependency cycles). Idempotent —
    /// every subsequent call returns the same cached outcome.
    pub(crate) fn freeze(&self) -> Result<&Frozen> {
        let outcome = self.frozen.get_or_init(|| {
            let producer_count = self.producers_registered.load(Ordering::Acquire);
            let consumers = self.consumers.lock().unwrap();

            if producer_count == 0 {
                return Err(FreezeError::Config("no producers attached before first use".to_string()));
            }
            if consumers.is_empty() {
                return Err(FreezeError::Config("no consumers attached before first use".to_string()));
            }
            if has_dependency_cycle(&consumers) {
                return Err(FreezeError::DependencyCycle);
            }

            let claim_mode = if producer_count == 1 { ClaimMode::Single } else { ClaimMode::Multi };
            let consumer_cursors: Box<[Arc<SequenceCell>]> =
                consumers.iter().map(|c| c.cursor.clone()).collect();
            tracing::debug!(
                queue = %self.name,
                producers = producer_count,
                consumers = consumers.len(),
                claim_mode = ?claim_mode,
                "queue topology frozen"
            );
            Ok(Frozen { producer_count, claim_mode, consumer_cursors })
        });

        outcome.as_ref().map_err(|err| match err {
            FreezeError::Config(message) => {
                tracing::error!(queue = %self.name, %message, "freeze failed");
                VarontError::config(message.clone())
            }
            FreezeError::DependencyCycle => {
                tracing::error!(queue = %self.name, "freeze failed: dependency cycle detected");
                VarontError::DependencyCycle
            }
        })
    }

    /// # Safety
    /// Caller must hold exclusive claim rights to `id` (i.e. be the
    /// producer that just claimed it).
    pub(crate) unsafe fn slot_mut(&self, id: Sequence) -> &mut Slot<VT::Value> {
        let idx = (id as usize) & self.mask;
        &mut *self.slots[idx].get()
    }

    /// # Safety
    /// Caller must have observed (via acquire load) that `id` is published
    /// and be the consumer currently at `current_id == id`.
    pub(crate) unsafe fn slot_ref(&self, id: Sequence) -> &Slot<VT::Value> {
        let idx = (id as usize) & self.mask;
        &*self.slots[idx].get()
    }
}

/// The modular minimum cursor across a frozen snapshot of consumer cursors.
/// Used by producers to decide whether a slot is safe to reuse (invariant
/// 3). Takes the slice captured in [`Frozen::consumer_cursors`] rather than
/// `Queue::consumers` directly, so the hot path never touches the mutex.
pub(crate) fn min_consumer_cursor(cursors: &[Arc<SequenceCell>]) -> Sequence {
    // Fold starting from the first cursor rather than a sentinel "largest"
    // value: under modular arithmetic there is no value guaranteed to
    // compare as larger than every real cursor, so a fold-from-MAX would
    // miscompare once any cursor sits far enough from MAX.
    let mut cursors = cursors.iter().map(|c| c.load_acquire());
    let first = cursors.next().unwrap_or(INITIAL_SENTINEL);
    cursors.fold(first, mod_min)
}

fn has_dependency_cycle(consumers: &[ConsumerRegistration]) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    fn visit(i: usize, consumers: &[ConsumerRegistration], marks: &mut [Mark]) -> bool {
        match marks[i] {
            Mark::Done => return false,
            Mark::InProgress => return true,
            Mark::Unvisited => {}
        }
        marks[i] = Mark::InProgress;
        for &dep in &consumers[i].dependency_indices {
            if visit(dep, consumers, marks) {
                return true;
            }
        }
        marks[i] = Mark::Done;
        false
    }

    let mut marks = vec![Mark::Unvisited; consumers.len()];
    (0..consumers.len()).any(|i| visit(i, consumers, &mut marks))
}

impl<VT: ValueType> Drop for Queue<VT> {
    fn drop(&mut self) {
        for cell in self.slots.iter() {
            let slot = unsafe { &mut *cell.get() };
            let value = unsafe { std::mem::ManuallyDrop::take(&mut slot.value) };
            self.value_type.free(value);
        }
        tracing::debug!(queue = %self.name, "queue torn down");
    }
}
