//! Varon-T: a shared-memory, in-process, lock-free multi-producer/
//! multi-consumer FIFO modeled after the LMAX Disruptor.
//!
//! Producers feed values into a fixed-capacity, power-of-two ring buffer;
//! consumers drain them in strict FIFO order, optionally arranged in a
//! dependency graph so a downstream consumer never overtakes the upstream
//! consumers it depends on. Coordination is entirely lock-free: the only
//! synchronization primitive in the hot path is [`atomic_cell::SequenceCell`],
//! and any actor that cannot make progress backs off through a pluggable
//! [`wait_strategy::YieldStrategy`] rather than blocking on an OS primitive.
//!
//! ```
//! use varon_t::{Queue, QueueConfig, ValueType, SpinWait, Delivery};
//!
//! struct Counters;
//! impl ValueType for Counters {
//!     type Value = u64;
//!     fn type_id(&self) -> &'static str { "u64" }
//!     fn allocate(&self) -> u64 { 0 }
//! }
//!
//! let queue = Queue::new(QueueConfig::new("demo", 8), Counters).unwrap();
//! let mut producer = queue.new_producer("p0", 0, Box::new(SpinWait::new()));
//! let mut consumer = queue.new_consumer("c0", Box::new(SpinWait::new()));
//!
//! for i in 0..3u64 {
//!     *producer.claim().unwrap() = i;
//!     producer.publish().unwrap();
//! }
//! producer.eof().unwrap();
//!
//! let mut total = 0u64;
//! loop {
//!     match consumer.next().unwrap() {
//!         Delivery::Value(v) => total += *v,
//!         Delivery::Flush => continue,
//!         Delivery::Eof => break,
//!     }
//! }
//! assert_eq!(total, 0 + 1 + 2);
//! ```

pub mod atomic_cell;
pub mod consumer;
pub mod constants;
pub mod error;
pub mod producer;
pub mod queue;
pub mod sequence;
pub mod value;
pub mod wait_strategy;

pub use consumer::{Consumer, Delivery};
pub use error::{Result, VarontError};
pub use producer::Producer;
pub use queue::{Queue, QueueConfig};
pub use sequence::{mod_le, mod_lt, mod_min, Sequence, INITIAL_SENTINEL};
pub use value::{Special, ValueType};
pub use wait_strategy::{HybridWait, SpinWait, ThreadedWait, YieldStrategy};

/// Crate version, exposed for diagnostics the same way the grounding crate
/// exposes its own.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
