//! Pluggable back-off, invoked whenever a producer or consumer would
//! otherwise have to spin on a condition that isn't yet true.
//!
//! Grounded on the teacher's `WaitStrategy` trait and its
//! `BusySpinWaitStrategy`/`YieldingWaitStrategy` implementations
//! (`flux/src/disruptor/wait_strategy.rs`). The teacher's blocking
//! (parking_lot mutex/condvar) and timeout-wrapper variants are not carried
//! over: blocking OS primitives are an explicit non-goal of the core here,
//! and none of this spec's three built-ins needs a deadline.
//!
//! Each producer/consumer handle owns its strategy instance exclusively (it
//! is never shared across threads), so escalation state is plain
//! `Cell`-based interior mutability rather than atomics.

use std::cell::Cell;
use std::hint;
use std::thread;
use std::time::Duration;

/// Back-off policy invoked when a producer or consumer cannot make progress.
///
/// `first_call` is `true` at the start of a fresh stall (the caller's
/// condition just became false) so a strategy can reset its escalation
/// counter; it is `false` on every subsequent call within the same stall.
pub trait YieldStrategy: Send {
    fn on_wait(&self, first_call: bool, queue_name: &str, actor_name: &str);
}

/// Tight busy loop with a CPU hint. Appropriate when every producer/consumer
/// is pinned to its own hardware thread and descheduling would only add
/// latency.
#[derive(Debug, Default)]
pub struct SpinWait;

impl SpinWait {
    pub fn new() -> Self {
        SpinWait
    }
}

impl YieldStrategy for SpinWait {
    #[inline(always)]
    fn on_wait(&self, _first_call: bool, _queue_name: &str, _actor_name: &str) {
        hint::spin_loop();
    }
}

/// A brief spin, then unconditional descheduling of the current thread via
/// `thread::yield_now`. Appropriate when producers/consumers outnumber
/// hardware threads and a busy spinner would just steal time from whoever
/// the OS scheduler would rather run.
pub struct ThreadedWait {
    spin_budget: u32,
    spins: Cell<u32>,
}

impl ThreadedWait {
    pub fn new() -> Self {
        ThreadedWait { spin_budget: 64, spins: Cell::new(0) }
    }
}

impl Default for ThreadedWait {
    fn default() -> Self {
        Self::new()
    }
}

impl YieldStrategy for ThreadedWait {
    fn on_wait(&self, first_call: bool, _queue_name: &str, _actor_name: &str) {
        if first_call {
            self.spins.set(0);
        }
        let spins = self.spins.get();
        if spins < self.spin_budget {
            hint::spin_loop();
            self.spins.set(spins + 1);
        } else {
            thread::yield_now();
        }
    }
}

/// Three-phase escalation: a cooperative spin phase, then OS-thread yields,
/// then short sleeps. Grounded on the teacher's `YieldingWaitStrategy`,
/// which escalates the same way.
pub struct HybridWait {
    spin_phase: u32,
    yield_phase: u32,
    spins: Cell<u32>,
}

impl HybridWait {
    pub fn new() -> Self {
        HybridWait { spin_phase: 100, yield_phase: 1_000, spins: Cell::new(0) }
    }
}

impl Default for HybridWait {
    fn default() -> Self {
        Self::new()
    }
}

impl YieldStrategy for HybridWait {
    fn on_wait(&self, first_call: bool, queue_name: &str, actor_name: &str) {
        if first_call {
            self.spins.set(0);
        }
        let spins = self.spins.get();
        self.spins.set(spins.saturating_add(1));

        if spins < self.spin_phase {
            hint::spin_loop();
        } else if spins < self.yield_phase {
            if spins == self.spin_phase {
                tracing::trace!(queue = queue_name, actor = actor_name, "escalating to thread yield");
            }
            thread::yield_now();
        } else {
            if spins == self.yield_phase {
                tracing::trace!(queue = queue_name, actor = actor_name, "escalating to sleep");
            }
            thread::sleep(Duration::from_micros(50));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_wait_never_panics() {
        let s = SpinWait::new();
        for _ in 0..10 {
            s.on_wait(true, "q", "p");
        }
    }

    #[test]
    fn threaded_wait_resets_on_first_call() {
        let s = ThreadedWait::new();
        s.on_wait(true, "q", "p");
        assert_eq!(s.spins.get(), 1);
        s.on_wait(true, "q", "p");
        assert_eq!(s.spins.get(), 1);
    }

    #[test]
    fn hybrid_wait_escalates_through_phases() {
        let s = HybridWait::new();
        s.on_wait(true, "q", "p");
        for _ in 0..200 {
            s.on_wait(false, "q", "p");
        }
        assert!(s.spins.get() as u32 >= s.spin_phase);
    }
}
