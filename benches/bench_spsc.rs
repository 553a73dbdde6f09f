//! Single-producer/single-consumer throughput, grounded on the teacher's
//! `bench_criterion.rs` shape (one `criterion_group`, producer + consumer
//! spawned per iteration, throughput reported in elements).
//!
//! Run: cargo bench --bench bench_spsc

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::thread;

use varon_t::{Delivery, Queue, QueueConfig, SpinWait, ValueType};

const RING_SIZE: usize = 1024 * 64;
const TOTAL_EVENTS: u64 = 2_000_000;

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

fn spsc_run(events: u64) -> u64 {
    let queue = Queue::new(QueueConfig::new("bench-spsc", RING_SIZE), Counter).unwrap();
    let mut producer = queue.new_producer("p", 256, Box::new(SpinWait::new()));
    let mut consumer = queue.new_consumer("c", Box::new(SpinWait::new()));

    thread::scope(|scope| {
        scope.spawn(move || {
            for i in 0..events {
                *producer.claim().unwrap() = i;
                producer.publish().unwrap();
            }
            producer.eof().unwrap();
        });

        let mut total = 0u64;
        loop {
            match consumer.next().unwrap() {
                Delivery::Value(v) => {
                    total = total.wrapping_add(black_box(*v));
                }
                Delivery::Flush => {}
                Delivery::Eof => break,
            }
        }
        total
    })
}

fn benchmark_spsc_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("SPSC claim/publish/next");
    group.throughput(Throughput::Elements(TOTAL_EVENTS));
    group.sample_size(20);

    group.bench_function(BenchmarkId::new("varon-t", "spsc"), |b| {
        b.iter(|| spsc_run(TOTAL_EVENTS))
    });

    group.finish();
}

criterion_group!(benches, benchmark_spsc_throughput);
criterion_main!(benches);
