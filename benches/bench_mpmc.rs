//! Multi-producer/multi-consumer throughput, and a dependency-chain variant
//! comparing a single gating consumer against a two-deep dependency chain.
//! Grounded on the teacher's `bench_criterion.rs` shape.
//!
//! Run: cargo bench --bench bench_mpmc

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::thread;

use varon_t::{Delivery, Queue, QueueConfig, SpinWait, ValueType};

const RING_SIZE: usize = 1024 * 64;
const PRODUCERS: u64 = 4;
const EVENTS_PER_PRODUCER: u64 = 500_000;
const TOTAL_EVENTS: u64 = PRODUCERS * EVENTS_PER_PRODUCER;

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

fn mpmc_run() -> u64 {
    let queue = Queue::new(QueueConfig::new("bench-mpmc", RING_SIZE), Counter).unwrap();
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|i| queue.new_producer(format!("p{i}"), 128, Box::new(SpinWait::new())))
        .collect();
    let mut consumer = queue.new_consumer("c", Box::new(SpinWait::new()));

    thread::scope(|scope| {
        for mut producer in producers {
            scope.spawn(move || {
                for i in 0..EVENTS_PER_PRODUCER {
                    *producer.claim().unwrap() = i;
                    producer.publish().unwrap();
                }
                producer.eof().unwrap();
            });
        }

        let mut total = 0u64;
        loop {
            match consumer.next().unwrap() {
                Delivery::Value(v) => total = total.wrapping_add(black_box(*v)),
                Delivery::Flush => {}
                Delivery::Eof => break,
            }
        }
        total
    })
}

fn dependency_chain_run() -> u64 {
    let queue = Queue::new(QueueConfig::new("bench-chain", RING_SIZE), Counter).unwrap();
    let mut producer = queue.new_producer("p", 128, Box::new(SpinWait::new()));
    let mut c1 = queue.new_consumer("c1", Box::new(SpinWait::new()));
    let mut c2 = queue.new_consumer("c2", Box::new(SpinWait::new()));
    c2.add_dependency(&c1).unwrap();

    thread::scope(|scope| {
        scope.spawn(move || {
            for i in 0..TOTAL_EVENTS {
                *producer.claim().unwrap() = i;
                producer.publish().unwrap();
            }
            producer.eof().unwrap();
        });

        scope.spawn(move || loop {
            match c1.next().unwrap() {
                Delivery::Value(v) => {
                    black_box(*v);
                }
                Delivery::Flush => {}
                Delivery::Eof => break,
            }
        });

        let mut total = 0u64;
        loop {
            match c2.next().unwrap() {
                Delivery::Value(v) => total = total.wrapping_add(black_box(*v)),
                Delivery::Flush => {}
                Delivery::Eof => break,
            }
        }
        total
    })
}

fn benchmark_mpmc_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("MPMC claim/publish/next");
    group.throughput(Throughput::Elements(TOTAL_EVENTS));
    group.sample_size(20);

    group.bench_function(BenchmarkId::new("varon-t", "mpmc-4p1c"), |b| b.iter(mpmc_run));

    group.finish();
}

fn benchmark_dependency_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("Dependency chain (c2 depends on c1)");
    group.throughput(Throughput::Elements(TOTAL_EVENTS));
    group.sample_size(20);

    group.bench_function(BenchmarkId::new("varon-t", "chain-1p2c"), |b| {
        b.iter(dependency_chain_run)
    });

    group.finish();
}

criterion_group!(benches, benchmark_mpmc_throughput, benchmark_dependency_chain);
criterion_main!(benches);
