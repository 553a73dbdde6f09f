//! Computes the average of 1..=1,000,000 using a single producer, a single
//! consumer, and FLUSH to report a running subtotal partway through.
//!
//! Run: cargo run --example average_calculator

use std::thread;
use std::time::Instant;

use varon_t::{Delivery, Queue, QueueConfig, SpinWait, ValueType};

const RING_SIZE: usize = 1024 * 64;
const MAX_NUMBER: u64 = 1_000_000;

struct Number;

impl ValueType for Number {
    type Value = u64;

    fn type_id(&self) -> &'static str {
        "u64"
    }

    fn allocate(&self) -> u64 {
        0
    }
}

fn main() {
    let queue = Queue::new(QueueConfig::new("average-calculator", RING_SIZE), Number).unwrap();
    let mut producer = queue.new_producer("p", 512, Box::new(SpinWait::new()));
    let mut consumer = queue.new_consumer("c", Box::new(SpinWait::new()));

    let start = Instant::now();

    let producer_thread = thread::spawn(move || {
        for n in 1..=MAX_NUMBER {
            *producer.claim().unwrap() = n;
            producer.publish().unwrap();
            if n == MAX_NUMBER / 2 {
                producer.flush().unwrap();
            }
        }
        producer.eof().unwrap();
    });

    let mut sum = 0u128;
    let mut count = 0u64;
    let mut halfway_sum = None;
    loop {
        match consumer.next().unwrap() {
            Delivery::Value(v) => {
                sum += *v as u128;
                count += 1;
            }
            Delivery::Flush => halfway_sum = Some(sum),
            Delivery::Eof => break,
        }
    }

    producer_thread.join().unwrap();
    let elapsed = start.elapsed();

    let expected_sum = (MAX_NUMBER as u128 * (MAX_NUMBER as u128 + 1)) / 2;
    assert_eq!(count, MAX_NUMBER);
    assert_eq!(sum, expected_sum);

    println!("numbers processed:  {count}");
    println!("sum:                {sum} (expected {expected_sum})");
    println!("average:            {:.1}", sum as f64 / count as f64);
    if let Some(halfway) = halfway_sum {
        println!("subtotal at flush:  {halfway}");
    }
    println!("elapsed:            {:.3}s", elapsed.as_secs_f64());
}
