//! Scheduler guarantees under contention: handler exclusion, per-producer
//! FIFO, mailbox backpressure, and panic isolation.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use conflux_actor::ActorSystem;
use parking_lot::Mutex;

fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    predicate()
}

#[test]
fn two_producers_both_land() {
    let system = ActorSystem::new(4).unwrap();
    let total = Arc::new(AtomicU64::new(0));
    let sink = Arc::clone(&total);
    let sum = system
        .register("sum", 16, move |n: u64| {
            sink.fetch_add(n, Ordering::SeqCst);
        })
        .unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let sum = sum.clone();
            thread::spawn(move || assert!(sum.send(1)))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || total.load(Ordering::SeqCst) == 2));
    system.shutdown();
    assert_eq!(total.load(Ordering::SeqCst), 2);
}

#[test]
fn handler_executions_never_overlap() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 500;

    let system = ActorSystem::new(4).unwrap();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let processed = Arc::new(AtomicUsize::new(0));

    let actor = {
        let in_flight = Arc::clone(&in_flight);
        let overlaps = Arc::clone(&overlaps);
        let processed = Arc::clone(&processed);
        system
            .register("exclusive", 1024, move |_: u32| {
                if in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                // Widen the window so a second worker would be caught.
                std::hint::black_box(());
                thread::sleep(Duration::from_micros(20));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                processed.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
    };

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let actor = actor.clone();
            thread::spawn(move || {
                for _ in 0..PER_PRODUCER {
                    // Retry on a full mailbox; backpressure is the caller's
                    // problem by contract.
                    while !actor.send(0) {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(wait_until(Duration::from_secs(30), || {
        processed.load(Ordering::SeqCst) == PRODUCERS * PER_PRODUCER
    }));
    assert_eq!(overlaps.load(Ordering::SeqCst), 0, "handler ran concurrently");
    system.shutdown();
}

#[test]
fn single_producer_order_is_preserved() {
    const TOTAL: u32 = 5_000;

    let system = ActorSystem::new(4).unwrap();
    let seen = Arc::new(Mutex::new(Vec::with_capacity(TOTAL as usize)));
    let sink = Arc::clone(&seen);
    let actor = system
        .register("ordered", 64, move |n: u32| {
            sink.lock().push(n);
        })
        .unwrap();

    for n in 0..TOTAL {
        while !actor.send(n) {
            thread::yield_now();
        }
    }

    assert!(wait_until(Duration::from_secs(10), || seen.lock().len() == TOTAL as usize));
    let seen = seen.lock();
    for (expected, actual) in seen.iter().enumerate() {
        assert_eq!(*actual, expected as u32);
    }
    system.shutdown();
}

#[test]
fn independent_actors_progress_in_parallel() {
    let system = ActorSystem::new(2).unwrap();
    let counts: Vec<_> = (0..4).map(|_| Arc::new(AtomicUsize::new(0))).collect();

    let actors: Vec<_> = counts
        .iter()
        .enumerate()
        .map(|(i, count)| {
            let count = Arc::clone(count);
            system
                .register(format!("actor-{i}"), 128, move |_: u32| {
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap()
        })
        .collect();

    for _ in 0..100 {
        for actor in &actors {
            while !actor.send(0) {
                thread::yield_now();
            }
        }
    }

    assert!(wait_until(Duration::from_secs(10), || {
        counts.iter().all(|count| count.load(Ordering::SeqCst) == 100)
    }));
    system.shutdown();
}

#[test]
fn full_mailbox_rejects_without_blocking() {
    let system = ActorSystem::new(1).unwrap();
    let gate = Arc::new(AtomicBool::new(false));
    let started = Arc::new(AtomicBool::new(false));
    let processed = Arc::new(AtomicUsize::new(0));

    let actor = {
        let gate = Arc::clone(&gate);
        let started = Arc::clone(&started);
        let processed = Arc::clone(&processed);
        system
            .register("slow", 1, move |_: u32| {
                started.store(true, Ordering::SeqCst);
                while !gate.load(Ordering::SeqCst) {
                    thread::yield_now();
                }
                processed.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
    };

    // First message is picked up and parks in the handler.
    assert!(actor.send(1));
    assert!(wait_until(Duration::from_secs(5), || started.load(Ordering::SeqCst)));

    // Second fills the single-slot mailbox; third must be refused.
    assert!(actor.send(2));
    assert!(!actor.send(3));

    gate.store(true, Ordering::SeqCst);
    assert!(wait_until(Duration::from_secs(5), || processed.load(Ordering::SeqCst) == 2));
    system.shutdown();
}

#[test]
fn handler_panic_does_not_tear_down_the_actor() {
    let system = ActorSystem::new(2).unwrap();
    let processed = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&processed);
    let actor = system
        .register("flaky", 64, move |n: u32| {
            assert!(n != 13, "unlucky message");
            sink.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    for n in 0..20 {
        while !actor.send(n) {
            thread::yield_now();
        }
    }

    // 19 messages survive; number 13 is consumed by the panic.
    assert!(wait_until(Duration::from_secs(10), || processed.load(Ordering::SeqCst) == 19));
    system.shutdown();
    assert_eq!(processed.load(Ordering::SeqCst), 19);
}

#[test]
fn shutdown_lets_the_in_flight_handler_finish() {
    let system = Arc::new(ActorSystem::new(1).unwrap());
    let gate = Arc::new(AtomicBool::new(false));
    let started = Arc::new(AtomicBool::new(false));
    let processed = Arc::new(AtomicUsize::new(0));

    let actor = {
        let gate = Arc::clone(&gate);
        let started = Arc::clone(&started);
        let processed = Arc::clone(&processed);
        system
            .register("draining", 8, move |_: u32| {
                started.store(true, Ordering::SeqCst);
                while !gate.load(Ordering::SeqCst) {
                    thread::yield_now();
                }
                processed.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
    };

    assert!(actor.send(1));
    assert!(actor.send(2));
    assert!(wait_until(Duration::from_secs(5), || started.load(Ordering::SeqCst)));

    let shutdown = {
        let system = Arc::clone(&system);
        thread::spawn(move || system.shutdown())
    };

    // Shutdown is waiting on the parked handler; release it.
    thread::sleep(Duration::from_millis(20));
    gate.store(true, Ordering::SeqCst);
    shutdown.join().unwrap();

    // The in-flight message completed; the queued one was abandoned.
    assert_eq!(processed.load(Ordering::SeqCst), 1);
    assert!(!system.is_running());
}
