//! Contention suite for the pool: permit conservation, the warm minimum
//! under rejection, close-while-waiting, and permit recovery when a factory
//! panics mid-release.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use conflux_pool::{Pool, PoolError, PoolResource};

struct Conn {
    id: u32,
    uses: AtomicU32,
}

impl PoolResource for Conn {}

fn id_factory() -> impl Fn() -> Conn + Send + Sync {
    let ids = AtomicU32::new(0);
    move || Conn { id: ids.fetch_add(1, Ordering::Relaxed) + 1, uses: AtomicU32::new(0) }
}

#[test]
fn warm_minimum_survives_rejected_releases() {
    // Validator rejects every used resource, so each release discards and
    // the pool backfills toward min.
    let pool = Arc::new(
        Pool::new(1, 2, id_factory(), |conn: &Conn| conn.uses.load(Ordering::Relaxed) == 0)
            .unwrap(),
    );
    let repooled = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let repooled = Arc::clone(&repooled);
            thread::spawn(move || {
                let conn = pool.borrow().unwrap();
                conn.uses.fetch_add(1, Ordering::Relaxed);
                if pool.release(conn) {
                    repooled.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Both releases rejected their resource, so nothing was re-pooled, but
    // the warm set never drops to zero.
    assert_eq!(repooled.load(Ordering::Relaxed), 0);
    let available = pool.available_count();
    assert!((1..=2).contains(&available), "available = {available}");
}

#[test]
fn permits_are_conserved_under_churn() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 1_000;
    const MAX: usize = 4;

    let pool = Arc::new(
        Pool::new(2, MAX, id_factory(), |conn: &Conn| conn.id % 7 != 0).unwrap(),
    );
    let outstanding = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let outstanding = Arc::clone(&outstanding);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let conn = pool.borrow().unwrap();
                    let now = outstanding.fetch_add(1, Ordering::SeqCst) + 1;
                    assert!(now <= MAX, "more than max resources outstanding: {now}");
                    outstanding.fetch_sub(1, Ordering::SeqCst);
                    pool.release(conn);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Quiescent and open: the idle set respects both bounds.
    let available = pool.available_count();
    assert!(available >= pool.min_capacity());
    assert!(available <= pool.max_capacity());
}

#[test]
fn close_wakes_blocked_borrowers() {
    let pool = Arc::new(Pool::new(1, 1, id_factory(), |_: &Conn| true).unwrap());
    let held = pool.borrow().unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.borrow().map(|conn| conn.id))
    };

    // Give the waiter time to block on the permit, then close under it.
    thread::sleep(Duration::from_millis(50));
    pool.close();

    assert_eq!(waiter.join().unwrap().err(), Some(PoolError::Closed));
    assert!(!pool.release(held));
}

#[test]
fn factory_panic_during_release_does_not_leak_a_permit() {
    let panic_once = Arc::new(AtomicBool::new(false));
    let armed = Arc::clone(&panic_once);
    let ids = AtomicU32::new(0);
    let factory = move || {
        if armed.swap(false, Ordering::SeqCst) {
            panic!("factory failure");
        }
        Conn { id: ids.fetch_add(1, Ordering::Relaxed) + 1, uses: AtomicU32::new(0) }
    };

    let pool = Pool::new(1, 1, factory, |_: &Conn| false).unwrap();

    let conn = pool.borrow().unwrap();
    panic_once.store(true, Ordering::SeqCst);

    // The rejected release mints a replacement; the factory panics. The
    // panic propagates, but the permit must come back regardless.
    let result = catch_unwind(AssertUnwindSafe(|| pool.release(conn)));
    assert!(result.is_err());

    let recovered = pool
        .borrow_timeout(Duration::from_millis(200))
        .expect("permit was leaked by the panicking release");
    assert!(pool.release(recovered) || pool.available_count() >= pool.min_capacity());
}
