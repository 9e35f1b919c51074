//! The bounded pool implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam::queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::error::PoolError;

/// A resource whose lifecycle ends when the pool discards it for good.
///
/// `close` runs once for each resource drained by [`Pool::close`], and for
/// resources handed back after the pool has closed. Dropping a rejected
/// resource does not call it; plain [`Drop`] applies there.
pub trait PoolResource {
    /// Releases anything held by the resource.
    fn close(&mut self) {}
}

/// Counting semaphore bounding outstanding borrows at `max`.
struct Permits {
    available: Mutex<usize>,
    returned: Condvar,
}

impl Permits {
    fn release_one(&self) {
        let mut available = self.available.lock();
        *available += 1;
        self.returned.notify_one();
    }
}

/// Restores one permit when dropped while armed.
///
/// `release` keeps the guard armed for its whole body, so the permit comes
/// back after the idle queue has been updated on every exit path, including
/// a panicking factory. `borrow` disarms the guard once a resource is
/// actually handed out.
struct PermitGuard<'a> {
    permits: &'a Permits,
    armed: bool,
}

impl<'a> PermitGuard<'a> {
    fn new(permits: &'a Permits) -> Self {
        Self { permits, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.permits.release_one();
        }
    }
}

/// A thread-safe object pool bounded at `max` outstanding resources.
///
/// Construction pre-creates `min` resources. `borrow` blocks while all `max`
/// permits are out; `release` validates the resource and either re-pools it
/// or discards it, minting a replacement whenever the idle set would fall
/// under `min`. Closing is terminal: idle resources are drained and closed,
/// and blocked borrowers fail with [`PoolError::Closed`].
pub struct Pool<T: PoolResource> {
    idle: ArrayQueue<T>,
    permits: Permits,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    validator: Box<dyn Fn(&T) -> bool + Send + Sync>,
    min: usize,
    max: usize,
    closed: AtomicBool,
}

impl<T: PoolResource> Pool<T> {
    /// Creates a pool holding between `min` and `max` resources.
    ///
    /// # Errors
    /// Returns [`PoolError::InvalidCapacity`] when `min > max` or `max` is
    /// zero.
    pub fn new<F, V>(min: usize, max: usize, factory: F, validator: V) -> Result<Self, PoolError>
    where
        F: Fn() -> T + Send + Sync + 'static,
        V: Fn(&T) -> bool + Send + Sync + 'static,
    {
        if max == 0 || min > max {
            return Err(PoolError::InvalidCapacity { min, max });
        }

        let idle = ArrayQueue::new(max);
        for _ in 0..min {
            // Queue capacity is `max >= min`; these pushes cannot fail.
            let _ = idle.push(factory());
        }
        debug!(min, max, "pool created");

        Ok(Self {
            idle,
            permits: Permits { available: Mutex::new(max), returned: Condvar::new() },
            factory: Box::new(factory),
            validator: Box::new(validator),
            min,
            max,
            closed: AtomicBool::new(false),
        })
    }

    /// Borrows a resource, blocking until one of the `max` permits frees up.
    ///
    /// When a permit is granted but the idle queue is empty, a fresh resource
    /// is minted from the factory.
    ///
    /// # Errors
    /// Returns [`PoolError::Closed`] if the pool is closed before or while
    /// waiting.
    pub fn borrow(&self) -> Result<T, PoolError> {
        self.acquire(None)
    }

    /// Like [`Pool::borrow`] but gives up after `timeout`.
    ///
    /// # Errors
    /// Returns [`PoolError::Timeout`] when no permit frees up in time, or
    /// [`PoolError::Closed`] if the pool closes while waiting.
    pub fn borrow_timeout(&self, timeout: Duration) -> Result<T, PoolError> {
        self.acquire(Some(Instant::now() + timeout))
    }

    fn acquire(&self, deadline: Option<Instant>) -> Result<T, PoolError> {
        {
            let mut available = self.permits.available.lock();
            loop {
                if self.closed.load(Ordering::Acquire) {
                    return Err(PoolError::Closed);
                }
                if *available > 0 {
                    *available -= 1;
                    break;
                }
                match deadline {
                    Some(deadline) => {
                        if self.permits.returned.wait_until(&mut available, deadline).timed_out() {
                            return Err(PoolError::Timeout);
                        }
                    },
                    None => self.permits.returned.wait(&mut available),
                }
            }
        }

        let permit = PermitGuard::new(&self.permits);
        let resource = match self.idle.pop() {
            Some(resource) => resource,
            None => {
                debug!("idle queue empty, minting fresh resource");
                (self.factory)()
            },
        };
        permit.disarm();
        Ok(resource)
    }

    /// Hands a resource back to the pool.
    ///
    /// The validator decides its fate: valid resources rejoin the idle queue;
    /// rejected ones are discarded and, when the idle set has fallen under
    /// `min`, replaced through the factory before the permit is released.
    /// Returns whether the original resource was re-pooled.
    pub fn release(&self, mut resource: T) -> bool {
        let _permit = PermitGuard::new(&self.permits);

        if self.closed.load(Ordering::Acquire) {
            resource.close();
            return false;
        }

        if (self.validator)(&resource) {
            if self.idle.push(resource).is_err() {
                // Only reachable through a double release; the queue already
                // holds `max` resources.
                warn!("idle queue full on release, discarding resource");
                return false;
            }
            true
        } else {
            debug!("validator rejected resource, discarding");
            drop(resource);
            if self.idle.len() < self.min {
                let _ = self.idle.push((self.factory)());
            }
            false
        }
    }

    /// Number of idle resources ready to be borrowed.
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.idle.len()
    }

    /// The warm minimum this pool maintains.
    #[must_use]
    pub fn min_capacity(&self) -> usize {
        self.min
    }

    /// The maximum number of outstanding resources.
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.max
    }

    /// Whether [`Pool::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the pool: blocked borrowers fail, idle resources are drained
    /// and closed. Outstanding borrows are not waited for; releasing them
    /// later closes them too. Idempotent, and terminal — a closed pool cannot
    /// reopen.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("closing pool");

        // Fence against borrowers between their closed-check and their wait,
        // then wake everyone so they observe the flag.
        drop(self.permits.available.lock());
        self.permits.returned.notify_all();

        let mut drained = 0usize;
        while let Some(mut resource) = self.idle.pop() {
            resource.close();
            drained += 1;
        }
        debug!(drained, "idle resources closed");
    }
}

impl<T: PoolResource> Drop for Pool<T> {
    fn drop(&mut self) {
        self.close();
    }
}
