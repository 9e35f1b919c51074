//! Per-actor state: the bounded mailbox, the handler, and the scheduled
//! flag that serves as the single-holder execution token.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::queue::ArrayQueue;
use tracing::error;

/// Type-erased view of an actor, drained by the worker pool.
pub(crate) trait Drainable: Send + Sync {
    fn actor_id(&self) -> &str;

    /// Dequeues and handles one message. Returns false when the mailbox was
    /// empty. A panicking handler is caught and logged; the message counts
    /// as consumed either way.
    fn process_next(&self) -> bool;

    fn mailbox_is_empty(&self) -> bool;

    /// scheduled -> idle. Unconditional.
    fn clear_scheduled(&self);

    /// idle -> scheduled. Returns whether this caller won the token.
    fn try_schedule(&self) -> bool;
}

pub(crate) struct ActorContext<T> {
    id: String,
    mailbox: ArrayQueue<T>,
    handler: Box<dyn Fn(T) + Send + Sync>,
    scheduled: AtomicBool,
}

impl<T: Send + 'static> ActorContext<T> {
    pub(crate) fn new<F>(id: String, mailbox_capacity: usize, handler: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            id,
            mailbox: ArrayQueue::new(mailbox_capacity),
            handler: Box::new(handler),
            scheduled: AtomicBool::new(false),
        }
    }

    /// Offers a message without blocking. False when the mailbox is full.
    pub(crate) fn enqueue(&self, message: T) -> bool {
        self.mailbox.push(message).is_ok()
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }
}

impl<T: Send + 'static> Drainable for ActorContext<T> {
    fn actor_id(&self) -> &str {
        &self.id
    }

    fn process_next(&self) -> bool {
        let Some(message) = self.mailbox.pop() else {
            return false;
        };
        if catch_unwind(AssertUnwindSafe(|| (self.handler)(message))).is_err() {
            error!(actor = %self.id, "message handler panicked, message dropped");
        }
        true
    }

    fn mailbox_is_empty(&self) -> bool {
        self.mailbox.is_empty()
    }

    fn clear_scheduled(&self) {
        self.scheduled.store(false, Ordering::Release);
    }

    fn try_schedule(&self) -> bool {
        self.scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
