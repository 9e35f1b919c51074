//! The actor system: registry, worker pool, and the drain scheduler.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ActorSystemConfig;
use crate::context::{ActorContext, Drainable};

/// Errors surfaced by [`ActorSystem`] construction.
#[derive(Error, Debug)]
pub enum ActorError {
    /// The configured worker count is zero.
    #[error("worker pool must have at least one thread")]
    NoWorkers,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

enum WorkerCommand {
    Drain(Arc<dyn Drainable>),
    Shutdown,
}

struct Shared {
    running: AtomicBool,
    commands: Sender<WorkerCommand>,
}

/// A scheduler that multiplexes per-actor mailboxes onto a fixed pool of
/// worker threads.
///
/// Each actor owns a bounded mailbox and a handler. A per-actor scheduled
/// flag guarantees at most one worker ever runs a given actor's handler at a
/// time, while any number of actors make progress in parallel across the
/// pool.
pub struct ActorSystem {
    shared: Arc<Shared>,
    actors: DashMap<String, Arc<dyn Drainable>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl ActorSystem {
    /// Creates a system with `worker_threads` draining threads.
    ///
    /// # Errors
    /// Returns [`ActorError::NoWorkers`] for a zero-sized pool and
    /// [`ActorError::Spawn`] when the OS refuses a thread.
    pub fn new(worker_threads: usize) -> Result<Self, ActorError> {
        if worker_threads == 0 {
            return Err(ActorError::NoWorkers);
        }

        let (commands, feed) = channel::unbounded();
        let shared = Arc::new(Shared { running: AtomicBool::new(true), commands });

        let mut workers = Vec::with_capacity(worker_threads);
        for index in 0..worker_threads {
            let feed = feed.clone();
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("actor-worker-{index}"))
                .spawn(move || worker_loop(&feed, &shared))?;
            workers.push(handle);
        }
        info!(worker_threads, "actor system started");

        Ok(Self { shared, actors: DashMap::new(), workers: Mutex::new(workers), worker_count: worker_threads })
    }

    /// Creates a system from a configuration.
    ///
    /// # Errors
    /// Same failure modes as [`ActorSystem::new`].
    pub fn with_config(config: &ActorSystemConfig) -> Result<Self, ActorError> {
        Self::new(config.worker_threads)
    }

    /// Registers an actor and returns its handle, or `None` when the id is
    /// already taken. Registration is atomic under concurrent callers.
    ///
    /// # Panics
    /// Panics when `mailbox_capacity` is zero.
    pub fn register<T, F>(
        &self,
        id: impl Into<String>,
        mailbox_capacity: usize,
        handler: F,
    ) -> Option<ActorRef<T>>
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        assert!(mailbox_capacity > 0, "mailbox capacity must be positive");
        let id = id.into();
        let context = Arc::new(ActorContext::new(id.clone(), mailbox_capacity, handler));

        match self.actors.entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&context) as Arc<dyn Drainable>);
                debug!(actor = context.id(), mailbox_capacity, "actor registered");
                Some(ActorRef { context, shared: Arc::clone(&self.shared) })
            },
        }
    }

    /// Whether [`ActorSystem::shutdown`] has not run yet.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Number of worker threads in the pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of registered actors.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Stops the system: drain tasks observe the flag and exit, in-flight
    /// handler invocations complete, and the worker threads are joined.
    /// Mailboxes still accept messages afterwards, but nothing processes
    /// them. Idempotent.
    pub fn shutdown(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        info!("actor system shutting down");

        for _ in 0..self.worker_count {
            // Failure means every worker already exited; nothing to wake.
            let _ = self.shared.commands.send(WorkerCommand::Shutdown);
        }

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
        debug!("worker threads joined");
    }
}

impl Drop for ActorSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Handle for sending messages to one registered actor.
pub struct ActorRef<T> {
    context: Arc<ActorContext<T>>,
    shared: Arc<Shared>,
}

impl<T: Send + 'static> ActorRef<T> {
    /// Offers `message` to the actor's mailbox without blocking.
    ///
    /// Returns false when the mailbox is full; the library neither retries
    /// nor drops silently, that call is the caller's to handle. On a
    /// successful enqueue the actor is scheduled onto the worker pool unless
    /// it already is.
    pub fn send(&self, message: T) -> bool {
        if !self.context.enqueue(message) {
            return false;
        }

        if self.context.try_schedule() {
            let drain = WorkerCommand::Drain(Arc::clone(&self.context) as Arc<dyn Drainable>);
            // A send after shutdown finds the workers gone; the message
            // stays queued, unprocessed, per the lifecycle contract.
            let _ = self.shared.commands.send(drain);
        }
        true
    }

    /// The id this actor was registered under.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        self.context.id()
    }
}

impl<T> Clone for ActorRef<T> {
    fn clone(&self) -> Self {
        Self { context: Arc::clone(&self.context), shared: Arc::clone(&self.shared) }
    }
}

fn worker_loop(feed: &Receiver<WorkerCommand>, shared: &Shared) {
    while let Ok(command) = feed.recv() {
        match command {
            WorkerCommand::Shutdown => break,
            WorkerCommand::Drain(actor) => drain(&actor, shared),
        }
    }
}

/// Pulls messages from one mailbox until it runs dry.
///
/// The empty case must clear the scheduled flag *before* re-checking the
/// mailbox: a sender that enqueued between the last pop and the clear would
/// otherwise observe `scheduled` still set, skip submitting, and strand its
/// message. Whoever wins the re-CAS continues the drain.
fn drain(actor: &Arc<dyn Drainable>, shared: &Shared) {
    loop {
        if !shared.running.load(Ordering::Acquire) {
            return;
        }
        if actor.process_next() {
            continue;
        }

        actor.clear_scheduled();
        if !actor.mailbox_is_empty() && actor.try_schedule() {
            continue;
        }
        return;
    }
}
