//! Event serialization queue.
//!
//! Runs one asynchronous task per event, strictly one at a time, in arrival
//! order. A queue is made of generations: each generation is a worker task
//! draining its own channel. `reset` cancels the current generation and
//! installs a fresh one. A task that has already started is never aborted by
//! a reset; only tasks that have not started are dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use parlance_core::error::ConversationError;
use parlance_core::event::MessageEvent;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, info, warn};

/// Work performed for each queued event.
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    /// Processes one event. The queue waits for the returned future before
    /// starting the next task.
    ///
    /// # Errors
    ///
    /// Errors are logged and the queue moves on to the next event.
    async fn handle(&self, event: E) -> Result<(), ConversationError>;
}

/// An event that can be queued.
pub trait QueuedEvent: Send + 'static {
    /// Short identifier used in logs.
    fn label(&self) -> &str;
}

impl QueuedEvent for MessageEvent {
    fn label(&self) -> &str {
        &self.event_id
    }
}

#[derive(Debug, Default)]
struct GenerationState {
    cancelled: AtomicBool,
    /// Sent but not yet started.
    queued: AtomicUsize,
    /// Queued plus running.
    outstanding: AtomicUsize,
    idle: Notify,
}

impl GenerationState {
    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn stop(&self) {
        self.queued.store(0, Ordering::Release);
        self.outstanding.store(0, Ordering::Release);
        self.idle.notify_waiters();
    }
}

struct Generation<E> {
    id: u64,
    sender: mpsc::UnboundedSender<E>,
    state: Arc<GenerationState>,
}

/// Single-concurrency FIFO task queue with discard-and-replace reset.
pub struct EventQueue<E: QueuedEvent> {
    handler: Arc<dyn EventHandler<E>>,
    task_timeout: Option<Duration>,
    next_generation: AtomicU64,
    current: Mutex<Option<Generation<E>>>,
}

impl<E: QueuedEvent> std::fmt::Debug for EventQueue<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("generation", &self.generation())
            .field("pending", &self.pending())
            .field("task_timeout", &self.task_timeout)
            .finish_non_exhaustive()
    }
}

impl<E: QueuedEvent> EventQueue<E> {
    /// Creates a queue and spawns its first generation.
    ///
    /// `task_timeout` is an optional watchdog: a task running longer is
    /// aborted and logged so later events are not stalled forever.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(handler: Arc<dyn EventHandler<E>>, task_timeout: Option<Duration>) -> Self {
        let queue = Self {
            handler,
            task_timeout,
            next_generation: AtomicU64::new(0),
            current: Mutex::new(None),
        };
        let first = queue.spawn_generation();
        *queue.lock() = Some(first);
        queue
    }

    fn lock(&self) -> MutexGuard<'_, Option<Generation<E>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_generation(&self) -> Generation<E> {
        let id = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(GenerationState::default());
        tokio::spawn(run_generation(
            id,
            receiver,
            Arc::clone(&state),
            Arc::clone(&self.handler),
            self.task_timeout,
        ));
        debug!(generation = id, "queue generation started");
        Generation { id, sender, state }
    }

    /// Appends a task for `event`. Returns `false` if the queue is closed.
    pub fn enqueue(&self, event: E) -> bool {
        let guard = self.lock();
        let Some(generation) = guard.as_ref() else {
            debug!(event = event.label(), "queue closed; dropping event");
            return false;
        };
        generation.state.queued.fetch_add(1, Ordering::AcqRel);
        generation.state.outstanding.fetch_add(1, Ordering::AcqRel);
        let label = event.label().to_owned();
        if generation.sender.send(event).is_err() {
            generation.state.queued.fetch_sub(1, Ordering::AcqRel);
            generation.state.finish_one();
            warn!(generation = generation.id, event = %label, "queue worker gone; dropping event");
            return false;
        }
        debug!(generation = generation.id, event = %label, "event enqueued");
        true
    }

    /// Discards every task that has not started and installs a fresh
    /// generation. Returns the number of discarded tasks.
    pub fn reset(&self) -> usize {
        let mut guard = self.lock();
        let Some(old) = guard.take() else {
            return 0;
        };
        old.state.cancelled.store(true, Ordering::Release);
        let discarded = old.state.queued.load(Ordering::Acquire);
        let fresh = self.spawn_generation();
        info!(
            previous_generation = old.id,
            generation = fresh.id,
            discarded,
            "event queue reset"
        );
        *guard = Some(fresh);
        discarded
    }

    /// Cancels the current generation and rejects further events.
    pub fn close(&self) {
        if let Some(old) = self.lock().take() {
            old.state.cancelled.store(true, Ordering::Release);
            debug!(generation = old.id, "event queue closed");
        }
    }

    /// Number of tasks waiting to start in the current generation.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock()
            .as_ref()
            .map_or(0, |generation| generation.state.queued.load(Ordering::Acquire))
    }

    /// Identifier of the current generation, if the queue is open.
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        self.lock().as_ref().map(|generation| generation.id)
    }

    /// Waits until the current generation has no queued or running tasks.
    ///
    /// Tasks of generations discarded by an earlier reset are not awaited.
    pub async fn drain(&self) {
        let Some(state) = self
            .lock()
            .as_ref()
            .map(|generation| Arc::clone(&generation.state))
        else {
            return;
        };
        loop {
            let notified = state.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if state.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl<E: QueuedEvent> Drop for EventQueue<E> {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_generation<E: QueuedEvent>(
    id: u64,
    mut receiver: mpsc::UnboundedReceiver<E>,
    state: Arc<GenerationState>,
    handler: Arc<dyn EventHandler<E>>,
    task_timeout: Option<Duration>,
) {
    while let Some(event) = receiver.recv().await {
        if state.cancelled.load(Ordering::Acquire) {
            break;
        }
        state.queued.fetch_sub(1, Ordering::AcqRel);
        run_task(id, event, &handler, task_timeout).await;
        state.finish_one();
    }
    state.stop();
    debug!(generation = id, "queue generation stopped");
}

async fn run_task<E: QueuedEvent>(
    generation: u64,
    event: E,
    handler: &Arc<dyn EventHandler<E>>,
    task_timeout: Option<Duration>,
) {
    let label = event.label().to_owned();
    debug!(generation, event = %label, "task started");

    // Spawned so a panicking handler surfaces as a JoinError instead of
    // killing the worker.
    let handler = Arc::clone(handler);
    let task = tokio::spawn(async move { handler.handle(event).await });
    let abort = task.abort_handle();

    let joined = match task_timeout {
        Some(limit) => {
            if let Ok(joined) = tokio::time::timeout(limit, task).await {
                joined
            } else {
                abort.abort();
                let error = ConversationError::TaskTimedOut {
                    event_id: label,
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                };
                warn!(generation, %error, "task aborted by watchdog; continuing");
                return;
            }
        }
        None => task.await,
    };

    match joined {
        Ok(Ok(())) => debug!(generation, event = %label, "task completed"),
        Ok(Err(error)) => warn!(generation, event = %label, %error, "task failed; continuing"),
        Err(error) => warn!(generation, event = %label, %error, "task panicked; continuing"),
    }
}
