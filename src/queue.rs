//! The request queue. The public API for submitting and observing work.
//!
//! The queue owns the pending list, the executing set, and the observer
//! map, all behind one mutex; tasks run on the Tokio runtime and never
//! hold the lock across an await. All state transitions go through here.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::error::TicketError;
use crate::event::{Emitter, QueueEvent, QueueEventKind};
use crate::model::{QueueStatus, TicketId};
use crate::retry::{Classify, RetryPolicy};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A type-erased submission: invoking it runs the operation's whole retry
/// loop and settles its ticket.
type Job = Box<dyn FnOnce() -> BoxFuture + Send>;

type ObserverFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// What the executing task sends back through the ticket's channel.
/// Failures carry the total invocation count alongside the last error.
type Settlement<T, E> = Result<T, (E, u32)>;

struct PendingItem {
    id: TicketId,
    job: Job,
    enqueued_at: Instant,
}

struct Inner {
    pending: VecDeque<PendingItem>,
    executing: HashSet<TicketId>,
    observers: HashMap<TicketId, ObserverFn>,
}

/// Handle to a submitted operation. Carries the ticket id (for
/// [`RequestQueue::observe`]) and the settlement channel.
pub struct Ticket<T, E> {
    id: TicketId,
    rx: oneshot::Receiver<Settlement<T, E>>,
}

impl<T, E: std::error::Error> Ticket<T, E> {
    pub fn id(&self) -> TicketId {
        self.id
    }

    /// Wait for final settlement: the operation's value, or its last error
    /// after bounded retry. [`TicketError::Closed`] is only seen when the
    /// ticket outlives the runtime's tasks (e.g. runtime shutdown) —
    /// dropping queue handles does not cancel submitted work.
    pub async fn wait(self) -> Result<T, TicketError<E>> {
        match self.rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err((source, attempts))) => Err(TicketError::Failed { attempts, source }),
            Err(_) => Err(TicketError::Closed),
        }
    }
}

/// Bounded-concurrency FIFO queue for asynchronous operations.
///
/// At most `concurrency` operations execute at any instant; the rest wait
/// in submission order. Transient failures are retried with exponential
/// backoff per the queue's [`RetryPolicy`]. Cheap to clone; clones share
/// the same queue. Construct one per upstream and pass it to whatever
/// needs throttling — there is deliberately no process-global instance.
///
/// Executing tasks hold their own handle, so dropping every user handle
/// does not cancel anything: items already submitted keep draining and
/// settle normally. Once submitted, work runs.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<Mutex<Inner>>,
    emitter: Emitter,
    policy: RetryPolicy,
    concurrency: usize,
}

impl RequestQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                pending: VecDeque::new(),
                executing: HashSet::new(),
                observers: HashMap::new(),
            })),
            emitter: Emitter::new(config.event_capacity),
            policy: config.retry,
            concurrency: config.concurrency.max(1),
        }
    }

    /// The configured concurrency ceiling. Fixed at construction.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Subscribe to the queue's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.emitter.subscribe()
    }

    /// Submit an operation. Returns immediately with a [`Ticket`]; the
    /// operation starts as soon as a slot frees up, FIFO among waiters.
    ///
    /// `op` is invoked once per attempt, so it must be safe to invoke
    /// repeatedly if retries are to be meaningful — that is the caller's
    /// responsibility, not enforced here.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit<F, Fut, T, E>(&self, mut op: F) -> Ticket<T, E>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Classify + std::error::Error + Send + 'static,
    {
        let id = TicketId::new();
        let (tx, rx) = oneshot::channel();
        let policy = self.policy.clone();
        let emitter = self.emitter.clone();

        let job: Job = Box::new(move || {
            Box::pin(async move {
                let started = Instant::now();
                let mut attempts: u32 = 0;
                let outcome = loop {
                    attempts += 1;
                    match op().await {
                        Ok(value) => break Ok(value),
                        Err(error) => {
                            let retryable = policy.should_retry(error.class());
                            if !retryable || attempts > policy.max_retries {
                                break Err((error, retryable));
                            }
                            let delay = policy.delay_for(attempts - 1);
                            warn!(
                                ticket = %id,
                                attempt = attempts,
                                delay_ms = delay.as_millis() as u64,
                                %error,
                                "transient failure, retrying"
                            );
                            emitter.emit(QueueEventKind::RetryScheduled {
                                id,
                                attempt: attempts,
                                delay_ms: delay.as_millis() as u64,
                                error: error.to_string(),
                            });
                            tokio::time::sleep(delay).await;
                        }
                    }
                };

                let duration_ms = started.elapsed().as_millis() as u64;
                match outcome {
                    Ok(value) => {
                        debug!(ticket = %id, duration_ms, attempts, "request completed");
                        emitter.emit(QueueEventKind::Completed {
                            id,
                            duration_ms,
                            attempts,
                        });
                        let _ = tx.send(Ok(value));
                    }
                    Err((error, retryable)) => {
                        warn!(ticket = %id, attempts, retryable, %error, "request failed");
                        emitter.emit(QueueEventKind::Failed {
                            id,
                            error: error.to_string(),
                            attempts,
                            retryable,
                        });
                        let _ = tx.send(Err((error, attempts)));
                    }
                }
            })
        });

        let waiting = {
            let mut inner = self.lock();
            inner.pending.push_back(PendingItem {
                id,
                job,
                enqueued_at: Instant::now(),
            });
            inner.pending.len()
        };
        debug!(ticket = %id, waiting, "request enqueued");
        self.emitter.emit(QueueEventKind::Enqueued { id, waiting });
        self.notify_observers();
        self.drain();

        Ticket { id, rx }
    }

    /// Register a position callback for a ticket. Fires immediately with
    /// the current `(position, total)` snapshot, then again on every
    /// composition change until the ticket settles (which unregisters it).
    ///
    /// Position counts items ahead: executing items report 0, the first
    /// waiter reports the number executing, and so on. `total` is
    /// waiting + executing. No-op if the ticket has already settled.
    ///
    /// Each delivered snapshot is internally consistent, but delivery
    /// order is best-effort: callbacks run outside the queue lock, so on
    /// a multi-threaded runtime the registration snapshot may arrive
    /// after a newer one from a concurrent notification pass. Treat the
    /// smallest position seen so far as current.
    pub fn observe<F>(&self, id: TicketId, callback: F)
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        let callback: ObserverFn = Arc::new(callback);
        let (position, total) = {
            let mut inner = self.lock();
            let Some(snapshot) = position_of(&inner, id) else {
                return;
            };
            inner.observers.insert(id, Arc::clone(&callback));
            snapshot
        };
        callback(position, total);
    }

    /// Remove a position callback. No-op if absent.
    pub fn unobserve(&self, id: TicketId) {
        self.lock().observers.remove(&id);
    }

    /// Point-in-time composition snapshot. No side effects.
    pub fn status(&self) -> QueueStatus {
        let inner = self.lock();
        QueueStatus {
            waiting: inner.pending.len(),
            processing: inner.executing.len(),
            total: inner.pending.len() + inner.executing.len(),
        }
    }

    /// Pop and start pending items until the ceiling is reached or the
    /// pending list empties. Pops under the lock, spawns outside it.
    fn drain(&self) {
        loop {
            let item = {
                let mut inner = self.lock();
                if inner.executing.len() >= self.concurrency {
                    break;
                }
                let Some(item) = inner.pending.pop_front() else {
                    break;
                };
                inner.executing.insert(item.id);
                item
            };

            let waited_ms = item.enqueued_at.elapsed().as_millis() as u64;
            debug!(ticket = %item.id, waited_ms, "request started");
            self.emitter.emit(QueueEventKind::Started {
                id: item.id,
                waited_ms,
            });
            self.notify_observers();

            let queue = self.clone();
            let id = item.id;
            let fut = (item.job)();
            tokio::spawn(async move {
                fut.await;
                queue.finish(id);
            });
        }
    }

    /// An executing item settled: free its slot, drop its observer, and
    /// pull the next waiter in.
    fn finish(&self, id: TicketId) {
        {
            let mut inner = self.lock();
            inner.executing.remove(&id);
            inner.observers.remove(&id);
        }
        self.notify_observers();
        self.drain();
    }

    /// Run a notification pass over all registered observers, outside the
    /// lock, from a consistent snapshot.
    fn notify_observers(&self) {
        let snapshots: Vec<(ObserverFn, usize, usize)> = {
            let inner = self.lock();
            inner
                .observers
                .iter()
                .filter_map(|(id, callback)| {
                    position_of(&inner, *id)
                        .map(|(position, total)| (Arc::clone(callback), position, total))
                })
                .collect()
        };
        for (callback, position, total) in snapshots {
            callback(position, total);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicked observer callback can't poison us (callbacks run
        // outside the lock), but recover anyway rather than unwrap.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

/// Position of a ticket among items ahead of it, or None if the ticket
/// is not (or no longer) in the queue.
fn position_of(inner: &Inner, id: TicketId) -> Option<(usize, usize)> {
    let total = inner.pending.len() + inner.executing.len();
    if inner.executing.contains(&id) {
        return Some((0, total));
    }
    inner
        .pending
        .iter()
        .position(|item| item.id == id)
        .map(|index| (index + inner.executing.len(), total))
}
