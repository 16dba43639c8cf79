//! Calculation Queue
//!
//! FIFO queue of independent calculation thunks drained by a single tokio
//! task. The drain keeps each run of synchronous work inside the frame
//! budget and yields to the scheduler before continuing.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::{CalcError, Result};
use crate::lock::mutex_lock;
use crate::scheduler::Scheduler;
use crate::tasks::{ShutdownSignal, SliceBudget};

const SOURCE: &str = "tasks::queue";

type Job = Box<dyn FnOnce() + Send + 'static>;

// == Pending Task ==
/// A queued thunk. Dropping it unrun cancels its ticket.
struct PendingTask {
    id: u64,
    job: Job,
    enqueued_at: u64,
    guard: PendingGuard,
}

/// Keeps the queue's pending count in step with live tasks.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// == Calculation Ticket ==
/// Resolves to the result of one queued calculation.
///
/// Yields [`CalcError::Cancelled`] if the queue shut down before the
/// calculation ran.
#[derive(Debug)]
#[must_use = "a ticket does nothing unless awaited"]
pub struct CalculationTicket<T> {
    id: u64,
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> CalculationTicket<T> {
    /// Sequence number assigned at enqueue time, as seen in `task_id` log fields.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Future for CalculationTicket<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CalcError::Cancelled)))
    }
}

// == Calculation Queue ==
/// FIFO queue of calculation thunks with a budgeted drain loop.
///
/// Owns its drain task; shutting down or dropping the queue cancels every
/// calculation that has not started.
#[derive(Debug)]
pub struct CalculationQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<PendingTask>>>,
    drain: Mutex<Option<JoinHandle<()>>>,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    pending: Arc<AtomicUsize>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTask")
            .field("id", &self.id)
            .field("enqueued_at", &self.enqueued_at)
            .finish()
    }
}

impl CalculationQueue {
    // == Constructor ==
    /// Creates the queue and spawns its drain task on the current tokio
    /// runtime.
    pub fn new(
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        config: &SchedulerConfig,
        shutdown: ShutdownSignal,
    ) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| CalcError::NoRuntime)?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let drain = Drain {
            receiver,
            clock: clock.clone(),
            scheduler,
            budget: config.frame_budget,
            yield_delay: config.yield_delay,
            closed: closed.clone(),
            shutdown,
        };
        let join = handle.spawn(drain.run());

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            drain: Mutex::new(Some(join)),
            closed,
            next_id: AtomicU64::new(0),
            pending: Arc::new(AtomicUsize::new(0)),
            clock,
        })
    }

    // == Queue Calculation ==
    /// Appends a thunk to the queue.
    ///
    /// Thunks run strictly in enqueue order. An `Err` or a panic from one
    /// thunk is delivered to its own ticket only; later thunks still run.
    pub fn queue_calculation<T, F>(&self, thunk: F) -> CalculationTicket<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        let job: Job = Box::new(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(thunk)) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(task_id = id, panic = %message, "Queued calculation panicked");
                    Err(CalcError::TaskPanicked(message))
                }
            };
            // Caller may have dropped the ticket
            let _ = tx.send(outcome);
        });

        let task = PendingTask {
            id,
            job,
            enqueued_at: self.clock.now_ms(),
            guard: PendingGuard::new(self.pending.clone()),
        };

        let sender = mutex_lock(&self.sender, SOURCE, "queue_calculation");
        match sender.as_ref() {
            Some(sender) if !self.closed.load(Ordering::SeqCst) => {
                if sender.send(task).is_err() {
                    debug!(task_id = id, "Drain task gone, calculation cancelled");
                }
            }
            _ => debug!(task_id = id, "Queue shut down, calculation cancelled"),
        }

        CalculationTicket { id, rx }
    }

    /// Number of calculations queued but not yet started.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // == Shutdown ==
    /// Stops the drain task and cancels every calculation not yet started.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        mutex_lock(&self.sender, SOURCE, "shutdown").take();
        if let Some(join) = mutex_lock(&self.drain, SOURCE, "shutdown").take() {
            join.abort();
        }
        debug!(pending = self.pending(), "Calculation queue shut down");
    }
}

impl Drop for CalculationQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// == Drain Loop ==
struct Drain {
    receiver: mpsc::UnboundedReceiver<PendingTask>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    budget: Duration,
    yield_delay: Duration,
    closed: Arc<AtomicBool>,
    shutdown: ShutdownSignal,
}

impl Drain {
    async fn run(mut self) {
        let mut slice = SliceBudget::new(self.clock.clone(), self.budget);
        let mut shutdown = self.shutdown.clone();

        'drain: loop {
            let first = tokio::select! {
                biased;
                _ = shutdown.triggered() => break 'drain,
                task = self.receiver.recv() => match task {
                    Some(task) => task,
                    None => break 'drain,
                },
            };

            // Waiting for work always ends the previous slice
            slice.start_slice();
            let mut next = Some(first);

            while let Some(task) = next.take() {
                if self.is_closed() {
                    break 'drain;
                }
                self.run_task(task, &mut slice);

                if let Ok(task) = self.receiver.try_recv() {
                    if !slice.has_room() {
                        trace!(slice_ms = slice.elapsed_ms(), "Yielding between queued calculations");
                        tokio::select! {
                            biased;
                            _ = shutdown.triggered() => break 'drain,
                            _ = self.scheduler.pause(self.yield_delay) => {}
                        }
                        slice.start_slice();
                    }
                    next = Some(task);
                }
            }
        }

        self.receiver.close();
        let mut cancelled = 0usize;
        while self.receiver.try_recv().is_ok() {
            cancelled += 1;
        }
        debug!(cancelled, "Calculation queue drain stopped");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.shutdown.is_triggered()
    }

    fn run_task(&self, task: PendingTask, slice: &mut SliceBudget) {
        let PendingTask {
            id,
            job,
            enqueued_at,
            guard,
        } = task;
        drop(guard);

        let waited_ms = self.clock.now_ms().saturating_sub(enqueued_at);
        slice.measure(job);
        trace!(task_id = id, waited_ms, "Ran queued calculation");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
