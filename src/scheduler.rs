//! Scheduler Module
//!
//! The yield boundary between slices of cooperative work. `TokioScheduler`
//! hands control back to the tokio runtime; `VirtualScheduler` records every
//! yield against a clock so tests can inspect slice lengths.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::clock::Clock;
use crate::lock::mutex_lock;

const SOURCE: &str = "scheduler";

// == Scheduler Trait ==
/// Capability to suspend the current task until a later scheduler turn.
#[async_trait]
pub trait Scheduler: Send + Sync + std::fmt::Debug {
    /// Suspends the caller for at least one scheduler turn, and at least
    /// `delay` when it is non-zero.
    async fn pause(&self, delay: Duration);
}

// == Tokio Scheduler ==
/// Yields to the tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn shared() -> Arc<dyn Scheduler> {
        Arc::new(TokioScheduler)
    }
}

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn pause(&self, delay: Duration) {
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
    }
}

// == Virtual Scheduler ==
/// Deterministic scheduler for tests.
///
/// Each pause records the clock reading at the moment of yielding, then
/// advances the clock by the requested delay and yields to the runtime so
/// other tasks still make progress.
#[derive(Clone)]
pub struct VirtualScheduler {
    clock: Arc<dyn Clock>,
    advance: Option<Arc<dyn Fn(Duration) + Send + Sync>>,
    yields: Arc<Mutex<Vec<u64>>>,
}

impl std::fmt::Debug for VirtualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualScheduler")
            .field("clock", &self.clock)
            .field("advances", &self.advance.is_some())
            .field("yields", &self.yield_count())
            .finish()
    }
}

impl VirtualScheduler {
    /// Creates a scheduler that reads time from `clock` and never advances it.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            advance: None,
            yields: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Uses `advance` to move virtual time forward by each pause's delay.
    pub fn with_advance(mut self, advance: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.advance = Some(Arc::new(advance));
        self
    }

    /// Clock readings at each yield, in order.
    pub fn yields(&self) -> Vec<u64> {
        mutex_lock(&self.yields, SOURCE, "yields").clone()
    }

    /// Number of yields so far.
    pub fn yield_count(&self) -> usize {
        self.yields().len()
    }
}

#[async_trait]
impl Scheduler for VirtualScheduler {
    async fn pause(&self, delay: Duration) {
        let now = self.clock.now_ms();
        mutex_lock(&self.yields, SOURCE, "pause").push(now);
        if let Some(advance) = &self.advance {
            if !delay.is_zero() {
                advance(delay);
            }
        }
        tokio::task::yield_now().await;
    }
}
