//! Chunked Executor
//!
//! Applies a transform to an ordered batch in time-bounded slices, yielding
//! to the scheduler between slices so no single burst of synchronous work
//! outlasts the frame budget.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::{CalcError, Result};
use crate::scheduler::Scheduler;
use crate::tasks::{ShutdownSignal, SliceBudget};

/// Splits large ordered workloads into frame-budgeted slices.
///
/// Cheap to clone; clones share the clock, scheduler and shutdown signal.
#[derive(Debug, Clone)]
pub struct ChunkedExecutor {
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    default_budget: Duration,
    yield_delay: Duration,
    shutdown: ShutdownSignal,
}

impl ChunkedExecutor {
    pub fn new(
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        config: &SchedulerConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            clock,
            scheduler,
            default_budget: config.frame_budget,
            yield_delay: config.yield_delay,
            shutdown,
        }
    }

    pub fn default_budget(&self) -> Duration {
        self.default_budget
    }

    /// Maps `transform` over `items`, preserving order.
    ///
    /// `budget` of `None` uses the configured frame budget. Fails only with
    /// [`CalcError::Cancelled`] when the owning runtime shuts down while the
    /// batch is suspended between slices.
    pub async fn process_batch<I, U, F>(
        &self,
        items: I,
        mut transform: F,
        budget: Option<Duration>,
    ) -> Result<Vec<U>>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> U,
    {
        self.try_process_batch(items, move |item| Ok(transform(item)), budget)
            .await
    }

    /// Like [`process_batch`](Self::process_batch) with a fallible
    /// transform. The first error stops the batch and is returned unchanged.
    pub async fn try_process_batch<I, U, F>(
        &self,
        items: I,
        mut transform: F,
        budget: Option<Duration>,
    ) -> Result<Vec<U>>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Result<U>,
    {
        if self.shutdown.is_triggered() {
            return Err(CalcError::Cancelled);
        }

        let mut remaining = items.into_iter().peekable();
        let mut results = Vec::with_capacity(remaining.size_hint().0);
        let mut slice = SliceBudget::new(
            self.clock.clone(),
            budget.unwrap_or(self.default_budget),
        );
        let mut slices: usize = 1;

        while let Some(item) = remaining.next() {
            let output = slice.measure(|| transform(item))?;
            results.push(output);

            if remaining.peek().is_some() && !slice.has_room() {
                debug!(
                    processed = results.len(),
                    slice_ms = slice.elapsed_ms(),
                    "Yielding between batch slices"
                );
                self.yield_slice().await?;
                slice.start_slice();
                slices += 1;
            }
        }

        debug!(items = results.len(), slices, "Chunked batch complete");
        Ok(results)
    }

    async fn yield_slice(&self) -> Result<()> {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            biased;
            _ = shutdown.triggered() => Err(CalcError::Cancelled),
            _ = self.scheduler.pause(self.yield_delay) => {
                if shutdown.is_triggered() {
                    Err(CalcError::Cancelled)
                } else {
                    Ok(())
                }
            }
        }
    }
}
