//! Slice Budget
//!
//! Time bookkeeping for one run of cooperative work. A slice keeps going
//! while the time already spent plus the cost of the most recent item still
//! fits in the budget; the first item of a slice always runs.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;

/// Per-slice time accounting in whole milliseconds of the injected clock.
///
/// Items shorter than one millisecond measure as zero cost, so a slice of
/// such items runs until the elapsed time passes the budget and may end up
/// to 1ms over it.
#[derive(Debug)]
pub struct SliceBudget {
    clock: Arc<dyn Clock>,
    budget_ms: u64,
    slice_start: u64,
    last_cost: u64,
}

impl SliceBudget {
    /// Opens the first slice at the current time.
    pub fn new(clock: Arc<dyn Clock>, budget: Duration) -> Self {
        let slice_start = clock.now_ms();
        Self {
            clock,
            budget_ms: budget.as_millis().min(u64::MAX as u128) as u64,
            slice_start,
            last_cost: 0,
        }
    }

    /// Starts a fresh slice after a yield.
    pub fn start_slice(&mut self) {
        self.slice_start = self.clock.now_ms();
        self.last_cost = 0;
    }

    /// Runs one unit of work and records how long it took.
    pub fn measure<R>(&mut self, work: impl FnOnce() -> R) -> R {
        let started = self.clock.now_ms();
        let out = work();
        self.last_cost = self.clock.now_ms().saturating_sub(started);
        out
    }

    /// Milliseconds spent in the current slice.
    pub fn elapsed_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.slice_start)
    }

    /// Whether another item of the last observed cost still fits.
    pub fn has_room(&self) -> bool {
        self.elapsed_ms().saturating_add(self.last_cost) <= self.budget_ms
    }
}
