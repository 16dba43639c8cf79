//! Cooperative Tasks Module
//!
//! Time-budgeted execution of calculation work on a single logical thread.
//!
//! # Components
//! - `ChunkedExecutor`: splits one ordered batch into frame-sized slices
//! - `CalculationQueue`: FIFO queue of independent thunks drained in slices
//! - `Shutdown`: teardown signal shared by both

mod budget;
mod chunked;
mod queue;
mod shutdown;

pub use budget::SliceBudget;
pub use chunked::ChunkedExecutor;
pub use queue::{CalculationQueue, CalculationTicket};
pub use shutdown::{Shutdown, ShutdownSignal};
