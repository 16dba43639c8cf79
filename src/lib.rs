//! calc_cache - Computation caching and cooperative scheduling
//!
//! Memoizes financial calculations behind a bounded LRU cache with lazy TTL
//! expiry, and keeps large workloads responsive by running them in
//! frame-budgeted slices on a single logical thread.

pub mod adapters;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
mod lock;
pub mod models;
pub mod runtime;
pub mod scheduler;
pub mod tasks;

pub use adapters::Adapters;
pub use cache::{CacheKey, CacheStore};
pub use config::Config;
pub use error::{CalcError, Result};
pub use runtime::CalcRuntime;
