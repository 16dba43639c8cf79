//! Calculation Runtime
//!
//! Owned bundle of one consumer's cache, chunked executor and calculation
//! queue, plus the memoization logic the domain adapters build on. Nothing
//! here is global: two runtimes never see each other's entries.
//!
//! # Teardown
//! `shutdown()` cancels queued and suspended work and clears the cache.
//! Dropping the runtime does the same on a best-effort basis.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStats, CacheStore};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{CalcError, Result};
use crate::lock::mutex_lock;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::tasks::{CalculationQueue, ChunkedExecutor, Shutdown};

const SOURCE: &str = "runtime";

/// Type-erased cached result. Adapters downcast back to their own types.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// The runtime's cache behind the lock every caller goes through.
pub type SharedCache = Arc<RwLock<CacheStore<CachedValue>>>;

type SharedResult = Shared<BoxFuture<'static, Result<CachedValue>>>;

type InFlightMap = HashMap<CacheKey, Registration>;

/// One de-duplicated computation and the callers still waiting on it.
struct Registration {
    id: u64,
    future: SharedResult,
    waiters: usize,
}

// == Calc Runtime ==
pub struct CalcRuntime {
    config: Config,
    clock: Arc<dyn Clock>,
    cache: SharedCache,
    executor: ChunkedExecutor,
    queue: CalculationQueue,
    /// Computations that have suspended at least once, by key
    in_flight: Mutex<InFlightMap>,
    next_registration: AtomicU64,
    shutdown: Shutdown,
}

impl std::fmt::Debug for CalcRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalcRuntime")
            .field("config", &self.config)
            .field("queue", &self.queue)
            .field("shut_down", &self.shutdown.is_triggered())
            .finish()
    }
}

impl CalcRuntime {
    // == Constructors ==
    /// Creates a runtime on wall-clock time and the tokio scheduler.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_parts(config, SystemClock::shared(), TokioScheduler::shared())
    }

    /// Creates a runtime with an injected clock and scheduler.
    pub fn with_parts(
        config: Config,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        config.validate()?;

        let shutdown = Shutdown::new();
        let cache = CacheStore::from_config(&config.cache, clock.clone());
        let executor = ChunkedExecutor::new(
            clock.clone(),
            scheduler.clone(),
            &config.scheduler,
            shutdown.signal(),
        );
        let queue = CalculationQueue::new(
            clock.clone(),
            scheduler,
            &config.scheduler,
            shutdown.signal(),
        )?;

        info!(
            max_size = config.cache.max_size.get(),
            default_ttl_ms = config.cache.default_ttl.as_millis() as u64,
            frame_budget_ms = config.scheduler.frame_budget.as_millis() as u64,
            "Calculation runtime created"
        );

        Ok(Self {
            config,
            clock,
            cache: Arc::new(RwLock::new(cache)),
            executor,
            queue,
            in_flight: Mutex::new(HashMap::new()),
            next_registration: AtomicU64::new(0),
            shutdown,
        })
    }

    // == Accessors ==
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn executor(&self) -> &ChunkedExecutor {
        &self.executor
    }

    pub fn queue(&self) -> &CalculationQueue {
        &self.queue
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }

    /// Drops one cached result so the next call recomputes it.
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.cache.write().await.invalidate(key.as_str())
    }

    /// Number of de-duplicated computations currently running.
    pub fn in_flight(&self) -> usize {
        mutex_lock(&self.in_flight, SOURCE, "in_flight").len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    // == Memoize (direct) ==
    /// Returns the cached value for `key`, or computes it inline and caches
    /// it for `ttl`.
    ///
    /// An error from `compute` is returned unchanged and nothing is cached.
    pub async fn memoize<T, F>(&self, key: &CacheKey, ttl: Duration, compute: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T>,
    {
        self.ensure_open()?;
        if let Some(hit) = self.lookup::<T>(key).await {
            return Ok(hit);
        }

        let value = compute()?;
        self.store(key, Arc::new(value.clone()), ttl).await;
        Ok(value)
    }

    // == Memoize (queued) ==
    /// Like [`memoize`](Self::memoize), but runs `compute` on the
    /// calculation queue.
    ///
    /// Overlapping calls for the same key share one queued computation.
    pub async fn memoize_queued<T, F>(&self, key: &CacheKey, ttl: Duration, compute: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        self.memoize_shared(key, ttl, || self.queue.queue_calculation(compute).boxed())
            .await
    }

    // == Memoize (chunked) ==
    /// Caches the output of a chunked batch under `key`.
    ///
    /// Overlapping calls for the same key share one batch run.
    pub async fn memoize_batch<I, U, F>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        items: I,
        transform: F,
    ) -> Result<Vec<U>>
    where
        I: IntoIterator + Send + 'static,
        I::IntoIter: Send,
        I::Item: Send,
        U: Clone + Send + Sync + 'static,
        F: FnMut(I::Item) -> U + Send + 'static,
    {
        let executor = self.executor.clone();
        self.memoize_shared(key, ttl, move || {
            async move { executor.process_batch(items, transform, None).await }.boxed()
        })
        .await
    }

    /// Chunked variant for fallible per-item transforms. The first item
    /// error fails the whole batch and nothing is cached.
    pub async fn memoize_try_batch<I, U, F>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        items: I,
        transform: F,
    ) -> Result<Vec<U>>
    where
        I: IntoIterator + Send + 'static,
        I::IntoIter: Send,
        I::Item: Send,
        U: Clone + Send + Sync + 'static,
        F: FnMut(I::Item) -> Result<U> + Send + 'static,
    {
        let executor = self.executor.clone();
        self.memoize_shared(key, ttl, move || {
            async move { executor.try_process_batch(items, transform, None).await }.boxed()
        })
        .await
    }

    // == Shutdown ==
    /// Cancels outstanding work and clears the cache.
    pub async fn shutdown(&self) {
        self.begin_shutdown();
        self.cache.write().await.clear();
        info!("Calculation runtime shut down");
    }

    fn begin_shutdown(&self) {
        if self.shutdown.is_triggered() {
            return;
        }
        self.shutdown.trigger();
        self.queue.shutdown();
        let abandoned = {
            let mut in_flight = mutex_lock(&self.in_flight, SOURCE, "shutdown");
            let count = in_flight.len();
            in_flight.clear();
            count
        };
        debug!(abandoned, "Cancelled outstanding calculations");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shutdown.is_triggered() {
            Err(CalcError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn lookup<T: Clone + 'static>(&self, key: &CacheKey) -> Option<T> {
        let cached = self.cache.write().await.get(key.as_str())?;
        match cached.downcast_ref::<T>() {
            Some(value) => {
                debug!(key = %key, "Cache hit");
                Some(value.clone())
            }
            None => {
                warn!(key = %key, "Cached value has an unexpected type, recomputing");
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, value: CachedValue, ttl: Duration) {
        self.cache
            .write()
            .await
            .set(key.as_str(), value, Some(ttl));
        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cached calculation result");
    }

    /// Runs the future built by `start` once per key at a time.
    ///
    /// The first caller registers the computation; overlapping callers
    /// await the same shared future. Whoever observes completion first
    /// removes the registration and, on success, stores the value. If every
    /// caller goes away first, the last one removes the registration and the
    /// computation is dropped unfinished.
    async fn memoize_shared<T, S>(&self, key: &CacheKey, ttl: Duration, start: S) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        S: FnOnce() -> BoxFuture<'static, Result<T>>,
    {
        self.ensure_open()?;
        if let Some(hit) = self.lookup::<T>(key).await {
            return Ok(hit);
        }

        let (future, waiter) = {
            let mut in_flight = mutex_lock(&self.in_flight, SOURCE, "register");
            let registration = match in_flight.entry(key.clone()) {
                Entry::Occupied(entry) => {
                    debug!(key = %key, "Joining in-flight calculation");
                    let existing = entry.into_mut();
                    existing.waiters += 1;
                    existing
                }
                Entry::Vacant(entry) => {
                    let future = start()
                        .map(|result| result.map(|value| Arc::new(value) as CachedValue))
                        .boxed()
                        .shared();
                    let id = self.next_registration.fetch_add(1, Ordering::Relaxed);
                    entry.insert(Registration { id, future, waiters: 1 })
                }
            };
            let waiter = Waiter {
                in_flight: &self.in_flight,
                key,
                id: registration.id,
                settled: false,
            };
            (registration.future.clone(), waiter)
        };

        let outcome = future.await;
        let finisher = waiter.settle();

        let value = outcome?;
        if finisher && !self.shutdown.is_triggered() {
            self.store(key, value.clone(), ttl).await;
        }

        value.downcast_ref::<T>().cloned().ok_or_else(|| {
            CalcError::KeyDerivation(format!("key {} is shared by different result types", key))
        })
    }
}

// == In-flight Waiter ==
/// A caller's hold on a registration. Dropping it before the computation
/// settles gives up that caller's interest.
struct Waiter<'a> {
    in_flight: &'a Mutex<InFlightMap>,
    key: &'a CacheKey,
    id: u64,
    settled: bool,
}

impl Waiter<'_> {
    /// Returns true for the first caller to see the computation finish.
    /// That caller removes the registration.
    fn settle(mut self) -> bool {
        self.settled = true;
        let mut in_flight = mutex_lock(self.in_flight, SOURCE, "complete");
        let first = matches!(in_flight.get(self.key), Some(current) if current.id == self.id);
        if first {
            in_flight.remove(self.key);
        }
        first
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let abandoned = {
            let mut in_flight = mutex_lock(self.in_flight, SOURCE, "abandon");
            match in_flight.get_mut(self.key) {
                Some(current) if current.id == self.id => {
                    current.waiters = current.waiters.saturating_sub(1);
                    if current.waiters == 0 {
                        in_flight.remove(self.key)
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };
        // The unfinished computation is dropped outside the lock
        if abandoned.is_some() {
            debug!(key = %self.key, "Abandoned in-flight calculation");
        }
    }
}

impl Drop for CalcRuntime {
    fn drop(&mut self) {
        self.begin_shutdown();
        if let Ok(mut cache) = self.cache.try_write() {
            cache.clear();
        }
    }
}
