//! Configuration Module
//!
//! Handles loading and managing cache and scheduling configuration from
//! environment variables.

use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

use tracing::warn;

use crate::error::{CalcError, Result};

/// Cache sizing and default expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum resident entries before LRU eviction triggers
    pub max_size: NonZeroUsize,
    /// TTL for entries stored without an explicit one
    pub default_ttl: Duration,
}

/// Frame budget and yielding behaviour for chunked and queued work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Longest synchronous slice before yielding
    pub frame_budget: Duration,
    /// Delay requested from the scheduler at each yield
    pub yield_delay: Duration,
}

/// Per-domain TTLs used by the adapters.
///
/// Rate-sensitive projections get short lifetimes; static schedules and
/// bracket tables live longer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterTtls {
    pub investment: Duration,
    pub debt: Duration,
    pub budget: Duration,
    pub tax: Duration,
    pub retirement: Duration,
    pub mortgage: Duration,
}

/// Layer configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
    pub ttls: AdapterTtls,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CALC_CACHE_MAX_SIZE` - Maximum cache entries (default: 500)
    /// - `CALC_CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CALC_FRAME_BUDGET_MS` - Slice budget in milliseconds (default: 16)
    /// - `CALC_YIELD_DELAY_MS` - Delay requested at each yield (default: 0)
    /// - `CALC_TTL_{INVESTMENT,DEBT,BUDGET,TAX,RETIREMENT,MORTGAGE}_MS` - Adapter TTLs
    ///
    /// Values that fail to parse fall back to their defaults. Call
    /// [`Config::validate`] before use.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        let ttls = defaults.ttls;

        Self {
            cache: CacheConfig {
                max_size: env_parse("CALC_CACHE_MAX_SIZE")
                    .and_then(NonZeroUsize::new)
                    .unwrap_or(defaults.cache.max_size),
                default_ttl: env_millis("CALC_CACHE_DEFAULT_TTL_MS")
                    .unwrap_or(defaults.cache.default_ttl),
            },
            scheduler: SchedulerConfig {
                frame_budget: env_millis("CALC_FRAME_BUDGET_MS")
                    .unwrap_or(defaults.scheduler.frame_budget),
                yield_delay: env_millis("CALC_YIELD_DELAY_MS")
                    .unwrap_or(defaults.scheduler.yield_delay),
            },
            ttls: AdapterTtls {
                investment: env_millis("CALC_TTL_INVESTMENT_MS").unwrap_or(ttls.investment),
                debt: env_millis("CALC_TTL_DEBT_MS").unwrap_or(ttls.debt),
                budget: env_millis("CALC_TTL_BUDGET_MS").unwrap_or(ttls.budget),
                tax: env_millis("CALC_TTL_TAX_MS").unwrap_or(ttls.tax),
                retirement: env_millis("CALC_TTL_RETIREMENT_MS").unwrap_or(ttls.retirement),
                mortgage: env_millis("CALC_TTL_MORTGAGE_MS").unwrap_or(ttls.mortgage),
            },
        }
    }

    /// Sets the cache capacity. Zero is rejected.
    pub fn with_max_size(mut self, max_size: usize) -> Result<Self> {
        self.cache.max_size = NonZeroUsize::new(max_size)
            .ok_or_else(|| CalcError::InvalidConfig("max_size must be positive".to_string()))?;
        Ok(self)
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.cache.default_ttl = ttl;
        self
    }

    pub fn with_frame_budget(mut self, budget: Duration) -> Self {
        self.scheduler.frame_budget = budget;
        self
    }

    /// Checks that every duration is non-zero where zero makes no sense.
    pub fn validate(&self) -> Result<()> {
        if self.cache.default_ttl.is_zero() {
            return Err(CalcError::InvalidConfig(
                "default_ttl must be greater than zero".to_string(),
            ));
        }
        if self.scheduler.frame_budget.is_zero() {
            return Err(CalcError::InvalidConfig(
                "frame_budget must be greater than zero".to_string(),
            ));
        }
        let ttls = [
            ("investment", self.ttls.investment),
            ("debt", self.ttls.debt),
            ("budget", self.ttls.budget),
            ("tax", self.ttls.tax),
            ("retirement", self.ttls.retirement),
            ("mortgage", self.ttls.mortgage),
        ];
        if let Some((name, _)) = ttls.iter().find(|(_, ttl)| ttl.is_zero()) {
            return Err(CalcError::InvalidConfig(format!(
                "{} ttl must be greater than zero",
                name
            )));
        }
        Ok(())
    }
}

impl Default for AdapterTtls {
    fn default() -> Self {
        Self {
            investment: Duration::from_secs(60),
            debt: Duration::from_secs(10 * 60),
            budget: Duration::from_secs(5 * 60),
            tax: Duration::from_secs(30 * 60),
            retirement: Duration::from_secs(60),
            mortgage: Duration::from_secs(30 * 60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig {
                max_size: NonZeroUsize::new(500).unwrap_or(NonZeroUsize::MIN),
                default_ttl: Duration::from_secs(300),
            },
            scheduler: SchedulerConfig {
                frame_budget: Duration::from_millis(16),
                yield_delay: Duration::ZERO,
            },
            ttls: AdapterTtls::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}
