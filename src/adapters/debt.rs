//! Debt Adapter
//!
//! Multi-account payoff strategies run on the calculation queue. A single
//! account's month-by-month timeline is built row by row on the chunked
//! executor.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheKey;
use crate::error::Result;
use crate::models::{DebtAccount, PayoffStrategy};
use crate::runtime::CalcRuntime;

const PAYOFF_STRATEGY: &str = "debt.payoff_strategy";
const PAYOFF_TIMELINE: &str = "debt.payoff_timeline";

#[derive(Debug, Clone)]
pub struct DebtAdapter {
    runtime: Arc<CalcRuntime>,
    ttl: Duration,
}

impl DebtAdapter {
    pub fn new(runtime: Arc<CalcRuntime>) -> Self {
        let ttl = runtime.config().ttls.debt;
        Self { runtime, ttl }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Payoff Strategy ==
    /// Plans payoff of all `debts` with `extra_payment` a month applied per
    /// `strategy`. Account order is part of the key.
    pub async fn calculate_payoff_strategy<T, F>(
        &self,
        debts: &[DebtAccount],
        extra_payment: f64,
        strategy: PayoffStrategy,
        calculate: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Vec<DebtAccount>, f64, PayoffStrategy) -> Result<T> + Send + 'static,
    {
        let key = CacheKey::builder(PAYOFF_STRATEGY)
            .arg(debts)?
            .arg(&extra_payment)?
            .arg(&strategy)?
            .build()?;
        let debts = debts.to_vec();

        self.runtime
            .memoize_queued(&key, self.ttl, move || {
                calculate(debts, extra_payment, strategy)
            })
            .await
    }

    // == Payoff Timeline ==
    /// One row per month, `1..=account.term_months`, in month order.
    ///
    /// `row` is called once per month on the chunked executor; its first
    /// error aborts the timeline.
    pub async fn calculate_payoff_timeline<U, F>(
        &self,
        account: &DebtAccount,
        row: F,
    ) -> Result<Vec<U>>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&DebtAccount, u32) -> Result<U> + Send + 'static,
    {
        let key = CacheKey::derive(PAYOFF_TIMELINE, account)?;
        let months = 1..=account.term_months;
        let account = account.clone();

        self.runtime
            .memoize_try_batch(&key, self.ttl, months, move |month| row(&account, month))
            .await
    }
}
