//! Mortgage Adapter
//!
//! The periodic payment is a closed-form figure computed inline. Full
//! amortization schedules (360 rows for a 30-year loan, more with extra
//! payment scenarios) are built on the chunked executor.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheKey;
use crate::error::Result;
use crate::models::MortgageTerms;
use crate::runtime::CalcRuntime;

const MONTHLY_PAYMENT: &str = "mortgage.monthly_payment";
const AMORTIZATION_SCHEDULE: &str = "mortgage.amortization_schedule";

#[derive(Debug, Clone)]
pub struct MortgageAdapter {
    runtime: Arc<CalcRuntime>,
    ttl: Duration,
}

impl MortgageAdapter {
    pub fn new(runtime: Arc<CalcRuntime>) -> Self {
        let ttl = runtime.config().ttls.mortgage;
        Self { runtime, ttl }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn calculate_monthly_payment<T, F>(&self, terms: &MortgageTerms, calculate: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(&MortgageTerms) -> Result<T>,
    {
        let key = CacheKey::derive(MONTHLY_PAYMENT, terms)?;

        self.runtime
            .memoize(&key, self.ttl, || calculate(terms))
            .await
    }

    // == Amortization Schedule ==
    /// One row per installment, `1..=terms.periods()`, in payment order.
    pub async fn calculate_amortization_schedule<U, F>(
        &self,
        terms: &MortgageTerms,
        row: F,
    ) -> Result<Vec<U>>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&MortgageTerms, u32) -> Result<U> + Send + 'static,
    {
        let key = CacheKey::derive(AMORTIZATION_SCHEDULE, terms)?;
        let periods = 1..=terms.periods();
        let terms = terms.clone();

        self.runtime
            .memoize_try_batch(&key, self.ttl, periods, move |period| row(&terms, period))
            .await
    }
}
