//! Budget Adapter
//!
//! Budget arithmetic is cheap, so both operations compute inline on a miss.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheKey;
use crate::error::Result;
use crate::models::BudgetLine;
use crate::runtime::CalcRuntime;

const BUDGET_BREAKDOWN: &str = "budget.breakdown";
const SAVINGS_RATE: &str = "budget.savings_rate";

#[derive(Debug, Clone)]
pub struct BudgetAdapter {
    runtime: Arc<CalcRuntime>,
    ttl: Duration,
}

impl BudgetAdapter {
    pub fn new(runtime: Arc<CalcRuntime>) -> Self {
        let ttl = runtime.config().ttls.budget;
        Self { runtime, ttl }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Splits monthly `income` across `lines`.
    pub async fn calculate_budget_breakdown<T, F>(
        &self,
        income: f64,
        lines: &[BudgetLine],
        calculate: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(f64, &[BudgetLine]) -> Result<T>,
    {
        let key = CacheKey::builder(BUDGET_BREAKDOWN)
            .arg(&income)?
            .arg(lines)?
            .build()?;

        self.runtime
            .memoize(&key, self.ttl, || calculate(income, lines))
            .await
    }

    pub async fn calculate_savings_rate<T, F>(
        &self,
        income: f64,
        expenses: f64,
        calculate: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(f64, f64) -> Result<T>,
    {
        let key = CacheKey::builder(SAVINGS_RATE)
            .arg(&income)?
            .arg(&expenses)?
            .build()?;

        self.runtime
            .memoize(&key, self.ttl, || calculate(income, expenses))
            .await
    }
}
