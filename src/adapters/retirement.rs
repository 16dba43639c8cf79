//! Retirement Adapter
//!
//! Accumulation projections span decades and go through the calculation
//! queue. Withdrawal schedules produce one row per retirement year on the
//! chunked executor.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheKey;
use crate::error::Result;
use crate::models::RetirementPlan;
use crate::runtime::CalcRuntime;

const RETIREMENT_PROJECTION: &str = "retirement.projection";
const WITHDRAWAL_SCHEDULE: &str = "retirement.withdrawal_schedule";

#[derive(Debug, Clone)]
pub struct RetirementAdapter {
    runtime: Arc<CalcRuntime>,
    ttl: Duration,
}

impl RetirementAdapter {
    pub fn new(runtime: Arc<CalcRuntime>) -> Self {
        let ttl = runtime.config().ttls.retirement;
        Self { runtime, ttl }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn calculate_retirement_projection<T, F>(
        &self,
        plan: &RetirementPlan,
        calculate: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(RetirementPlan) -> Result<T> + Send + 'static,
    {
        let key = CacheKey::derive(RETIREMENT_PROJECTION, plan)?;
        let plan = plan.clone();

        self.runtime
            .memoize_queued(&key, self.ttl, move || calculate(plan))
            .await
    }

    /// One row per year of retirement, `0..plan.years_in_retirement()`.
    pub async fn calculate_withdrawal_schedule<U, F>(
        &self,
        plan: &RetirementPlan,
        withdrawal_rate: f64,
        row: F,
    ) -> Result<Vec<U>>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&RetirementPlan, f64, u32) -> Result<U> + Send + 'static,
    {
        let key = CacheKey::builder(WITHDRAWAL_SCHEDULE)
            .arg(plan)?
            .arg(&withdrawal_rate)?
            .build()?;
        let years = 0..plan.years_in_retirement();
        let plan = plan.clone();

        self.runtime
            .memoize_try_batch(&key, self.ttl, years, move |year| {
                row(&plan, withdrawal_rate, year)
            })
            .await
    }
}
