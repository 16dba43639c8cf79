//! Tax Adapter
//!
//! Liability for one income is computed inline. Bracket sweeps evaluate a
//! whole range of incomes (for charts of effective rate against income) and
//! run on the chunked executor.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheKey;
use crate::error::Result;
use crate::models::{FilingStatus, TaxBracket};
use crate::runtime::CalcRuntime;

const TAX_LIABILITY: &str = "tax.liability";
const BRACKET_SWEEP: &str = "tax.bracket_sweep";

#[derive(Debug, Clone)]
pub struct TaxAdapter {
    runtime: Arc<CalcRuntime>,
    ttl: Duration,
}

impl TaxAdapter {
    pub fn new(runtime: Arc<CalcRuntime>) -> Self {
        let ttl = runtime.config().ttls.tax;
        Self { runtime, ttl }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Tax Liability ==
    pub async fn calculate_tax_liability<T, F>(
        &self,
        income: f64,
        filing_status: FilingStatus,
        brackets: &[TaxBracket],
        calculate: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(f64, FilingStatus, &[TaxBracket]) -> Result<T>,
    {
        let key = CacheKey::builder(TAX_LIABILITY)
            .arg(&income)?
            .arg(&filing_status)?
            .arg(brackets)?
            .build()?;

        self.runtime
            .memoize(&key, self.ttl, || calculate(income, filing_status, brackets))
            .await
    }

    // == Bracket Sweep ==
    /// Evaluates `point` for every income in `incomes`, in order.
    pub async fn calculate_bracket_sweep<U, F>(
        &self,
        incomes: &[f64],
        filing_status: FilingStatus,
        brackets: &[TaxBracket],
        point: F,
    ) -> Result<Vec<U>>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(f64, FilingStatus, &[TaxBracket]) -> Result<U> + Send + 'static,
    {
        let key = CacheKey::builder(BRACKET_SWEEP)
            .arg(incomes)?
            .arg(&filing_status)?
            .arg(brackets)?
            .build()?;
        let brackets = brackets.to_vec();

        self.runtime
            .memoize_try_batch(&key, self.ttl, incomes.to_vec(), move |income| {
                point(income, filing_status, &brackets)
            })
            .await
    }
}
