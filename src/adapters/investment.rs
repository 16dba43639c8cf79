//! Investment Adapter
//!
//! Portfolio projections and compound growth. Projections compound month by
//! month over decades, so they go through the calculation queue; single
//! compound-growth figures are cheap and computed inline.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheKey;
use crate::error::Result;
use crate::models::ProjectionOptions;
use crate::runtime::CalcRuntime;

const PORTFOLIO_PROJECTION: &str = "investment.portfolio_projection";
const COMPOUND_GROWTH: &str = "investment.compound_growth";

#[derive(Debug, Clone)]
pub struct InvestmentAdapter {
    runtime: Arc<CalcRuntime>,
    ttl: Duration,
}

impl InvestmentAdapter {
    pub fn new(runtime: Arc<CalcRuntime>) -> Self {
        let ttl = runtime.config().ttls.investment;
        Self { runtime, ttl }
    }

    /// Overrides the TTL taken from configuration.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Portfolio Projection ==
    /// Projects a portfolio's value over `years`.
    ///
    /// `calculate` receives the arguments unchanged and runs on the
    /// calculation queue. Missing options and `Some(ProjectionOptions::default())`
    /// are distinct keys.
    pub async fn calculate_portfolio_projection<T, F>(
        &self,
        initial: f64,
        monthly_contribution: f64,
        expected_return: f64,
        years: u32,
        options: Option<&ProjectionOptions>,
        calculate: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(f64, f64, f64, u32, Option<ProjectionOptions>) -> Result<T> + Send + 'static,
    {
        let key = CacheKey::builder(PORTFOLIO_PROJECTION)
            .arg(&initial)?
            .arg(&monthly_contribution)?
            .arg(&expected_return)?
            .arg(&years)?
            .opt(options)?
            .build()?;
        let options = options.cloned();

        self.runtime
            .memoize_queued(&key, self.ttl, move || {
                calculate(initial, monthly_contribution, expected_return, years, options)
            })
            .await
    }

    // == Compound Growth ==
    /// Value of `principal` after `years` at `annual_rate` compounded
    /// `compounds_per_year` times a year.
    pub async fn calculate_compound_growth<T, F>(
        &self,
        principal: f64,
        annual_rate: f64,
        years: u32,
        compounds_per_year: u32,
        calculate: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(f64, f64, u32, u32) -> Result<T>,
    {
        let key = CacheKey::builder(COMPOUND_GROWTH)
            .arg(&principal)?
            .arg(&annual_rate)?
            .arg(&years)?
            .arg(&compounds_per_year)?
            .build()?;

        self.runtime
            .memoize(&key, self.ttl, || {
                calculate(principal, annual_rate, years, compounds_per_year)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support;
    use crate::error::CalcError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn projection(
        calls: Arc<AtomicUsize>,
    ) -> impl FnOnce(f64, f64, f64, u32, Option<ProjectionOptions>) -> Result<Vec<f64>> + Send + 'static
    {
        move |initial, monthly, rate, years, _options| {
            calls.fetch_add(1, Ordering::SeqCst);
            let mut balance = initial;
            let mut yearly = Vec::with_capacity(years as usize);
            for _ in 0..years {
                for _ in 0..12 {
                    balance = balance * (1.0 + rate / 12.0) + monthly;
                }
                yearly.push(balance);
            }
            Ok(yearly)
        }
    }

    #[tokio::test]
    async fn test_projection_computed_once_within_ttl() {
        let (runtime, _) = test_support::runtime();
        let adapter = InvestmentAdapter::new(runtime);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = adapter
            .calculate_portfolio_projection(10_000.0, 500.0, 0.07, 30, None, projection(calls.clone()))
            .await
            .unwrap();
        let second = adapter
            .calculate_portfolio_projection(10_000.0, 500.0, 0.07, 30, None, projection(calls.clone()))
            .await
            .unwrap();

        assert_eq!(first.len(), 30);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_projection_recomputes_after_ttl() {
        let (runtime, clock) = test_support::runtime();
        let adapter = InvestmentAdapter::new(runtime).with_ttl(Duration::from_millis(1_000));
        let calls = Arc::new(AtomicUsize::new(0));

        adapter
            .calculate_portfolio_projection(1.0, 1.0, 0.05, 1, None, projection(calls.clone()))
            .await
            .unwrap();
        clock.advance_ms(1_500);
        adapter
            .calculate_portfolio_projection(1.0, 1.0, 0.05, 1, None, projection(calls.clone()))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_options_field_order_shares_cache_entry() {
        let (runtime, _) = test_support::runtime();
        let adapter = InvestmentAdapter::new(runtime);
        let calls = Arc::new(AtomicUsize::new(0));

        let a: ProjectionOptions =
            serde_json::from_value(json!({"fee_rate": 0.01, "inflation_rate": 0.02})).unwrap();
        let b: ProjectionOptions =
            serde_json::from_value(json!({"inflation_rate": 0.02, "fee_rate": 0.01})).unwrap();

        for opts in [&a, &b] {
            adapter
                .calculate_portfolio_projection(5.0, 1.0, 0.04, 2, Some(opts), projection(calls.clone()))
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        adapter
            .calculate_portfolio_projection(5.0, 1.0, 0.04, 2, None, projection(calls.clone()))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_compound_growth_error_propagates_uncached() {
        let (runtime, _) = test_support::runtime();
        let adapter = InvestmentAdapter::new(runtime.clone());
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result: Result<f64> = adapter
                .calculate_compound_growth(1_000.0, 0.05, 10, 0, |_, _, _, n| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(CalcError::invalid_input("compounds_per_year must be positive"))
                    } else {
                        Ok(0.0)
                    }
                })
                .await;
            assert_eq!(
                result,
                Err(CalcError::invalid_input("compounds_per_year must be positive"))
            );
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(runtime.stats().await.total_entries, 0);
    }
}
