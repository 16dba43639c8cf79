//! Domain Adapters
//!
//! Thin per-calculator façades over a [`CalcRuntime`]. Each adapter turns
//! typed arguments into a canonical cache key, serves hits from the cache
//! and otherwise runs the caller's pure calculation function directly,
//! through the calculation queue, or through the chunked executor.
//!
//! # Adapters
//! - `InvestmentAdapter`: portfolio projections, compound growth
//! - `DebtAdapter`: payoff strategies, per-account payoff timelines
//! - `BudgetAdapter`: budget breakdowns, savings rate
//! - `TaxAdapter`: liability for one income, bracket sweeps
//! - `RetirementAdapter`: accumulation projections, withdrawal schedules
//! - `MortgageAdapter`: periodic payment, amortization schedules

pub mod budget;
pub mod debt;
pub mod investment;
pub mod mortgage;
pub mod retirement;
pub mod tax;

use std::sync::Arc;

pub use budget::BudgetAdapter;
pub use debt::DebtAdapter;
pub use investment::InvestmentAdapter;
pub use mortgage::MortgageAdapter;
pub use retirement::RetirementAdapter;
pub use tax::TaxAdapter;

use crate::runtime::CalcRuntime;

/// Every adapter, all sharing one runtime.
///
/// A consumer builds one of these per runtime; dropping the last handle to
/// the runtime tears down its cache and outstanding work.
#[derive(Debug, Clone)]
pub struct Adapters {
    pub investment: InvestmentAdapter,
    pub debt: DebtAdapter,
    pub budget: BudgetAdapter,
    pub tax: TaxAdapter,
    pub retirement: RetirementAdapter,
    pub mortgage: MortgageAdapter,
}

impl Adapters {
    pub fn new(runtime: Arc<CalcRuntime>) -> Self {
        Self {
            investment: InvestmentAdapter::new(runtime.clone()),
            debt: DebtAdapter::new(runtime.clone()),
            budget: BudgetAdapter::new(runtime.clone()),
            tax: TaxAdapter::new(runtime.clone()),
            retirement: RetirementAdapter::new(runtime.clone()),
            mortgage: MortgageAdapter::new(runtime),
        }
    }
}
