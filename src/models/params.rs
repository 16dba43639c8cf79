//! Calculator parameter types
//!
//! Typed inputs accepted by the domain adapters. Every type serializes with
//! serde so it can be folded into a cache key, and deserializes so callers
//! can build them straight from form or JSON state.

use serde::{Deserialize, Serialize};

// == Investment ==
/// Optional knobs for a portfolio projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionOptions {
    /// Annual inflation used to report real values
    #[serde(default)]
    pub inflation_rate: Option<f64>,
    /// Yearly growth applied to the monthly contribution
    #[serde(default)]
    pub contribution_growth: Option<f64>,
    /// Annual fee deducted from returns
    #[serde(default)]
    pub fee_rate: Option<f64>,
    #[serde(default = "default_compounds_per_year")]
    pub compounds_per_year: u32,
}

fn default_compounds_per_year() -> u32 {
    12
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            inflation_rate: None,
            contribution_growth: None,
            fee_rate: None,
            compounds_per_year: default_compounds_per_year(),
        }
    }
}

// == Debt ==
/// One debt in a payoff plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtAccount {
    pub name: String,
    pub balance: f64,
    /// Annual interest rate as a fraction (0.19 = 19%)
    pub annual_rate: f64,
    pub minimum_payment: f64,
    /// Number of monthly rows in the payoff timeline
    pub term_months: u32,
}

/// Order in which extra payments are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoffStrategy {
    /// Highest interest rate first
    Avalanche,
    /// Smallest balance first
    Snowball,
}

// == Budget ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub category: String,
    /// Monthly amount
    pub amount: f64,
    #[serde(default)]
    pub essential: bool,
}

// == Tax ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
    MarriedJoint,
    MarriedSeparate,
    HeadOfHousehold,
}

/// One marginal bracket. `upper` of `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub lower: f64,
    #[serde(default)]
    pub upper: Option<f64>,
    pub rate: f64,
}

impl TaxBracket {
    /// Portion of `income` that falls inside this bracket.
    pub fn taxable_in(&self, income: f64) -> f64 {
        let top = self.upper.map_or(income, |upper| income.min(upper));
        (top - self.lower).max(0.0)
    }
}

// == Retirement ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetirementPlan {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub current_savings: f64,
    pub annual_contribution: f64,
    pub expected_return: f64,
    #[serde(default)]
    pub inflation_rate: f64,
}

impl RetirementPlan {
    pub fn years_to_retirement(&self) -> u32 {
        self.retirement_age.saturating_sub(self.current_age)
    }

    /// Length of the withdrawal phase; zero if the plan ends at retirement.
    pub fn years_in_retirement(&self) -> u32 {
        self.life_expectancy.saturating_sub(self.retirement_age)
    }
}

// == Mortgage ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortgageTerms {
    pub principal: f64,
    pub annual_rate: f64,
    pub term_years: u32,
    #[serde(default = "default_payments_per_year")]
    pub payments_per_year: u32,
    /// Extra principal paid with every installment
    #[serde(default)]
    pub extra_payment: f64,
}

fn default_payments_per_year() -> u32 {
    12
}

impl MortgageTerms {
    /// Total number of scheduled installments.
    pub fn periods(&self) -> u32 {
        self.term_years.saturating_mul(self.payments_per_year)
    }

    /// Interest rate applied per installment.
    pub fn periodic_rate(&self) -> f64 {
        if self.payments_per_year == 0 {
            0.0
        } else {
            self.annual_rate / self.payments_per_year as f64
        }
    }
}
