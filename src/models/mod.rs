//! Calculator parameter models
//!
//! Typed, serializable inputs for the domain adapters.

pub mod params;

// Re-export commonly used types
pub use params::{
    BudgetLine, DebtAccount, FilingStatus, MortgageTerms, PayoffStrategy, ProjectionOptions,
    RetirementPlan, TaxBracket,
};
