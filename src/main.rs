//! calc_cache demo
//!
//! Runs a short calculator session against one runtime: a mortgage payment
//! and amortization schedule, a portfolio projection and a tax sweep, each
//! requested twice so the second round is served from the cache.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use calc_cache::models::{FilingStatus, MortgageTerms, TaxBracket};
use calc_cache::{Adapters, CalcError, CalcRuntime, Config};

/// Main entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the runtime and its adapters
/// 4. Run the sample workload twice
/// 5. Report cache statistics and shut the runtime down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "calc_cache=info", can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calc_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    info!(
        "Configuration loaded: max_size={}, default_ttl={}ms, frame_budget={}ms",
        config.cache.max_size,
        config.cache.default_ttl.as_millis(),
        config.scheduler.frame_budget.as_millis()
    );

    let runtime = Arc::new(CalcRuntime::new(config).context("failed to start runtime")?);
    let adapters = Adapters::new(runtime.clone());

    for round in 1..=2 {
        run_session(&adapters)
            .await
            .with_context(|| format!("session round {} failed", round))?;
        let stats = runtime.stats().await;
        info!(
            round,
            hits = stats.hits,
            misses = stats.misses,
            entries = stats.total_entries,
            hit_rate = stats.hit_rate(),
            "Session round complete"
        );
    }

    runtime.shutdown().await;
    info!("Demo complete");
    Ok(())
}

async fn run_session(adapters: &Adapters) -> calc_cache::Result<()> {
    let terms = MortgageTerms {
        principal: 350_000.0,
        annual_rate: 0.065,
        term_years: 30,
        payments_per_year: 12,
        extra_payment: 0.0,
    };

    let payment = adapters
        .mortgage
        .calculate_monthly_payment(&terms, level_payment)
        .await?;
    let schedule = adapters
        .mortgage
        .calculate_amortization_schedule(&terms, |t, period| {
            let pmt = level_payment(t)?;
            let r = t.periodic_rate();
            let growth = (1.0 + r).powi(period as i32);
            Ok((t.principal * growth - pmt * (growth - 1.0) / r).max(0.0))
        })
        .await?;
    info!(payment, periods = schedule.len(), "Mortgage ready");

    let projection = adapters
        .investment
        .calculate_portfolio_projection(25_000.0, 750.0, 0.07, 40, None, |initial, monthly, rate, years, _| {
            let mut balance = initial;
            for _ in 0..years * 12 {
                balance = balance * (1.0 + rate / 12.0) + monthly;
            }
            Ok(balance)
        })
        .await?;
    info!(projection, "Portfolio projection ready");

    let brackets = vec![
        TaxBracket {
            lower: 0.0,
            upper: Some(11_600.0),
            rate: 0.10,
        },
        TaxBracket {
            lower: 11_600.0,
            upper: Some(47_150.0),
            rate: 0.12,
        },
        TaxBracket {
            lower: 47_150.0,
            upper: None,
            rate: 0.22,
        },
    ];
    let incomes: Vec<f64> = (1..=500).map(|i| i as f64 * 500.0).collect();
    let sweep = adapters
        .tax
        .calculate_bracket_sweep(&incomes, FilingStatus::Single, &brackets, |income, _, table| {
            let tax: f64 = table.iter().map(|b| b.taxable_in(income) * b.rate).sum();
            Ok(tax / income)
        })
        .await?;
    info!(points = sweep.len(), "Effective rate sweep ready");

    Ok(())
}

fn level_payment(terms: &MortgageTerms) -> calc_cache::Result<f64> {
    let n = terms.periods();
    if n == 0 {
        return Err(CalcError::invalid_input("term must be at least one period"));
    }
    let r = terms.periodic_rate();
    if r == 0.0 {
        return Ok(terms.principal / n as f64);
    }
    Ok(terms.principal * r / (1.0 - (1.0 + r).powi(-(n as i32))))
}
