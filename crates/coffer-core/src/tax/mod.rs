//! Tax estimation
//!
//! This module is organized by concern:
//! - `brackets` - Progressive bracket tables
//! - `config` - Tax tables loaded from `tax.toml`
//! - `aggregate` - Period totals over classified transactions
//! - `us` / `india` - Jurisdiction calculators
//! - `recommendations` - Tax-saving heuristics
//! - `due_dates` - Quarterly payment calendar
//!
//! Everything except [`TaxEngine`] is pure. The engine fetches inputs from the
//! stores, runs the pure calculators and persists the snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{
    clamp_unit, DueDate, Jurisdiction, PresumptiveTax, RealTimeTaxJar, SetAsideComponent,
    TaxCalculationResult, TaxComponents, TaxPeriod, TaxProfile, TaxRecommendations, TaxSetAside,
    TransactionType,
};
use crate::store::{ProfileStore, SnapshotStore, TransactionStore};
use crate::taxonomy::Taxonomy;

pub mod aggregate;
pub mod brackets;
pub mod config;
pub mod due_dates;
pub mod india;
pub mod recommendations;
pub mod us;

pub use aggregate::PeriodTotals;
pub use brackets::{BracketTable, TaxBracket};
pub use config::{DueDateRule, RecommendationSettings, TaxConfig};

/// Effective rate used for the real-time jar before any snapshot exists
pub const DEFAULT_EFFECTIVE_RATE: f64 = 0.25;

/// Compute a full snapshot from already-fetched totals
pub fn estimate(
    config: &TaxConfig,
    user_id: &str,
    profile: &TaxProfile,
    period: TaxPeriod,
    totals: PeriodTotals,
    now: DateTime<Utc>,
) -> Result<TaxCalculationResult> {
    period.validate()?;
    let jurisdiction = Jurisdiction::from_country(&profile.country)?;

    let taxes = match jurisdiction {
        Jurisdiction::Us => TaxComponents::Us(us::calculate(&config.us, profile, &totals)),
        Jurisdiction::India => TaxComponents::India(india::calculate(
            &config.india,
            profile,
            &totals,
            period.fraction_of_year(),
        )),
    };
    let total_tax_owed = taxes.total();

    // A quarter's figures are annualized by 4/q before being spread over four payments
    let annualize = match period.quarter {
        Some(q) => 4.0 / f64::from(q),
        None => 1.0,
    };
    let estimated_quarterly_payment = total_tax_owed * annualize / 4.0;

    let tax_jar_amount = match jurisdiction {
        Jurisdiction::Us => {
            let us = &config.us;
            (total_tax_owed * us.jar_owed_multiplier)
                .max(totals.income.total * us.jar_income_floor_rate)
                * annualize
        }
        Jurisdiction::India => totals.income.total * config.india.tax_jar_rate,
    };

    let suggested_deductions = recommendations::generate(config, profile, &totals, &taxes);
    let next_due_date =
        due_dates::next_due_date(config.due_dates(jurisdiction), now.date_naive());

    Ok(TaxCalculationResult {
        user_id: user_id.to_string(),
        period,
        income: totals.income,
        expenses: totals.expenses,
        taxes,
        total_tax_owed,
        estimated_quarterly_payment,
        recommendations: TaxRecommendations {
            tax_jar_amount,
            next_due_date,
            suggested_deductions,
            strategy: recommendations::strategy(
                jurisdiction,
                totals.income.total,
                tax_jar_amount,
            ),
        },
        calculated_at: now,
    })
}

/// Set-aside for an amount using default component rates, overridable by name
pub fn tax_set_aside(
    config: &TaxConfig,
    amount: f64,
    jurisdiction: Jurisdiction,
    overrides: &HashMap<String, f64>,
) -> Result<TaxSetAside> {
    if !amount.is_finite() {
        return Err(Error::Validation(format!(
            "set-aside amount must be a finite number, got {}",
            amount
        )));
    }

    let defaults = config.set_aside_rates(jurisdiction);
    for (name, rate) in overrides {
        if !defaults.contains_key(name) {
            return Err(Error::Validation(format!(
                "unknown set-aside component for {}: {}",
                jurisdiction, name
            )));
        }
        if !(0.0..=1.0).contains(rate) {
            return Err(Error::Validation(format!(
                "set-aside rate for {} must be within [0,1], got {}",
                name, rate
            )));
        }
    }

    let base = amount.max(0.0);
    let breakdown: Vec<SetAsideComponent> = defaults
        .iter()
        .map(|(name, default_rate)| {
            let rate = overrides.get(name).copied().unwrap_or(*default_rate);
            SetAsideComponent {
                name: name.clone(),
                rate,
                amount: base * rate,
            }
        })
        .collect();
    let total_set_aside: f64 = breakdown.iter().map(|c| c.amount).sum();
    let effective_rate = breakdown.iter().map(|c| c.rate).sum();

    Ok(TaxSetAside {
        jurisdiction,
        amount,
        total_set_aside,
        effective_rate,
        breakdown,
    })
}

/// Async front door: fetches profile and transactions, persists snapshots
#[derive(Clone)]
pub struct TaxEngine {
    config: Arc<TaxConfig>,
    taxonomy: Arc<Taxonomy>,
    transactions: Arc<dyn TransactionStore>,
    profiles: Arc<dyn ProfileStore>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl TaxEngine {
    pub fn new(
        config: Arc<TaxConfig>,
        taxonomy: Arc<Taxonomy>,
        transactions: Arc<dyn TransactionStore>,
        profiles: Arc<dyn ProfileStore>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            config,
            taxonomy,
            transactions,
            profiles,
            snapshots,
        }
    }

    pub fn config(&self) -> &TaxConfig {
        &self.config
    }

    /// Stored profile, or the default US/single profile
    pub async fn profile(&self, user_id: &str) -> Result<TaxProfile> {
        match self.profiles.get(user_id).await? {
            Some(profile) => Ok(profile),
            None => {
                warn!("No tax profile for user {}, using default US profile", user_id);
                Ok(TaxProfile::default())
            }
        }
    }

    /// Calculate and persist a snapshot for a year or quarter
    pub async fn calculate_taxes(
        &self,
        user_id: &str,
        period: TaxPeriod,
    ) -> Result<TaxCalculationResult> {
        self.calculate_taxes_at(user_id, period, Utc::now()).await
    }

    /// As [`Self::calculate_taxes`] with an explicit clock
    pub async fn calculate_taxes_at(
        &self,
        user_id: &str,
        period: TaxPeriod,
        now: DateTime<Utc>,
    ) -> Result<TaxCalculationResult> {
        let range = period.date_range()?;
        let profile = self.profile(user_id).await?;
        // Resolve the jurisdiction before touching the transaction store
        Jurisdiction::from_country(&profile.country)?;

        let transactions = self.transactions.query(user_id, range, None).await?;
        let totals = PeriodTotals::from_transactions(&transactions, &self.taxonomy);
        let result = estimate(&self.config, user_id, &profile, period, totals, now)?;

        self.snapshots.save_snapshot(&result).await?;
        info!(
            "Tax snapshot for {} {}: owed {:.2} on income {:.2}",
            user_id,
            period.label(),
            result.total_tax_owed,
            result.income.total
        );
        Ok(result)
    }

    /// Suggested set-aside for one incoming transaction from the latest snapshot's rate
    pub async fn calculate_real_time_tax_jar(
        &self,
        user_id: &str,
        amount: f64,
        transaction_type: TransactionType,
    ) -> Result<RealTimeTaxJar> {
        if !amount.is_finite() {
            return Err(Error::Validation(format!(
                "amount must be a finite number, got {}",
                amount
            )));
        }

        let tax_rate = self
            .snapshots
            .latest_snapshot(user_id)
            .await?
            .and_then(|s| s.effective_rate())
            .unwrap_or(DEFAULT_EFFECTIVE_RATE);
        let tax_rate = clamp_unit(tax_rate);

        Ok(match transaction_type {
            TransactionType::Income => {
                let amount_to_set_aside = amount.abs() * tax_rate;
                RealTimeTaxJar {
                    amount_to_set_aside,
                    tax_rate,
                    message: format!(
                        "Set aside {:.2} ({:.0}% of this payment) for taxes",
                        amount_to_set_aside,
                        tax_rate * 100.0
                    ),
                }
            }
            TransactionType::Expense | TransactionType::Transfer => RealTimeTaxJar {
                amount_to_set_aside: 0.0,
                tax_rate,
                message: format!("No tax set-aside needed for a {}", transaction_type),
            },
        })
    }

    /// Payment calendar for a jurisdiction relative to today
    pub fn upcoming_due_dates(&self, jurisdiction: Jurisdiction) -> Vec<DueDate> {
        due_dates::upcoming(
            self.config.due_dates(jurisdiction),
            Utc::now().date_naive(),
        )
    }

    pub fn tax_set_aside(
        &self,
        amount: f64,
        jurisdiction: Jurisdiction,
        overrides: &HashMap<String, f64>,
    ) -> Result<TaxSetAside> {
        tax_set_aside(&self.config, amount, jurisdiction, overrides)
    }

    pub fn presumptive_tax(&self, gross_receipts: f64) -> PresumptiveTax {
        india::presumptive_tax(&self.config.india, gross_receipts)
    }
}
