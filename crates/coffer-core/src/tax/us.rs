//! US federal, state and self-employment tax

use tracing::warn;

use super::aggregate::PeriodTotals;
use super::config::UsTaxConfig;
use crate::models::{FilingStatus, TaxProfile, UsTaxBreakdown};

/// Federal income tax on adjusted income
pub fn federal_tax(config: &UsTaxConfig, income: f64, status: FilingStatus) -> f64 {
    config.federal_table(status).evaluate(income)
}

/// Self-employment tax, with the additional rate above the threshold
pub fn self_employment_tax(config: &UsTaxConfig, income: f64) -> f64 {
    if !income.is_finite() || income <= 0.0 {
        return 0.0;
    }
    let base = income * config.self_employment_rate;
    let additional = (income - config.additional_self_employment_threshold).max(0.0)
        * config.additional_self_employment_rate;
    base + additional
}

/// Flat state rate: the profile override, else the state table, else the default rate
pub fn state_rate(config: &UsTaxConfig, profile: &TaxProfile) -> f64 {
    if let Some(rate) = profile.state_tax_rate {
        return rate.clamp(0.0, 1.0);
    }
    match profile.state.as_deref() {
        Some(state) => config.state_rate(state).unwrap_or_else(|| {
            warn!(
                "No state tax rate for {}, using default {}",
                state, config.default_state_rate
            );
            config.default_state_rate
        }),
        None => config.default_state_rate,
    }
}

/// Full US breakdown for a period's totals
pub fn calculate(
    config: &UsTaxConfig,
    profile: &TaxProfile,
    totals: &PeriodTotals,
) -> UsTaxBreakdown {
    let status = profile.filing_status;
    let standard_deduction = config.standard_deduction(status);
    let taxable_income =
        (totals.income.total - totals.expenses.deductible - standard_deduction).max(0.0);
    let self_employment_income = (totals.income.business - totals.expenses.deductible).max(0.0);
    let rate = state_rate(config, profile);

    UsTaxBreakdown {
        filing_status: status,
        standard_deduction,
        taxable_income,
        federal: federal_tax(config, taxable_income, status),
        state: taxable_income * rate,
        state_rate: rate,
        self_employment: self_employment_tax(config, self_employment_income),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseBreakdown, IncomeBreakdown};
    use crate::tax::config::TaxConfig;

    fn config() -> UsTaxConfig {
        TaxConfig::embedded().unwrap().us
    }

    fn totals(income: f64, business: f64, deductible: f64) -> PeriodTotals {
        PeriodTotals {
            income: IncomeBreakdown {
                total: income,
                business,
                other: income - business,
            },
            expenses: ExpenseBreakdown {
                total: deductible,
                deductible,
                personal: 0.0,
            },
        }
    }

    #[test]
    fn test_federal_tax_zero_income() {
        let config = config();
        assert_eq!(federal_tax(&config, 0.0, FilingStatus::Single), 0.0);
        assert_eq!(federal_tax(&config, -100.0, FilingStatus::MarriedFilingJointly), 0.0);
    }

    #[test]
    fn test_federal_tax_single_brackets() {
        let config = config();
        let tax = federal_tax(&config, 50000.0, FilingStatus::Single);
        let expected = 11600.0 * 0.10 + (47150.0 - 11600.0) * 0.12 + (50000.0 - 47150.0) * 0.22;
        assert!((tax - expected).abs() < 1e-6);
    }

    #[test]
    fn test_joint_filers_pay_less() {
        let config = config();
        let single = federal_tax(&config, 120000.0, FilingStatus::Single);
        let joint = federal_tax(&config, 120000.0, FilingStatus::MarriedFilingJointly);
        assert!(joint < single);
    }

    #[test]
    fn test_self_employment_monotonic_with_step() {
        let config = config();
        let mut previous = 0.0;
        for step in 0..=60 {
            let income = step as f64 * 5000.0;
            let tax = self_employment_tax(&config, income);
            assert!(tax >= previous);
            previous = tax;
        }

        let below = self_employment_tax(&config, 200000.0) - self_employment_tax(&config, 199999.0);
        let above = self_employment_tax(&config, 200001.0) - self_employment_tax(&config, 200000.0);
        assert!((below - 0.1413).abs() < 1e-6);
        assert!((above - 0.1503).abs() < 1e-6);
    }

    #[test]
    fn test_state_rate_resolution() {
        let config = config();
        let mut profile = TaxProfile {
            state: Some("ca".to_string()),
            ..Default::default()
        };
        assert_eq!(state_rate(&config, &profile), 0.093);

        profile.state_tax_rate = Some(0.02);
        assert_eq!(state_rate(&config, &profile), 0.02);

        profile.state_tax_rate = None;
        profile.state = Some("ZZ".to_string());
        assert_eq!(state_rate(&config, &profile), 0.05);
    }

    #[test]
    fn test_calculate_subtracts_deductions() {
        let config = config();
        let profile = TaxProfile {
            state: Some("TX".to_string()),
            ..Default::default()
        };
        let breakdown = calculate(&config, &profile, &totals(80000.0, 80000.0, 5400.0));
        assert_eq!(breakdown.standard_deduction, 14600.0);
        assert!((breakdown.taxable_income - 60000.0).abs() < 1e-9);
        assert_eq!(breakdown.state, 0.0);
        assert!((breakdown.self_employment - 74600.0 * 0.1413).abs() < 1e-6);
    }

    #[test]
    fn test_calculate_below_standard_deduction() {
        let config = config();
        let breakdown = calculate(&config, &TaxProfile::default(), &totals(10000.0, 0.0, 0.0));
        assert_eq!(breakdown.taxable_income, 0.0);
        assert_eq!(breakdown.federal, 0.0);
        assert_eq!(breakdown.state, 0.0);
        assert_eq!(breakdown.self_employment, 0.0);
    }
}
