//! Indian income tax, cess, GST, professional tax and Section 44ADA

use super::aggregate::PeriodTotals;
use super::config::IndiaTaxConfig;
use crate::models::{GstAssessment, IndiaTaxBreakdown, PresumptiveTax, TaxProfile, TaxRegime};

/// Deductions allowed under the profile's regime
///
/// The new regime only allows the standard deduction. The old regime allows
/// the capped 80C and 80D claims plus uncapped 80E interest.
pub fn regime_deductions(config: &IndiaTaxConfig, profile: &TaxProfile, regime: TaxRegime) -> f64 {
    match regime {
        TaxRegime::New => config.standard_deduction,
        TaxRegime::Old => {
            let cap_80d = if profile.senior_citizen {
                config.section_80d_senior_cap
            } else {
                config.section_80d_cap
            };
            profile.section_80c.clamp(0.0, config.section_80c_cap)
                + profile.section_80d.clamp(0.0, cap_80d)
                + profile.section_80e.max(0.0)
        }
    }
}

/// Income tax before cess on already-adjusted income
pub fn income_tax(config: &IndiaTaxConfig, taxable_income: f64, regime: TaxRegime) -> f64 {
    config.table(regime).evaluate(taxable_income)
}

/// Taxable income and tax under the regular (non-presumptive) rules
pub fn regular_tax(
    config: &IndiaTaxConfig,
    profile: &TaxProfile,
    totals: &PeriodTotals,
    regime: TaxRegime,
) -> (f64, f64, f64) {
    let deductions = regime_deductions(config, profile, regime);
    let taxable = (totals.income.total - totals.expenses.deductible - deductions).max(0.0);
    (deductions, taxable, income_tax(config, taxable, regime))
}

/// GST on gross digital-service income once it exceeds the registration threshold
pub fn gst(config: &IndiaTaxConfig, gross_digital_income: f64) -> GstAssessment {
    if gross_digital_income > config.gst_threshold {
        GstAssessment {
            required: true,
            rate: config.gst_rate,
            amount: gross_digital_income * config.gst_rate,
        }
    } else {
        GstAssessment {
            required: false,
            rate: config.gst_rate,
            amount: 0.0,
        }
    }
}

/// Section 44ADA: a fixed share of gross receipts is deemed profit, taxed on the new-regime table
pub fn presumptive_tax(config: &IndiaTaxConfig, gross_receipts: f64) -> PresumptiveTax {
    let gross_receipts = gross_receipts.max(0.0);
    if gross_receipts > config.presumptive_limit {
        return PresumptiveTax {
            applicable: false,
            gross_receipts,
            profit: 0.0,
            tax: 0.0,
        };
    }
    let profit = gross_receipts * config.presumptive_profit_ratio;
    PresumptiveTax {
        applicable: true,
        gross_receipts,
        profit,
        tax: income_tax(config, profit, TaxRegime::New),
    }
}

/// Full Indian breakdown for a period's totals
pub fn calculate(
    config: &IndiaTaxConfig,
    profile: &TaxProfile,
    totals: &PeriodTotals,
    fraction_of_year: f64,
) -> IndiaTaxBreakdown {
    let presumptive = profile
        .presumptive_taxation
        .then(|| presumptive_tax(config, totals.income.business));

    let (regime, deductions, taxable_income, income_tax) = match presumptive {
        Some(p) if p.applicable => {
            let taxable = p.profit + totals.income.other.max(0.0);
            (
                TaxRegime::New,
                0.0,
                taxable,
                self::income_tax(config, taxable, TaxRegime::New),
            )
        }
        _ => {
            let (deductions, taxable, tax) =
                regular_tax(config, profile, totals, profile.tax_regime);
            (profile.tax_regime, deductions, taxable, tax)
        }
    };

    IndiaTaxBreakdown {
        regime,
        deductions,
        taxable_income,
        income_tax,
        cess: income_tax * config.cess_rate,
        gst: gst(config, totals.income.business),
        professional_tax: config.professional_tax_cap * fraction_of_year.clamp(0.0, 1.0),
        presumptive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseBreakdown, IncomeBreakdown, TaxComponents};
    use crate::tax::config::TaxConfig;

    fn config() -> IndiaTaxConfig {
        TaxConfig::embedded().unwrap().india
    }

    fn totals(business: f64, other: f64, deductible: f64) -> PeriodTotals {
        PeriodTotals {
            income: IncomeBreakdown {
                total: business + other,
                business,
                other,
            },
            expenses: ExpenseBreakdown {
                total: deductible,
                deductible,
                personal: 0.0,
            },
        }
    }

    #[test]
    fn test_income_below_standard_deduction_is_untaxed() {
        let config = config();
        let profile = TaxProfile::india(TaxRegime::New);
        let period = totals(50000.0, 0.0, 0.0);
        let (_, taxable, tax) = regular_tax(&config, &profile, &period, TaxRegime::New);
        assert_eq!(taxable, 0.0);
        assert_eq!(tax, 0.0);
        assert_eq!(income_tax(&config, 0.0, TaxRegime::New), 0.0);
    }

    #[test]
    fn test_new_regime_brackets() {
        let config = config();
        let tax = income_tax(&config, 1_000_000.0, TaxRegime::New);
        assert!((tax - (400000.0 * 0.05 + 300000.0 * 0.10)).abs() < 1e-6);
    }

    #[test]
    fn test_old_regime_deduction_caps() {
        let config = config();
        let mut profile = TaxProfile::india(TaxRegime::Old);
        profile.section_80c = 300000.0;
        profile.section_80d = 40000.0;
        profile.section_80e = 70000.0;
        assert_eq!(
            regime_deductions(&config, &profile, TaxRegime::Old),
            150000.0 + 25000.0 + 70000.0
        );

        profile.senior_citizen = true;
        assert_eq!(
            regime_deductions(&config, &profile, TaxRegime::Old),
            150000.0 + 40000.0 + 70000.0
        );
        assert_eq!(regime_deductions(&config, &profile, TaxRegime::New), 50000.0);
    }

    #[test]
    fn test_gst_threshold() {
        let config = config();
        let below = gst(&config, 2_000_000.0);
        assert!(!below.required);
        assert_eq!(below.amount, 0.0);

        let above = gst(&config, 2_500_000.0);
        assert!(above.required);
        assert!((above.amount - 450000.0).abs() < 1e-6);
    }

    #[test]
    fn test_presumptive_tax() {
        let config = config();
        let eligible = presumptive_tax(&config, 3_000_000.0);
        assert!(eligible.applicable);
        assert_eq!(eligible.profit, 1_500_000.0);
        assert!(eligible.tax > 0.0);

        let ineligible = presumptive_tax(&config, 6_000_000.0);
        assert!(!ineligible.applicable);
        assert_eq!(ineligible.profit, 0.0);
    }

    #[test]
    fn test_calculate_with_presumptive_profile() {
        let config = config();
        let mut profile = TaxProfile::india(TaxRegime::Old);
        profile.presumptive_taxation = true;
        let breakdown = calculate(&config, &profile, &totals(1_200_000.0, 0.0, 0.0), 1.0);
        assert_eq!(breakdown.regime, TaxRegime::New);
        assert_eq!(breakdown.taxable_income, 600000.0);
        assert!((breakdown.income_tax - 15000.0).abs() < 1e-6);
        assert!((breakdown.cess - 600.0).abs() < 1e-6);
        assert_eq!(breakdown.professional_tax, 2500.0);
        assert!(breakdown.presumptive.unwrap().applicable);
    }

    #[test]
    fn test_professional_tax_prorated_for_quarter() {
        let config = config();
        let profile = TaxProfile::india(TaxRegime::New);
        let breakdown = calculate(&config, &profile, &totals(100000.0, 0.0, 0.0), 0.25);
        assert_eq!(breakdown.professional_tax, 625.0);
        assert_eq!(breakdown.income_tax, 0.0);
        let total = TaxComponents::India(breakdown).total();
        assert_eq!(total, 625.0);
    }
}
