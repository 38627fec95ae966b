//! Tax-saving recommendations
//!
//! Heuristics over a period's totals and computed taxes. Each suggestion has a
//! priority tier and, where one can be estimated, a savings figure. The list is
//! sorted by priority and capped.

use super::aggregate::PeriodTotals;
use super::config::TaxConfig;
use super::india;
use crate::models::{Jurisdiction, Priority, Recommendation, TaxComponents, TaxProfile, TaxRegime};

fn recommendation(
    key: &str,
    title: &str,
    description: String,
    priority: Priority,
    estimated_savings: Option<f64>,
) -> Recommendation {
    Recommendation {
        key: key.to_string(),
        title: title.to_string(),
        description,
        priority,
        estimated_savings: estimated_savings.filter(|s| *s > 0.0).map(round_cents),
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Generate recommendations for a computed period
pub fn generate(
    config: &TaxConfig,
    profile: &TaxProfile,
    totals: &PeriodTotals,
    taxes: &TaxComponents,
) -> Vec<Recommendation> {
    let settings = &config.recommendations;
    let income = totals.income.total;
    let total_owed = taxes.total();
    let mut recs = Vec::new();

    if let Some(ratio) = totals.expense_ratio() {
        if ratio < settings.low_expense_ratio {
            let missing = income * settings.low_expense_ratio - totals.expenses.deductible;
            recs.push(recommendation(
                "track_deductions",
                "Track more business expenses",
                format!(
                    "Deductible expenses are {:.1}% of income. Creators typically deduct software, \
                     equipment, internet and home office costs; make sure these are recorded.",
                    ratio * 100.0
                ),
                Priority::Medium,
                Some(missing * settings.estimated_marginal_rate),
            ));
        }
    }

    if income > 0.0 && total_owed > income * settings.high_tax_ratio {
        recs.push(recommendation(
            "professional_consultation",
            "Consult a tax professional",
            format!(
                "Estimated tax is {:.1}% of income. A professional review may uncover \
                 deductions or structures that lower it.",
                total_owed / income * 100.0
            ),
            Priority::High,
            None,
        ));
    }

    match taxes {
        TaxComponents::Us(_) => us_recommendations(config, totals, &mut recs),
        TaxComponents::India(breakdown) => {
            if breakdown.gst.required {
                recs.push(recommendation(
                    "gst_registration",
                    "Register for GST",
                    format!(
                        "Digital-service income exceeds the GST threshold; {:.0} is due at {:.0}%.",
                        breakdown.gst.amount,
                        breakdown.gst.rate * 100.0
                    ),
                    Priority::High,
                    None,
                ));
            }
            if total_owed > settings.advance_tax_liability {
                recs.push(recommendation(
                    "advance_tax",
                    "Pay advance tax in installments",
                    "Liability exceeds the advance tax limit; pay in quarterly installments \
                     to avoid interest."
                        .to_string(),
                    Priority::High,
                    None,
                ));
            }
            india_recommendations(config, profile, totals, &mut recs);
        }
    }

    recs.sort_by_key(|r| r.priority);
    recs.truncate(settings.max_recommendations);
    recs
}

fn us_recommendations(config: &TaxConfig, totals: &PeriodTotals, recs: &mut Vec<Recommendation>) {
    let settings = &config.recommendations;
    let business = totals.income.business;

    if totals.income.total > settings.quarterly_payment_income {
        recs.push(recommendation(
            "quarterly_payments",
            "Make quarterly estimated payments",
            "Self-employed income is not withheld; pay estimated tax each quarter to avoid \
             underpayment penalties."
                .to_string(),
            Priority::High,
            None,
        ));
    }

    if business > settings.entity_election_income {
        recs.push(recommendation(
            "s_corp_election",
            "Consider an S-Corp election",
            format!(
                "With {:.0} of business income, paying yourself a salary through an S-Corp \
                 can reduce self-employment tax on the remainder.",
                business
            ),
            Priority::Medium,
            Some((business - settings.entity_election_income) * config.us.self_employment_rate),
        ));
    }

    if business > settings.retirement_income {
        let contribution = business * 0.20;
        recs.push(recommendation(
            "retirement_contribution",
            "Open a SEP-IRA or Solo 401(k)",
            format!(
                "Contributing up to {:.0} to a self-employed retirement plan lowers taxable income.",
                contribution
            ),
            Priority::Low,
            Some(contribution * settings.estimated_marginal_rate),
        ));
    }
}

fn india_recommendations(
    config: &TaxConfig,
    profile: &TaxProfile,
    totals: &PeriodTotals,
    recs: &mut Vec<Recommendation>,
) {
    let india = &config.india;
    let with_cess = |tax: f64| tax * (1.0 + india.cess_rate);

    let (_, _, current) = india::regular_tax(india, profile, totals, profile.tax_regime);
    let other_regime = match profile.tax_regime {
        TaxRegime::New => TaxRegime::Old,
        TaxRegime::Old => TaxRegime::New,
    };
    let (_, _, alternative) = india::regular_tax(india, profile, totals, other_regime);

    if !profile.presumptive_taxation && alternative < current {
        recs.push(recommendation(
            "switch_regime",
            &format!("Switch to the {} tax regime", other_regime),
            format!(
                "Your deductions make the {} regime cheaper than the {} regime this period.",
                other_regime, profile.tax_regime
            ),
            Priority::Medium,
            Some(with_cess(current - alternative)),
        ));
    }

    let gross = totals.income.business;
    if !profile.presumptive_taxation && gross > 0.0 {
        let presumptive = india::presumptive_tax(india, gross);
        let presumptive_total =
            india::income_tax(india, presumptive.profit + totals.income.other, TaxRegime::New);
        if presumptive.applicable && presumptive_total < current.min(alternative) {
            recs.push(recommendation(
                "presumptive_taxation",
                "Opt into presumptive taxation (Section 44ADA)",
                format!(
                    "Gross receipts of {:.0} are within the {:.0} limit; only {:.0}% would be \
                     treated as taxable profit.",
                    gross,
                    india.presumptive_limit,
                    india.presumptive_profit_ratio * 100.0
                ),
                Priority::High,
                Some(with_cess(current.min(alternative) - presumptive_total)),
            ));
        }
    }
}

/// One-line planning summary for a snapshot
pub fn strategy(jurisdiction: Jurisdiction, total_income: f64, tax_jar_amount: f64) -> String {
    if total_income <= 0.0 {
        return "No income recorded for this period; nothing to set aside yet.".to_string();
    }
    let share = (tax_jar_amount / total_income * 100.0).clamp(0.0, 100.0);
    match jurisdiction {
        Jurisdiction::Us => format!(
            "Set aside about {:.0}% of each payment and pay federal estimates by each quarterly due date.",
            share
        ),
        Jurisdiction::India => format!(
            "Set aside about {:.0}% of receipts and pay advance tax installments by each due date.",
            share
        ),
    }
}
