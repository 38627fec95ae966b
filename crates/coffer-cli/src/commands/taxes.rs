//! Tax estimation command implementations

use std::collections::HashMap;

use anyhow::{Context, Result};
use coffer_core::{Engine, Jurisdiction, TaxCalculationResult, TaxComponents};

use super::{parse_transaction_type, print_json};

pub async fn cmd_taxes(
    engine: &Engine,
    user: &str,
    year: i32,
    quarter: Option<u8>,
    json: bool,
) -> Result<()> {
    let result = engine.calculate_taxes(user, year, quarter).await?;
    if json {
        return print_json(&serde_json::to_value(&result)?);
    }
    print_tax_result(&result);
    Ok(())
}

fn print_tax_result(result: &TaxCalculationResult) {
    println!();
    println!("🧾 Tax estimate for {} ({})", result.period.label(), result.jurisdiction());
    println!("   ─────────────────────────────────────────────");
    println!("   Business income:      {:>12.2}", result.income.business);
    println!("   Other income:         {:>12.2}", result.income.other);
    println!("   Deductible expenses:  {:>12.2}", result.expenses.deductible);
    println!("   Personal expenses:    {:>12.2}", result.expenses.personal);
    println!();

    match &result.taxes {
        TaxComponents::Us(us) => {
            println!("   Filing status:        {:>12}", us.filing_status.as_str());
            println!("   Taxable income:       {:>12.2}", us.taxable_income);
            println!("   Federal:              {:>12.2}", us.federal);
            println!(
                "   State ({:>5.2}%):      {:>12.2}",
                us.state_rate * 100.0,
                us.state
            );
            println!("   Self-employment:      {:>12.2}", us.self_employment);
        }
        TaxComponents::India(india) => {
            println!("   Regime:               {:>12}", india.regime.as_str());
            println!("   Deductions:           {:>12.2}", india.deductions);
            println!("   Taxable income:       {:>12.2}", india.taxable_income);
            println!("   Income tax:           {:>12.2}", india.income_tax);
            println!("   Cess:                 {:>12.2}", india.cess);
            if india.gst.required {
                println!(
                    "   GST ({:.0}%):            {:>12.2}",
                    india.gst.rate * 100.0,
                    india.gst.amount
                );
            }
            println!("   Professional tax:     {:>12.2}", india.professional_tax);
            if let Some(p) = india.presumptive.filter(|p| p.applicable) {
                println!("   Presumptive profit:   {:>12.2}", p.profit);
            }
        }
    }

    println!("   ─────────────────────────────────────────────");
    println!("   Total tax owed:       {:>12.2}", result.total_tax_owed);
    println!(
        "   Quarterly payment:    {:>12.2}",
        result.estimated_quarterly_payment
    );
    if let Some(rate) = result.effective_rate() {
        println!("   Effective rate:       {:>11.1}%", rate * 100.0);
    }

    let recs = &result.recommendations;
    println!();
    println!("🫙 Tax jar: {:.2}", recs.tax_jar_amount);
    if let Some(due) = recs.next_due_date {
        println!("📅 Next payment due: {}", due);
    }
    println!("   {}", recs.strategy);

    if !recs.suggested_deductions.is_empty() {
        println!();
        println!("💡 Recommendations");
        for rec in &recs.suggested_deductions {
            let savings = rec
                .estimated_savings
                .map(|s| format!(" (save ~{:.0})", s))
                .unwrap_or_default();
            println!("   [{}] {}{}", rec.priority, rec.title, savings);
            println!("         {}", rec.description);
        }
    }
}

pub async fn cmd_jar(
    engine: &Engine,
    user: &str,
    amount: f64,
    transaction_type: &str,
    json: bool,
) -> Result<()> {
    let transaction_type = parse_transaction_type(transaction_type)?;
    let jar = engine
        .calculate_real_time_tax_jar(user, amount, transaction_type)
        .await?;

    if json {
        return print_json(&serde_json::to_value(&jar)?);
    }

    println!("🫙 {}", jar.message);
    if jar.amount_to_set_aside > 0.0 {
        println!(
            "   Set aside {:.2} ({:.1}% rate)",
            jar.amount_to_set_aside,
            jar.tax_rate * 100.0
        );
    }
    Ok(())
}

/// Parse `name=rate` pairs such as `state=0.05`
fn parse_rate_overrides(rates: &[String]) -> Result<HashMap<String, f64>> {
    rates
        .iter()
        .map(|pair| {
            let (name, rate) = pair
                .split_once('=')
                .with_context(|| format!("Expected name=rate, got '{}'", pair))?;
            let rate: f64 = rate
                .trim()
                .parse()
                .with_context(|| format!("Invalid rate in '{}'", pair))?;
            Ok((name.trim().to_lowercase(), rate))
        })
        .collect()
}

/// Country from the flag, falling back to the user's profile
async fn resolve_country(engine: &Engine, user: &str, country: Option<&str>) -> Result<String> {
    match country {
        Some(c) => Ok(c.to_string()),
        None => Ok(engine.profile(user).await?.country),
    }
}

pub async fn cmd_set_aside(
    engine: &Engine,
    user: &str,
    amount: f64,
    country: Option<&str>,
    rates: &[String],
    json: bool,
) -> Result<()> {
    let overrides = parse_rate_overrides(rates)?;
    let country = resolve_country(engine, user, country).await?;
    let set_aside = engine.tax_set_aside(amount, &country, &overrides)?;

    if json {
        return print_json(&serde_json::to_value(&set_aside)?);
    }

    println!();
    println!(
        "🫙 Set-aside for {:.2} ({})",
        set_aside.amount, set_aside.jurisdiction
    );
    println!("   ─────────────────────────────────────────────");
    for component in &set_aside.breakdown {
        println!(
            "   {:<18} {:>6.2}%  {:>12.2}",
            component.name,
            component.rate * 100.0,
            component.amount
        );
    }
    println!("   ─────────────────────────────────────────────");
    println!(
        "   {:<18} {:>6.2}%  {:>12.2}",
        "Total",
        set_aside.effective_rate * 100.0,
        set_aside.total_set_aside
    );
    Ok(())
}

pub async fn cmd_due_dates(
    engine: &Engine,
    user: &str,
    country: Option<&str>,
    json: bool,
) -> Result<()> {
    let country = resolve_country(engine, user, country).await?;
    let jurisdiction = Jurisdiction::from_country(&country)?;
    let due_dates = engine.get_upcoming_due_dates(jurisdiction);

    if json {
        return print_json(&serde_json::to_value(&due_dates)?);
    }

    if due_dates.is_empty() {
        println!("No upcoming payment deadlines.");
        return Ok(());
    }

    println!();
    println!("📅 Upcoming payment deadlines ({})", jurisdiction);
    println!("   ─────────────────────────────────────────────");
    for due in due_dates {
        let marker = if due.is_past_due {
            "⚠️  past due"
        } else if due.is_urgent {
            "⏰ due soon"
        } else {
            ""
        };
        println!(
            "   {:<14} {}  in {:>3} days  {}",
            due.period, due.due_date, due.days_until, marker
        );
    }
    Ok(())
}
