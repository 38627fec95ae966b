//! Classification command implementations

use anyhow::Result;
use coffer_core::{ClassificationResult, Engine};
use serde_json::json;

use super::{format_amount, parse_transaction, print_json, truncate};
use crate::cli::TransactionArgs;

pub async fn cmd_classify(
    engine: &Engine,
    user: &str,
    args: &TransactionArgs,
    save: bool,
    json: bool,
) -> Result<()> {
    let tx = parse_transaction(args)?;
    // Models live only in memory, so rebuild this user's from stored corrections
    if engine.train_model(user).await? {
        tracing::debug!("Using personal classifier for {}", user);
    }

    let (id, result) = if save {
        let (id, result) = engine.classify_and_save(user, &tx).await?;
        (Some(id), result)
    } else {
        (None, engine.classify(&tx, Some(user))?)
    };

    if json {
        return print_json(&json!({ "id": id, "classification": result }));
    }

    println!();
    println!(
        "🏷️  {} │ {}",
        format_amount(tx.amount),
        truncate(&tx.description, 50)
    );
    print_classification(&result);
    if let Some(id) = id {
        println!("   Saved as transaction #{}", id);
    }
    Ok(())
}

pub fn print_classification(result: &ClassificationResult) {
    println!("   ─────────────────────────────────────────────");
    println!(
        "   Category:   {} ({:.0}%)",
        result.category.detailed,
        result.category.confidence * 100.0
    );
    println!("   Type:       {}", result.business_classification);
    if result.tax_deductible.is_deductible {
        let kind = result
            .tax_deductible
            .deduction_type
            .map_or("other", |t| t.as_str());
        println!(
            "   Deductible: yes, {} at {:.0}% ({:.0}% confident)",
            kind,
            result.tax_deductible.deduction_percentage * 100.0,
            result.tax_deductible.confidence * 100.0
        );
    } else {
        println!("   Deductible: no");
    }
    println!("   Source:     {}", result.source.as_str());
}

pub fn cmd_suggest(engine: &Engine, description: &str, limit: usize, json: bool) -> Result<()> {
    let suggestions = engine.suggest_categories(description, limit);

    if json {
        return print_json(&serde_json::to_value(&suggestions)?);
    }

    if suggestions.is_empty() {
        println!("No matching categories for '{}'.", description);
        return Ok(());
    }

    println!();
    println!("💡 Suggestions for '{}'", truncate(description, 40));
    println!("   ─────────────────────────────────────────────");
    for s in suggestions {
        println!(
            "   {:<24} {:>5.0}%{}",
            s.category,
            s.confidence * 100.0,
            if s.tax_deductible { "  deductible" } else { "" }
        );
    }
    Ok(())
}

pub fn cmd_categories(engine: &Engine, platform: Option<&str>, json: bool) -> Result<()> {
    let taxonomy = engine.taxonomy();
    let categories: Vec<_> = match platform {
        Some(p) => taxonomy.categories_for_platform(p),
        None => taxonomy.categories().iter().collect(),
    };

    if json {
        let listed: Vec<_> = categories
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "group": c.group.as_str(),
                    "keywords": c.keywords,
                    "deductible": c.deductible,
                    "deduction_type": c.deduction_type.map(|t| t.as_str()),
                    "deduction_percentage": c.deduction_percentage,
                    "platforms": c.platforms,
                })
            })
            .collect();
        return print_json(&json!(listed));
    }

    if categories.is_empty() {
        println!("No categories found.");
        return Ok(());
    }

    println!();
    println!("📂 Categories (taxonomy v{})", taxonomy.version());
    println!("   ─────────────────────────────────────────────");
    for c in categories {
        let deduction = if c.deductible {
            format!("deductible {:.0}%", c.deduction_percentage * 100.0)
        } else {
            String::new()
        };
        println!("   {:<28} {:<18} {}", c.detailed(), deduction, c.keywords.join(", "));
    }
    Ok(())
}
