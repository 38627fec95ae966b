//! Correction and training command implementations

use anyhow::{bail, Result};
use coffer_core::{BusinessClassification, Engine, UserCorrection};
use serde_json::json;

use super::{parse_transaction, print_json, truncate};
use crate::cli::TransactionArgs;

pub async fn cmd_correct(
    engine: &Engine,
    user: &str,
    args: &TransactionArgs,
    category: Option<String>,
    business: Option<&str>,
    deductible: Option<bool>,
    json: bool,
) -> Result<()> {
    if category.is_none() && business.is_none() && deductible.is_none() {
        bail!("Nothing to correct: pass --category, --business or --deductible");
    }
    let business = business
        .map(|b| b.parse::<BusinessClassification>())
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let tx = parse_transaction(args)?;
    engine.train_model(user).await?;
    let prediction = engine.classify(&tx, Some(user))?;

    let correction = UserCorrection {
        category,
        business_classification: business,
        is_deductible: deductible,
    };
    let outcome = engine
        .record_correction(user, &tx, &correction, &prediction)
        .await?;

    if json {
        return print_json(&json!({ "prediction": prediction, "outcome": outcome }));
    }

    println!(
        "✏️  Recorded {} for '{}'",
        outcome.correction_type,
        truncate(&tx.description, 40)
    );
    println!(
        "   Was: {} ({})",
        prediction.category.primary, prediction.business_classification
    );
    println!("   Corrections on file: {}", outcome.total_corrections);
    if outcome.retrained {
        println!("   🧠 Personal classifier retrained");
    }
    Ok(())
}

pub async fn cmd_train(engine: &Engine, user: &str, json: bool) -> Result<()> {
    let trained = engine.train_model(user).await?;
    let info = engine.model_info(user);

    if json {
        return print_json(&json!({ "trained": trained, "model": info }));
    }

    match info {
        Some(info) if trained => println!(
            "🧠 Trained classifier for {} on {} corrections",
            user, info.training_examples
        ),
        _ => {
            let needed = engine.taxonomy().settings().min_training_examples;
            println!(
                "⚠️  Not enough corrections to train yet (need at least {}).",
                needed
            );
            println!("   Record some with: coffer correct \"<description>\" <amount> --category <name>");
        }
    }
    Ok(())
}
