//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Database/engine setup and `init`
//! - `classify` - Classification, suggestions and the category listing
//! - `corrections` - Recording corrections and retraining
//! - `profile` - Tax profile show/set
//! - `taxes` - Tax estimates, the tax jar, set-asides and due dates

pub mod classify;
pub mod core;
pub mod corrections;
pub mod profile;
pub mod taxes;

// Re-export command functions for main.rs
pub use classify::*;
pub use core::*;
pub use corrections::*;
pub use profile::*;
pub use taxes::*;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use coffer_core::{TransactionInput, TransactionType};

use crate::cli::TransactionArgs;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Pretty-print a JSON value on stdout
pub fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn parse_transaction_type(s: &str) -> Result<TransactionType> {
    s.parse().map_err(anyhow::Error::msg)
}

/// Build a transaction from command-line arguments
pub fn parse_transaction(args: &TransactionArgs) -> Result<TransactionInput> {
    let date = match args.date.as_deref() {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", d))?,
        None => Local::now().date_naive(),
    };
    let mut tx = TransactionInput::new(
        args.description.clone(),
        args.amount,
        date,
        parse_transaction_type(&args.transaction_type)?,
    )
    .with_external_categories(args.external_categories.clone());
    if let Some(merchant) = &args.merchant {
        tx = tx.with_merchant(merchant.clone());
    }
    Ok(tx)
}

/// Format a money amount, red for money out and green for money in
pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("\x1b[31m-{:.2}\x1b[0m", amount.abs())
    } else {
        format!("\x1b[32m{:.2}\x1b[0m", amount)
    }
}
