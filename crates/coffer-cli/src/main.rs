//! Coffer CLI - Creator transaction classification and tax estimation
//!
//! Usage:
//!   coffer init                              Initialize database
//!   coffer classify "Adobe CC" -59.99        Classify a transaction
//!   coffer correct "Starbucks" -18 --category meals
//!   coffer taxes --year 2024 --quarter 2     Estimate quarterly taxes
//!   coffer jar 1200                          Set-aside for a payment

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    if let Commands::Init = cli.command {
        return commands::cmd_init(&cli.db, cli.taxonomy.as_deref(), cli.tax_config.as_deref());
    }

    let engine = commands::open_engine(
        &cli.db,
        cli.taxonomy.as_deref(),
        cli.tax_config.as_deref(),
    )?;
    let user = cli.user.as_str();
    let json = cli.json;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Classify { transaction, save } => {
            commands::cmd_classify(&engine, user, &transaction, save, json).await
        }
        Commands::Suggest { description, limit } => {
            commands::cmd_suggest(&engine, &description, limit, json)
        }
        Commands::Correct {
            transaction,
            category,
            business,
            deductible,
        } => {
            commands::cmd_correct(
                &engine,
                user,
                &transaction,
                category,
                business.as_deref(),
                deductible,
                json,
            )
            .await
        }
        Commands::Train => commands::cmd_train(&engine, user, json).await,
        Commands::Profile { action } => match action {
            None | Some(ProfileAction::Show) => {
                commands::cmd_profile_show(&engine, user, json).await
            }
            Some(ProfileAction::Set {
                country,
                filing_status,
                state,
                state_rate,
                regime,
                presumptive,
                section_80c,
                section_80d,
                section_80e,
                senior_citizen,
            }) => {
                let update = commands::ProfileUpdate {
                    country,
                    filing_status,
                    state,
                    state_rate,
                    regime,
                    presumptive,
                    section_80c,
                    section_80d,
                    section_80e,
                    senior_citizen,
                };
                commands::cmd_profile_set(&engine, user, update).await
            }
        },
        Commands::Taxes { year, quarter } => {
            commands::cmd_taxes(&engine, user, year, quarter, json).await
        }
        Commands::Jar {
            amount,
            transaction_type,
        } => commands::cmd_jar(&engine, user, amount, &transaction_type, json).await,
        Commands::SetAside {
            amount,
            country,
            rates,
        } => {
            commands::cmd_set_aside(&engine, user, amount, country.as_deref(), &rates, json).await
        }
        Commands::DueDates { country } => {
            commands::cmd_due_dates(&engine, user, country.as_deref(), json).await
        }
        Commands::Categories { platform } => {
            commands::cmd_categories(&engine, platform.as_deref(), json)
        }
    }
}
