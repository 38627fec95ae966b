//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Coffer - Classify creator income and expenses and estimate taxes
#[derive(Parser)]
#[command(name = "coffer")]
#[command(about = "Transaction classification and tax estimation for creators", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "coffer.db", global = true)]
    pub db: PathBuf,

    /// User whose data the command reads and writes
    #[arg(short, long, default_value = "default", global = true)]
    pub user: String,

    /// Taxonomy file (defaults to the data-dir override, then the built-in taxonomy)
    #[arg(long, global = true)]
    pub taxonomy: Option<PathBuf>,

    /// Tax configuration file (defaults to the data-dir override, then the built-in tables)
    #[arg(long, global = true)]
    pub tax_config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and show where configuration is read from
    Init,

    /// Classify a transaction
    Classify {
        #[command(flatten)]
        transaction: TransactionArgs,

        /// Save the transaction with its classification
        #[arg(long)]
        save: bool,
    },

    /// Suggest taxonomy categories for a description
    Suggest {
        /// Free-text description
        description: String,

        /// Maximum number of suggestions
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Record a correction to a classification
    Correct {
        #[command(flatten)]
        transaction: TransactionArgs,

        /// Correct category
        #[arg(long)]
        category: Option<String>,

        /// Correct business classification: business, personal, mixed, unknown
        #[arg(long)]
        business: Option<String>,

        /// Whether the expense is tax deductible
        #[arg(long)]
        deductible: Option<bool>,
    },

    /// Retrain the user's adaptive classifier from their corrections
    Train,

    /// Show or update the user's tax profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },

    /// Estimate taxes for a year or quarter
    Taxes {
        /// Tax year
        #[arg(short, long)]
        year: i32,

        /// Quarter (1-4); omit for the full year
        #[arg(short, long)]
        quarter: Option<u8>,
    },

    /// Suggested set-aside for one incoming transaction
    Jar {
        /// Transaction amount
        #[arg(allow_hyphen_values = true)]
        amount: f64,

        /// Transaction type: income, expense, transfer
        #[arg(short = 't', long = "type", default_value = "income")]
        transaction_type: String,
    },

    /// Split an amount into per-component tax set-asides
    SetAside {
        /// Amount to set aside from
        amount: f64,

        /// Country (defaults to the profile's country)
        #[arg(short, long)]
        country: Option<String>,

        /// Override a component rate, e.g. --rate state=0.0 (repeatable)
        #[arg(long = "rate")]
        rates: Vec<String>,
    },

    /// Upcoming quarterly payment deadlines
    DueDates {
        /// Country (defaults to the profile's country)
        #[arg(short, long)]
        country: Option<String>,
    },

    /// List taxonomy categories
    Categories {
        /// Only categories relevant to a platform (e.g. youtube, twitch)
        #[arg(short, long)]
        platform: Option<String>,
    },
}

/// A transaction described on the command line
#[derive(clap::Args, Clone)]
pub struct TransactionArgs {
    /// Transaction description
    pub description: String,

    /// Amount (negative for money out)
    #[arg(allow_hyphen_values = true)]
    pub amount: f64,

    /// Transaction type: income, expense, transfer
    #[arg(short = 't', long = "type", default_value = "expense")]
    pub transaction_type: String,

    /// Date (YYYY-MM-DD, defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,

    /// Merchant name
    #[arg(short, long)]
    pub merchant: Option<String>,

    /// Category supplied by the bank or aggregator (repeatable)
    #[arg(long = "external")]
    pub external_categories: Vec<String>,
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the tax profile
    Show,

    /// Update fields of the tax profile
    Set {
        /// Country: US or IN
        #[arg(long)]
        country: Option<String>,

        /// US filing status: single, married_filing_jointly, married_filing_separately, head_of_household
        #[arg(long)]
        filing_status: Option<String>,

        /// US state code
        #[arg(long)]
        state: Option<String>,

        /// Flat state rate overriding the state table
        #[arg(long)]
        state_rate: Option<f64>,

        /// Indian tax regime: new or old
        #[arg(long)]
        regime: Option<String>,

        /// Opt into section 44ADA presumptive taxation
        #[arg(long)]
        presumptive: Option<bool>,

        /// Section 80C investments
        #[arg(long)]
        section_80c: Option<f64>,

        /// Section 80D health insurance premiums
        #[arg(long)]
        section_80d: Option<f64>,

        /// Section 80E education loan interest
        #[arg(long)]
        section_80e: Option<f64>,

        /// Senior citizen (raises the 80D cap)
        #[arg(long)]
        senior_citizen: Option<bool>,
    },
}
