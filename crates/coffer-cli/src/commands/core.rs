//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `open_engine` - Engine over the database with the resolved configuration
//! - `cmd_init` - Initialize the database

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use coffer_core::{taxonomy, Database, Engine, Stores, TaxConfig, Taxonomy};

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    Database::new(path_str).context("Failed to open database")
}

pub fn open_engine(
    db_path: &Path,
    taxonomy_path: Option<&Path>,
    tax_config_path: Option<&Path>,
) -> Result<Engine> {
    let db = Arc::new(open_db(db_path)?);
    let taxonomy = Taxonomy::load(taxonomy_path).context("Failed to load taxonomy")?;
    let tax_config = TaxConfig::load(tax_config_path).context("Failed to load tax configuration")?;
    tracing::debug!(
        "Opened {} with taxonomy v{} and tax tables v{}",
        db_path.display(),
        taxonomy.version(),
        tax_config.version
    );
    Ok(Engine::new(taxonomy, tax_config, Stores::shared(db)))
}

pub fn cmd_init(
    db_path: &Path,
    taxonomy_path: Option<&Path>,
    tax_config_path: Option<&Path>,
) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;
    let taxonomy = Taxonomy::load(taxonomy_path).context("Failed to load taxonomy")?;
    let tax_config = TaxConfig::load(tax_config_path).context("Failed to load tax configuration")?;

    println!(
        "   Taxonomy v{}: {} categories, {} override rules",
        taxonomy.version(),
        taxonomy.categories().len(),
        taxonomy.overrides().len()
    );
    println!("   Tax tables v{}", tax_config.version);
    if let Some(path) = taxonomy::default_config_path() {
        println!("   Taxonomy override path: {}", path.display());
    }
    if let Some(path) = coffer_core::tax::config::default_config_path() {
        println!("   Tax config override path: {}", path.display());
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Set your tax profile: coffer profile set --country US --state CA");
    println!("  2. Classify a transaction: coffer classify \"Adobe Creative Cloud\" -59.99 --save");
    println!("  3. Estimate taxes: coffer taxes --year 2024");

    Ok(())
}
