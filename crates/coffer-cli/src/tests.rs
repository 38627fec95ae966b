//! CLI command tests
//!
//! Commands run against an engine over a temporary database.

use coffer_core::{DateRange, Engine, FilingStatus, TaxRegime, TransactionType};
use tempfile::TempDir;

use crate::cli::TransactionArgs;
use crate::commands::{self, truncate, ProfileUpdate};

fn setup_engine() -> (TempDir, Engine) {
    let dir = TempDir::new().unwrap();
    let engine = commands::open_engine(&dir.path().join("coffer.db"), None, None).unwrap();
    (dir, engine)
}

fn tx_args(description: &str, amount: f64, transaction_type: &str) -> TransactionArgs {
    TransactionArgs {
        description: description.to_string(),
        amount,
        transaction_type: transaction_type.to_string(),
        date: Some("2024-03-15".to_string()),
        merchant: None,
        external_categories: Vec::new(),
    }
}

fn year_2024() -> DateRange {
    DateRange::new(
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
    )
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a longer description", 10), "a longe...");
    assert_eq!(truncate("café au lait", 6), "caf...");
}

#[test]
fn test_parse_transaction() {
    let mut args = tx_args("Adobe Creative Cloud", -59.99, "expense");
    args.merchant = Some("Adobe".to_string());
    args.external_categories = vec!["Software".to_string()];

    let tx = commands::parse_transaction(&args).unwrap();
    assert_eq!(tx.description, "Adobe Creative Cloud");
    assert_eq!(tx.transaction_type, TransactionType::Expense);
    assert_eq!(tx.date.to_string(), "2024-03-15");
    assert_eq!(tx.merchant_name.as_deref(), Some("Adobe"));
    assert_eq!(tx.external_categories, vec!["Software".to_string()]);
}

#[test]
fn test_parse_transaction_rejects_bad_input() {
    let mut args = tx_args("Coffee", -4.5, "expense");
    args.date = Some("15/03/2024".to_string());
    assert!(commands::parse_transaction(&args).is_err());

    let args = tx_args("Coffee", -4.5, "refund");
    assert!(commands::parse_transaction(&args).is_err());
}

// ========== Init Tests ==========

#[test]
fn test_cmd_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fresh.db");
    commands::cmd_init(&path, None, None).unwrap();
    assert!(path.exists());
}

#[test]
fn test_cmd_init_rejects_missing_taxonomy_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");
    let result = commands::cmd_init(&dir.path().join("fresh.db"), Some(&missing), None);
    assert!(result.is_err());
}

// ========== Classification Tests ==========

#[tokio::test]
async fn test_cmd_classify_without_save_stores_nothing() {
    let (dir, engine) = setup_engine();
    let args = tx_args("Adobe Creative Cloud", -59.99, "expense");

    commands::cmd_classify(&engine, "alice", &args, false, false)
        .await
        .unwrap();

    let db = commands::open_db(&dir.path().join("coffer.db")).unwrap();
    let saved = db.list_transactions("alice", year_2024(), None).unwrap();
    assert!(saved.is_empty());
}

#[tokio::test]
async fn test_cmd_classify_save_persists_classification() {
    let (dir, engine) = setup_engine();
    let args = tx_args("Adobe Creative Cloud", -59.99, "expense");

    commands::cmd_classify(&engine, "alice", &args, true, true)
        .await
        .unwrap();
    // Same transaction again is deduplicated
    commands::cmd_classify(&engine, "alice", &args, true, false)
        .await
        .unwrap();

    let db = commands::open_db(&dir.path().join("coffer.db")).unwrap();
    let saved = db.list_transactions("alice", year_2024(), None).unwrap();
    assert_eq!(saved.len(), 1);
    let classification = saved[0].classification.as_ref().unwrap();
    assert!(!classification.is_uncategorized());
}

#[test]
fn test_cmd_suggest_and_categories() {
    let (_dir, engine) = setup_engine();
    commands::cmd_suggest(&engine, "adobe software subscription", 3, false).unwrap();
    commands::cmd_suggest(&engine, "zzzz", 3, true).unwrap();
    commands::cmd_categories(&engine, None, false).unwrap();
    commands::cmd_categories(&engine, Some("youtube"), true).unwrap();
}

// ========== Correction Tests ==========

#[tokio::test]
async fn test_cmd_correct_requires_a_field() {
    let (_dir, engine) = setup_engine();
    let args = tx_args("Starbucks", -18.0, "expense");
    let result = commands::cmd_correct(&engine, "alice", &args, None, None, None, false).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_correct_rejects_unknown_business_value() {
    let (_dir, engine) = setup_engine();
    let args = tx_args("Starbucks", -18.0, "expense");
    let result =
        commands::cmd_correct(&engine, "alice", &args, None, Some("sideways"), None, false).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_correct_then_train() {
    let (_dir, engine) = setup_engine();
    let needed = engine.taxonomy().settings().min_training_examples;

    commands::cmd_train(&engine, "alice", false).await.unwrap();
    assert!(engine.model_info("alice").is_none());

    for i in 0..needed {
        let args = tx_args(&format!("Starbucks client meeting {}", i), -18.0, "expense");
        commands::cmd_correct(
            &engine,
            "alice",
            &args,
            Some("meals".to_string()),
            Some("business"),
            Some(true),
            false,
        )
        .await
        .unwrap();
    }

    commands::cmd_train(&engine, "alice", true).await.unwrap();
    let info = engine.model_info("alice").unwrap();
    assert_eq!(info.training_examples, needed);
}

// ========== Profile Tests ==========

#[tokio::test]
async fn test_cmd_profile_set_updates_stored_profile() {
    let (_dir, engine) = setup_engine();
    commands::cmd_profile_show(&engine, "alice", false).await.unwrap();

    let update = ProfileUpdate {
        country: Some("us".to_string()),
        filing_status: Some("married_filing_jointly".to_string()),
        state: Some("ca".to_string()),
        ..Default::default()
    };
    commands::cmd_profile_set(&engine, "alice", update).await.unwrap();

    let profile = engine.profile("alice").await.unwrap();
    assert_eq!(profile.country, "US");
    assert_eq!(profile.filing_status, FilingStatus::MarriedFilingJointly);
    assert_eq!(profile.state.as_deref(), Some("CA"));
}

#[tokio::test]
async fn test_cmd_profile_set_india() {
    let (_dir, engine) = setup_engine();
    let update = ProfileUpdate {
        country: Some("IN".to_string()),
        regime: Some("old".to_string()),
        presumptive: Some(true),
        section_80c: Some(150_000.0),
        section_80d: Some(-5.0),
        ..Default::default()
    };
    commands::cmd_profile_set(&engine, "priya", update).await.unwrap();
    commands::cmd_profile_show(&engine, "priya", true).await.unwrap();

    let profile = engine.profile("priya").await.unwrap();
    assert_eq!(profile.tax_regime, TaxRegime::Old);
    assert!(profile.presumptive_taxation);
    assert_eq!(profile.section_80c, 150_000.0);
    assert_eq!(profile.section_80d, 0.0);
}

#[tokio::test]
async fn test_cmd_profile_set_rejects_invalid_values() {
    let (_dir, engine) = setup_engine();

    let unsupported = ProfileUpdate {
        country: Some("FR".to_string()),
        ..Default::default()
    };
    assert!(commands::cmd_profile_set(&engine, "alice", unsupported)
        .await
        .is_err());

    let bad_rate = ProfileUpdate {
        state_rate: Some(1.5),
        ..Default::default()
    };
    assert!(commands::cmd_profile_set(&engine, "alice", bad_rate)
        .await
        .is_err());

    // Nothing was stored
    assert_eq!(engine.profile("alice").await.unwrap().country, "US");
}

// ========== Tax Tests ==========

#[tokio::test]
async fn test_cmd_taxes_on_saved_transactions() {
    let (_dir, engine) = setup_engine();
    let income = tx_args("YouTube AdSense payout", 12_000.0, "income");
    let expense = tx_args("Adobe Creative Cloud", -59.99, "expense");
    commands::cmd_classify(&engine, "alice", &income, true, false)
        .await
        .unwrap();
    commands::cmd_classify(&engine, "alice", &expense, true, false)
        .await
        .unwrap();

    commands::cmd_taxes(&engine, "alice", 2024, Some(1), false)
        .await
        .unwrap();
    commands::cmd_taxes(&engine, "alice", 2024, None, true)
        .await
        .unwrap();

    assert!(commands::cmd_taxes(&engine, "alice", 2024, Some(5), false)
        .await
        .is_err());
}

#[tokio::test]
async fn test_cmd_jar() {
    let (_dir, engine) = setup_engine();
    commands::cmd_jar(&engine, "alice", 1_200.0, "income", false)
        .await
        .unwrap();
    commands::cmd_jar(&engine, "alice", -40.0, "expense", true)
        .await
        .unwrap();
    assert!(commands::cmd_jar(&engine, "alice", 100.0, "gift", false)
        .await
        .is_err());
}

#[tokio::test]
async fn test_cmd_set_aside() {
    let (_dir, engine) = setup_engine();
    commands::cmd_set_aside(&engine, "alice", 1_000.0, None, &[], false)
        .await
        .unwrap();
    commands::cmd_set_aside(
        &engine,
        "alice",
        1_000.0,
        Some("US"),
        &["state=0".to_string()],
        true,
    )
    .await
    .unwrap();
    commands::cmd_set_aside(&engine, "alice", 1_000.0, Some("IN"), &[], false)
        .await
        .unwrap();

    assert!(
        commands::cmd_set_aside(&engine, "alice", 1_000.0, Some("FR"), &[], false)
            .await
            .is_err()
    );
    assert!(commands::cmd_set_aside(
        &engine,
        "alice",
        1_000.0,
        None,
        &["bogus=0.1".to_string()],
        false
    )
    .await
    .is_err());
}

#[tokio::test]
async fn test_cmd_due_dates() {
    let (_dir, engine) = setup_engine();
    commands::cmd_due_dates(&engine, "alice", None, false)
        .await
        .unwrap();
    commands::cmd_due_dates(&engine, "alice", Some("india"), true)
        .await
        .unwrap();
    assert!(commands::cmd_due_dates(&engine, "alice", Some("FR"), false)
        .await
        .is_err());
}
