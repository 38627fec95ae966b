//! Integration tests for coffer-core
//!
//! These tests exercise the classify → correct → retrain and
//! transactions → taxes → tax jar workflows through the engine facade.

use std::collections::HashMap;
use std::sync::Arc;

use coffer_core::tax::{brackets::TaxBracket, us, BracketTable};
use coffer_core::test_utils::{date, memory_engine, CountingClassifier, FailingStore};
use coffer_core::{
    BusinessClassification, ClassificationSource, Database, Engine, Error, FilingStatus,
    Jurisdiction, MemoryStore, ProfileStore, Stores, TaxComponents, TaxConfig, TaxProfile,
    TaxRegime, Taxonomy, TransactionInput, TransactionType, UserCorrection,
};

fn counting_engine() -> (Engine, CountingClassifier) {
    let counting = CountingClassifier::new();
    let engine = Engine::with_classifier_factory(
        Taxonomy::embedded().expect("embedded taxonomy"),
        TaxConfig::embedded().expect("embedded tax config"),
        Stores::shared(Arc::new(MemoryStore::new())),
        counting.factory(),
    );
    (engine, counting)
}

fn expense(description: &str, amount: f64) -> TransactionInput {
    TransactionInput::new(description, amount, date(2024, 5, 10), TransactionType::Expense)
}

fn income(description: &str, amount: f64, month: u32) -> TransactionInput {
    TransactionInput::new(description, amount, date(2024, month, 1), TransactionType::Income)
}

async fn correct_n(engine: &Engine, user_id: &str, n: usize) -> usize {
    let mut retrains = 0;
    for i in 0..n {
        let tx = expense(&format!("Starbucks client meeting {}", i), -18.0);
        let prediction = engine.classify(&tx, Some(user_id)).unwrap();
        let correction = UserCorrection {
            category: Some("meals".to_string()),
            business_classification: Some(BusinessClassification::Business),
            is_deductible: Some(true),
        };
        let outcome = engine
            .record_correction(user_id, &tx, &correction, &prediction)
            .await
            .unwrap();
        assert_eq!(outcome.total_corrections, i + 1);
        if outcome.retrained {
            retrains += 1;
        }
    }
    retrains
}

// =============================================================================
// Classification Workflow
// =============================================================================

#[tokio::test]
async fn test_ten_corrections_trigger_exactly_one_retrain() {
    let (engine, counting) = counting_engine();
    assert_eq!(correct_n(&engine, "alice", 10).await, 1);
    assert_eq!(counting.train_calls(), 1);
    assert_eq!(engine.model_info("alice").unwrap().training_examples, 10);
}

#[tokio::test]
async fn test_nineteen_corrections_still_one_retrain() {
    let (engine, counting) = counting_engine();
    assert_eq!(correct_n(&engine, "alice", 19).await, 1);
    assert_eq!(counting.train_calls(), 1);
}

#[tokio::test]
async fn test_corrections_teach_the_classifier() {
    let (engine, _) = memory_engine();
    let tx = expense("Starbucks client meeting", -18.0);

    let before = engine.classify(&tx, Some("alice")).unwrap();
    assert_eq!(before.category.primary, "dining");
    assert_eq!(before.source, ClassificationSource::Rules);

    correct_n(&engine, "alice", 10).await;

    let after = engine.classify(&tx, Some("alice")).unwrap();
    assert_eq!(after.category.primary, "meals");
    assert_eq!(after.source, ClassificationSource::Adaptive);
    assert_eq!(after.business_classification, BusinessClassification::Business);
    assert!(after.tax_deductible.is_deductible);

    // Anonymous and other users keep the rules
    assert_eq!(engine.classify(&tx, None).unwrap().category.primary, "dining");
    assert_eq!(engine.classify(&tx, Some("bob")).unwrap().category.primary, "dining");
}

#[tokio::test]
async fn test_explicit_training_below_minimum_is_not_an_error() {
    let (engine, _) = memory_engine();
    correct_n(&engine, "alice", 3).await;
    assert!(!engine.train_model("alice").await.unwrap());
    assert!(engine.model_info("alice").is_none());
}

#[test]
fn test_confidences_stay_in_unit_range() {
    let (engine, _) = memory_engine();
    let texts = [
        "YouTube AdSense payment",
        "Adobe Creative Cloud Photoshop Lightroom software subscription",
        "Elgato Stream Deck",
        "Comcast internet",
        "zzqx",
    ];
    for text in texts {
        for transaction_type in [TransactionType::Income, TransactionType::Expense] {
            let tx = TransactionInput::new(text, 10.0, date(2024, 1, 1), transaction_type);
            let result = engine.classify(&tx, None).unwrap();
            assert!((0.0..=1.0).contains(&result.category.confidence));
            assert!((0.0..=1.0).contains(&result.tax_deductible.confidence));
        }
    }
}

// =============================================================================
// Tax Workflow
// =============================================================================

#[tokio::test]
async fn test_us_taxes_from_saved_transactions() {
    let (engine, store) = memory_engine();
    engine
        .classify_and_save("alice", &income("YouTube AdSense payment", 60_000.0, 2))
        .await
        .unwrap();
    engine
        .classify_and_save("alice", &income("YouTube AdSense payment", 40_000.0, 8))
        .await
        .unwrap();
    engine
        .classify_and_save("alice", &expense("Adobe Creative Cloud", -600.0))
        .await
        .unwrap();
    engine
        .classify_and_save("alice", &expense("Whole Foods grocery run", -300.0))
        .await
        .unwrap();

    let result = engine.calculate_taxes("alice", 2024, None).await.unwrap();
    assert_eq!(result.income.business, 100_000.0);
    assert_eq!(result.expenses.deductible, 600.0);
    assert_eq!(result.expenses.personal, 300.0);

    let config = engine.tax_config();
    let TaxComponents::Us(breakdown) = &result.taxes else {
        panic!("expected a US breakdown");
    };
    let taxable = 100_000.0 - 600.0 - config.us.standard_deduction(FilingStatus::Single);
    assert!((breakdown.taxable_income - taxable).abs() < 1e-6);
    let federal = us::federal_tax(&config.us, taxable, FilingStatus::Single);
    assert!((breakdown.federal - federal).abs() < 1e-6);
    assert!(
        (breakdown.self_employment - us::self_employment_tax(&config.us, 99_400.0)).abs() < 1e-6
    );
    assert!(
        (result.total_tax_owed - (breakdown.federal + breakdown.state + breakdown.self_employment))
            .abs()
            < 1e-6
    );
    assert!((result.estimated_quarterly_payment - result.total_tax_owed / 4.0).abs() < 1e-6);
    assert_eq!(store.snapshot_count("alice").unwrap(), 1);

    // The jar now uses the snapshot's effective rate
    let jar = engine
        .calculate_real_time_tax_jar("alice", 1000.0, TransactionType::Income)
        .await
        .unwrap();
    let rate = result.total_tax_owed / result.income.business;
    assert!((jar.tax_rate - rate).abs() < 1e-9);
    assert!((jar.amount_to_set_aside - 1000.0 * rate).abs() < 1e-6);
}

#[tokio::test]
async fn test_calculate_taxes_is_idempotent_and_keeps_history() {
    let (engine, store) = memory_engine();
    engine
        .classify_and_save("alice", &income("Patreon payout", 12_000.0, 3))
        .await
        .unwrap();

    let first = engine.calculate_taxes("alice", 2024, Some(1)).await.unwrap();
    let second = engine.calculate_taxes("alice", 2024, Some(1)).await.unwrap();
    assert_eq!(first.taxes, second.taxes);
    assert_eq!(first.total_tax_owed, second.total_tax_owed);
    assert_eq!(first.income, second.income);
    assert_eq!(store.snapshot_count("alice").unwrap(), 2);
}

#[tokio::test]
async fn test_jar_defaults_without_snapshot() {
    let (engine, _) = memory_engine();
    let jar = engine
        .calculate_real_time_tax_jar("alice", 2000.0, TransactionType::Income)
        .await
        .unwrap();
    assert_eq!(jar.tax_rate, 0.25);
    assert_eq!(jar.amount_to_set_aside, 500.0);

    let expense = engine
        .calculate_real_time_tax_jar("alice", -50.0, TransactionType::Expense)
        .await
        .unwrap();
    assert_eq!(expense.amount_to_set_aside, 0.0);
}

#[tokio::test]
async fn test_india_presumptive_profile() {
    let (engine, _) = memory_engine();
    let mut profile = TaxProfile::india(TaxRegime::New);
    profile.presumptive_taxation = true;
    engine.set_profile("priya", &profile).await.unwrap();
    engine
        .classify_and_save("priya", &income("YouTube AdSense payment", 3_000_000.0, 6))
        .await
        .unwrap();

    let result = engine.calculate_taxes("priya", 2024, None).await.unwrap();
    assert_eq!(result.jurisdiction(), Jurisdiction::India);
    let TaxComponents::India(breakdown) = &result.taxes else {
        panic!("expected an Indian breakdown");
    };
    let presumptive = breakdown.presumptive.expect("presumptive assessment");
    assert!(presumptive.applicable);
    assert_eq!(presumptive.profit, 1_500_000.0);
    assert_eq!(breakdown.taxable_income, 1_500_000.0);
    assert!(breakdown.gst.required);
}

#[test]
fn test_presumptive_limit() {
    let (engine, _) = memory_engine();
    let within = engine.presumptive_tax(3_000_000.0).unwrap();
    assert!(within.applicable);
    assert_eq!(within.profit, 1_500_000.0);

    let over = engine.presumptive_tax(6_000_000.0).unwrap();
    assert!(!over.applicable);
    assert_eq!(over.profit, 0.0);
}

#[test]
fn test_set_aside_defaults_and_overrides() {
    let (engine, _) = memory_engine();
    let india = engine.tax_set_aside(1000.0, "India", &HashMap::new()).unwrap();
    assert!((india.total_set_aside - 300.0).abs() < 1e-9);

    let us_default = engine.tax_set_aside(1000.0, "US", &HashMap::new()).unwrap();
    assert!((us_default.total_set_aside - 300.0).abs() < 1e-9);
    assert_eq!(us_default.breakdown.len(), 3);

    let overrides = HashMap::from([("state".to_string(), 0.0)]);
    let no_state = engine.tax_set_aside(1000.0, "US", &overrides).unwrap();
    assert!((no_state.total_set_aside - 250.0).abs() < 1e-9);
    assert!((no_state.effective_rate - 0.25).abs() < 1e-9);
}

#[test]
fn test_federal_tax_zero_and_bracket_validation() {
    let config = TaxConfig::embedded().unwrap();
    assert_eq!(us::federal_tax(&config.us, 0.0, FilingStatus::Single), 0.0);
    assert_eq!(us::federal_tax(&config.us, -500.0, FilingStatus::Single), 0.0);

    let gap = BracketTable::new(
        "gap",
        vec![
            TaxBracket { min: 0.0, max: Some(100.0), rate: 0.1 },
            TaxBracket { min: 150.0, max: None, rate: 0.2 },
        ],
    );
    assert!(matches!(gap, Err(Error::Config(_))));
}

#[test]
fn test_upcoming_due_dates_are_sorted() {
    let (engine, _) = memory_engine();
    for jurisdiction in [Jurisdiction::Us, Jurisdiction::India] {
        let dates = engine.get_upcoming_due_dates(jurisdiction);
        assert!(!dates.is_empty());
        assert!(dates
            .windows(2)
            .all(|w| w[0].days_until.abs() <= w[1].days_until.abs()));
        for due in &dates {
            assert_eq!(due.is_past_due, due.days_until < 0);
            assert_eq!(due.is_urgent, (0..=30).contains(&due.days_until));
        }
    }
}

// =============================================================================
// Error Propagation
// =============================================================================

#[tokio::test]
async fn test_unsupported_jurisdiction_is_an_error() {
    let (engine, store) = memory_engine();
    let mut profile = TaxProfile::default();
    profile.country = "FR".to_string();
    store.put("marie", &profile).await.unwrap();

    let result = engine.calculate_taxes("marie", 2024, None).await;
    assert!(matches!(result, Err(Error::UnsupportedJurisdiction(_))));
    assert!(matches!(
        engine.tax_set_aside(100.0, "FR", &HashMap::new()),
        Err(Error::UnsupportedJurisdiction(_))
    ));
}

#[tokio::test]
async fn test_invalid_quarter_is_rejected() {
    let (engine, _) = memory_engine();
    let result = engine.calculate_taxes("alice", 2024, Some(5)).await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_store_failures_propagate() {
    let engine = Engine::new(
        Taxonomy::embedded().unwrap(),
        TaxConfig::embedded().unwrap(),
        Stores::shared(Arc::new(FailingStore)),
    );
    assert!(matches!(
        engine.calculate_taxes("alice", 2024, None).await,
        Err(Error::Store(_))
    ));
    assert!(matches!(
        engine
            .calculate_real_time_tax_jar("alice", 10.0, TransactionType::Income)
            .await,
        Err(Error::Store(_))
    ));

    let tx = expense("Adobe Creative Cloud", -60.0);
    let prediction = engine.classify(&tx, Some("alice")).unwrap();
    let correction = UserCorrection {
        category: Some("software".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        engine
            .record_correction("alice", &tx, &correction, &prediction)
            .await,
        Err(Error::Store(_))
    ));
}

// =============================================================================
// SQLite Store
// =============================================================================

#[tokio::test]
async fn test_engine_over_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coffer.db");
    let db = Arc::new(Database::new(path.to_str().unwrap()).unwrap());
    let engine = Engine::new(
        Taxonomy::embedded().unwrap(),
        TaxConfig::embedded().unwrap(),
        Stores::shared(db.clone()),
    );

    engine
        .classify_and_save("alice", &income("YouTube AdSense payment", 50_000.0, 4))
        .await
        .unwrap();
    // Saving the same transaction again does not double count it
    engine
        .classify_and_save("alice", &income("YouTube AdSense payment", 50_000.0, 4))
        .await
        .unwrap();

    let result = engine.calculate_taxes("alice", 2024, None).await.unwrap();
    assert_eq!(result.income.total, 50_000.0);
    assert_eq!(db.count_snapshots("alice").unwrap(), 1);
    assert_eq!(ProfileStore::get(db.as_ref(), "alice").await.unwrap(), None);
}
