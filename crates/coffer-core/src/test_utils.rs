//! Test utilities for coffer-core
//!
//! Fixtures, an in-memory engine builder, a store that always fails and a
//! text classifier that counts its training runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::classify::{ClassifierFactory, NaiveBayes, RuleClassifier, TextClassifier};
use crate::corrections::{correction_type, extract_features};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::models::{
    ClassificationResult, ClassifiedTransaction, CorrectionRecord, DateRange,
    TaxCalculationResult, TaxProfile, TransactionInput, TransactionType, UserCorrection,
};
use crate::store::{
    CorrectionStore, MemoryStore, ProfileStore, SnapshotStore, Stores, TransactionStore,
};
use crate::tax::TaxConfig;
use crate::taxonomy::Taxonomy;
use crate::text;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A transaction classified by the embedded taxonomy's rules and overrides
pub fn classified(
    description: &str,
    amount: f64,
    date: NaiveDate,
    transaction_type: TransactionType,
) -> ClassifiedTransaction {
    let input = TransactionInput::new(description, amount, date, transaction_type);
    let rules = RuleClassifier::new(Arc::new(Taxonomy::embedded().unwrap()));
    let features = text::analyze(&input.text());
    let base = rules.classify(&features, transaction_type);
    let result = rules.apply_overrides(&features.normalized, transaction_type, base);
    ClassifiedTransaction::new(input, Some(result))
}

/// An expense correction moving an uncategorized prediction to `category`
pub fn correction_record(user_id: &str, description: &str, category: &str) -> CorrectionRecord {
    let transaction = TransactionInput::new(
        description,
        -25.0,
        date(2024, 1, 15),
        TransactionType::Expense,
    );
    let prediction = ClassificationResult::uncategorized();
    let correction = UserCorrection {
        category: Some(category.to_string()),
        ..Default::default()
    };
    CorrectionRecord {
        user_id: user_id.to_string(),
        correction_type: correction_type(&correction, &prediction),
        features: extract_features(&transaction),
        transaction,
        system_prediction: prediction,
        correction,
        created_at: Utc::now(),
    }
}

/// Engine over a fresh [`MemoryStore`] with the embedded configuration
pub fn memory_engine() -> (Engine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(
        Taxonomy::embedded().unwrap(),
        TaxConfig::embedded().unwrap(),
        Stores::shared(store.clone()),
    );
    (engine, store)
}

/// Naive Bayes wrapper that counts training runs across every instance
#[derive(Clone, Default)]
pub struct CountingClassifier {
    train_calls: Arc<AtomicUsize>,
    fail_predictions: bool,
}

impl CountingClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trains normally but errors on every prediction
    pub fn failing() -> Self {
        Self {
            fail_predictions: true,
            ..Self::default()
        }
    }

    pub fn train_calls(&self) -> usize {
        self.train_calls.load(Ordering::SeqCst)
    }

    pub fn factory(&self) -> ClassifierFactory {
        let template = self.clone();
        Arc::new(move || {
            Box::new(CountingModel {
                inner: NaiveBayes::new(),
                counter: template.clone(),
            }) as Box<dyn TextClassifier>
        })
    }
}

struct CountingModel {
    inner: NaiveBayes,
    counter: CountingClassifier,
}

impl TextClassifier for CountingModel {
    fn train(&mut self, examples: &[(String, String)]) -> Result<()> {
        self.counter.train_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.train(examples)
    }

    fn classify(&self, features: &str) -> Result<(String, f64)> {
        if self.counter.fail_predictions {
            return Err(Error::Training("prediction failure".to_string()));
        }
        self.inner.classify(features)
    }
}

/// Store whose every operation fails
pub struct FailingStore;

fn unavailable<T>() -> Result<T> {
    Err(Error::Store("store unavailable".to_string()))
}

#[async_trait]
impl TransactionStore for FailingStore {
    async fn query(
        &self,
        _user_id: &str,
        _range: DateRange,
        _transaction_type: Option<TransactionType>,
    ) -> Result<Vec<ClassifiedTransaction>> {
        unavailable()
    }

    async fn save(
        &self,
        _user_id: &str,
        _transaction: &TransactionInput,
        _classification: Option<&ClassificationResult>,
    ) -> Result<i64> {
        unavailable()
    }
}

#[async_trait]
impl CorrectionStore for FailingStore {
    async fn append(&self, _record: &CorrectionRecord) -> Result<()> {
        unavailable()
    }

    async fn count(&self, _user_id: &str) -> Result<usize> {
        unavailable()
    }

    async fn recent(&self, _user_id: &str, _limit: usize) -> Result<Vec<CorrectionRecord>> {
        unavailable()
    }
}

#[async_trait]
impl ProfileStore for FailingStore {
    async fn get(&self, _user_id: &str) -> Result<Option<TaxProfile>> {
        unavailable()
    }

    async fn put(&self, _user_id: &str, _profile: &TaxProfile) -> Result<()> {
        unavailable()
    }
}

#[async_trait]
impl SnapshotStore for FailingStore {
    async fn save_snapshot(&self, _snapshot: &TaxCalculationResult) -> Result<()> {
        unavailable()
    }

    async fn latest_snapshot(&self, _user_id: &str) -> Result<Option<TaxCalculationResult>> {
        unavailable()
    }
}
