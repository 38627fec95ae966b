//! Engine facade
//!
//! Wires the taxonomy, tax configuration, classifiers and stores together and
//! exposes the in-process call surface used by the CLI and by embedders.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::classify::{
    AdaptiveClassifier, Classifier, ClassifierFactory, ModelInfo, NaiveBayes, RuleClassifier,
};
use crate::corrections::{CorrectionOutcome, CorrectionRecorder, RetrainScheduler};
use crate::error::{Error, Result};
use crate::models::{
    CategorySuggestion, ClassificationResult, DueDate, Jurisdiction, PresumptiveTax,
    RealTimeTaxJar, TaxCalculationResult, TaxPeriod, TaxProfile, TaxSetAside, TransactionInput,
    TransactionType, UserCorrection,
};
use crate::store::Stores;
use crate::tax::{TaxConfig, TaxEngine};
use crate::taxonomy::Taxonomy;

/// Classification and tax estimation over a set of stores
#[derive(Clone)]
pub struct Engine {
    taxonomy: Arc<Taxonomy>,
    classifier: Arc<Classifier>,
    adaptive: Arc<AdaptiveClassifier>,
    recorder: CorrectionRecorder,
    scheduler: RetrainScheduler,
    tax: TaxEngine,
    stores: Stores,
}

impl Engine {
    /// Build an engine with the naive Bayes per-user classifier
    pub fn new(taxonomy: Taxonomy, tax_config: TaxConfig, stores: Stores) -> Self {
        Self::with_classifier_factory(taxonomy, tax_config, stores, NaiveBayes::factory())
    }

    /// Build an engine with a custom per-user classifier
    pub fn with_classifier_factory(
        taxonomy: Taxonomy,
        tax_config: TaxConfig,
        stores: Stores,
        factory: ClassifierFactory,
    ) -> Self {
        let taxonomy = Arc::new(taxonomy);
        let adaptive = Arc::new(AdaptiveClassifier::new(
            taxonomy.clone(),
            stores.corrections.clone(),
            factory,
        ));
        let classifier = Arc::new(Classifier::new(
            RuleClassifier::new(taxonomy.clone()),
            adaptive.clone(),
        ));
        let scheduler = RetrainScheduler::new(
            taxonomy.settings().retrain_interval,
            stores.corrections.clone(),
            adaptive.clone(),
        );
        let tax = TaxEngine::new(
            Arc::new(tax_config),
            taxonomy.clone(),
            stores.transactions.clone(),
            stores.profiles.clone(),
            stores.snapshots.clone(),
        );
        Self {
            recorder: CorrectionRecorder::new(stores.corrections.clone()),
            taxonomy,
            classifier,
            adaptive,
            scheduler,
            tax,
            stores,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn tax_config(&self) -> &TaxConfig {
        self.tax.config()
    }

    // ========== Classification ==========

    /// Classify a transaction, using the user's model when one is trained
    pub fn classify(
        &self,
        transaction: &TransactionInput,
        user_id: Option<&str>,
    ) -> Result<ClassificationResult> {
        self.classifier.classify(transaction, user_id)
    }

    /// Classify and persist; returns the stored id with the result
    pub async fn classify_and_save(
        &self,
        user_id: &str,
        transaction: &TransactionInput,
    ) -> Result<(i64, ClassificationResult)> {
        let result = self.classify(transaction, Some(user_id))?;
        let id = self
            .stores
            .transactions
            .save(user_id, transaction, Some(&result))
            .await?;
        debug!("Saved transaction {} for {}", id, user_id);
        Ok((id, result))
    }

    /// Ranked taxonomy categories for free text
    pub fn suggest_categories(&self, description: &str, limit: usize) -> Vec<CategorySuggestion> {
        self.classifier.rules().suggest(description, limit)
    }

    // ========== Corrections ==========

    /// Append a correction and retrain when the count reaches the interval
    pub async fn record_correction(
        &self,
        user_id: &str,
        original: &TransactionInput,
        correction: &UserCorrection,
        prediction: &ClassificationResult,
    ) -> Result<CorrectionOutcome> {
        let record = self
            .recorder
            .record(user_id, original, correction, prediction)
            .await?;
        let (total_corrections, retrained) = self.scheduler.after_correction(user_id).await?;
        Ok(CorrectionOutcome {
            correction_type: record.correction_type,
            total_corrections,
            retrained,
        })
    }

    /// Retrain a user's model now; false when there are too few corrections
    pub async fn train_model(&self, user_id: &str) -> Result<bool> {
        self.adaptive.train_model(user_id).await
    }

    pub fn model_info(&self, user_id: &str) -> Option<ModelInfo> {
        self.adaptive.model_info(user_id)
    }

    // ========== Profiles ==========

    /// Stored profile, or the default profile when none is stored
    pub async fn profile(&self, user_id: &str) -> Result<TaxProfile> {
        self.tax.profile(user_id).await
    }

    pub async fn set_profile(&self, user_id: &str, profile: &TaxProfile) -> Result<()> {
        Jurisdiction::from_country(&profile.country)?;
        self.stores.profiles.put(user_id, profile).await
    }

    // ========== Taxes ==========

    /// Tax estimate for a year, or for one quarter of it
    pub async fn calculate_taxes(
        &self,
        user_id: &str,
        year: i32,
        quarter: Option<u8>,
    ) -> Result<TaxCalculationResult> {
        let period = match quarter {
            Some(q) => TaxPeriod::quarter(year, q),
            None => TaxPeriod::year(year),
        };
        self.tax.calculate_taxes(user_id, period).await
    }

    pub async fn calculate_real_time_tax_jar(
        &self,
        user_id: &str,
        amount: f64,
        transaction_type: TransactionType,
    ) -> Result<RealTimeTaxJar> {
        self.tax
            .calculate_real_time_tax_jar(user_id, amount, transaction_type)
            .await
    }

    pub fn get_upcoming_due_dates(&self, jurisdiction: Jurisdiction) -> Vec<DueDate> {
        self.tax.upcoming_due_dates(jurisdiction)
    }

    /// Split an amount into per-component set-asides for a country
    pub fn tax_set_aside(
        &self,
        amount: f64,
        country: &str,
        overrides: &HashMap<String, f64>,
    ) -> Result<TaxSetAside> {
        let jurisdiction = Jurisdiction::from_country(country)?;
        self.tax.tax_set_aside(amount, jurisdiction, overrides)
    }

    /// Section 44ADA estimate for gross professional receipts
    pub fn presumptive_tax(&self, gross_receipts: f64) -> Result<PresumptiveTax> {
        if !gross_receipts.is_finite() || gross_receipts < 0.0 {
            return Err(Error::Validation(format!(
                "gross receipts must be a non-negative number, got {}",
                gross_receipts
            )));
        }
        Ok(self.tax.presumptive_tax(gross_receipts))
    }
}
