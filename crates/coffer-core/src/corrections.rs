//! User corrections and the retraining trigger
//!
//! Recording is plain persistence: [`CorrectionRecorder`] derives the
//! correction type and features and appends the record. Retraining is a
//! separate observer: [`RetrainScheduler`] checks the user's correction count
//! after each append and retrains on every multiple of the interval.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::classify::AdaptiveClassifier;
use crate::error::{Error, Result};
use crate::models::{
    AmountBucket, ClassificationResult, CorrectionRecord, CorrectionType, ExtractedFeatures,
    MerchantType, SyntacticPatterns, TransactionInput, UserCorrection,
};
use crate::store::CorrectionStore;
use crate::text;

/// Which field the user changed, checked in priority order
pub fn correction_type(
    correction: &UserCorrection,
    prediction: &ClassificationResult,
) -> CorrectionType {
    if correction
        .category
        .as_deref()
        .is_some_and(|c| c != prediction.category.primary)
    {
        CorrectionType::CategoryCorrection
    } else if correction
        .business_classification
        .is_some_and(|b| b != prediction.business_classification)
    {
        CorrectionType::BusinessClassificationCorrection
    } else if correction
        .is_deductible
        .is_some_and(|d| d != prediction.tax_deductible.is_deductible)
    {
        CorrectionType::TaxDeductibleCorrection
    } else {
        CorrectionType::NewClassification
    }
}

struct FeatureRegexes {
    digits: Regex,
    acronym: Regex,
    company_suffix: Regex,
    retail_keyword: Regex,
    merchant_types: Vec<(MerchantType, Regex)>,
}

fn regexes() -> &'static FeatureRegexes {
    static RE: OnceLock<FeatureRegexes> = OnceLock::new();
    RE.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("static regex");
        FeatureRegexes {
            digits: re(r"\d"),
            acronym: re(r"\b[A-Z]{2,}\b"),
            company_suffix: re(r"(?i)\b(inc|llc|ltd|corp|co|company|corporation|gmbh|plc|pvt)\b"),
            retail_keyword: re(
                r"(?i)\b(store|shop|market|mart|pay|payment|purchase|pos|checkout|order)\b",
            ),
            // Order matters: food is checked before transportation so "uber eats" is food
            merchant_types: vec![
                (
                    MerchantType::Ecommerce,
                    re(r"(?i)(amazon|ebay|etsy|shopify|aliexpress|\.com\b|\bonline\b)"),
                ),
                (
                    MerchantType::Retail,
                    re(r"(?i)\b(walmart|target|costco|best buy|ikea|store|shop|mart)\b"),
                ),
                (
                    MerchantType::Food,
                    re(r"(?i)\b(restaurant|cafe|coffee|pizza|burger|grill|kitchen|bakery|doordash|grubhub|uber eats|starbucks)\b"),
                ),
                (
                    MerchantType::GasStation,
                    re(r"(?i)\b(shell|chevron|exxon|mobil|bp|gas|fuel|petrol)\b"),
                ),
                (
                    MerchantType::Travel,
                    re(r"(?i)\b(airline|airlines|airways|hotel|airbnb|expedia|booking|flight)\b"),
                ),
                (
                    MerchantType::Transportation,
                    re(r"(?i)\b(uber|lyft|taxi|metro|transit|parking|toll|train)\b"),
                ),
            ],
        }
    })
}

/// Features stored with a correction for later retraining
pub fn extract_features(transaction: &TransactionInput) -> ExtractedFeatures {
    let raw = transaction.text();
    let analyzed = text::analyze(&raw);
    let re = regexes();

    let merchant_type = re
        .merchant_types
        .iter()
        .find(|(_, pattern)| pattern.is_match(&raw))
        .map_or(MerchantType::Other, |(kind, _)| *kind);

    ExtractedFeatures {
        tokens: analyzed.tokens,
        stems: analyzed.stems,
        patterns: SyntacticPatterns {
            has_digits: re.digits.is_match(&raw),
            has_acronym: re.acronym.is_match(&raw),
            has_company_suffix: re.company_suffix.is_match(&raw),
            has_retail_keyword: re.retail_keyword.is_match(&raw),
        },
        merchant_type,
        amount_bucket: AmountBucket::from_amount(transaction.amount),
    }
}

/// Builds and appends correction records
#[derive(Clone)]
pub struct CorrectionRecorder {
    store: Arc<dyn CorrectionStore>,
}

impl CorrectionRecorder {
    pub fn new(store: Arc<dyn CorrectionStore>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        user_id: &str,
        original: &TransactionInput,
        correction: &UserCorrection,
        prediction: &ClassificationResult,
    ) -> Result<CorrectionRecord> {
        if user_id.trim().is_empty() {
            return Err(Error::Validation("user id is required".to_string()));
        }
        original.validate()?;
        if correction
            .category
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            return Err(Error::Validation(
                "corrected category must not be blank".to_string(),
            ));
        }

        let record = CorrectionRecord {
            user_id: user_id.to_string(),
            transaction: original.clone(),
            system_prediction: prediction.clone(),
            correction: correction.clone(),
            correction_type: correction_type(correction, prediction),
            features: extract_features(original),
            created_at: Utc::now(),
        };
        self.store.append(&record).await?;
        debug!(
            "Recorded {} for {}: '{}'",
            record.correction_type, user_id, original.description
        );
        Ok(record)
    }
}

/// Retrains a user's model whenever their correction count hits the interval
#[derive(Clone)]
pub struct RetrainScheduler {
    interval: usize,
    store: Arc<dyn CorrectionStore>,
    adaptive: Arc<AdaptiveClassifier>,
}

impl RetrainScheduler {
    pub fn new(
        interval: usize,
        store: Arc<dyn CorrectionStore>,
        adaptive: Arc<AdaptiveClassifier>,
    ) -> Self {
        Self {
            interval: interval.max(1),
            store,
            adaptive,
        }
    }

    /// Check the count after an append; returns the count and whether a retrain ran
    pub async fn after_correction(&self, user_id: &str) -> Result<(usize, bool)> {
        let count = self.store.count(user_id).await?;
        if count == 0 || count % self.interval != 0 {
            return Ok((count, false));
        }
        info!("{} has {} corrections, retraining", user_id, count);
        let retrained = self.adaptive.train_model(user_id).await?;
        Ok((count, retrained))
    }
}

/// Outcome of recording a correction
#[derive(Debug, Clone, Serialize)]
pub struct CorrectionOutcome {
    pub correction_type: CorrectionType,
    pub total_corrections: usize,
    pub retrained: bool,
}
