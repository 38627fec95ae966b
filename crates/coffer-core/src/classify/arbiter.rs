//! Merges the adaptive, rule-based and external-category paths

use std::sync::Arc;

use tracing::debug;

use super::adaptive::AdaptiveClassifier;
use super::rules::RuleClassifier;
use crate::error::Result;
use crate::models::{
    ClassificationResult, ClassificationSource, TransactionInput, TransactionType,
};
use crate::taxonomy::ClassifierSettings;
use crate::text;

/// Classification arbiter
///
/// 1. A user's trained model wins when its confidence clears the acceptance threshold.
/// 2. Otherwise the rule classifier runs.
/// 3. Low-confidence results take the first external category, if one was supplied.
/// 4. Override rules always run last.
///
/// Transfers skip every path and return the uncategorized result.
pub struct Classifier {
    rules: RuleClassifier,
    adaptive: Arc<AdaptiveClassifier>,
    settings: ClassifierSettings,
}

impl Classifier {
    pub fn new(rules: RuleClassifier, adaptive: Arc<AdaptiveClassifier>) -> Self {
        let settings = rules.taxonomy().settings().clone();
        Self {
            rules,
            adaptive,
            settings,
        }
    }

    pub fn rules(&self) -> &RuleClassifier {
        &self.rules
    }

    pub fn classify(
        &self,
        transaction: &TransactionInput,
        user_id: Option<&str>,
    ) -> Result<ClassificationResult> {
        transaction.validate()?;
        let transaction_type = transaction.transaction_type;
        if transaction_type == TransactionType::Transfer {
            return Ok(ClassificationResult::uncategorized());
        }

        let features = text::analyze(&transaction.text());

        let adaptive = user_id
            .and_then(|uid| self.adaptive.predict(uid, &features))
            .filter(|p| p.category.confidence > self.settings.model_acceptance_threshold);
        let mut result = match adaptive {
            Some(prediction) => prediction,
            None => self.rules.classify(&features, transaction_type),
        };

        if result.category.confidence < self.settings.external_fallback_threshold {
            if let Some(external) = transaction
                .external_categories
                .iter()
                .map(|c| c.trim())
                .find(|c| !c.is_empty())
            {
                result.category.primary = external.to_string();
                result.category.detailed = external.to_string();
                result.category.confidence = self.settings.external_category_confidence;
                result.source = ClassificationSource::ExternalCategory;
            }
        }

        let result = self
            .rules
            .apply_overrides(&features.normalized, transaction_type, result)
            .clamped();
        debug!(
            "Classified '{}' as {} ({:.2}) via {}",
            transaction.description,
            result.category.primary,
            result.category.confidence,
            result.source.as_str()
        );
        Ok(result)
    }
}
