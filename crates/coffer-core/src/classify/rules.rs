//! Keyword taxonomy scorer and creator override rules

use std::sync::Arc;

use tracing::debug;

use crate::models::{
    BusinessClassification, CategoryGroup, CategoryPrediction, CategorySuggestion,
    ClassificationResult, ClassificationSource, TaxDeductible, TransactionType,
};
use crate::taxonomy::{CategoryDefinition, Taxonomy};
use crate::text::{self, TextFeatures};

/// Score for a keyword found verbatim
const EXACT_MATCH: f64 = 1.0;
/// Score for a keyword found only after stemming
const STEM_MATCH: f64 = 0.7;
/// Boost applied once any keyword matched
const MATCH_BOOST: f64 = 1.2;

/// Score a category against analyzed text, in [0,1]
///
/// Single-word keywords match when any token contains them. Multi-word keywords
/// match when the normalized text contains the phrase. Failing that, a keyword
/// whose every word stem appears among the text's stems earns a partial match.
pub fn score(features: &TextFeatures, category: &CategoryDefinition) -> f64 {
    if category.keywords.is_empty() {
        return 0.0;
    }

    let matched: f64 = category
        .keywords
        .iter()
        .zip(category.keyword_stems())
        .map(|(keyword, stems)| {
            let exact = if keyword.contains(' ') {
                features.normalized.contains(keyword.as_str())
            } else {
                features.tokens.iter().any(|t| t.contains(keyword.as_str()))
            };
            if exact {
                EXACT_MATCH
            } else if stems.iter().all(|s| features.stems.contains(s)) {
                STEM_MATCH
            } else {
                0.0
            }
        })
        .sum();

    let confidence = matched / category.keywords.len() as f64 * category.base_weight;
    if matched > 0.0 {
        (confidence * MATCH_BOOST).min(1.0)
    } else {
        confidence
    }
}

/// Static taxonomy classifier
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    taxonomy: Arc<Taxonomy>,
}

impl RuleClassifier {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Best-scoring category among the groups allowed for the transaction type
    pub fn classify(
        &self,
        features: &TextFeatures,
        transaction_type: TransactionType,
    ) -> ClassificationResult {
        let groups: &[CategoryGroup] = match transaction_type {
            TransactionType::Income => &[CategoryGroup::Income],
            TransactionType::Expense => &[CategoryGroup::BusinessExpense, CategoryGroup::Personal],
            TransactionType::Transfer => &[],
        };

        let mut best: Option<(&CategoryDefinition, f64)> = None;
        for category in self
            .taxonomy
            .categories()
            .iter()
            .filter(|c| groups.contains(&c.group))
        {
            let s = score(features, category);
            if s > best.map_or(0.0, |(_, b)| b) {
                best = Some((category, s));
            }
        }

        let Some((category, confidence)) = best else {
            return ClassificationResult::uncategorized();
        };
        debug!(
            "Rule match {} at {:.2} for '{}'",
            category.name, confidence, features.normalized
        );

        let business_classification = if category.group.is_business() {
            BusinessClassification::Business
        } else {
            BusinessClassification::Personal
        };
        let tax_deductible = if category.deductible && transaction_type == TransactionType::Expense
        {
            TaxDeductible {
                is_deductible: true,
                deduction_type: category.deduction_type,
                confidence,
                deduction_percentage: category.deduction_percentage,
            }
        } else {
            TaxDeductible::not_deductible()
        };

        ClassificationResult {
            category: CategoryPrediction {
                primary: category.name.clone(),
                detailed: category.detailed(),
                confidence,
            },
            business_classification,
            tax_deductible,
            source: ClassificationSource::Rules,
        }
    }

    /// Ranked categories from every group for free text
    pub fn suggest(&self, description: &str, limit: usize) -> Vec<CategorySuggestion> {
        let features = text::analyze(description);
        let mut suggestions: Vec<CategorySuggestion> = self
            .taxonomy
            .categories()
            .iter()
            .filter_map(|category| {
                let confidence = score(&features, category);
                (confidence > 0.0).then(|| CategorySuggestion {
                    category: category.name.clone(),
                    confidence,
                    tax_deductible: category.deductible,
                })
            })
            .collect();
        suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        suggestions.truncate(limit);
        suggestions
    }

    /// Apply the first matching override rule to a base result
    pub fn apply_overrides(
        &self,
        normalized: &str,
        transaction_type: TransactionType,
        mut result: ClassificationResult,
    ) -> ClassificationResult {
        let Some(rule) = self
            .taxonomy
            .overrides()
            .iter()
            .find(|rule| rule.pattern.is_match(normalized))
        else {
            return result;
        };
        debug!("Override {} matched '{}'", rule.name, normalized);

        if rule.force_business {
            result.business_classification = BusinessClassification::Business;
        }
        if rule.deductible_expense && transaction_type == TransactionType::Expense {
            let deductible = &mut result.tax_deductible;
            deductible.is_deductible = true;
            deductible.confidence = deductible.confidence.max(rule.min_deductible_confidence);
            if deductible.deduction_type.is_none() {
                deductible.deduction_type = rule.deduction_type;
            }
            if deductible.deduction_percentage <= 0.0 {
                deductible.deduction_percentage = 1.0;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeductionType;

    fn classifier() -> RuleClassifier {
        RuleClassifier::new(Arc::new(Taxonomy::embedded().unwrap()))
    }

    fn classify(text: &str, transaction_type: TransactionType) -> ClassificationResult {
        let classifier = classifier();
        let features = text::analyze(text);
        let base = classifier.classify(&features, transaction_type);
        classifier.apply_overrides(&features.normalized, transaction_type, base)
    }

    #[test]
    fn test_score_exact_and_boost() {
        let taxonomy = Taxonomy::embedded().unwrap();
        let ad_revenue = taxonomy.get("ad_revenue").unwrap();
        let s = score(&text::analyze("YouTube AdSense payment"), ad_revenue);
        assert!((s - 2.0 / 3.0 * 0.9 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_score_stem_match() {
        let taxonomy = Taxonomy::embedded().unwrap();
        let freelance = taxonomy.get("freelance_income").unwrap();
        // "consulted" and "consulting" share the stem "consult"
        let s = score(&text::analyze("consulted"), freelance);
        assert!((s - 0.7 / 4.0 * 0.75 * 1.2).abs() < 1e-9);
        assert_eq!(score(&text::analyze("rent check"), freelance), 0.0);
    }

    #[test]
    fn test_score_stays_in_unit_range() {
        let taxonomy = Taxonomy::embedded().unwrap();
        let features = text::analyze("adobe creative cloud software figma canva");
        for category in taxonomy.categories() {
            let s = score(&features, category);
            assert!((0.0..=1.0).contains(&s), "{} scored {}", category.name, s);
        }
    }

    #[test]
    fn test_youtube_income_is_business_ad_revenue() {
        let result = classify("YouTube AdSense payment", TransactionType::Income);
        assert_eq!(result.category.primary, "ad_revenue");
        assert_eq!(result.business_classification, BusinessClassification::Business);
        assert!(result.category.confidence > 0.5);
    }

    #[test]
    fn test_adobe_is_deductible_software() {
        let result = classify("Adobe Creative Cloud subscription", TransactionType::Expense);
        assert_eq!(result.category.primary, "software");
        assert!(result.tax_deductible.is_deductible);
        assert_eq!(result.tax_deductible.deduction_type, Some(DeductionType::Software));
        assert!(result.tax_deductible.confidence >= 0.8);
    }

    #[test]
    fn test_income_never_gets_expense_category() {
        let result = classify("Adobe refund", TransactionType::Income);
        assert_ne!(result.category.primary, "software");
        assert!(!result.tax_deductible.is_deductible);
    }

    #[test]
    fn test_personal_expense() {
        let result = classify("Starbucks coffee", TransactionType::Expense);
        assert_eq!(result.category.primary, "dining");
        assert_eq!(result.business_classification, BusinessClassification::Personal);
        assert!(!result.tax_deductible.is_deductible);
    }

    #[test]
    fn test_no_match_is_uncategorized() {
        let result = classify("zzqx 9981", TransactionType::Expense);
        assert!(result.is_uncategorized());
        assert_eq!(result.business_classification, BusinessClassification::Unknown);
    }

    #[test]
    fn test_transfer_is_uncategorized() {
        let classifier = classifier();
        let result =
            classifier.classify(&text::analyze("Patreon payout"), TransactionType::Transfer);
        assert!(result.is_uncategorized());
    }

    #[test]
    fn test_override_forces_business_on_unmatched_text() {
        let result = classify("Elgato stream deck", TransactionType::Expense);
        assert_eq!(result.business_classification, BusinessClassification::Business);
        assert!(result.tax_deductible.is_deductible);
        assert_eq!(result.tax_deductible.deduction_type, Some(DeductionType::Equipment));
        assert_eq!(result.tax_deductible.deduction_percentage, 1.0);
    }

    #[test]
    fn test_first_override_wins() {
        // Matches both the platform and software rules; only the platform rule applies
        let result = classify("Twitch OBS plugin", TransactionType::Expense);
        assert_eq!(result.business_classification, BusinessClassification::Business);
        assert!(!result.tax_deductible.is_deductible);
    }

    #[test]
    fn test_suggest_ranks_and_limits() {
        let suggestions = classifier().suggest("adobe creative cloud", 3);
        assert!(!suggestions.is_empty());
        assert!(suggestions.len() <= 3);
        assert_eq!(suggestions[0].category, "software");
        assert!(suggestions[0].tax_deductible);
        assert!(suggestions
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        assert!(classifier().suggest("zzqx", 5).is_empty());
    }
}
