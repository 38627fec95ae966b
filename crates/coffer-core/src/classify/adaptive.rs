//! Per-user classifiers trained on corrections
//!
//! Each user with enough corrections gets a text classifier predicting an
//! encoded `category|business_classification|is_deductible` label. Models live
//! in a bounded cache and are replaced wholesale on retrain; they are not
//! persisted across restarts.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{
    BusinessClassification, CategoryPrediction, ClassificationResult, ClassificationSource,
    TaxDeductible,
};
use crate::store::CorrectionStore;
use crate::taxonomy::{ClassifierSettings, Taxonomy};
use crate::text::{self, TextFeatures};

/// Capability interface for a trainable text classifier
pub trait TextClassifier: Send + Sync {
    /// Fit on `(feature_text, label)` pairs, replacing any previous state
    fn train(&mut self, examples: &[(String, String)]) -> Result<()>;

    /// Most likely label with its confidence in [0,1]
    fn classify(&self, features: &str) -> Result<(String, f64)>;
}

/// Builds a fresh, untrained classifier for each retrain
pub type ClassifierFactory = Arc<dyn Fn() -> Box<dyn TextClassifier> + Send + Sync>;

/// Multinomial naive Bayes over whitespace-separated tokens
///
/// The posterior is scaled by the share of input tokens seen in training, so
/// text the model has no evidence about scores zero whatever the label mix.
#[derive(Debug, Default, Clone)]
pub struct NaiveBayes {
    labels: Vec<LabelStats>,
    vocabulary: HashSet<String>,
    total_documents: usize,
}

#[derive(Debug, Clone)]
struct LabelStats {
    label: String,
    documents: usize,
    token_counts: HashMap<String, usize>,
    total_tokens: usize,
}

impl NaiveBayes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> ClassifierFactory {
        Arc::new(|| Box::new(NaiveBayes::new()) as Box<dyn TextClassifier>)
    }
}

impl TextClassifier for NaiveBayes {
    fn train(&mut self, examples: &[(String, String)]) -> Result<()> {
        if examples.is_empty() {
            return Err(Error::Training("no training examples".to_string()));
        }

        let mut by_label: HashMap<&str, LabelStats> = HashMap::new();
        let mut vocabulary: HashSet<String> = HashSet::new();
        for (features, label) in examples {
            let stats = by_label.entry(label.as_str()).or_insert_with(|| LabelStats {
                label: label.clone(),
                documents: 0,
                token_counts: HashMap::new(),
                total_tokens: 0,
            });
            stats.documents += 1;
            for token in features.split_whitespace() {
                *stats.token_counts.entry(token.to_string()).or_insert(0) += 1;
                stats.total_tokens += 1;
                vocabulary.insert(token.to_string());
            }
        }

        let mut labels: Vec<LabelStats> = by_label.into_values().collect();
        labels.sort_by(|a, b| a.label.cmp(&b.label));

        self.labels = labels;
        self.vocabulary = vocabulary;
        self.total_documents = examples.len();
        Ok(())
    }

    fn classify(&self, features: &str) -> Result<(String, f64)> {
        if self.labels.is_empty() {
            return Err(Error::Training("model has not been trained".to_string()));
        }

        let tokens: Vec<&str> = features.split_whitespace().collect();
        let known = tokens
            .iter()
            .filter(|t| self.vocabulary.contains(**t))
            .count();
        let coverage = if tokens.is_empty() {
            0.0
        } else {
            known as f64 / tokens.len() as f64
        };
        let vocabulary = (self.vocabulary.len() + 1) as f64;
        let log_scores: Vec<f64> = self
            .labels
            .iter()
            .map(|stats| {
                let prior = (stats.documents as f64 / self.total_documents as f64).ln();
                let denominator = stats.total_tokens as f64 + vocabulary;
                tokens.iter().fold(prior, |acc, token| {
                    let count = stats.token_counts.get(*token).copied().unwrap_or(0);
                    acc + ((count as f64 + 1.0) / denominator).ln()
                })
            })
            .collect();

        // Softmax over log scores for a posterior in [0,1]
        let max = log_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = log_scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = weights.iter().sum();
        let (best, weight) = weights
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| Error::Training("no labels".to_string()))?;

        let posterior = if total > 0.0 { weight / total } else { 0.0 };
        Ok((self.labels[best].label.clone(), posterior * coverage))
    }
}

/// Encode a training label
pub fn encode_label(category: &str, business: BusinessClassification, deductible: bool) -> String {
    format!("{}|{}|{}", category, business.as_str(), deductible)
}

/// Decode a label produced by [`encode_label`]
pub fn decode_label(label: &str) -> Result<(String, BusinessClassification, bool)> {
    let mut parts = label.split('|');
    let (Some(category), Some(business), Some(deductible), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::Training(format!("malformed label: {}", label)));
    };
    let business = business.parse().map_err(Error::Training)?;
    let deductible = deductible
        .parse()
        .map_err(|_| Error::Training(format!("malformed deductible flag: {}", label)))?;
    Ok((category.to_string(), business, deductible))
}

/// A trained per-user model
pub struct UserModel {
    classifier: Box<dyn TextClassifier>,
    training_examples: usize,
    trained_at: DateTime<Utc>,
}

/// Metadata about a user's cached model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub training_examples: usize,
    pub trained_at: DateTime<Utc>,
}

/// Number of striped retrain locks
const TRAIN_LOCK_STRIPES: usize = 16;

/// Trains, caches and queries per-user models
pub struct AdaptiveClassifier {
    settings: ClassifierSettings,
    taxonomy: Arc<Taxonomy>,
    corrections: Arc<dyn CorrectionStore>,
    factory: ClassifierFactory,
    cache: Cache<String, Arc<UserModel>>,
    train_locks: Vec<tokio::sync::Mutex<()>>,
}

impl AdaptiveClassifier {
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        corrections: Arc<dyn CorrectionStore>,
        factory: ClassifierFactory,
    ) -> Self {
        let settings = taxonomy.settings().clone();
        let cache = Cache::builder()
            .max_capacity(settings.model_cache_capacity as u64)
            .build();
        Self {
            settings,
            taxonomy,
            corrections,
            factory,
            cache,
            train_locks: (0..TRAIN_LOCK_STRIPES)
                .map(|_| tokio::sync::Mutex::new(()))
                .collect(),
        }
    }

    fn train_lock(&self, user_id: &str) -> &tokio::sync::Mutex<()> {
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        &self.train_locks[(hasher.finish() as usize) % self.train_locks.len()]
    }

    /// Retrain a user's model from their most recent corrections
    ///
    /// Returns false without touching the cache when the user has too few
    /// corrections. Concurrent retrains for the same user are serialized.
    pub async fn train_model(&self, user_id: &str) -> Result<bool> {
        let _guard = self.train_lock(user_id).lock().await;

        let records = self
            .corrections
            .recent(user_id, self.settings.max_training_records)
            .await?;
        if records.len() < self.settings.min_training_examples {
            debug!(
                "Skipping training for {}: {} of {} corrections",
                user_id,
                records.len(),
                self.settings.min_training_examples
            );
            return Ok(false);
        }

        let examples: Vec<(String, String)> = records
            .iter()
            .map(|record| {
                (
                    text::analyze(&record.transaction.text()).joined(),
                    encode_label(
                        record.corrected_category(),
                        record.corrected_business(),
                        record.corrected_deductible(),
                    ),
                )
            })
            .collect();

        let mut classifier = (self.factory)();
        classifier.train(&examples)?;

        let model = Arc::new(UserModel {
            classifier,
            training_examples: examples.len(),
            trained_at: Utc::now(),
        });
        self.cache.insert(user_id.to_string(), model);
        info!(
            "Trained classifier for {} on {} corrections",
            user_id,
            examples.len()
        );
        Ok(true)
    }

    /// Predict with the user's model; `None` when the user has no model
    ///
    /// Internal failures degrade to the uncategorized result.
    pub fn predict(&self, user_id: &str, features: &TextFeatures) -> Option<ClassificationResult> {
        let model = self.cache.get(user_id)?;
        match self.decode_prediction(&model, features) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Prediction failed for {}: {}", user_id, e);
                Some(ClassificationResult::uncategorized())
            }
        }
    }

    fn decode_prediction(
        &self,
        model: &UserModel,
        features: &TextFeatures,
    ) -> Result<ClassificationResult> {
        let (label, confidence) = model.classifier.classify(&features.joined())?;
        let (category, business_classification, is_deductible) = decode_label(&label)?;

        let definition = self.taxonomy.get(&category);
        let detailed = definition.map_or_else(|| category.clone(), |d| d.detailed());
        let tax_deductible = if is_deductible {
            TaxDeductible {
                is_deductible: true,
                deduction_type: definition.and_then(|d| d.deduction_type),
                confidence,
                deduction_percentage: definition
                    .filter(|d| d.deductible)
                    .map_or(1.0, |d| d.deduction_percentage),
            }
        } else {
            TaxDeductible::not_deductible()
        };

        Ok(ClassificationResult {
            category: CategoryPrediction {
                primary: category,
                detailed,
                confidence,
            },
            business_classification,
            tax_deductible,
            source: ClassificationSource::Adaptive,
        })
    }

    pub fn has_model(&self, user_id: &str) -> bool {
        self.cache.contains_key(user_id)
    }

    pub fn model_info(&self, user_id: &str) -> Option<ModelInfo> {
        self.cache.get(user_id).map(|model| ModelInfo {
            training_examples: model.training_examples,
            trained_at: model.trained_at,
        })
    }

    /// Number of cached models once pending evictions have run
    pub fn cached_models(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.entry_count() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::{correction_record, CountingClassifier};

    fn examples() -> Vec<(String, String)> {
        vec![
            ("adobe creative cloud".to_string(), "software|business|true".to_string()),
            ("adobe photoshop".to_string(), "software|business|true".to_string()),
            ("whole foods market".to_string(), "groceries|personal|false".to_string()),
            ("safeway groceries".to_string(), "groceries|personal|false".to_string()),
        ]
    }

    #[test]
    fn test_naive_bayes_learns_labels() {
        let mut nb = NaiveBayes::new();
        nb.train(&examples()).unwrap();
        let (label, confidence) = nb.classify("adobe creative").unwrap();
        assert_eq!(label, "software|business|true");
        assert!(confidence > 0.5 && confidence <= 1.0);

        let (label, _) = nb.classify("whole foods").unwrap();
        assert_eq!(label, "groceries|personal|false");
    }

    #[test]
    fn test_naive_bayes_requires_training() {
        let nb = NaiveBayes::new();
        assert!(matches!(nb.classify("anything"), Err(Error::Training(_))));
        assert!(NaiveBayes::new().train(&[]).is_err());
    }

    #[test]
    fn test_naive_bayes_unseen_text_has_no_confidence() {
        let single_label: Vec<(String, String)> = (0..10)
            .map(|i| (format!("figma seat {}", i), "software|business|true".to_string()))
            .collect();
        let mut nb = NaiveBayes::new();
        nb.train(&single_label).unwrap();

        let (_, confidence) = nb.classify("figma seat").unwrap();
        assert!((confidence - 1.0).abs() < 1e-9);

        let (_, confidence) = nb.classify("starbucks coffee").unwrap();
        assert_eq!(confidence, 0.0);

        // Half the tokens known halves the confidence
        let (_, confidence) = nb.classify("figma coffee").unwrap();
        assert!((confidence - 0.5).abs() < 1e-9);

        let (_, confidence) = nb.classify("").unwrap();
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_label_round_trip_and_malformed() {
        let label = encode_label("software", BusinessClassification::Business, true);
        assert_eq!(label, "software|business|true");
        let (category, business, deductible) = decode_label(&label).unwrap();
        assert_eq!(category, "software");
        assert_eq!(business, BusinessClassification::Business);
        assert!(deductible);

        assert!(decode_label("software|business").is_err());
        assert!(decode_label("software|sideways|true").is_err());
        assert!(decode_label("software|business|maybe").is_err());
        assert!(decode_label("a|business|true|extra").is_err());
    }

    fn adaptive(store: Arc<MemoryStore>, factory: ClassifierFactory) -> AdaptiveClassifier {
        AdaptiveClassifier::new(Arc::new(Taxonomy::embedded().unwrap()), store, factory)
    }

    #[tokio::test]
    async fn test_train_requires_minimum_corrections() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..9 {
            store
                .append(&correction_record("alice", &format!("Figma seat {}", i), "software"))
                .await
                .unwrap();
        }
        let classifier = adaptive(store.clone(), NaiveBayes::factory());
        assert!(!classifier.train_model("alice").await.unwrap());
        assert!(!classifier.has_model("alice"));

        store
            .append(&correction_record("alice", "Figma seat 9", "software"))
            .await
            .unwrap();
        assert!(classifier.train_model("alice").await.unwrap());
        let info = classifier.model_info("alice").unwrap();
        assert_eq!(info.training_examples, 10);
    }

    #[tokio::test]
    async fn test_predict_uses_trained_model() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..10 {
            store
                .append(&correction_record("alice", &format!("Figma seat {}", i), "software"))
                .await
                .unwrap();
        }
        let classifier = adaptive(store, NaiveBayes::factory());
        assert!(classifier.predict("alice", &text::analyze("figma seat")).is_none());

        classifier.train_model("alice").await.unwrap();
        let result = classifier.predict("alice", &text::analyze("figma seat")).unwrap();
        assert_eq!(result.category.primary, "software");
        assert_eq!(result.source, ClassificationSource::Adaptive);
        assert_eq!(result.category.detailed, "business_expense/software");
        assert!(classifier.predict("bob", &text::analyze("figma seat")).is_none());
    }

    #[tokio::test]
    async fn test_failed_prediction_degrades() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..10 {
            store
                .append(&correction_record("alice", &format!("Item {}", i), "software"))
                .await
                .unwrap();
        }
        let counting = CountingClassifier::failing();
        let classifier = adaptive(store, counting.factory());
        classifier.train_model("alice").await.unwrap();

        let result = classifier.predict("alice", &text::analyze("item")).unwrap();
        assert!(result.is_uncategorized());
    }

    #[tokio::test]
    async fn test_cache_is_bounded() {
        let taxonomy = Taxonomy::from_toml(
            &include_str!("../../config/taxonomy.toml")
                .replace("model_cache_capacity = 256", "model_cache_capacity = 2"),
        )
        .unwrap();
        let store = Arc::new(MemoryStore::new());
        for user in ["a", "b", "c"] {
            for i in 0..10 {
                store
                    .append(&correction_record(user, &format!("Item {}", i), "software"))
                    .await
                    .unwrap();
            }
        }
        let classifier = AdaptiveClassifier::new(Arc::new(taxonomy), store, NaiveBayes::factory());
        for user in ["a", "b", "c"] {
            classifier.train_model(user).await.unwrap();
        }
        assert_eq!(classifier.cached_models(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_retrains_serialize() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..10 {
            store
                .append(&correction_record("alice", &format!("Item {}", i), "software"))
                .await
                .unwrap();
        }
        let counting = CountingClassifier::new();
        let classifier = Arc::new(adaptive(store, counting.factory()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let classifier = classifier.clone();
                tokio::spawn(async move { classifier.train_model("alice").await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }
        assert_eq!(counting.train_calls(), 4);
        assert_eq!(classifier.cached_models(), 1);
    }
}
