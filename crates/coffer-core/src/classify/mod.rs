//! Transaction classification
//!
//! - `rules` - Keyword taxonomy scorer and override rules
//! - `adaptive` - Per-user models trained on corrections
//! - `arbiter` - Picks between the two and applies fallbacks

pub mod adaptive;
pub mod arbiter;
pub mod rules;

pub use adaptive::{
    AdaptiveClassifier, ClassifierFactory, ModelInfo, NaiveBayes, TextClassifier,
};
pub use arbiter::Classifier;
pub use rules::RuleClassifier;
