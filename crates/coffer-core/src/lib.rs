//! Coffer Core Library
//!
//! Transaction classification and tax estimation for creators and freelancers:
//! - Text normalization and a keyword taxonomy classifier with creator overrides
//! - Per-user adaptive classifiers retrained from corrections
//! - Progressive US and Indian tax estimates with quarterly schedules
//! - Async store interfaces with in-memory and SQLite implementations

pub mod classify;
pub mod config;
pub mod corrections;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
pub mod tax;
pub mod taxonomy;
pub mod text;

/// Fixtures, an in-memory engine builder and failing/counting doubles
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use classify::{
    AdaptiveClassifier, Classifier, ClassifierFactory, ModelInfo, NaiveBayes, RuleClassifier,
    TextClassifier,
};
pub use corrections::{CorrectionOutcome, CorrectionRecorder, RetrainScheduler};
pub use db::Database;
pub use engine::Engine;
pub use error::{Error, Result};
pub use models::*;
pub use store::{
    CorrectionStore, MemoryStore, ProfileStore, SnapshotStore, Stores, TransactionStore,
};
pub use tax::{PeriodTotals, TaxConfig, TaxEngine};
pub use taxonomy::{CategoryDefinition, ClassifierSettings, OverrideRule, Taxonomy};
