//! Transaction taxonomy and classifier settings
//!
//! The taxonomy is versioned, immutable configuration data rather than code:
//! adding a category or an override rule is a config edit.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/coffer/config/taxonomy.toml)
//! 2. Fall back to embedded defaults (compiled into binary)

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::config;
use crate::error::{Error, Result};
use crate::models::{CategoryGroup, DeductionType};
use crate::text;

/// Embedded default taxonomy (compiled into binary)
const DEFAULT_TAXONOMY: &str = include_str!("../config/taxonomy.toml");

const CONFIG_FILE: &str = "taxonomy.toml";

/// Thresholds and limits for the classification pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    /// Per-user model predictions must exceed this confidence to be used
    pub model_acceptance_threshold: f64,
    /// Results below this confidence defer to external categories
    pub external_fallback_threshold: f64,
    /// Confidence assigned when an external category is used
    pub external_category_confidence: f64,
    /// Corrections required before a per-user model is trained
    pub min_training_examples: usize,
    /// Retrain every time the correction count reaches a multiple of this
    pub retrain_interval: usize,
    /// Most recent corrections loaded for training
    pub max_training_records: usize,
    /// Per-user models kept in memory
    pub model_cache_capacity: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model_acceptance_threshold: 0.6,
            external_fallback_threshold: 0.5,
            external_category_confidence: 0.3,
            min_training_examples: 10,
            retrain_interval: 10,
            max_training_records: 1000,
            model_cache_capacity: 256,
        }
    }
}

/// One category of the static taxonomy
#[derive(Debug, Clone)]
pub struct CategoryDefinition {
    pub name: String,
    pub group: CategoryGroup,
    /// Normalized keywords
    pub keywords: Vec<String>,
    pub base_weight: f64,
    pub deductible: bool,
    pub deduction_type: Option<DeductionType>,
    pub deduction_percentage: f64,
    pub platforms: Vec<String>,
    /// Porter stems of each keyword's words, aligned with `keywords`
    keyword_stems: Vec<Vec<String>>,
}

impl CategoryDefinition {
    pub fn keyword_stems(&self) -> &[Vec<String>] {
        &self.keyword_stems
    }

    /// Label used for `CategoryPrediction::detailed`
    pub fn detailed(&self) -> String {
        format!("{}/{}", self.group.as_str(), self.name)
    }
}

/// Ordered regex rule applied after every base classification
#[derive(Debug, Clone)]
pub struct OverrideRule {
    pub name: String,
    pub pattern: Regex,
    pub force_business: bool,
    /// Mark expense transactions deductible when matched
    pub deductible_expense: bool,
    pub min_deductible_confidence: f64,
    pub deduction_type: Option<DeductionType>,
}

/// The loaded taxonomy
#[derive(Debug, Clone)]
pub struct Taxonomy {
    version: String,
    settings: ClassifierSettings,
    categories: Vec<CategoryDefinition>,
    overrides: Vec<OverrideRule>,
}

impl Taxonomy {
    /// Load from an explicit path, the data-dir override, or embedded defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = config::resolve(path, CONFIG_FILE, DEFAULT_TAXONOMY)?;
        Self::from_toml(&content)
    }

    /// The taxonomy compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_TAXONOMY)
    }

    /// Parse and validate taxonomy TOML
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawTaxonomy = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid taxonomy TOML: {}", e)))?;

        let settings = raw.classifier.map(RawClassifier::into_settings).unwrap_or_default();
        validate_settings(&settings)?;

        let mut categories = Vec::with_capacity(raw.categories.len());
        for raw_category in raw.categories {
            let category = raw_category.into_definition()?;
            if categories
                .iter()
                .any(|c: &CategoryDefinition| c.name == category.name)
            {
                return Err(Error::Config(format!(
                    "Duplicate category: {}",
                    category.name
                )));
            }
            categories.push(category);
        }
        if categories.is_empty() {
            return Err(Error::Config("Taxonomy defines no categories".to_string()));
        }

        let overrides = raw
            .overrides
            .into_iter()
            .map(RawOverride::into_rule)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            version: raw.version,
            settings,
            categories,
            overrides,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    pub fn categories(&self) -> &[CategoryDefinition] {
        &self.categories
    }

    pub fn overrides(&self) -> &[OverrideRule] {
        &self.overrides
    }

    /// Categories in one group, in config order
    pub fn group(&self, group: CategoryGroup) -> impl Iterator<Item = &CategoryDefinition> {
        self.categories.iter().filter(move |c| c.group == group)
    }

    pub fn get(&self, name: &str) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Categories that list the platform (case-insensitive)
    pub fn categories_for_platform(&self, platform: &str) -> Vec<&CategoryDefinition> {
        let platform = platform.to_lowercase();
        self.categories
            .iter()
            .filter(|c| c.platforms.iter().any(|p| *p == platform))
            .collect()
    }

    /// Whether a category name belongs to the income or business-expense groups
    pub fn is_business_category(&self, name: &str) -> bool {
        self.get(name).is_some_and(|c| c.group.is_business())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    config::default_config_path(CONFIG_FILE)
}

fn validate_settings(settings: &ClassifierSettings) -> Result<()> {
    for (name, value) in [
        ("model_acceptance_threshold", settings.model_acceptance_threshold),
        ("external_fallback_threshold", settings.external_fallback_threshold),
        (
            "external_category_confidence",
            settings.external_category_confidence,
        ),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(Error::Config(format!(
                "{} must be within [0,1], got {}",
                name, value
            )));
        }
    }
    if settings.retrain_interval == 0 {
        return Err(Error::Config("retrain_interval must be positive".to_string()));
    }
    if settings.model_cache_capacity == 0 {
        return Err(Error::Config(
            "model_cache_capacity must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawTaxonomy {
    version: String,
    classifier: Option<RawClassifier>,
    #[serde(default)]
    categories: Vec<RawCategory>,
    #[serde(default)]
    overrides: Vec<RawOverride>,
}

#[derive(Debug, Deserialize)]
struct RawClassifier {
    model_acceptance_threshold: Option<f64>,
    external_fallback_threshold: Option<f64>,
    external_category_confidence: Option<f64>,
    min_training_examples: Option<usize>,
    retrain_interval: Option<usize>,
    max_training_records: Option<usize>,
    model_cache_capacity: Option<usize>,
}

impl RawClassifier {
    fn into_settings(self) -> ClassifierSettings {
        let defaults = ClassifierSettings::default();
        ClassifierSettings {
            model_acceptance_threshold: self
                .model_acceptance_threshold
                .unwrap_or(defaults.model_acceptance_threshold),
            external_fallback_threshold: self
                .external_fallback_threshold
                .unwrap_or(defaults.external_fallback_threshold),
            external_category_confidence: self
                .external_category_confidence
                .unwrap_or(defaults.external_category_confidence),
            min_training_examples: self
                .min_training_examples
                .unwrap_or(defaults.min_training_examples),
            retrain_interval: self.retrain_interval.unwrap_or(defaults.retrain_interval),
            max_training_records: self
                .max_training_records
                .unwrap_or(defaults.max_training_records),
            model_cache_capacity: self
                .model_cache_capacity
                .unwrap_or(defaults.model_cache_capacity),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    name: String,
    group: CategoryGroup,
    keywords: Vec<String>,
    base_weight: f64,
    #[serde(default)]
    deductible: bool,
    deduction_type: Option<DeductionType>,
    deduction_percentage: Option<f64>,
    #[serde(default)]
    platforms: Vec<String>,
}

impl RawCategory {
    fn into_definition(self) -> Result<CategoryDefinition> {
        if !(0.0..=1.0).contains(&self.base_weight) {
            return Err(Error::Config(format!(
                "Category {} has base_weight outside [0,1]: {}",
                self.name, self.base_weight
            )));
        }

        let keywords: Vec<String> = self
            .keywords
            .iter()
            .map(|k| text::normalize(k))
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(Error::Config(format!(
                "Category {} has no keywords",
                self.name
            )));
        }

        let deduction_percentage = match (self.deductible, self.deduction_percentage) {
            (true, Some(p)) => p,
            (true, None) => 1.0,
            (false, _) => 0.0,
        };
        if !(0.0..=1.0).contains(&deduction_percentage) {
            return Err(Error::Config(format!(
                "Category {} has deduction_percentage outside [0,1]: {}",
                self.name, deduction_percentage
            )));
        }

        let keyword_stems = keywords
            .iter()
            .map(|k| k.split(' ').map(text::stem).collect())
            .collect();

        Ok(CategoryDefinition {
            name: self.name,
            group: self.group,
            keywords,
            base_weight: self.base_weight,
            deductible: self.deductible,
            deduction_type: if self.deductible {
                self.deduction_type.or(Some(DeductionType::Other))
            } else {
                None
            },
            deduction_percentage,
            platforms: self.platforms.iter().map(|p| p.to_lowercase()).collect(),
            keyword_stems,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawOverride {
    name: String,
    pattern: String,
    #[serde(default)]
    force_business: bool,
    #[serde(default)]
    deductible_expense: bool,
    min_deductible_confidence: Option<f64>,
    deduction_type: Option<DeductionType>,
}

impl RawOverride {
    fn into_rule(self) -> Result<OverrideRule> {
        let pattern = Regex::new(&self.pattern).map_err(|e| {
            Error::Config(format!("Override {} has invalid pattern: {}", self.name, e))
        })?;
        let min_deductible_confidence = self.min_deductible_confidence.unwrap_or(0.8);
        if !(0.0..=1.0).contains(&min_deductible_confidence) {
            return Err(Error::Config(format!(
                "Override {} has min_deductible_confidence outside [0,1]",
                self.name
            )));
        }
        Ok(OverrideRule {
            name: self.name,
            pattern,
            force_business: self.force_business,
            deductible_expense: self.deductible_expense,
            min_deductible_confidence,
            deduction_type: self.deduction_type,
        })
    }
}
