//! Tax tables loaded from `tax.toml`

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::brackets::{BracketTable, TaxBracket};
use crate::config;
use crate::error::{Error, Result};
use crate::models::{FilingStatus, Jurisdiction, TaxRegime};

/// Embedded default tax tables (compiled into binary)
const DEFAULT_TAX_CONFIG: &str = include_str!("../../config/tax.toml");

const CONFIG_FILE: &str = "tax.toml";

/// A quarterly due date in the annual calendar
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DueDateRule {
    pub period: String,
    pub month: u32,
    pub day: u32,
    /// Years after the tax year the payment falls in
    #[serde(default)]
    pub year_offset: i32,
}

/// US federal, state and self-employment parameters
#[derive(Debug, Clone)]
pub struct UsTaxConfig {
    single: BracketTable,
    federal: HashMap<FilingStatus, BracketTable>,
    standard_deduction: HashMap<FilingStatus, f64>,
    state_rates: HashMap<String, f64>,
    pub default_state_rate: f64,
    pub self_employment_rate: f64,
    pub additional_self_employment_rate: f64,
    pub additional_self_employment_threshold: f64,
    pub jar_owed_multiplier: f64,
    pub jar_income_floor_rate: f64,
    pub due_dates: Vec<DueDateRule>,
    pub set_aside: BTreeMap<String, f64>,
}

impl UsTaxConfig {
    /// Federal table for a filing status; statuses without their own table use `single`
    pub fn federal_table(&self, status: FilingStatus) -> &BracketTable {
        self.federal.get(&status).unwrap_or(&self.single)
    }

    pub fn standard_deduction(&self, status: FilingStatus) -> f64 {
        self.standard_deduction
            .get(&status)
            .or_else(|| self.standard_deduction.get(&FilingStatus::Single))
            .copied()
            .unwrap_or(0.0)
    }

    /// Flat rate for a state code, if the code is in the table
    pub fn state_rate(&self, state: &str) -> Option<f64> {
        self.state_rates.get(&state.trim().to_uppercase()).copied()
    }
}

/// Indian income tax, GST and presumptive parameters
#[derive(Debug, Clone)]
pub struct IndiaTaxConfig {
    new_regime: BracketTable,
    old_regime: BracketTable,
    pub standard_deduction: f64,
    pub section_80c_cap: f64,
    pub section_80d_cap: f64,
    pub section_80d_senior_cap: f64,
    pub cess_rate: f64,
    pub gst_rate: f64,
    pub gst_threshold: f64,
    pub presumptive_limit: f64,
    pub presumptive_profit_ratio: f64,
    pub professional_tax_cap: f64,
    pub tax_jar_rate: f64,
    pub due_dates: Vec<DueDateRule>,
    pub set_aside: BTreeMap<String, f64>,
}

impl IndiaTaxConfig {
    pub fn table(&self, regime: TaxRegime) -> &BracketTable {
        match regime {
            TaxRegime::New => &self.new_regime,
            TaxRegime::Old => &self.old_regime,
        }
    }
}

/// Thresholds for the recommendation heuristics
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecommendationSettings {
    pub low_expense_ratio: f64,
    pub high_tax_ratio: f64,
    pub quarterly_payment_income: f64,
    pub retirement_income: f64,
    pub entity_election_income: f64,
    pub advance_tax_liability: f64,
    pub estimated_marginal_rate: f64,
    pub max_recommendations: usize,
}

/// All tax tables
#[derive(Debug, Clone)]
pub struct TaxConfig {
    pub version: String,
    pub us: UsTaxConfig,
    pub india: IndiaTaxConfig,
    pub recommendations: RecommendationSettings,
}

impl TaxConfig {
    /// Load from an explicit path, the data-dir override, or embedded defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = config::resolve(path, CONFIG_FILE, DEFAULT_TAX_CONFIG)?;
        Self::from_toml(&content)
    }

    /// The tables compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_TAX_CONFIG)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawTaxConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid tax TOML: {}", e)))?;
        Ok(Self {
            version: raw.version,
            us: raw.us.try_into()?,
            india: raw.india.try_into()?,
            recommendations: raw.recommendations,
        })
    }

    pub fn due_dates(&self, jurisdiction: Jurisdiction) -> &[DueDateRule] {
        match jurisdiction {
            Jurisdiction::Us => &self.us.due_dates,
            Jurisdiction::India => &self.india.due_dates,
        }
    }

    /// Default set-aside component rates by name
    pub fn set_aside_rates(&self, jurisdiction: Jurisdiction) -> &BTreeMap<String, f64> {
        match jurisdiction {
            Jurisdiction::Us => &self.us.set_aside,
            Jurisdiction::India => &self.india.set_aside,
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    config::default_config_path(CONFIG_FILE)
}

fn check_rate(name: &str, rate: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(Error::Config(format!("{} must be within [0,1], got {}", name, rate)))
    }
}

fn check_amount(name: &str, amount: f64) -> Result<f64> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(Error::Config(format!("{} must be non-negative, got {}", name, amount)))
    }
}

fn check_due_dates(name: &str, rules: Vec<DueDateRule>) -> Result<Vec<DueDateRule>> {
    for rule in &rules {
        if chrono::NaiveDate::from_ymd_opt(2001, rule.month, rule.day).is_none() {
            return Err(Error::Config(format!(
                "{} due date {} has invalid month/day {}/{}",
                name, rule.period, rule.month, rule.day
            )));
        }
    }
    Ok(rules)
}

fn check_set_aside(name: &str, rates: BTreeMap<String, f64>) -> Result<BTreeMap<String, f64>> {
    for (component, rate) in &rates {
        check_rate(&format!("{} set-aside {}", name, component), *rate)?;
    }
    Ok(rates)
}

fn parse_status(key: &str) -> Result<FilingStatus> {
    key.parse()
        .map_err(|e: String| Error::Config(format!("Invalid filing status key: {}", e)))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawTaxConfig {
    version: String,
    us: RawUs,
    india: RawIndia,
    recommendations: RecommendationSettings,
}

#[derive(Debug, Deserialize)]
struct RawUs {
    default_state_rate: f64,
    federal_brackets: HashMap<String, Vec<TaxBracket>>,
    standard_deduction: HashMap<String, f64>,
    #[serde(default)]
    state_rates: HashMap<String, f64>,
    self_employment: RawSelfEmployment,
    tax_jar: RawUsTaxJar,
    due_dates: Vec<DueDateRule>,
    set_aside: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct RawSelfEmployment {
    rate: f64,
    additional_rate: f64,
    additional_threshold: f64,
}

#[derive(Debug, Deserialize)]
struct RawUsTaxJar {
    owed_multiplier: f64,
    income_floor_rate: f64,
}

impl TryFrom<RawUs> for UsTaxConfig {
    type Error = Error;

    fn try_from(raw: RawUs) -> Result<Self> {
        let mut federal = HashMap::new();
        for (key, brackets) in raw.federal_brackets {
            let status = parse_status(&key)?;
            let table = BracketTable::new(&format!("us.{}", status), brackets)?;
            federal.insert(status, table);
        }
        let single = federal.remove(&FilingStatus::Single).ok_or_else(|| {
            Error::Config("us.federal_brackets must define a single table".to_string())
        })?;

        let mut standard_deduction = HashMap::new();
        for (key, amount) in raw.standard_deduction {
            let status = parse_status(&key)?;
            standard_deduction.insert(
                status,
                check_amount(&format!("us.standard_deduction.{}", key), amount)?,
            );
        }

        let mut state_rates = HashMap::new();
        for (state, rate) in raw.state_rates {
            let rate = check_rate(&format!("us.state_rates.{}", state), rate)?;
            state_rates.insert(state.to_uppercase(), rate);
        }

        let multiplier = raw.tax_jar.owed_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(Error::Config(format!(
                "us.tax_jar.owed_multiplier must be at least 1, got {}",
                multiplier
            )));
        }

        Ok(Self {
            single,
            federal,
            standard_deduction,
            state_rates,
            default_state_rate: check_rate("us.default_state_rate", raw.default_state_rate)?,
            self_employment_rate: check_rate("us.self_employment.rate", raw.self_employment.rate)?,
            additional_self_employment_rate: check_rate(
                "us.self_employment.additional_rate",
                raw.self_employment.additional_rate,
            )?,
            additional_self_employment_threshold: check_amount(
                "us.self_employment.additional_threshold",
                raw.self_employment.additional_threshold,
            )?,
            jar_owed_multiplier: multiplier,
            jar_income_floor_rate: check_rate(
                "us.tax_jar.income_floor_rate",
                raw.tax_jar.income_floor_rate,
            )?,
            due_dates: check_due_dates("us", raw.due_dates)?,
            set_aside: check_set_aside("us", raw.set_aside)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawIndia {
    standard_deduction: f64,
    section_80c_cap: f64,
    section_80d_cap: f64,
    section_80d_senior_cap: f64,
    cess_rate: f64,
    gst_rate: f64,
    gst_threshold: f64,
    presumptive_limit: f64,
    presumptive_profit_ratio: f64,
    professional_tax_cap: f64,
    tax_jar_rate: f64,
    brackets: RawIndiaBrackets,
    due_dates: Vec<DueDateRule>,
    set_aside: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct RawIndiaBrackets {
    new: Vec<TaxBracket>,
    old: Vec<TaxBracket>,
}

impl TryFrom<RawIndia> for IndiaTaxConfig {
    type Error = Error;

    fn try_from(raw: RawIndia) -> Result<Self> {
        Ok(Self {
            new_regime: BracketTable::new("india.new", raw.brackets.new)?,
            old_regime: BracketTable::new("india.old", raw.brackets.old)?,
            standard_deduction: check_amount("india.standard_deduction", raw.standard_deduction)?,
            section_80c_cap: check_amount("india.section_80c_cap", raw.section_80c_cap)?,
            section_80d_cap: check_amount("india.section_80d_cap", raw.section_80d_cap)?,
            section_80d_senior_cap: check_amount(
                "india.section_80d_senior_cap",
                raw.section_80d_senior_cap,
            )?,
            cess_rate: check_rate("india.cess_rate", raw.cess_rate)?,
            gst_rate: check_rate("india.gst_rate", raw.gst_rate)?,
            gst_threshold: check_amount("india.gst_threshold", raw.gst_threshold)?,
            presumptive_limit: check_amount("india.presumptive_limit", raw.presumptive_limit)?,
            presumptive_profit_ratio: check_rate(
                "india.presumptive_profit_ratio",
                raw.presumptive_profit_ratio,
            )?,
            professional_tax_cap: check_amount(
                "india.professional_tax_cap",
                raw.professional_tax_cap,
            )?,
            tax_jar_rate: check_rate("india.tax_jar_rate", raw.tax_jar_rate)?,
            due_dates: check_due_dates("india", raw.due_dates)?,
            set_aside: check_set_aside("india", raw.set_aside)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_loads() {
        let config = TaxConfig::embedded().unwrap();
        assert_eq!(config.us.standard_deduction(FilingStatus::Single), 14600.0);
        assert_eq!(
            config.us.standard_deduction(FilingStatus::MarriedFilingJointly),
            29200.0
        );
        assert_eq!(config.us.state_rate("ca"), Some(0.093));
        assert_eq!(config.us.state_rate("TX"), Some(0.0));
        assert_eq!(config.us.state_rate("ZZ"), None);
        assert_eq!(config.india.standard_deduction, 50000.0);
        assert_eq!(config.due_dates(Jurisdiction::Us).len(), 4);
        assert_eq!(config.due_dates(Jurisdiction::India).len(), 4);
    }

    #[test]
    fn test_every_table_unbounded_at_top() {
        let config = TaxConfig::embedded().unwrap();
        let tables = [
            config.us.federal_table(FilingStatus::Single),
            config.us.federal_table(FilingStatus::MarriedFilingJointly),
            config.india.table(TaxRegime::New),
            config.india.table(TaxRegime::Old),
        ];
        for table in tables {
            let brackets = table.brackets();
            assert_eq!(brackets[0].min, 0.0);
            assert!(brackets.last().unwrap().max.is_none());
            for pair in brackets.windows(2) {
                assert_eq!(pair[0].max, Some(pair[1].min));
            }
        }
    }

    #[test]
    fn test_filing_status_without_table_uses_single() {
        let config = TaxConfig::embedded().unwrap();
        assert_eq!(
            config.us.federal_table(FilingStatus::HeadOfHousehold),
            config.us.federal_table(FilingStatus::Single)
        );
    }

    #[test]
    fn test_default_set_aside_sums_to_thirty_percent() {
        let config = TaxConfig::embedded().unwrap();
        let us: f64 = config.set_aside_rates(Jurisdiction::Us).values().sum();
        assert!((us - 0.30).abs() < 1e-9);
        let india: f64 = config.set_aside_rates(Jurisdiction::India).values().sum();
        assert!((india - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_gapped_table() {
        let content = DEFAULT_TAX_CONFIG.replace(
            "{ min = 11600, max = 47150, rate = 0.12 }",
            "{ min = 12000, max = 47150, rate = 0.12 }",
        );
        assert!(matches!(TaxConfig::from_toml(&content), Err(Error::Config(_))));
    }
}
