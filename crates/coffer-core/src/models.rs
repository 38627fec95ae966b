//! Domain models for coffer

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ========== Transaction Models ==========

/// Direction of money movement for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" | "credit" => Ok(Self::Income),
            "expense" | "debit" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A raw transaction as handed to the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Coarse categories supplied by the bank or aggregator, most specific last
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_categories: Vec<String>,
}

impl TransactionInput {
    pub fn new(
        description: impl Into<String>,
        amount: f64,
        date: NaiveDate,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            description: description.into(),
            merchant_name: None,
            amount,
            date,
            transaction_type,
            external_categories: Vec::new(),
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant_name = Some(merchant.into());
        self
    }

    pub fn with_external_categories(mut self, categories: Vec<String>) -> Self {
        self.external_categories = categories;
        self
    }

    /// Description and merchant joined into one string for text analysis
    pub fn text(&self) -> String {
        match &self.merchant_name {
            Some(merchant) if !merchant.trim().is_empty() => {
                format!("{} {}", self.description, merchant)
            }
            _ => self.description.clone(),
        }
    }

    /// Reject malformed input rather than coercing it
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::Validation(
                "transaction description is required".to_string(),
            ));
        }
        if !self.amount.is_finite() {
            return Err(Error::Validation(format!(
                "transaction amount must be a finite number, got {}",
                self.amount
            )));
        }
        if self.date.year() < 1900 || self.date.year() > 2200 {
            return Err(Error::Validation(format!(
                "transaction date out of range: {}",
                self.date
            )));
        }
        Ok(())
    }
}

/// A stored transaction together with its persisted classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    pub id: Option<i64>,
    pub transaction: TransactionInput,
    pub classification: Option<ClassificationResult>,
}

impl ClassifiedTransaction {
    pub fn new(
        transaction: TransactionInput,
        classification: Option<ClassificationResult>,
    ) -> Self {
        Self {
            id: None,
            transaction,
            classification,
        }
    }
}

/// Inclusive date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

// ========== Classification Models ==========

/// Taxonomy group a category belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGroup {
    Income,
    BusinessExpense,
    Personal,
}

impl CategoryGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::BusinessExpense => "business_expense",
            Self::Personal => "personal",
        }
    }

    /// Income and business expenses count toward business activity
    pub fn is_business(&self) -> bool {
        matches!(self, Self::Income | Self::BusinessExpense)
    }
}

impl std::fmt::Display for CategoryGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a transaction belongs to the business
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusinessClassification {
    Business,
    Personal,
    Mixed,
    #[default]
    Unknown,
}

impl BusinessClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Personal => "personal",
            Self::Mixed => "mixed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for BusinessClassification {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "business" => Ok(Self::Business),
            "personal" => Ok(Self::Personal),
            "mixed" => Ok(Self::Mixed),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Unknown business classification: {}", s)),
        }
    }
}

impl std::fmt::Display for BusinessClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kinds of expense recognized as tax-deductible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionType {
    Software,
    Equipment,
    OfficeSupplies,
    InternetPhone,
    Advertising,
    ContractLabor,
    Travel,
    Education,
    ProfessionalServices,
    WebHosting,
    ContentLicensing,
    PlatformFees,
    Other,
}

impl DeductionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::Equipment => "equipment",
            Self::OfficeSupplies => "office_supplies",
            Self::InternetPhone => "internet_phone",
            Self::Advertising => "advertising",
            Self::ContractLabor => "contract_labor",
            Self::Travel => "travel",
            Self::Education => "education",
            Self::ProfessionalServices => "professional_services",
            Self::WebHosting => "web_hosting",
            Self::ContentLicensing => "content_licensing",
            Self::PlatformFees => "platform_fees",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for DeductionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which classification path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Per-user model trained on corrections
    Adaptive,
    /// Static keyword taxonomy
    Rules,
    /// Coarse category supplied with the transaction
    ExternalCategory,
    /// Nothing matched
    #[default]
    Fallback,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adaptive => "adaptive",
            Self::Rules => "rules",
            Self::ExternalCategory => "external_category",
            Self::Fallback => "fallback",
        }
    }
}

/// Predicted category with confidence in [0,1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPrediction {
    pub primary: String,
    pub detailed: String,
    pub confidence: f64,
}

/// Tax-deductibility verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxDeductible {
    pub is_deductible: bool,
    pub deduction_type: Option<DeductionType>,
    pub confidence: f64,
    /// Share of the amount that is deductible, in [0,1]
    pub deduction_percentage: f64,
}

impl TaxDeductible {
    pub fn not_deductible() -> Self {
        Self {
            is_deductible: false,
            deduction_type: None,
            confidence: 0.0,
            deduction_percentage: 0.0,
        }
    }
}

/// Full classification of one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: CategoryPrediction,
    pub business_classification: BusinessClassification,
    pub tax_deductible: TaxDeductible,
    #[serde(default)]
    pub source: ClassificationSource,
}

pub const UNCATEGORIZED_PRIMARY: &str = "other";
pub const UNCATEGORIZED_DETAILED: &str = "uncategorized";

impl ClassificationResult {
    /// The not-found sentinel: "other/uncategorized" with zero confidence
    pub fn uncategorized() -> Self {
        Self {
            category: CategoryPrediction {
                primary: UNCATEGORIZED_PRIMARY.to_string(),
                detailed: UNCATEGORIZED_DETAILED.to_string(),
                confidence: 0.0,
            },
            business_classification: BusinessClassification::Unknown,
            tax_deductible: TaxDeductible::not_deductible(),
            source: ClassificationSource::Fallback,
        }
    }

    pub fn is_uncategorized(&self) -> bool {
        self.category.primary == UNCATEGORIZED_PRIMARY && self.category.confidence == 0.0
    }

    /// Force every confidence and percentage back into [0,1]
    pub fn clamped(mut self) -> Self {
        self.category.confidence = clamp_unit(self.category.confidence);
        self.tax_deductible.confidence = clamp_unit(self.tax_deductible.confidence);
        self.tax_deductible.deduction_percentage =
            clamp_unit(self.tax_deductible.deduction_percentage);
        self
    }
}

/// Clamp to [0,1], mapping NaN to 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A ranked category suggestion for a free-text description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category: String,
    pub confidence: f64,
    pub tax_deductible: bool,
}

// ========== Correction Models ==========

/// What the user changed about a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionType {
    CategoryCorrection,
    BusinessClassificationCorrection,
    TaxDeductibleCorrection,
    NewClassification,
}

impl CorrectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CategoryCorrection => "category_correction",
            Self::BusinessClassificationCorrection => "business_classification_correction",
            Self::TaxDeductibleCorrection => "tax_deductible_correction",
            Self::NewClassification => "new_classification",
        }
    }
}

impl std::fmt::Display for CorrectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user's override of a prediction; absent fields keep the system's value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCorrection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_classification: Option<BusinessClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deductible: Option<bool>,
}

/// Coarse size of a transaction amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountBucket {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl AmountBucket {
    pub fn from_amount(amount: f64) -> Self {
        let amount = amount.abs();
        if amount < 50.0 {
            Self::Low
        } else if amount < 500.0 {
            Self::Medium
        } else if amount < 2000.0 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

/// Merchant kind guessed from the transaction text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MerchantType {
    Ecommerce,
    Retail,
    Food,
    GasStation,
    Travel,
    Transportation,
    Other,
}

impl MerchantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ecommerce => "ecommerce",
            Self::Retail => "retail",
            Self::Food => "food",
            Self::GasStation => "gas_station",
            Self::Travel => "travel",
            Self::Transportation => "transportation",
            Self::Other => "other",
        }
    }
}

/// Surface-level flags about the raw transaction text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntacticPatterns {
    pub has_digits: bool,
    pub has_acronym: bool,
    pub has_company_suffix: bool,
    pub has_retail_keyword: bool,
}

/// Features captured alongside a correction for later retraining
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFeatures {
    pub tokens: Vec<String>,
    pub stems: Vec<String>,
    pub patterns: SyntacticPatterns,
    pub merchant_type: MerchantType,
    pub amount_bucket: AmountBucket,
}

/// One appended user correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub user_id: String,
    pub transaction: TransactionInput,
    pub system_prediction: ClassificationResult,
    pub correction: UserCorrection,
    pub correction_type: CorrectionType,
    pub features: ExtractedFeatures,
    pub created_at: DateTime<Utc>,
}

impl CorrectionRecord {
    /// Category after applying the correction
    pub fn corrected_category(&self) -> &str {
        self.correction
            .category
            .as_deref()
            .unwrap_or(&self.system_prediction.category.primary)
    }

    /// Business classification after applying the correction
    pub fn corrected_business(&self) -> BusinessClassification {
        self.correction
            .business_classification
            .unwrap_or(self.system_prediction.business_classification)
    }

    /// Deductibility after applying the correction
    pub fn corrected_deductible(&self) -> bool {
        self.correction
            .is_deductible
            .unwrap_or(self.system_prediction.tax_deductible.is_deductible)
    }
}

// ========== Tax Profile Models ==========

/// Tax jurisdictions with a calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Jurisdiction {
    Us,
    India,
}

impl Jurisdiction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "us",
            Self::India => "india",
        }
    }

    /// Resolve a profile country code or name
    pub fn from_country(country: &str) -> Result<Self> {
        country
            .parse()
            .map_err(|_| Error::UnsupportedJurisdiction(country.to_string()))
    }
}

impl std::str::FromStr for Jurisdiction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "us" | "usa" | "united states" | "united states of america" => Ok(Self::Us),
            "in" | "ind" | "india" => Ok(Self::India),
            _ => Err(format!("Unsupported jurisdiction: {}", s)),
        }
    }
}

impl std::fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// US federal filing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    #[default]
    Single,
    MarriedFilingJointly,
    MarriedFilingSeparately,
    HeadOfHousehold,
}

impl FilingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::MarriedFilingJointly => "married_filing_jointly",
            Self::MarriedFilingSeparately => "married_filing_separately",
            Self::HeadOfHousehold => "head_of_household",
        }
    }
}

impl std::str::FromStr for FilingStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "single" => Ok(Self::Single),
            "married_filing_jointly" | "married" | "mfj" => Ok(Self::MarriedFilingJointly),
            "married_filing_separately" | "mfs" => Ok(Self::MarriedFilingSeparately),
            "head_of_household" | "hoh" => Ok(Self::HeadOfHousehold),
            _ => Err(format!("Unknown filing status: {}", s)),
        }
    }
}

impl std::fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Indian income tax regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaxRegime {
    #[default]
    New,
    Old,
}

impl TaxRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Old => "old",
        }
    }
}

impl std::str::FromStr for TaxRegime {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "old" => Ok(Self::Old),
            _ => Err(format!("Unknown tax regime: {}", s)),
        }
    }
}

impl std::fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-user tax settings from the profile store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxProfile {
    pub country: String,
    #[serde(default)]
    pub filing_status: FilingStatus,
    #[serde(default)]
    pub state: Option<String>,
    /// Overrides the state lookup table when set
    #[serde(default)]
    pub state_tax_rate: Option<f64>,
    #[serde(default)]
    pub tax_regime: TaxRegime,
    #[serde(default)]
    pub presumptive_taxation: bool,
    #[serde(default)]
    pub section_80c: f64,
    #[serde(default)]
    pub section_80d: f64,
    #[serde(default)]
    pub section_80e: f64,
    /// Raises the 80D cap
    #[serde(default)]
    pub senior_citizen: bool,
}

impl Default for TaxProfile {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            filing_status: FilingStatus::Single,
            state: None,
            state_tax_rate: None,
            tax_regime: TaxRegime::New,
            presumptive_taxation: false,
            section_80c: 0.0,
            section_80d: 0.0,
            section_80e: 0.0,
            senior_citizen: false,
        }
    }
}

impl TaxProfile {
    pub fn india(regime: TaxRegime) -> Self {
        Self {
            country: "IN".to_string(),
            tax_regime: regime,
            ..Default::default()
        }
    }
}

// ========== Tax Result Models ==========

/// A tax year, optionally narrowed to one calendar quarter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxPeriod {
    pub year: i32,
    pub quarter: Option<u8>,
}

impl TaxPeriod {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            quarter: None,
        }
    }

    pub fn quarter(year: i32, quarter: u8) -> Self {
        Self {
            year,
            quarter: Some(quarter),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(q) = self.quarter {
            if !(1..=4).contains(&q) {
                return Err(Error::Validation(format!(
                    "quarter must be between 1 and 4, got {}",
                    q
                )));
            }
        }
        if !(1900..=2200).contains(&self.year) {
            return Err(Error::Validation(format!("year out of range: {}", self.year)));
        }
        Ok(())
    }

    /// Full year, or the quarter's three-month span
    pub fn date_range(&self) -> Result<DateRange> {
        self.validate()?;
        let (start_month, end_month) = match self.quarter {
            Some(q) => {
                let start = u32::from(q - 1) * 3 + 1;
                (start, start + 2)
            }
            None => (1, 12),
        };
        let start = NaiveDate::from_ymd_opt(self.year, start_month, 1)
            .ok_or_else(|| Error::Validation(format!("invalid period start: {:?}", self)))?;
        let end = last_day_of_month(self.year, end_month)
            .ok_or_else(|| Error::Validation(format!("invalid period end: {:?}", self)))?;
        Ok(DateRange::new(start, end))
    }

    /// Share of the year covered by the period
    pub fn fraction_of_year(&self) -> f64 {
        if self.quarter.is_some() {
            0.25
        } else {
            1.0
        }
    }

    pub fn label(&self) -> String {
        match self.quarter {
            Some(q) => format!("Q{} {}", q, self.year),
            None => self.year.to_string(),
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
}

/// Income totals for a period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeBreakdown {
    pub total: f64,
    pub business: f64,
    pub other: f64,
}

/// Expense totals for a period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseBreakdown {
    pub total: f64,
    pub deductible: f64,
    pub personal: f64,
}

/// US tax components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsTaxBreakdown {
    pub filing_status: FilingStatus,
    pub standard_deduction: f64,
    pub taxable_income: f64,
    pub federal: f64,
    pub state: f64,
    pub state_rate: f64,
    pub self_employment: f64,
}

/// GST liability on digital-service income
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GstAssessment {
    pub required: bool,
    pub rate: f64,
    pub amount: f64,
}

/// Section 44ADA presumptive taxation outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresumptiveTax {
    pub applicable: bool,
    pub gross_receipts: f64,
    /// Deemed taxable profit; zero when not applicable
    pub profit: f64,
    /// Income tax on the deemed profit before cess; zero when not applicable
    pub tax: f64,
}

/// Indian tax components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndiaTaxBreakdown {
    pub regime: TaxRegime,
    pub deductions: f64,
    pub taxable_income: f64,
    pub income_tax: f64,
    pub cess: f64,
    pub gst: GstAssessment,
    pub professional_tax: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presumptive: Option<PresumptiveTax>,
}

/// Jurisdiction-specific tax components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "jurisdiction", rename_all = "lowercase")]
pub enum TaxComponents {
    Us(UsTaxBreakdown),
    India(IndiaTaxBreakdown),
}

impl TaxComponents {
    pub fn jurisdiction(&self) -> Jurisdiction {
        match self {
            Self::Us(_) => Jurisdiction::Us,
            Self::India(_) => Jurisdiction::India,
        }
    }

    /// Sum of all components; never negative
    pub fn total(&self) -> f64 {
        let total = match self {
            Self::Us(us) => us.federal + us.state + us.self_employment,
            Self::India(india) => {
                india.income_tax + india.cess + india.gst.amount + india.professional_tax
            }
        };
        total.max(0.0)
    }
}

/// Priority tier of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tax-saving suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub key: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings: Option<f64>,
}

/// Reserve and planning advice attached to a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRecommendations {
    pub tax_jar_amount: f64,
    pub next_due_date: Option<NaiveDate>,
    pub suggested_deductions: Vec<Recommendation>,
    pub strategy: String,
}

/// Snapshot of a tax estimate for one user and period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    pub user_id: String,
    pub period: TaxPeriod,
    pub income: IncomeBreakdown,
    pub expenses: ExpenseBreakdown,
    pub taxes: TaxComponents,
    pub total_tax_owed: f64,
    pub estimated_quarterly_payment: f64,
    pub recommendations: TaxRecommendations,
    pub calculated_at: DateTime<Utc>,
}

impl TaxCalculationResult {
    pub fn jurisdiction(&self) -> Jurisdiction {
        self.taxes.jurisdiction()
    }

    /// Tax owed per unit of business income, if there was any
    pub fn effective_rate(&self) -> Option<f64> {
        if self.income.business > 0.0 {
            Some(clamp_unit(self.total_tax_owed / self.income.business))
        } else {
            None
        }
    }
}

/// Suggested set-aside for a single incoming transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealTimeTaxJar {
    pub amount_to_set_aside: f64,
    pub tax_rate: f64,
    pub message: String,
}

/// One component of a set-aside calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetAsideComponent {
    pub name: String,
    pub rate: f64,
    pub amount: f64,
}

/// Set-aside for an amount using default or overridden component rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSetAside {
    pub jurisdiction: Jurisdiction,
    pub amount: f64,
    pub total_set_aside: f64,
    pub effective_rate: f64,
    pub breakdown: Vec<SetAsideComponent>,
}

/// A quarterly payment deadline relative to today
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueDate {
    pub period: String,
    pub due_date: NaiveDate,
    pub days_until: i64,
    pub is_urgent: bool,
    pub is_past_due: bool,
}
