//! Period aggregation over classified transactions
//!
//! Pure: callers fetch transactions from a store and hand them over. Business
//! vs personal splits use the same taxonomy the rule classifier scores against.

use crate::models::{
    BusinessClassification, ClassifiedTransaction, ExpenseBreakdown, IncomeBreakdown,
    TransactionType,
};
use crate::taxonomy::Taxonomy;

/// Income and expense totals for one period
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodTotals {
    pub income: IncomeBreakdown,
    pub expenses: ExpenseBreakdown,
}

impl PeriodTotals {
    /// Sum income and expenses; transfers are ignored
    pub fn from_transactions(transactions: &[ClassifiedTransaction], taxonomy: &Taxonomy) -> Self {
        let mut totals = Self::default();

        for tx in transactions {
            let amount = tx.transaction.amount.abs();
            if !amount.is_finite() {
                continue;
            }
            let business = is_business(tx, taxonomy);

            match tx.transaction.transaction_type {
                TransactionType::Income => {
                    totals.income.total += amount;
                    if business {
                        totals.income.business += amount;
                    } else {
                        totals.income.other += amount;
                    }
                }
                TransactionType::Expense => {
                    totals.expenses.total += amount;
                    if let Some(deductible) = tx
                        .classification
                        .as_ref()
                        .map(|c| &c.tax_deductible)
                        .filter(|d| d.is_deductible)
                    {
                        totals.expenses.deductible += amount * deductible.deduction_percentage;
                    }
                    if !business {
                        totals.expenses.personal += amount;
                    }
                }
                TransactionType::Transfer => {}
            }
        }

        totals
    }

    /// Deductible expenses as a share of total income
    pub fn expense_ratio(&self) -> Option<f64> {
        (self.income.total > 0.0).then(|| self.expenses.deductible / self.income.total)
    }
}

fn is_business(tx: &ClassifiedTransaction, taxonomy: &Taxonomy) -> bool {
    match &tx.classification {
        Some(c) => match c.business_classification {
            BusinessClassification::Business => true,
            BusinessClassification::Personal => false,
            BusinessClassification::Mixed | BusinessClassification::Unknown => {
                taxonomy.is_business_category(&c.category.primary)
            }
        },
        None => false,
    }
}
