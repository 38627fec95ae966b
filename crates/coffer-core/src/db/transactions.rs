//! Transaction store operations

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{
    ClassificationResult, ClassifiedTransaction, DateRange, TransactionInput, TransactionType,
};
use crate::store::{transaction_hash, TransactionStore};

/// Raw column values of one transaction row
type TransactionRow = (
    i64,
    String,
    String,
    Option<String>,
    f64,
    String,
    String,
    Option<String>,
);

fn decode_row(row: TransactionRow) -> Result<ClassifiedTransaction> {
    let (id, date, description, merchant_name, amount, type_str, categories, classification) = row;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|e| Error::Store(format!("transaction {} has invalid date {}: {}", id, date, e)))?;
    let transaction_type: TransactionType = type_str.parse().map_err(Error::Store)?;

    Ok(ClassifiedTransaction {
        id: Some(id),
        transaction: TransactionInput {
            description,
            merchant_name,
            amount,
            date,
            transaction_type,
            external_categories: serde_json::from_str(&categories)?,
        },
        classification: classification
            .map(|json| serde_json::from_str(&json))
            .transpose()?,
    })
}

impl Database {
    /// Insert a transaction, or update the classification of its duplicate
    pub fn upsert_transaction(
        &self,
        user_id: &str,
        tx: &TransactionInput,
        classification: Option<&ClassificationResult>,
    ) -> Result<i64> {
        tx.validate()?;
        let conn = self.conn()?;
        let hash = transaction_hash(user_id, tx);
        let classification = classification.map(serde_json::to_string).transpose()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE hash = ?",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                "UPDATE transactions SET classification = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                params![classification, id],
            )?;
            return Ok(id);
        }

        conn.execute(
            r#"
            INSERT INTO transactions (
                user_id, hash, date, description, merchant_name, amount,
                transaction_type, external_categories, classification
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                hash,
                tx.date.to_string(),
                tx.description,
                tx.merchant_name,
                tx.amount,
                tx.transaction_type.as_str(),
                serde_json::to_string(&tx.external_categories)?,
                classification,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Transactions for a user within an inclusive date range, oldest first
    pub fn list_transactions(
        &self,
        user_id: &str,
        range: DateRange,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<ClassifiedTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, date, description, merchant_name, amount, transaction_type,
                   external_categories, classification
            FROM transactions
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
              AND (?4 IS NULL OR transaction_type = ?4)
            ORDER BY date, id
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    user_id,
                    range.start.to_string(),
                    range.end.to_string(),
                    transaction_type.map(|t| t.as_str()),
                ],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ))
                },
            )?
            .collect::<std::result::Result<Vec<TransactionRow>, _>>()?;

        rows.into_iter().map(decode_row).collect()
    }
}

#[async_trait]
impl TransactionStore for Database {
    async fn query(
        &self,
        user_id: &str,
        range: DateRange,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<ClassifiedTransaction>> {
        self.list_transactions(user_id, range, transaction_type)
    }

    async fn save(
        &self,
        user_id: &str,
        transaction: &TransactionInput,
        classification: Option<&ClassificationResult>,
    ) -> Result<i64> {
        self.upsert_transaction(user_id, transaction, classification)
    }
}
