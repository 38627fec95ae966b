//! Correction log operations

use async_trait::async_trait;
use rusqlite::params;

use super::Database;
use crate::error::{Error, Result};
use crate::models::CorrectionRecord;
use crate::store::CorrectionStore;

impl Database {
    pub fn insert_correction(&self, record: &CorrectionRecord) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO corrections (user_id, correction_type, record) VALUES (?, ?, ?)",
            params![
                record.user_id,
                record.correction_type.as_str(),
                serde_json::to_string(record)?,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn count_corrections(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM corrections WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Most recent corrections first
    pub fn recent_corrections(&self, user_id: &str, limit: usize) -> Result<Vec<CorrectionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT record FROM corrections WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![user_id, limit], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        records
            .iter()
            .map(|json| serde_json::from_str(json).map_err(Error::from))
            .collect()
    }
}

#[async_trait]
impl CorrectionStore for Database {
    async fn append(&self, record: &CorrectionRecord) -> Result<()> {
        self.insert_correction(record)?;
        Ok(())
    }

    async fn count(&self, user_id: &str) -> Result<usize> {
        self.count_corrections(user_id)
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<CorrectionRecord>> {
        self.recent_corrections(user_id, limit)
    }
}
