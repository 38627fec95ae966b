//! Tax profile and snapshot operations

use async_trait::async_trait;
use chrono::SecondsFormat;
use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::Result;
use crate::models::{TaxCalculationResult, TaxProfile};
use crate::store::{ProfileStore, SnapshotStore};

impl Database {
    pub fn get_profile(&self, user_id: &str) -> Result<Option<TaxProfile>> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT profile FROM profiles WHERE user_id = ?",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    pub fn upsert_profile(&self, user_id: &str, profile: &TaxProfile) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO profiles (user_id, country, profile)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                country = excluded.country,
                profile = excluded.profile,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![user_id, profile.country, serde_json::to_string(profile)?],
        )?;
        Ok(())
    }

    pub fn insert_snapshot(&self, snapshot: &TaxCalculationResult) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO snapshots (user_id, period, calculated_at, total_tax_owed, snapshot)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                snapshot.user_id,
                snapshot.period.label(),
                // Fixed-width UTC timestamps sort lexicographically
                snapshot
                    .calculated_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
                snapshot.total_tax_owed,
                serde_json::to_string(snapshot)?,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn latest_snapshot_for(&self, user_id: &str) -> Result<Option<TaxCalculationResult>> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(
                r#"
                SELECT snapshot FROM snapshots
                WHERE user_id = ?
                ORDER BY calculated_at DESC, id DESC
                LIMIT 1
                "#,
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    pub fn count_snapshots(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM snapshots WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl ProfileStore for Database {
    async fn get(&self, user_id: &str) -> Result<Option<TaxProfile>> {
        self.get_profile(user_id)
    }

    async fn put(&self, user_id: &str, profile: &TaxProfile) -> Result<()> {
        self.upsert_profile(user_id, profile)
    }
}

#[async_trait]
impl SnapshotStore for Database {
    async fn save_snapshot(&self, snapshot: &TaxCalculationResult) -> Result<()> {
        self.insert_snapshot(snapshot)?;
        Ok(())
    }

    async fn latest_snapshot(&self, user_id: &str) -> Result<Option<TaxCalculationResult>> {
        self.latest_snapshot_for(user_id)
    }
}
