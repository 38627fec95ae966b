//! Store interfaces consumed by the engine
//!
//! Transactions, corrections, profiles and tax snapshots live behind async
//! traits so the classification and tax code stays pure and testable.
//! [`MemoryStore`] implements all four in memory; [`crate::db::Database`]
//! implements them over SQLite.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::models::{
    ClassificationResult, ClassifiedTransaction, CorrectionRecord, DateRange, TaxCalculationResult,
    TaxProfile, TransactionInput, TransactionType,
};

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Transactions for a user within the range, optionally of one type, oldest first
    async fn query(
        &self,
        user_id: &str,
        range: DateRange,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<ClassifiedTransaction>>;

    /// Save a transaction with its classification; duplicates update the existing row
    async fn save(
        &self,
        user_id: &str,
        transaction: &TransactionInput,
        classification: Option<&ClassificationResult>,
    ) -> Result<i64>;
}

/// Append-only correction log
#[async_trait]
pub trait CorrectionStore: Send + Sync {
    async fn append(&self, record: &CorrectionRecord) -> Result<()>;

    async fn count(&self, user_id: &str) -> Result<usize>;

    /// Most recent corrections first
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<CorrectionRecord>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<TaxProfile>>;

    async fn put(&self, user_id: &str, profile: &TaxProfile) -> Result<()>;
}

/// Tax snapshots; history is retained
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save_snapshot(&self, snapshot: &TaxCalculationResult) -> Result<()>;

    async fn latest_snapshot(&self, user_id: &str) -> Result<Option<TaxCalculationResult>>;
}

/// The four stores the engine talks to
#[derive(Clone)]
pub struct Stores {
    pub transactions: Arc<dyn TransactionStore>,
    pub corrections: Arc<dyn CorrectionStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
}

impl Stores {
    /// Use one backend for every store
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: TransactionStore + CorrectionStore + ProfileStore + SnapshotStore + 'static,
    {
        Self {
            transactions: store.clone(),
            corrections: store.clone(),
            profiles: store.clone(),
            snapshots: store,
        }
    }
}

/// Deduplication hash over user, date, description, amount and type
pub fn transaction_hash(user_id: &str, transaction: &TransactionInput) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(transaction.date.to_string().as_bytes());
    hasher.update(transaction.description.as_bytes());
    hasher.update(transaction.amount.to_be_bytes());
    hasher.update(transaction.transaction_type.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    transactions: HashMap<String, Vec<(String, ClassifiedTransaction)>>,
    corrections: HashMap<String, Vec<CorrectionRecord>>,
    profiles: HashMap<String, TaxProfile>,
    snapshots: HashMap<String, Vec<TaxCalculationResult>>,
}

/// In-memory implementation of every store
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))
    }

    /// Number of snapshots retained for a user
    pub fn snapshot_count(&self, user_id: &str) -> Result<usize> {
        Ok(self.state()?.snapshots.get(user_id).map_or(0, Vec::len))
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn query(
        &self,
        user_id: &str,
        range: DateRange,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<ClassifiedTransaction>> {
        let state = self.state()?;
        let mut rows: Vec<ClassifiedTransaction> = state
            .transactions
            .get(user_id)
            .into_iter()
            .flatten()
            .map(|(_, tx)| tx)
            .filter(|tx| range.contains(tx.transaction.date))
            .filter(|tx| transaction_type.map_or(true, |t| tx.transaction.transaction_type == t))
            .cloned()
            .collect();
        rows.sort_by_key(|tx| (tx.transaction.date, tx.id));
        Ok(rows)
    }

    async fn save(
        &self,
        user_id: &str,
        transaction: &TransactionInput,
        classification: Option<&ClassificationResult>,
    ) -> Result<i64> {
        transaction.validate()?;
        let hash = transaction_hash(user_id, transaction);
        let mut state = self.state()?;

        if let Some((_, existing)) = state
            .transactions
            .get_mut(user_id)
            .and_then(|rows| rows.iter_mut().find(|(h, _)| *h == hash))
        {
            existing.classification = classification.cloned();
            return existing
                .id
                .ok_or_else(|| Error::Store("stored transaction without id".to_string()));
        }

        state.next_id += 1;
        let id = state.next_id;
        let mut row = ClassifiedTransaction::new(transaction.clone(), classification.cloned());
        row.id = Some(id);
        state
            .transactions
            .entry(user_id.to_string())
            .or_default()
            .push((hash, row));
        Ok(id)
    }
}

#[async_trait]
impl CorrectionStore for MemoryStore {
    async fn append(&self, record: &CorrectionRecord) -> Result<()> {
        self.state()?
            .corrections
            .entry(record.user_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn count(&self, user_id: &str) -> Result<usize> {
        Ok(self.state()?.corrections.get(user_id).map_or(0, Vec::len))
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<CorrectionRecord>> {
        Ok(self
            .state()?
            .corrections
            .get(user_id)
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get(&self, user_id: &str) -> Result<Option<TaxProfile>> {
        Ok(self.state()?.profiles.get(user_id).cloned())
    }

    async fn put(&self, user_id: &str, profile: &TaxProfile) -> Result<()> {
        self.state()?
            .profiles
            .insert(user_id.to_string(), profile.clone());
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save_snapshot(&self, snapshot: &TaxCalculationResult) -> Result<()> {
        self.state()?
            .snapshots
            .entry(snapshot.user_id.clone())
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    async fn latest_snapshot(&self, user_id: &str) -> Result<Option<TaxCalculationResult>> {
        Ok(self
            .state()?
            .snapshots
            .get(user_id)
            .and_then(|snapshots| snapshots.iter().max_by_key(|s| s.calculated_at))
            .cloned())
    }
}
