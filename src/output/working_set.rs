use crate::record::{CommittedRecord, EnrichedRecord, IdentityKey};
use std::sync::Arc;
use tokio::sync::RwLock;

/// All records committed so far, in commit order
///
/// Appends take the write lock and assign global sequence numbers under it,
/// so indices are dense, 0-based and monotonically increasing. Readers only
/// ever get a copy taken under the read lock.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    records: Arc<RwLock<Vec<CommittedRecord>>>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch, numbering each record; returns the number appended
    pub async fn append(&self, batch: Vec<(IdentityKey, EnrichedRecord)>) -> usize {
        let mut records = self.records.write().await;
        let appended = batch.len();
        for (key, record) in batch {
            let index = records.len() as u64;
            records.push(CommittedRecord::new(index, key, record));
        }
        appended
    }

    /// Consistent copy of every committed record
    pub async fn snapshot(&self) -> Vec<CommittedRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Number of committed records belonging to `category`
    pub async fn count_in_category(&self, category: &str) -> usize {
        self.records
            .read()
            .await
            .iter()
            .filter(|record| record.identity.category == category)
            .count()
    }
}
