//! Checkpoint and final artifact persistence
//!
//! Both artifacts have the same shape: a pretty-printed JSON array of
//! [`CommittedRecord`]s, fully overwritten on every write. A crash during a
//! write can leave a truncated file; the next save replaces it.

use crate::output::working_set::WorkingSet;
use crate::record::CommittedRecord;
use crate::CheckpointError;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

/// Serializes `records` and overwrites `path`; returns the record count
pub async fn write_artifact(path: &Path, records: Vec<CommittedRecord>) -> Result<usize, CheckpointError> {
    let count = records.len();
    let bytes = tokio::task::spawn_blocking(move || serde_json::to_vec_pretty(&records))
        .await
        .map_err(|e| CheckpointError::Task(e.to_string()))??;
    tokio::fs::write(path, bytes).await?;
    Ok(count)
}

/// Reads an artifact back into records
pub async fn read_artifact(path: &Path) -> Result<Vec<CommittedRecord>, CheckpointError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Periodic full-snapshot checkpointing of the working set
///
/// Saves run in a background task so the harvest keeps going while the
/// snapshot is serialized. At most one save is in flight; starting a new one
/// first waits for the previous one. Failures are logged, never returned to
/// the harvest.
#[derive(Debug)]
pub struct Checkpointer {
    path: PathBuf,
    interval: usize,
    pending: usize,
    saves_started: usize,
    in_flight: Option<JoinHandle<Result<usize, CheckpointError>>>,
}

impl Checkpointer {
    pub fn new(path: impl Into<PathBuf>, interval: usize) -> Self {
        Self {
            path: path.into(),
            interval: interval.max(1),
            pending: 0,
            saves_started: 0,
            in_flight: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of saves started so far
    pub fn saves_started(&self) -> usize {
        self.saves_started
    }

    /// Counts newly committed records and saves once `interval` have accumulated
    ///
    /// Returns true if a save was started.
    pub async fn note_committed(&mut self, count: usize, working_set: &WorkingSet) -> bool {
        self.pending += count;
        if self.pending < self.interval {
            return false;
        }
        self.save(working_set).await;
        true
    }

    /// Starts a save of the current working set
    pub async fn save(&mut self, working_set: &WorkingSet) {
        self.flush().await;

        let snapshot = working_set.snapshot().await;
        let path = self.path.clone();
        self.pending = 0;
        self.saves_started += 1;
        self.in_flight = Some(tokio::spawn(async move {
            let result = write_artifact(&path, snapshot).await;
            match &result {
                Ok(count) => {
                    tracing::info!("Progress saved: {} records to {}", count, path.display())
                }
                Err(e) => tracing::error!("Error saving progress to {}: {}", path.display(), e),
            }
            result
        }));
    }

    /// Waits for the in-flight save, if any, and returns its outcome
    pub async fn flush(&mut self) -> Option<Result<usize, CheckpointError>> {
        let handle = self.in_flight.take()?;
        match handle.await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::error!("Checkpoint task failed: {}", e);
                Some(Err(CheckpointError::Task(e.to_string())))
            }
        }
    }
}
