use crate::config::OutputConfig;
use crate::output::checkpoint::{write_artifact, Checkpointer};
use crate::output::working_set::WorkingSet;
use crate::record::{EnrichedRecord, IdentityKey};
use crate::CheckpointError;
use std::path::{Path, PathBuf};

/// The single commit path into the working set
///
/// Owned by the harvester and lent to each category walk. Every commit
/// numbers the records, appends them and lets the checkpointer decide whether
/// a periodic save is due.
#[derive(Debug)]
pub struct RunLedger {
    working_set: WorkingSet,
    checkpointer: Checkpointer,
    progress_interval: usize,
}

impl RunLedger {
    pub fn new(checkpoint_path: impl Into<PathBuf>, checkpoint_interval: usize, progress_interval: usize) -> Self {
        Self {
            working_set: WorkingSet::new(),
            checkpointer: Checkpointer::new(checkpoint_path, checkpoint_interval),
            progress_interval: progress_interval.max(1),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(
            &config.checkpoint_path,
            config.checkpoint_interval,
            config.progress_interval,
        )
    }

    /// Commits a batch and returns the number of records committed
    pub async fn commit(&mut self, batch: Vec<(IdentityKey, EnrichedRecord)>) -> usize {
        let committed = self.working_set.append(batch).await;
        if committed > 0 {
            self.checkpointer
                .note_committed(committed, &self.working_set)
                .await;
        }
        committed
    }

    /// Starts an out-of-schedule checkpoint (used after each category)
    pub async fn checkpoint(&mut self) {
        self.checkpointer.save(&self.working_set).await;
    }

    /// Waits for any in-flight checkpoint
    pub async fn flush(&mut self) -> Option<Result<usize, CheckpointError>> {
        self.checkpointer.flush().await
    }

    /// Writes the final artifact after the last checkpoint has landed
    pub async fn write_final(&mut self, path: &Path) -> Result<usize, CheckpointError> {
        if let Some(Err(e)) = self.flush().await {
            tracing::warn!("Last checkpoint failed: {}", e);
        }
        write_artifact(path, self.working_set.snapshot().await).await
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn checkpointer(&self) -> &Checkpointer {
        &self.checkpointer
    }

    pub fn progress_interval(&self) -> usize {
        self.progress_interval
    }
}
