use crate::crawler::dedup::Admitted;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::RecordParser;
use crate::record::{EnrichedRecord, IdentityKey, StubRecord};
use std::sync::Arc;
use tokio::task::JoinSet;

/// How a single stub's enrichment ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichStatus {
    /// Detail page fetched and merged
    Enriched,
    /// Stub had no detail URL
    NoUrl,
    /// Detail fetch failed; detail fields stay unset
    FetchFailed,
}

/// Records produced for one page batch, in admission order
#[derive(Debug, Default)]
pub struct EnrichedBatch {
    pub records: Vec<(IdentityKey, EnrichedRecord)>,
    /// Records committed with unset detail fields because enrichment failed
    pub failures: usize,
}

/// Second-stage fetch that fills in detail fields
///
/// Every admitted stub comes back as a record: a missing URL, a failed fetch
/// or a crashed task leave the detail fields unset instead of dropping it.
#[derive(Clone)]
pub struct Enricher {
    fetcher: Arc<Fetcher>,
    parser: Arc<dyn RecordParser>,
}

impl Enricher {
    pub fn new(fetcher: Arc<Fetcher>, parser: Arc<dyn RecordParser>) -> Self {
        Self { fetcher, parser }
    }

    /// Enriches one page's admitted stubs concurrently
    ///
    /// One task per stub; admission is bounded by the run's shared semaphore
    /// inside the fetcher. Returns only after every task has finished.
    pub async fn enrich_batch(&self, batch: Vec<Admitted>) -> EnrichedBatch {
        let mut slots: Vec<Option<(EnrichedRecord, EnrichStatus)>> = vec![None; batch.len()];
        let mut originals = Vec::with_capacity(batch.len());
        let mut tasks = JoinSet::new();

        for (slot, admitted) in batch.into_iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let parser = Arc::clone(&self.parser);
            let stub = admitted.stub.clone();
            tasks.spawn(async move { (slot, enrich_stub(&fetcher, parser.as_ref(), stub).await) });
            originals.push((admitted.key, admitted.stub));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => slots[slot] = Some(outcome),
                Err(e) => tracing::error!("Enrichment task failed: {}", e),
            }
        }

        let mut result = EnrichedBatch::default();
        for ((key, stub), slot) in originals.into_iter().zip(slots) {
            let record = match slot {
                Some((record, EnrichStatus::FetchFailed)) => {
                    result.failures += 1;
                    record
                }
                Some((record, _)) => record,
                None => {
                    result.failures += 1;
                    EnrichedRecord::from(stub)
                }
            };
            result.records.push((key, record));
        }
        result
    }
}

/// Enriches a single stub; never fails
pub async fn enrich_stub(
    fetcher: &Fetcher,
    parser: &dyn RecordParser,
    stub: StubRecord,
) -> (EnrichedRecord, EnrichStatus) {
    let Some(url) = stub.url.as_deref().map(str::to_string) else {
        return (EnrichedRecord::from(stub), EnrichStatus::NoUrl);
    };

    let mut record = EnrichedRecord::from(stub);
    match fetcher.fetch(&url).await {
        Ok(body) => {
            let filled = record.merge_details(parser.parse_detail(&body));
            tracing::debug!("Enriched '{}' ({} fields)", record.stub.title, filled);
            (record, EnrichStatus::Enriched)
        }
        Err(e) => {
            tracing::warn!("Error fetching details for {}: {}", record.stub.title, e);
            (record, EnrichStatus::FetchFailed)
        }
    }
}
