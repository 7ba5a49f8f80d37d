use crate::record::{IdentityKey, StubRecord};
use std::collections::HashSet;

/// A stub that passed deduplication, paired with its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    pub key: IdentityKey,
    pub stub: StubRecord,
}

/// Counters kept by a [`Deduplicator`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// Repeats of a key within the same page
    pub page_duplicates: usize,
    /// Keys already admitted from an earlier page of the category
    pub repeat_duplicates: usize,
}

/// Category-scoped identity filter
///
/// Runs before any detail fetch is scheduled, so a duplicate never costs a
/// request. Keys include the category, so each category gets its own
/// deduplicator and the same book may appear once per category.
#[derive(Debug)]
pub struct Deduplicator {
    category: String,
    seen: HashSet<IdentityKey>,
    stats: DedupStats,
}

impl Deduplicator {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            seen: HashSet::new(),
            stats: DedupStats::default(),
        }
    }

    /// Filters one page of stubs and admits at most `limit` of them
    ///
    /// Page-local repeats are dropped first, then keys already admitted from
    /// earlier pages. Admitted keys are recorded immediately: enrichment never
    /// drops a record, so admission is commitment. Unique stubs past `limit`
    /// are left unrecorded and are not counted as duplicates.
    pub fn admit(&mut self, stubs: Vec<StubRecord>, limit: usize) -> Vec<Admitted> {
        let mut on_page = HashSet::new();
        let mut admitted = Vec::new();

        for stub in stubs {
            let key = stub.identity();
            if key.is_empty() {
                tracing::debug!("Skipping untitled stub in '{}'", self.category);
                continue;
            }
            if !on_page.insert(key.clone()) {
                self.stats.page_duplicates += 1;
                continue;
            }
            if self.seen.contains(&key) {
                self.stats.repeat_duplicates += 1;
                continue;
            }
            if admitted.len() < limit {
                admitted.push(Admitted { key, stub });
            }
        }

        for entry in &admitted {
            self.seen.insert(entry.key.clone());
        }

        tracing::debug!(
            category = %self.category,
            admitted = admitted.len(),
            seen = self.seen.len(),
            "Deduplicated page"
        );
        admitted
    }

    /// Number of keys admitted so far
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn stats(&self) -> DedupStats {
        self.stats
    }
}
