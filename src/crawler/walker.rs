//! Pagination walker
//!
//! Drives one category from page 1 until a stop condition holds. Each page
//! goes through the page state machine: fetch, parse, deduplicate, enrich,
//! commit. Enrichment of a page finishes before the next page is requested.

use crate::config::{CategoryEntry, SourceConfig};
use crate::crawler::dedup::Deduplicator;
use crate::crawler::enrich::Enricher;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{ListingParse, RecordParser};
use crate::output::{CategoryReport, ProgressTracker, RunLedger, StopReason};
use crate::state::{PageCycle, PageState};
use crate::HarvestError;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Builds the listing URL for `page` of the list `list_id`
///
/// # Example
///
/// With `base-url = "https://catalog.test"` and
/// `list-path = "/shelf/show/{list}"`, page 3 of `history` is
/// `https://catalog.test/shelf/show/history?page=3`.
pub fn listing_url(source: &SourceConfig, list_id: &str, page: u32) -> Result<Url, HarvestError> {
    let path = source.list_path.replace("{list}", list_id);
    let mut url = Url::parse(&source.base_url)?.join(&path)?;
    url.query_pairs_mut()
        .append_pair("page", &page.to_string());
    Ok(url)
}

/// Walks the paginated listing of a single category
pub struct PaginationWalker {
    fetcher: Arc<Fetcher>,
    parser: Arc<dyn RecordParser>,
    source: SourceConfig,
}

impl PaginationWalker {
    pub fn new(fetcher: Arc<Fetcher>, parser: Arc<dyn RecordParser>, source: SourceConfig) -> Self {
        Self {
            fetcher,
            parser,
            source,
        }
    }

    /// Builds the listing URL for `page` of the list `list_id`
    pub fn page_url(&self, list_id: &str, page: u32) -> Result<Url, HarvestError> {
        listing_url(&self.source, list_id, page)
    }

    /// Harvests `category` into `ledger` and reports why the walk stopped
    ///
    /// Per-page failures end the walk with a [`StopReason`]; an `Err` is only
    /// returned for failures that are not tied to a single page, such as an
    /// unbuildable listing URL. Records committed before an `Err` stay in
    /// the ledger.
    pub async fn walk(
        &self,
        category: &CategoryEntry,
        ledger: &mut RunLedger,
    ) -> Result<CategoryReport, HarvestError> {
        let started = Instant::now();
        let enricher = Enricher::new(Arc::clone(&self.fetcher), Arc::clone(&self.parser));
        let mut dedup = Deduplicator::new(&category.name);
        let mut progress =
            ProgressTracker::new(&category.name, category.quota, ledger.progress_interval());

        let mut committed = 0usize;
        let mut pages_fetched = 0u32;
        let mut enrichment_failures = 0usize;
        let mut page = 0u32;

        tracing::info!(
            "Harvesting category '{}' (quota {})",
            category.name,
            category.quota
        );

        let stop_reason = loop {
            if committed >= category.quota {
                break StopReason::QuotaReached;
            }
            if page >= self.source.max_pages_per_category {
                break StopReason::PageCeiling;
            }
            page += 1;

            let url = self.page_url(&category.list_id, page)?;
            let mut cycle = PageCycle::start(page);
            tracing::debug!("Fetching page {} of '{}': {}", page, category.name, url);

            let body = match self.fetcher.fetch(url.as_str()).await {
                Ok(body) => body,
                Err(e) => {
                    cycle.advance(PageState::Failed)?;
                    tracing::warn!("Stopping '{}' at page {}: {}", category.name, page, e);
                    break StopReason::FetchFailed;
                }
            };
            pages_fetched += 1;

            cycle.advance(PageState::Parsing)?;
            let stubs = match self.parser.parse_listing(&body, &category.name, &url) {
                ListingParse::Stubs(stubs) => stubs,
                ListingParse::Empty => {
                    cycle.advance(PageState::Empty)?;
                    tracing::info!("No more entries for '{}' at page {}", category.name, page);
                    break StopReason::EmptyPage;
                }
                ListingParse::Unrecognized { entries } => {
                    cycle.advance(PageState::Failed)?;
                    tracing::warn!(
                        "Page {} of '{}' has {} entries but none could be read; listing markup may have changed",
                        page,
                        category.name,
                        entries
                    );
                    break StopReason::UnrecognizedMarkup;
                }
            };
            let parsed = stubs.len();

            cycle.advance(PageState::Deduplicating)?;
            let admitted = dedup.admit(stubs, category.quota - committed);

            cycle.advance(PageState::Enriching)?;
            let batch = enricher.enrich_batch(admitted).await;
            enrichment_failures += batch.failures;

            let count = ledger.commit(batch.records).await;
            cycle.advance(PageState::Committed)?;
            committed += count;
            progress.record(count);

            tracing::debug!(
                category = %category.name,
                page,
                parsed,
                committed = count,
                "Page committed"
            );

            if committed >= category.quota {
                break StopReason::QuotaReached;
            }
            if parsed < self.source.page_size {
                break StopReason::ShortPage;
            }
        };

        let stats = dedup.stats();
        let report = CategoryReport {
            category: category.name.clone(),
            quota: category.quota,
            committed,
            pages_fetched,
            page_duplicates: stats.page_duplicates,
            repeat_duplicates: stats.repeat_duplicates,
            enrichment_failures,
            stop_reason,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Finished '{}': {}/{} records from {} pages ({})",
            report.category,
            report.committed,
            report.quota,
            report.pages_fetched,
            report.stop_reason
        );
        Ok(report)
    }
}
