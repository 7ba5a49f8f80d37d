//! Crawler module for catalog fetching and processing
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with pacing, admission control and retry
//! - Listing and detail page parsing
//! - Pagination, deduplication and enrichment
//! - Overall harvest coordination

mod cache;
mod context;
mod coordinator;
mod dedup;
mod enrich;
mod fetcher;
mod parser;
mod retry;
mod walker;

pub use cache::FetchCache;
pub use context::RunContext;
pub use coordinator::{run_harvest, Harvester};
pub use dedup::{Admitted, DedupStats, Deduplicator};
pub use enrich::{enrich_stub, EnrichStatus, EnrichedBatch, Enricher};
pub use fetcher::{build_client_from_config, build_http_client, Fetcher};
pub use parser::{ListingParse, RecordParser, ShelfPageParser};
pub use retry::{RequestPacing, RetryPolicy};
pub use walker::{listing_url, PaginationWalker};

use crate::config::Config;
use crate::output::HarvestSummary;
use crate::HarvestError;

/// Runs a complete harvest
///
/// This is the main entry point for starting a harvest. It will:
/// 1. Build the HTTP client and shared run context
/// 2. Walk every category's listing pages in order
/// 3. Enrich and commit unique records, checkpointing as it goes
/// 4. Write the final artifact
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(HarvestSummary)` - Harvest completed
/// * `Err(HarvestError)` - Harvest could not start or its result could not be written
pub async fn harvest(config: Config) -> Result<HarvestSummary, HarvestError> {
    run_harvest(config).await
}
