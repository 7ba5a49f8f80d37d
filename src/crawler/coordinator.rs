//! Harvest coordinator - top-level run orchestration
//!
//! This module drives a complete harvest, including:
//! - Building the shared HTTP client and run context
//! - Walking each configured category in order
//! - Isolating category failures from the rest of the run
//! - Checkpointing between categories and writing the final artifact

use crate::config::{CategoryEntry, Config};
use crate::crawler::cache::FetchCache;
use crate::crawler::context::RunContext;
use crate::crawler::fetcher::{build_client_from_config, Fetcher};
use crate::crawler::parser::{RecordParser, ShelfPageParser};
use crate::crawler::retry::{RequestPacing, RetryPolicy};
use crate::crawler::walker::PaginationWalker;
use crate::output::{CategoryReport, HarvestSummary, RunLedger};
use crate::HarvestError;
use chrono::Utc;
use futures_util::FutureExt;
use reqwest::Client;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Main harvest coordinator structure
///
/// Owns everything that lives for the whole run: the HTTP client, the
/// [`RunContext`] (concurrency permits and rolling error count) and the
/// [`RunLedger`]. Per-category state, including the fetch cache, is created
/// fresh for each category and dropped when its walk ends.
pub struct Harvester {
    config: Arc<Config>,
    client: Client,
    context: RunContext,
    parser: Arc<dyn RecordParser>,
    ledger: RunLedger,
}

impl Harvester {
    /// Creates a harvester using the built-in shelf page parser
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        Self::with_parser(config, Arc::new(ShelfPageParser::new()))
    }

    /// Creates a harvester with a custom record parser
    pub fn with_parser(config: Config, parser: Arc<dyn RecordParser>) -> Result<Self, HarvestError> {
        let client = build_client_from_config(&config)?;
        let context = RunContext::new(config.harvester.max_concurrent_requests as usize);
        let ledger = RunLedger::from_config(&config.output);

        Ok(Self {
            config: Arc::new(config),
            client,
            context,
            parser,
            ledger,
        })
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    /// Runs every category, then writes the final artifact
    ///
    /// Category failures are logged and reported; they never stop the run.
    /// The only error returned is a failure to write the final artifact, in
    /// which case the last checkpoint still holds every committed record.
    pub async fn run(&mut self) -> Result<HarvestSummary, HarvestError> {
        let started_at = Utc::now();
        let config = Arc::clone(&self.config);

        tracing::info!(
            "Starting harvest of {} categories ({} concurrent requests)",
            config.categories.len(),
            self.context.max_in_flight()
        );

        let mut reports = Vec::with_capacity(config.categories.len());
        for category in &config.categories {
            let report = self.harvest_category(category).await;
            self.ledger.checkpoint().await;
            reports.push(report);
        }

        let final_path = Path::new(&config.output.final_path);
        let total_records = match self.ledger.write_final(final_path).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(
                    "Failed to write {}: {} (records remain in {})",
                    final_path.display(),
                    e,
                    config.output.checkpoint_path
                );
                return Err(e.into());
            }
        };

        tracing::info!(
            "Harvest complete: {} records written to {}",
            total_records,
            final_path.display()
        );

        Ok(HarvestSummary {
            started_at,
            finished_at: Utc::now(),
            categories: reports,
            total_records,
            final_path: config.output.final_path.clone(),
        })
    }

    /// Walks one category with its own fetch cache
    async fn harvest_category(&mut self, category: &CategoryEntry) -> CategoryReport {
        let started = Instant::now();

        let fetcher = Fetcher::new(
            self.client.clone(),
            self.context.clone(),
            FetchCache::new(),
            RetryPolicy::from_config(&self.config.retry),
            RequestPacing::from_config(&self.config.harvester),
        );
        let walker = PaginationWalker::new(
            Arc::new(fetcher),
            Arc::clone(&self.parser),
            self.config.source.clone(),
        );

        // The parser is pluggable; a panic in it ends this category only
        let outcome = AssertUnwindSafe(walker.walk(category, &mut self.ledger))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(report)) => return report,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("panicked: {}", panic_message(&*panic)),
        };

        tracing::error!("Error harvesting category '{}': {}", category.name, error);
        let committed = self
            .ledger
            .working_set()
            .count_in_category(&category.name)
            .await;
        CategoryReport::aborted(category, committed, error, started.elapsed())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Runs a complete harvest with the given configuration
pub async fn run_harvest(config: Config) -> Result<HarvestSummary, HarvestError> {
    let mut harvester = Harvester::new(config)?;
    harvester.run().await
}
