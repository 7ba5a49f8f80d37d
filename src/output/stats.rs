//! Harvest statistics
//!
//! Per-category reports collected by the harvester and the end-of-run summary.

use crate::config::CategoryEntry;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Why a category walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The category's quota of unique records was committed
    QuotaReached,
    /// A listing page could not be fetched
    FetchFailed,
    /// A listing page had no entries
    EmptyPage,
    /// A listing page had entries, none of which could be read
    UnrecognizedMarkup,
    /// A listing page had fewer entries than a full page
    ShortPage,
    /// The per-category page ceiling was reached
    PageCeiling,
    /// The walk failed; records committed before the failure are kept
    Aborted(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaReached => write!(f, "quota reached"),
            Self::FetchFailed => write!(f, "page fetch failed"),
            Self::EmptyPage => write!(f, "empty page"),
            Self::UnrecognizedMarkup => write!(f, "unrecognized markup"),
            Self::ShortPage => write!(f, "short page"),
            Self::PageCeiling => write!(f, "page ceiling"),
            Self::Aborted(error) => write!(f, "aborted: {}", error),
        }
    }
}

/// Outcome of one category walk
#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub category: String,
    pub quota: usize,
    pub committed: usize,
    pub pages_fetched: u32,
    pub page_duplicates: usize,
    pub repeat_duplicates: usize,
    pub enrichment_failures: usize,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

impl CategoryReport {
    /// Report for a walk that ended in an error
    pub fn aborted(
        category: &CategoryEntry,
        committed: usize,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            category: category.name.clone(),
            quota: category.quota,
            committed,
            pages_fetched: 0,
            page_duplicates: 0,
            repeat_duplicates: 0,
            enrichment_failures: 0,
            stop_reason: StopReason::Aborted(error.into()),
            elapsed,
        }
    }

    /// Records per minute over the walk
    pub fn rate_per_minute(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.committed as f64 / secs * 60.0
        } else {
            0.0
        }
    }
}

/// End-of-run summary
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub categories: Vec<CategoryReport>,
    pub total_records: usize,
    pub final_path: String,
}

impl HarvestSummary {
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn total_quota(&self) -> usize {
        self.categories.iter().map(|c| c.quota).sum()
    }

    pub fn aborted_categories(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| matches!(c.stop_reason, StopReason::Aborted(_)))
            .count()
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &HarvestSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Overview:");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!(
        "  Total time: {:.1} minutes",
        summary.duration().as_secs_f64() / 60.0
    );
    println!(
        "  Records: {} of {} requested",
        summary.total_records,
        summary.total_quota()
    );
    println!("  Results saved to: {}", summary.final_path);
    println!();

    println!("Categories:");
    for report in &summary.categories {
        println!(
            "  {}: {}/{} in {} pages, {:.1} records/min ({})",
            report.category,
            report.committed,
            report.quota,
            report.pages_fetched,
            report.rate_per_minute(),
            report.stop_reason
        );
        if report.page_duplicates + report.repeat_duplicates > 0 {
            println!(
                "    duplicates skipped: {} on-page, {} repeated",
                report.page_duplicates, report.repeat_duplicates
            );
        }
        if report.enrichment_failures > 0 {
            println!(
                "    committed without details: {}",
                report.enrichment_failures
            );
        }
    }

    let aborted = summary.aborted_categories();
    if aborted > 0 {
        println!("\n{} categories aborted early; partial results kept", aborted);
    }
}
