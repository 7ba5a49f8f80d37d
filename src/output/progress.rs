use std::time::{Duration, Instant};

/// Per-category throughput and ETA reporting
///
/// Emits a progress line whenever the processed count crosses a multiple of
/// the reporting interval, and once more when the quota is reached.
#[derive(Debug)]
pub struct ProgressTracker {
    category: String,
    quota: usize,
    processed: usize,
    interval: usize,
    started: Instant,
    last_bucket: usize,
    finished_reported: bool,
}

impl ProgressTracker {
    pub fn new(category: impl Into<String>, quota: usize, interval: usize) -> Self {
        Self {
            category: category.into(),
            quota,
            processed: 0,
            interval: interval.max(1),
            started: Instant::now(),
            last_bucket: 0,
            finished_reported: false,
        }
    }

    /// Adds `count` processed records; returns true if a progress line was emitted
    pub fn record(&mut self, count: usize) -> bool {
        self.processed += count;
        let bucket = self.processed / self.interval;
        let crossed = bucket > self.last_bucket;
        let finished = self.processed >= self.quota && !self.finished_reported;
        self.last_bucket = bucket;

        if crossed || finished {
            self.finished_reported |= self.processed >= self.quota;
            self.report();
            true
        } else {
            false
        }
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Percentage of the quota processed so far
    pub fn percent(&self) -> f64 {
        if self.quota == 0 {
            100.0
        } else {
            (self.processed as f64 / self.quota as f64) * 100.0
        }
    }

    /// Records per minute over `elapsed`
    pub fn rate_per_minute(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs * 60.0
        } else {
            0.0
        }
    }

    /// Estimated time left at the rate observed over `elapsed`
    pub fn eta(&self, elapsed: Duration) -> Option<Duration> {
        let rate = self.rate_per_minute(elapsed);
        if rate <= 0.0 {
            return None;
        }
        let remaining = self.quota.saturating_sub(self.processed) as f64;
        Some(Duration::from_secs_f64(remaining / rate * 60.0))
    }

    fn report(&self) {
        let elapsed = self.elapsed();
        let eta_minutes = self
            .eta(elapsed)
            .map(|eta| eta.as_secs_f64() / 60.0)
            .unwrap_or(0.0);
        tracing::info!(
            category = %self.category,
            "{} PROGRESS: {}/{} records ({:.1}%), {:.1} records/min, elapsed {:.1} min, ETA {:.1} min",
            self.category.to_uppercase(),
            self.processed,
            self.quota,
            self.percent(),
            self.rate_per_minute(elapsed),
            elapsed.as_secs_f64() / 60.0,
            eta_minutes
        );
    }
}
