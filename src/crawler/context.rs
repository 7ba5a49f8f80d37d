//! Run-scoped shared state
//!
//! One [`RunContext`] exists per harvest run. It owns the counting semaphore
//! that admits every outbound request (listing or detail, any category) and
//! the rolling error counter that stretches the pre-request delay.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Shared admission control and backpressure state for one run
#[derive(Debug, Clone)]
pub struct RunContext {
    permits: Arc<Semaphore>,
    errors: Arc<AtomicU32>,
    max_in_flight: usize,
}

impl RunContext {
    /// Creates a context admitting at most `max_in_flight` concurrent requests
    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
            errors: Arc::new(AtomicU32::new(0)),
            max_in_flight,
        }
    }

    /// Waits for a request slot; the slot is released when the permit drops
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.permits).acquire_owned().await
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Current rolling error count
    pub fn error_count(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Records a failed attempt and returns the new count
    pub fn record_error(&self) -> u32 {
        self.errors.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    /// Records a successful request; the count never drops below zero
    pub fn record_success(&self) {
        let _ = self
            .errors
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                count.checked_sub(1)
            });
    }
}
