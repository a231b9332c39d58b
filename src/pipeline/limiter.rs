//! Global concurrency limiting
//!
//! A thin wrapper over a tokio semaphore. A permit is held for the whole
//! lifetime of a work item, retries and backoff included, and released when
//! dropped whatever the outcome.

use crate::HarvestError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps how many work items execute at once
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyLimiter {
    /// Creates a limiter with `limit` slots
    ///
    /// # Returns
    ///
    /// * `Ok(ConcurrencyLimiter)` - For `1 <= limit <= Semaphore::MAX_PERMITS`
    /// * `Err(HarvestError::InvalidConcurrency)` - Otherwise
    pub fn new(limit: usize) -> Result<Self, HarvestError> {
        if limit < 1 || limit > Semaphore::MAX_PERMITS {
            return Err(HarvestError::InvalidConcurrency(limit));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    /// Waits for a free slot
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, HarvestError> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| HarvestError::LimiterClosed)
    }

    /// Maximum number of concurrent holders
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of free slots right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
