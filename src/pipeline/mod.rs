//! The concurrent fetch-retry-persist pipeline
//!
//! This module contains the core harvesting machinery:
//! - Bounded retry with exponential backoff per work item
//! - A global concurrency limit
//! - Batched persistence of produced rows
//! - The orchestrator driving one stage, and the four-stage sequencer

mod limiter;
mod orchestrator;
mod retry;
mod sequencer;
mod sink;

pub use limiter::ConcurrencyLimiter;
pub use orchestrator::{run_pipeline, PipelineOutcome};
pub use retry::{retry, RetryConfig, RetryError};
pub use sequencer::{run_all_stages, HarvestSummary, StageFailures, StageReport, STAGE_COUNT};
pub use sink::{BatchSink, DEFAULT_BATCH_SIZE};
