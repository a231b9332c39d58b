//! Pipeline orchestration
//!
//! `run_pipeline` fans a list of work items out over concurrently running
//! tasks and reduces their outcomes in a single loop:
//! - every item gets its own task right away, only execution is gated by
//!   the concurrency limiter
//! - each task runs its extractor under the retry policy
//! - rows go to the batch sink, exhausted items to the failure list
//! - anything else ends the run with an error
//!
//! The buffer, counters and failure list are touched only by the reducer
//! loop, never by the tasks.

use crate::config::SiteConfig;
use crate::extract::{Extractor, Session};
use crate::pipeline::limiter::ConcurrencyLimiter;
use crate::pipeline::retry::{retry, RetryConfig, RetryError};
use crate::pipeline::sink::BatchSink;
use crate::storage::Storage;
use crate::HarvestError;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Summary of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome<I> {
    /// Number of rows produced and persisted (not items)
    pub succeeded: usize,

    /// Items that exhausted their retries, in completion order
    pub failed: Vec<I>,
}

type TaskOutput<E> = Result<
    Result<Vec<<E as Extractor>::Output>, RetryError<<E as Extractor>::Item>>,
    HarvestError,
>;

/// Runs `extractor` over every work item and persists the rows
///
/// # Arguments
///
/// * `site` - Site the shared HTTP session is opened for
/// * `extractor` - The stage's extractor
/// * `work_items` - Items to process, each exactly once
/// * `concurrency_limit` - Maximum number of items executing at once (>= 1)
/// * `sink` - Batch sink for the produced rows
/// * `retry_config` - Retry policy applied to each item
///
/// # Returns
///
/// * `Ok(PipelineOutcome)` - Every item either produced rows or is listed
///   in `failed`
/// * `Err(HarvestError)` - A storage failure or a broken extractor contract;
///   tasks still running are aborted
pub async fn run_pipeline<E, S>(
    site: &SiteConfig,
    extractor: E,
    work_items: Vec<E::Item>,
    concurrency_limit: usize,
    sink: &mut BatchSink<'_, S, E::Output>,
    retry_config: &RetryConfig,
) -> Result<PipelineOutcome<E::Item>, HarvestError>
where
    E: Extractor,
    S: Storage + ?Sized,
{
    let limiter = ConcurrencyLimiter::new(concurrency_limit)?;
    let session = Session::open(site)?;
    let extractor = Arc::new(extractor);
    let retry_config = Arc::new(retry_config.clone());
    let total = work_items.len();

    tracing::debug!(
        "Scheduling {} {} tasks, at most {} at once",
        total,
        extractor.name(),
        limiter.limit()
    );

    let mut tasks: JoinSet<TaskOutput<E>> = JoinSet::new();
    for item in work_items {
        let extractor = Arc::clone(&extractor);
        let session = session.clone();
        let limiter = limiter.clone();
        let retry_config = Arc::clone(&retry_config);

        tasks.spawn(async move {
            let _permit = limiter.acquire().await?;
            let outcome = retry(&item, &retry_config, || extractor.extract(&session, &item)).await;
            Ok::<_, HarvestError>(outcome)
        });
    }

    let mut succeeded = 0;
    let mut failed = Vec::new();
    let mut completed = 0;

    while let Some(joined) = tasks.join_next().await {
        completed += 1;

        let outcome = match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => return Err(e),
            Err(join_error) => {
                return Err(HarvestError::Contract(format!(
                    "{} task did not complete: {}",
                    extractor.name(),
                    join_error
                )));
            }
        };

        match outcome {
            Ok(rows) => {
                succeeded += rows.len();
                sink.push(rows)?;
            }
            Err(RetryError::Exhausted { item, attempts }) => {
                tracing::warn!("Giving up on {:?} after {} attempts", item, attempts);
                failed.push(item);
            }
            Err(RetryError::Fatal { item, source }) => {
                return Err(HarvestError::Contract(format!(
                    "{} extractor failed on {:?}: {}",
                    extractor.name(),
                    item,
                    source
                )));
            }
        }

        if completed % 1000 == 0 {
            tracing::info!(
                "Progress: {}/{} {} items done, {} rows, {} failed",
                completed,
                total,
                extractor.name(),
                succeeded,
                failed.len()
            );
        }
    }

    sink.finish()?;

    Ok(PipelineOutcome { succeeded, failed })
}
