//! Stage sequencing
//!
//! Runs the four harvest stages one after another:
//!
//! 1. categories, from the home page
//! 2. listing page URLs, from `categories`
//! 3. article URLs, from `pages_urls`
//! 4. article data, from `articles_urls`
//!
//! Each stage reads its work items back from the table the previous stage
//! wrote, so a finished stage survives an interruption of the next one.
//! Failed items are reported but never stop the following stages.

use crate::config::Config;
use crate::extract::{
    ArticleDataExtractor, ArticleUrlExtractor, CategoryExtractor, Extractor, PageUrlExtractor,
    SiteRoot,
};
use crate::pipeline::orchestrator::run_pipeline;
use crate::pipeline::retry::RetryConfig;
use crate::pipeline::sink::BatchSink;
use crate::storage::{ArticleUrl, Category, PageUrl, Record, Row, Storage};
use crate::HarvestError;

/// Number of stages in a full harvest
pub const STAGE_COUNT: usize = 4;

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// 1-based stage number
    pub stage: usize,
    pub name: &'static str,
    /// Number of work items fed to the stage
    pub inputs: usize,
    /// Rows written by the stage
    pub succeeded: usize,
    /// Items that exhausted their retries, ready to be fed to the stage again
    pub failed: StageFailures,
}

impl StageReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Failed work items of one stage, typed by the stage's input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageFailures {
    Categories(Vec<SiteRoot>),
    Pages(Vec<Category>),
    ArticleUrls(Vec<PageUrl>),
    ArticleData(Vec<ArticleUrl>),
}

impl StageFailures {
    pub fn len(&self) -> usize {
        match self {
            StageFailures::Categories(items) => items.len(),
            StageFailures::Pages(items) => items.len(),
            StageFailures::ArticleUrls(items) => items.len(),
            StageFailures::ArticleData(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reports of all stages, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub stages: Vec<StageReport>,
}

impl HarvestSummary {
    /// Total number of failed items across stages
    pub fn total_failed(&self) -> usize {
        self.stages.iter().map(StageReport::failed_count).sum()
    }
}

/// Runs a complete four-stage harvest
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `storage` - Storage every stage writes to and reads from
///
/// # Returns
///
/// * `Ok(HarvestSummary)` - All stages ran; some items may have failed
/// * `Err(HarvestError)` - A storage failure or broken extractor contract
///
/// # Example
///
/// ```no_run
/// use shopfront::config::load_config;
/// use shopfront::pipeline::run_all_stages;
/// use shopfront::storage::open_storage;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("shopfront.toml"))?;
/// let mut storage = open_storage(Path::new(&config.output.database_path))?;
/// let summary = run_all_stages(&config, &mut storage).await?;
/// println!("{} items failed", summary.total_failed());
/// # Ok(())
/// # }
/// ```
pub async fn run_all_stages<S: Storage + ?Sized>(
    config: &Config,
    storage: &mut S,
) -> Result<HarvestSummary, HarvestError> {
    let retry_config = RetryConfig::from(&config.retry);
    let mut summary = HarvestSummary::default();

    // Hand-maintained categories are stored even if the home page never loads
    let category_extractor = CategoryExtractor::from_entries(&config.extra_categories);
    if !config.extra_categories.is_empty() {
        storage.create_table(Category::TABLE)?;
        let records: Vec<Record> = config
            .extra_categories
            .iter()
            .map(|entry| Category::from(entry).to_record())
            .collect();
        storage.insert_into(Category::TABLE, &records)?;
    }

    let roots = vec![SiteRoot {
        url: config.site.base_url.clone(),
    }];
    summary
        .stages
        .push(
            run_stage(
                1,
                config,
                storage,
                &retry_config,
                category_extractor,
                roots,
                StageFailures::Categories,
            )
            .await?,
        );

    let categories: Vec<Category> = reload(storage)?;
    summary
        .stages
        .push(
            run_stage(
                2,
                config,
                storage,
                &retry_config,
                PageUrlExtractor,
                categories,
                StageFailures::Pages,
            )
            .await?,
        );

    let pages: Vec<PageUrl> = reload(storage)?;
    summary
        .stages
        .push(
            run_stage(
                3,
                config,
                storage,
                &retry_config,
                ArticleUrlExtractor,
                pages,
                StageFailures::ArticleUrls,
            )
            .await?,
        );

    let articles: Vec<ArticleUrl> = reload(storage)?;
    let total_rows = articles.len();
    let articles: Vec<ArticleUrl> = articles
        .into_iter()
        .filter(|article| article.article_url.is_some())
        .collect();
    if articles.len() < total_rows {
        tracing::debug!(
            "Skipping {} listing pages without articles",
            total_rows - articles.len()
        );
    }
    summary
        .stages
        .push(
            run_stage(
                4,
                config,
                storage,
                &retry_config,
                ArticleDataExtractor,
                articles,
                StageFailures::ArticleData,
            )
            .await?,
        );

    Ok(summary)
}

/// Runs one stage and logs its outcome
async fn run_stage<E, S>(
    stage: usize,
    config: &Config,
    storage: &mut S,
    retry_config: &RetryConfig,
    extractor: E,
    items: Vec<E::Item>,
    failures: fn(Vec<E::Item>) -> StageFailures,
) -> Result<StageReport, HarvestError>
where
    E: Extractor,
    S: Storage + ?Sized,
{
    let name = extractor.name();
    let inputs = items.len();
    tracing::info!("[{}/{}] Getting {}...", stage, STAGE_COUNT, name);

    let mut sink = BatchSink::new(storage, config.pipeline.batch_size);
    sink.create_table()?;

    let outcome = run_pipeline(
        &config.site,
        extractor,
        items,
        config.pipeline.concurrency_limit,
        &mut sink,
        retry_config,
    )
    .await?;

    if !outcome.failed.is_empty() {
        tracing::error!(
            "[{}/{}] {} of {} requests failed",
            stage,
            STAGE_COUNT,
            outcome.failed.len(),
            inputs
        );
    }
    tracing::info!(
        "[{}/{}] Completed: {} rows written",
        stage,
        STAGE_COUNT,
        outcome.succeeded
    );

    Ok(StageReport {
        stage,
        name,
        inputs,
        succeeded: outcome.succeeded,
        failed: failures(outcome.failed),
    })
}

/// Loads a stage's table back as typed rows
fn reload<R: Row, S: Storage + ?Sized>(storage: &S) -> Result<Vec<R>, HarvestError> {
    let rows = storage
        .load_all(R::TABLE)?
        .iter()
        .map(R::from_record)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
