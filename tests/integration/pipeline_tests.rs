//! Integration tests for the harvest pipeline
//!
//! The orchestrator is exercised with in-process extractors, and the four
//! stages end-to-end against a wiremock storefront.

use async_trait::async_trait;
use shopfront::config::{parse_config, SiteConfig};
use shopfront::extract::SiteRoot;
use shopfront::pipeline::{run_all_stages, run_pipeline, BatchSink, RetryConfig, StageFailures};
use shopfront::storage::{ArticleData, ArticleUrl, PageUrl, Row, SqliteStorage, Storage};
use shopfront::storage::StorageError;
use shopfront::{ExtractError, Extractor, HarvestError, Session};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_site() -> SiteConfig {
    SiteConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        name: "shop".to_string(),
        user_agent: "shopfront-tests".to_string(),
        headers: BTreeMap::new(),
    }
}

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        timeout: Duration::from_secs(1),
        backoff_factor: 0.0,
    }
}

fn temp_storage() -> (TempDir, SqliteStorage) {
    let dir = TempDir::new().unwrap();
    let storage = SqliteStorage::new(&dir.path().join("harvest.db")).unwrap();
    (dir, storage)
}

fn page_rows(item: usize, count: usize) -> Vec<PageUrl> {
    (0..count)
        .map(|n| PageUrl {
            id: item as i64,
            page_url: format!("https://www.example.com/cat/?cid={}&page={}", item, n),
        })
        .collect()
}

/// Produces a fixed number of rows per item
struct FanOut {
    per_item: BTreeMap<usize, usize>,
    default: usize,
}

#[async_trait]
impl Extractor for FanOut {
    type Item = usize;
    type Output = PageUrl;

    fn name(&self) -> &'static str {
        "fan out"
    }

    async fn extract(&self, _session: &Session, item: &usize) -> Result<Vec<PageUrl>, ExtractError> {
        let count = self.per_item.get(item).copied().unwrap_or(self.default);
        Ok(page_rows(*item, count))
    }
}

/// Fails every attempt with a transient error
struct AlwaysDown {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl Extractor for AlwaysDown {
    type Item = usize;
    type Output = PageUrl;

    fn name(&self) -> &'static str {
        "always down"
    }

    async fn extract(&self, _session: &Session, item: &usize) -> Result<Vec<PageUrl>, ExtractError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ExtractError::Status {
            url: format!("https://www.example.com/{}", item),
            status: 503,
        })
    }
}

/// Tracks how many items run at the same time
struct Slow {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Extractor for Slow {
    type Item = usize;
    type Output = PageUrl;

    fn name(&self) -> &'static str {
        "slow"
    }

    async fn extract(&self, _session: &Session, item: &usize) -> Result<Vec<PageUrl>, ExtractError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(page_rows(*item, 1))
    }
}

/// Breaks the extractor contract on one item
struct Broken;

#[async_trait]
impl Extractor for Broken {
    type Item = usize;
    type Output = PageUrl;

    fn name(&self) -> &'static str {
        "broken"
    }

    async fn extract(&self, _session: &Session, item: &usize) -> Result<Vec<PageUrl>, ExtractError> {
        if *item == 2 {
            return Err(ExtractError::Contract("item 2 is malformed".to_string()));
        }
        Ok(page_rows(*item, 1))
    }
}

#[tokio::test]
async fn test_all_items_succeed() {
    let (_dir, mut storage) = temp_storage();
    let mut sink = BatchSink::new(&mut storage, 100);
    sink.create_table().unwrap();

    let extractor = FanOut {
        per_item: BTreeMap::new(),
        default: 1,
    };
    let outcome = run_pipeline(
        &test_site(),
        extractor,
        (1..=5).collect(),
        3,
        &mut sink,
        &fast_retry(5),
    )
    .await
    .unwrap();
    drop(sink);

    assert_eq!(outcome.succeeded, 5);
    assert!(outcome.failed.is_empty());
    assert_eq!(storage.count_rows(PageUrl::TABLE).unwrap(), 5);
}

#[tokio::test]
async fn test_exhausted_items_are_reported() {
    let (_dir, mut storage) = temp_storage();
    let mut sink = BatchSink::new(&mut storage, 100);
    sink.create_table().unwrap();

    let attempts = Arc::new(AtomicUsize::new(0));
    let extractor = AlwaysDown {
        attempts: Arc::clone(&attempts),
    };
    let outcome = run_pipeline(
        &test_site(),
        extractor,
        (1..=5).collect(),
        2,
        &mut sink,
        &fast_retry(2),
    )
    .await
    .unwrap();
    drop(sink);

    assert_eq!(outcome.succeeded, 0);
    let failed: HashSet<usize> = outcome.failed.into_iter().collect();
    assert_eq!(failed, (1..=5).collect::<HashSet<_>>());
    assert_eq!(attempts.load(Ordering::SeqCst), 10);
    assert_eq!(storage.count_rows(PageUrl::TABLE).unwrap(), 0);
}

#[tokio::test]
async fn test_succeeded_counts_rows_not_items() {
    let (_dir, mut storage) = temp_storage();
    let mut sink = BatchSink::new(&mut storage, 100);
    sink.create_table().unwrap();

    let extractor = FanOut {
        per_item: BTreeMap::from([(1, 0), (2, 3)]),
        default: 0,
    };
    let outcome = run_pipeline(&test_site(), extractor, vec![1, 2], 2, &mut sink, &fast_retry(3))
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, 3);
    assert!(outcome.failed.is_empty());
}

#[tokio::test]
async fn test_every_row_is_flushed_across_batches() {
    let (_dir, mut storage) = temp_storage();
    let flushed;
    let flushes;
    let outcome;
    {
        let mut sink = BatchSink::new(&mut storage, 4);
        sink.create_table().unwrap();

        let extractor = FanOut {
            per_item: BTreeMap::new(),
            default: 3,
        };
        outcome = run_pipeline(
            &test_site(),
            extractor,
            (1..=5).collect(),
            5,
            &mut sink,
            &fast_retry(3),
        )
        .await
        .unwrap();

        flushed = sink.flushed();
        flushes = sink.flushes();
        assert_eq!(sink.buffered(), 0);
    }

    assert_eq!(outcome.succeeded, 15);
    assert_eq!(flushed, 15);
    assert_eq!(flushes, 3);
    assert_eq!(storage.count_rows(PageUrl::TABLE).unwrap(), 15);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_limit_is_respected() {
    let (_dir, mut storage) = temp_storage();
    let mut sink = BatchSink::new(&mut storage, 100);
    sink.create_table().unwrap();

    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let extractor = Slow {
        running: Arc::clone(&running),
        peak: Arc::clone(&peak),
    };
    let outcome = run_pipeline(
        &test_site(),
        extractor,
        (1..=12).collect(),
        3,
        &mut sink,
        &fast_retry(1),
    )
    .await
    .unwrap();

    assert_eq!(outcome.succeeded, 12);
    assert_eq!(peak.load(Ordering::SeqCst), 3);
    assert_eq!(running.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_contract_violation_aborts_run() {
    let (_dir, mut storage) = temp_storage();
    let mut sink = BatchSink::new(&mut storage, 100);
    sink.create_table().unwrap();

    let result = run_pipeline(
        &test_site(),
        Broken,
        (1..=3).collect(),
        1,
        &mut sink,
        &fast_retry(3),
    )
    .await;

    assert!(matches!(result, Err(HarvestError::Contract(_))));
}

#[tokio::test]
async fn test_flush_failure_is_fatal_and_keeps_rows() {
    let (_dir, mut storage) = temp_storage();
    // pages_urls is never created, so the first flush fails
    let mut sink = BatchSink::new(&mut storage, 2);

    let extractor = FanOut {
        per_item: BTreeMap::new(),
        default: 1,
    };
    let result = run_pipeline(
        &test_site(),
        extractor,
        (1..=4).collect(),
        1,
        &mut sink,
        &fast_retry(1),
    )
    .await;

    assert!(matches!(
        result,
        Err(HarvestError::Storage(StorageError::UnknownTable(ref table))) if table == "pages_urls"
    ));
    assert!(sink.buffered() >= 2);
    assert_eq!(sink.flushed(), 0);
}

#[tokio::test]
async fn test_zero_concurrency_is_rejected() {
    let (_dir, mut storage) = temp_storage();
    let mut sink = BatchSink::new(&mut storage, 100);

    let extractor = FanOut {
        per_item: BTreeMap::new(),
        default: 1,
    };
    let result = run_pipeline(&test_site(), extractor, vec![1], 0, &mut sink, &fast_retry(1)).await;

    assert!(matches!(result, Err(HarvestError::InvalidConcurrency(0))));
}

const HOME_PAGE: &str = r#"<html><body>
<nav>
  <button data-testid="primarynav-button">Clothing</button>
  <div>
    <ul>
      <li><a href="/women/dresses/cat/?cid=8799#nlid=ww|clothing|shop+by+product">Dresses</a></li>
      <li><a href="/women/new-in/cat/?cid=27108">New in</a></li>
      <li><a href="/women/sale/cat/?cid=1&ctas=1">Sale</a></li>
    </ul>
  </div>
</nav>
</body></html>"#;

const LISTING_PAGE: &str = r#"<html><body>
<section>
  <article><a href="/prd/101">Red dress</a></article>
  <article><a href="/prd/102">Blue dress</a></article>
  <p>You've viewed 2 of 3 products</p>
  <progress max="3" value="2"></progress>
</section>
</body></html>"#;

const EMPTY_LISTING_PAGE: &str = "<html><body><section></section></body></html>";

const PRODUCT_PAGE: &str = r#"<html><head>
<script>window.shop.pdp.config.product = {"name":" Red Midi Dress ","images":[{"url":"https://images.example.com/101-1.jpg","colour":"RED"},{"url":"https://images.example.com/101-2.jpg","colour":""}]};</script>
</head><body>
<div id="productDescriptionDetails"><ul><li>Midi dress</li><li>Square neck</li></ul></div>
<div id="productDescriptionAboutMe">Main: 100% Cotton</div>
</body></html>"#;

async fn mount_storefront(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOME_PAGE))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/women/dresses/cat/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_LISTING_PAGE))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/women/dresses/cat/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING_PAGE))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/prd/101"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/prd/102"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

fn harvest_config(base_url: &str, db_path: &str, extra: &str) -> String {
    format!(
        r#"
[site]
base-url = "{base_url}"
name = "shop"

[pipeline]
concurrency-limit = 4
batch-size = 2

[retry]
max-retries = 2
timeout-secs = 5.0
backoff-factor = 0.0

[output]
database-path = "{db_path}"
{extra}
"#
    )
}

#[tokio::test]
async fn test_full_harvest_against_mock_storefront() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("harvest.db");
    let config = parse_config(&harvest_config(
        &server.uri(),
        &db_path.display().to_string(),
        "",
    ))
    .unwrap();
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    let summary = run_all_stages(&config, &mut storage).await.unwrap();

    let per_stage: Vec<(usize, usize, usize)> = summary
        .stages
        .iter()
        .map(|report| (report.inputs, report.succeeded, report.failed_count()))
        .collect();
    assert_eq!(per_stage, vec![(1, 1, 0), (1, 2, 0), (2, 3, 0), (2, 1, 1)]);
    assert_eq!(summary.total_failed(), 1);

    // The failed article comes back typed, ready to be retried
    match &summary.stages[3].failed {
        StageFailures::ArticleData(failed) => {
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].id, 8799);
            assert_eq!(
                failed[0].article_url,
                Some(format!("{}/prd/102", server.uri()))
            );
        }
        other => panic!("unexpected failures: {:?}", other),
    }
    assert_eq!(summary.stages[0].failed, StageFailures::Categories(vec![]));

    let categories = storage.load_all("categories").unwrap();
    assert_eq!(categories.len(), 1);

    let articles: Vec<ArticleUrl> = storage
        .load_all(ArticleUrl::TABLE)
        .unwrap()
        .iter()
        .map(|record| ArticleUrl::from_record(record).unwrap())
        .collect();
    assert_eq!(articles.len(), 3);
    let placeholder = articles
        .iter()
        .find(|article| article.article_url.is_none())
        .unwrap();
    assert!(placeholder.page_url.ends_with("?cid=8799&page=2"));

    let data: Vec<ArticleData> = storage
        .load_all(ArticleData::TABLE)
        .unwrap()
        .iter()
        .map(|record| ArticleData::from_record(record).unwrap())
        .collect();
    assert_eq!(data.len(), 1);
    let dress = &data[0];
    assert_eq!(dress.id, 8799);
    assert_eq!(dress.article_url, format!("{}/prd/101", server.uri()));
    assert_eq!(dress.description.as_deref(), Some("red midi dress"));
    assert_eq!(dress.colour.as_deref(), Some("red"));
    assert_eq!(
        dress.tags.as_deref(),
        Some(r#"["midi dress","square neck"]"#)
    );
    assert_eq!(dress.materials.as_deref(), Some(r#"["main: 100% cotton"]"#));
    assert_eq!(
        dress.images_urls.as_deref(),
        Some(r#"["https://images.example.com/101-1.jpg","https://images.example.com/101-2.jpg"]"#)
    );
}

#[tokio::test]
async fn test_configured_categories_survive_a_dead_home_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/men/shirts/cat/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_LISTING_PAGE))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("harvest.db");
    let extra = format!(
        r#"
[[extra-category]]
id = 3602
gender = "men"
category = "clothing"
subcategory = "shirts"
base-url = "{}/men/shirts/cat/?cid=3602"
"#,
        server.uri()
    );
    let config = parse_config(&harvest_config(
        &server.uri(),
        &db_path.display().to_string(),
        &extra,
    ))
    .unwrap();
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    let summary = run_all_stages(&config, &mut storage).await.unwrap();

    assert_eq!(
        summary.stages[0].failed,
        StageFailures::Categories(vec![SiteRoot { url: server.uri() }])
    );
    assert_eq!(storage.count_rows("categories").unwrap(), 1);
    // One listing page, no articles on it
    assert_eq!(storage.count_rows("pages_urls").unwrap(), 1);
    assert_eq!(storage.count_rows("articles_urls").unwrap(), 1);
    assert_eq!(summary.stages[3].inputs, 0);
    assert_eq!(storage.count_rows("articles_data").unwrap(), 0);
}
