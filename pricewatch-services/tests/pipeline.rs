//! End-to-end pipeline runs against fake marketplace and catalog collaborators

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pricewatch_catalog::{CatalogError, IdentifierSource};
use pricewatch_core::{AggregationStrategy, PriceError, PricePoint, PriceResult};
use pricewatch_services::{
    history_file_stem, Pipeline, PipelineConfig, PipelineError, RetryPolicy,
};
use pricewatch_steam::{MarketRequester, MarketResponse};
use tempfile::TempDir;

const NOW: i64 = 1_760_000_000_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

struct FixedCatalog {
    result: Result<Vec<&'static str>, ()>,
    calls: AtomicUsize,
}

impl FixedCatalog {
    fn with(names: Vec<&'static str>) -> Self {
        Self {
            result: Ok(names),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            result: Err(()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentifierSource for FixedCatalog {
    async fn load_identifiers(&self) -> Result<BTreeSet<String>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(names) => Ok(names.iter().map(|s| s.to_string()).collect()),
            Err(()) => Err(CatalogError::ApiError {
                feed: "crates".to_string(),
                status: 503,
            }),
        }
    }
}

/// Serves scripted replies per identifier, one per request; the last reply repeats
#[derive(Default)]
struct FakeMarket {
    replies: HashMap<String, Vec<PriceResult<MarketResponse>>>,
    requests: Mutex<Vec<String>>,
}

impl FakeMarket {
    fn on(mut self, identifier: &str, reply: PriceResult<MarketResponse>) -> Self {
        self.replies
            .entry(identifier.to_string())
            .or_default()
            .push(reply);
        self
    }

    fn request_count(&self, identifier: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| *r == identifier)
            .count()
    }
}

fn clone_reply(reply: &PriceResult<MarketResponse>) -> PriceResult<MarketResponse> {
    match reply {
        Ok(response) => Ok(response.clone()),
        Err(e) => Err(PriceError::transport(e.to_string())),
    }
}

#[async_trait]
impl MarketRequester for FakeMarket {
    async fn get(&self, url: &str) -> PriceResult<MarketResponse> {
        let identifier = url
            .split("market_hash_name=")
            .nth(1)
            .unwrap_or_default()
            .replace("%20", " ");

        let nth = {
            let mut requests = self.requests.lock().unwrap();
            let nth = requests.iter().filter(|r| **r == identifier).count();
            requests.push(identifier.clone());
            nth
        };

        match self.replies.get(&identifier) {
            Some(replies) => clone_reply(&replies[nth.min(replies.len() - 1)]),
            None => Ok(MarketResponse::new(404, "")),
        }
    }
}

fn history(points: &[(i64, f64, u64)]) -> PriceResult<MarketResponse> {
    let prices: Vec<serde_json::Value> = points
        .iter()
        .map(|(age_ms, price, volume)| {
            let date = chrono::DateTime::from_timestamp_millis(NOW - age_ms)
                .unwrap()
                .to_rfc3339();
            serde_json::json!([date, price.to_string(), volume.to_string()])
        })
        .collect();
    Ok(MarketResponse::new(
        200,
        serde_json::json!({ "success": true, "prices": prices }).to_string(),
    ))
}

fn authenticated(
    market: Arc<FakeMarket>,
) -> impl std::future::Future<Output = PriceResult<Arc<dyn MarketRequester>>> {
    async move { Ok(market as Arc<dyn MarketRequester>) }
}

fn config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        feeds: Vec::new(),
        batch_size: 2,
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    }
}

fn read_json(path: impl AsRef<std::path::Path>) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_full_run_writes_history_and_snapshot() {
    let market = Arc::new(
        FakeMarket::default()
            .on(
                "Clutch Case",
                history(&[
                    (10 * DAY_MS, 100.0, 6),
                    (HOUR_MS, 10.0, 1),
                    (HOUR_MS, 20.0, 2),
                    (HOUR_MS, 30.0, 3),
                ]),
            )
            .on("Kilowatt Case", history(&[(2 * DAY_MS, 1.5, 4)]))
            .on("Broken Case", Err(PriceError::transport("connection reset")))
            .on("Gone Case", Ok(MarketResponse::new(500, "<html>oops</html>"))),
    );
    let catalog = FixedCatalog::with(vec![
        "Clutch Case",
        "Kilowatt Case",
        "Broken Case",
        "Gone Case",
        "Kilowatt Case",
    ]);

    let dir = TempDir::new().unwrap();
    let summary = Pipeline::new(config(&dir))
        .with_reference_time(NOW)
        .run(authenticated(market), &catalog)
        .await
        .unwrap();

    assert_eq!(summary.stats.recorded, 2);
    assert_eq!(summary.stats.empty, 1);
    assert_eq!(summary.stats.failed, 1);
    assert_eq!(summary.stats.batches, 2);

    let clutch = summary.aggregates["Clutch Case"];
    assert!((clutch.last_24h.unwrap() - 140.0 / 6.0).abs() < 1e-9);
    assert!((clutch.last_30d.unwrap() - 740.0 / 12.0).abs() < 1e-9);
    assert_eq!(clutch.last_ever, Some(30.0));

    let kilowatt = summary.aggregates["Kilowatt Case"];
    assert_eq!(kilowatt.last_24h, None);
    assert_eq!(kilowatt.last_7d, Some(1.5));

    let snapshot_path = summary.snapshot_path.unwrap();
    assert_eq!(snapshot_path, dir.path().join("prices").join("latest.json"));
    let snapshot = read_json(&snapshot_path);
    let keys: Vec<&String> = snapshot.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["Clutch Case", "Kilowatt Case"]);
    assert_eq!(snapshot["Kilowatt Case"]["last_24h"], serde_json::Value::Null);
    assert_eq!(snapshot["Kilowatt Case"]["last_ever"], 1.5);

    let history_dir = dir.path().join("pricehistory");
    let raw = read_json(history_dir.join(format!("{}.json", history_file_stem("Clutch Case"))));
    let raw: Vec<PricePoint> = serde_json::from_value(raw).unwrap();
    assert_eq!(raw.len(), 4);
    assert_eq!(raw[3], PricePoint::new(NOW - HOUR_MS, 30.0, 3));

    assert_eq!(std::fs::read_dir(&history_dir).unwrap().count(), 2);
}

#[tokio::test]
async fn test_authentication_failure_aborts_before_catalog() {
    let catalog = FixedCatalog::with(vec!["Clutch Case"]);
    let dir = TempDir::new().unwrap();

    let err = Pipeline::new(config(&dir))
        .run(
            async {
                Err::<Arc<dyn MarketRequester>, _>(PriceError::auth(
                    "Incorrect account name or password",
                ))
            },
            &catalog,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Authentication(PriceError::Auth(_))));
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join("pricehistory").exists());
}

#[tokio::test]
async fn test_catalog_failure_aborts_before_any_request() {
    let market = Arc::new(FakeMarket::default());
    let catalog = FixedCatalog::failing();
    let dir = TempDir::new().unwrap();

    let err = Pipeline::new(config(&dir))
        .run(authenticated(market.clone()), &catalog)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Catalog(CatalogError::ApiError { status: 503, .. })));
    assert!(market.requests.lock().unwrap().is_empty());
    assert!(!dir.path().join("prices").exists());
}

#[tokio::test]
async fn test_snapshot_can_be_disabled() {
    let market = Arc::new(FakeMarket::default().on("Clutch Case", history(&[(HOUR_MS, 0.5, 10)])));
    let catalog = FixedCatalog::with(vec!["Clutch Case"]);
    let dir = TempDir::new().unwrap();

    let summary = Pipeline::new(PipelineConfig {
        write_snapshot: false,
        ..config(&dir)
    })
    .with_reference_time(NOW)
    .run(authenticated(market), &catalog)
    .await
    .unwrap();

    assert_eq!(summary.snapshot_path, None);
    assert_eq!(summary.aggregates["Clutch Case"].last_24h, Some(0.5));
    assert!(!dir.path().join("prices").join("latest.json").exists());
    assert!(dir
        .path()
        .join("pricehistory")
        .join(format!("{}.json", history_file_stem("Clutch Case")))
        .exists());
}

#[tokio::test]
async fn test_median_strategy_and_retention() {
    let market = Arc::new(FakeMarket::default().on(
        "Clutch Case",
        history(&[
            (3 * HOUR_MS, 10.0, 100),
            (2 * HOUR_MS, 20.0, 1),
            (HOUR_MS, 30.0, 1),
        ]),
    ));
    let catalog = FixedCatalog::with(vec!["Clutch Case"]);
    let dir = TempDir::new().unwrap();

    let summary = Pipeline::new(PipelineConfig {
        strategy: AggregationStrategy::Median,
        history_retention_points: 1,
        ..config(&dir)
    })
    .with_reference_time(NOW)
    .run(authenticated(market), &catalog)
    .await
    .unwrap();

    let clutch = summary.aggregates["Clutch Case"];
    assert_eq!(clutch.last_24h, Some(20.0));
    assert_eq!(clutch.last_90d, Some(20.0));
    assert_eq!(clutch.last_ever, Some(30.0));

    let raw = read_json(
        dir.path()
            .join("pricehistory")
            .join(format!("{}.json", history_file_stem("Clutch Case"))),
    );
    assert_eq!(raw.as_array().unwrap().len(), 1);
    assert_eq!(raw[0]["value"], 30.0);
}

#[tokio::test]
async fn test_transport_errors_are_retried_per_item() {
    let market = Arc::new(
        FakeMarket::default()
            .on("Clutch Case", Err(PriceError::transport("timed out")))
            .on("Clutch Case", history(&[(HOUR_MS, 2.0, 1)]))
            .on("Kilowatt Case", Err(PriceError::transport("timed out"))),
    );
    let catalog = FixedCatalog::with(vec!["Clutch Case", "Kilowatt Case"]);
    let dir = TempDir::new().unwrap();

    let summary = Pipeline::new(PipelineConfig {
        retry: RetryPolicy::new(2, 1),
        ..config(&dir)
    })
    .with_reference_time(NOW)
    .run(authenticated(market.clone()), &catalog)
    .await
    .unwrap();

    assert_eq!(summary.stats.recorded, 1);
    assert_eq!(summary.stats.failed, 1);
    assert_eq!(market.request_count("Clutch Case"), 2);
    assert_eq!(market.request_count("Kilowatt Case"), 3);
    assert!(summary.aggregates.contains_key("Clutch Case"));
}
