//! Pipeline
//!
//! Sequences one full run: authenticate → load identifiers → process in
//! batches → flush the snapshot. Setup failures abort before any batch runs;
//! everything after that is recovered per item.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use pricewatch_catalog::{default_feeds, CatalogError, CatalogFeed, IdentifierSource};
use pricewatch_core::{AggregationStrategy, PriceError, PriceResult};
use pricewatch_steam::{MarketRequester, PriceHistoryFetcher};
use tracing::{error, info, instrument};

use crate::aggregator::WindowAggregator;
use crate::record_store::{AggregateTable, RecordStore, RecordStoreError, DEFAULT_HISTORY_RETENTION};
use crate::retry::RetryPolicy;
use crate::scheduler::{BatchRunStats, BatchScheduler, BatchSchedulerConfig};

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Catalog documents to read identifiers from
    pub feeds: Vec<CatalogFeed>,
    /// Identifiers fetched concurrently per batch
    pub batch_size: usize,
    /// Request budget; `None` or `Some(0)` disables pacing
    pub requests_per_minute: Option<u32>,
    /// Raw points kept per item on disk
    pub history_retention_points: usize,
    pub strategy: AggregationStrategy,
    /// Write the combined snapshot at the end of the run
    pub write_snapshot: bool,
    /// Root for `pricehistory/` and `prices/latest.json`
    pub output_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            batch_size: 1,
            requests_per_minute: None,
            history_retention_points: DEFAULT_HISTORY_RETENTION,
            strategy: AggregationStrategy::default(),
            write_snapshot: true,
            output_dir: PathBuf::from("./static"),
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    fn scheduler_config(&self) -> BatchSchedulerConfig {
        BatchSchedulerConfig {
            batch_size: self.batch_size,
            requests_per_minute: self.requests_per_minute,
            retry: self.retry,
        }
    }
}

/// Result of a completed run
#[derive(Debug)]
pub struct RunSummary {
    /// Snapshot for every item that was recorded
    pub aggregates: AggregateTable,
    pub stats: BatchRunStats,
    /// Where the snapshot was written, if it was
    pub snapshot_path: Option<PathBuf>,
}

/// Failures that abort a run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Authentication failed: {0}")]
    Authentication(PriceError),

    #[error("Failed to load catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] RecordStoreError),
}

/// The ingestion-and-aggregation pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    market_url: Option<String>,
    reference_time_ms: Option<i64>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            market_url: None,
            reference_time_ms: None,
        }
    }

    /// Fetch price histories from a different market root
    pub fn with_market_url(mut self, market_url: impl Into<String>) -> Self {
        self.market_url = Some(market_url.into());
        self
    }

    /// Aggregate against a fixed timestamp instead of the wall clock
    pub fn with_reference_time(mut self, now_ms: i64) -> Self {
        self.reference_time_ms = Some(now_ms);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run once.
    ///
    /// `authenticate` yields the request capability; it is awaited first and
    /// its failure is fatal, as is any catalog failure.
    #[instrument(skip_all)]
    pub async fn run<A>(
        &self,
        authenticate: A,
        catalog: &dyn IdentifierSource,
    ) -> Result<RunSummary, PipelineError>
    where
        A: Future<Output = PriceResult<Arc<dyn MarketRequester>>>,
    {
        let requester = authenticate.await.map_err(|e| {
            error!("Authentication failed: {}", e);
            PipelineError::Authentication(e)
        })?;

        let identifiers: Vec<String> = catalog
            .load_identifiers()
            .await
            .map_err(|e| {
                error!("Failed to load catalog: {}", e);
                PipelineError::Catalog(e)
            })?
            .into_iter()
            .collect();
        info!("Loaded {} unique items from catalog", identifiers.len());

        let mut store = RecordStore::under(&self.config.output_dir)
            .with_retention(self.config.history_retention_points);
        store.prepare().await?;

        let scheduler = self.scheduler(requester);
        let stats = scheduler.run(&identifiers, &mut store).await;

        let (aggregates, snapshot_path) = if self.config.write_snapshot {
            let path = store.snapshot_path().to_path_buf();
            (store.flush().await?, Some(path))
        } else {
            info!("Snapshot disabled, skipping write");
            (store.into_aggregates(), None)
        };

        Ok(RunSummary {
            aggregates,
            stats,
            snapshot_path,
        })
    }

    fn scheduler(&self, requester: Arc<dyn MarketRequester>) -> BatchScheduler {
        let mut fetcher = PriceHistoryFetcher::new(requester);
        if let Some(market_url) = &self.market_url {
            fetcher = fetcher.with_market_url(market_url.as_str());
        }

        let scheduler = BatchScheduler::new(
            fetcher,
            WindowAggregator::new(self.config.strategy),
            self.config.scheduler_config(),
        );
        match self.reference_time_ms {
            Some(now_ms) => scheduler.with_reference_time(now_ms),
            None => scheduler,
        }
    }
}
