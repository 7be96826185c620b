//! Batch Scheduler
//!
//! Drives fetch → aggregate → persist for every identifier, a fixed-size
//! batch at a time. Items in a batch run concurrently and all of them settle
//! before the next batch starts. Between batches the pacer keeps the run
//! under the requests-per-minute budget.

use chrono::Utc;
use futures::future::join_all;
use pricewatch_core::{AggregateSnapshot, PriceError};
use pricewatch_steam::PriceHistoryFetcher;
use tracing::{debug, info, warn};

use crate::aggregator::WindowAggregator;
use crate::pacing::BatchPacer;
use crate::record_store::{RecordStore, RecordStoreError};
use crate::retry::RetryPolicy;

/// Configuration for the batch scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSchedulerConfig {
    /// Identifiers fetched concurrently per batch
    pub batch_size: usize,
    /// Request budget; `None` runs batches back to back
    pub requests_per_minute: Option<u32>,
    /// Retry policy for transport failures
    pub retry: RetryPolicy,
}

impl Default for BatchSchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            requests_per_minute: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// What happened to one identifier
#[derive(Debug)]
pub enum ItemOutcome {
    /// Raw history written; snapshot goes into the table
    Recorded(AggregateSnapshot),
    /// Upstream had no data for the item
    Empty,
    Failed(ItemError),
}

/// Why an identifier was left out of the snapshot
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] PriceError),

    #[error("persist failed: {0}")]
    Persist(#[from] RecordStoreError),
}

/// Counters for one scheduler run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRunStats {
    pub batches: usize,
    pub recorded: usize,
    pub empty: usize,
    pub failed: usize,
}

impl BatchRunStats {
    pub fn processed(&self) -> usize {
        self.recorded + self.empty + self.failed
    }
}

/// Runs the per-item pipeline over an identifier list in paced batches
pub struct BatchScheduler {
    fetcher: PriceHistoryFetcher,
    aggregator: WindowAggregator,
    config: BatchSchedulerConfig,
    pacer: BatchPacer,
    /// Fixed "now" for aggregation; wall clock when unset
    reference_time_ms: Option<i64>,
}

impl BatchScheduler {
    pub fn new(
        fetcher: PriceHistoryFetcher,
        aggregator: WindowAggregator,
        config: BatchSchedulerConfig,
    ) -> Self {
        let batch_size = config.batch_size.max(1);
        Self {
            fetcher,
            aggregator,
            pacer: BatchPacer::new(batch_size, config.requests_per_minute),
            config: BatchSchedulerConfig {
                batch_size,
                ..config
            },
            reference_time_ms: None,
        }
    }

    /// Aggregate against a fixed timestamp instead of the wall clock
    pub fn with_reference_time(mut self, now_ms: i64) -> Self {
        self.reference_time_ms = Some(now_ms);
        self
    }

    pub fn config(&self) -> &BatchSchedulerConfig {
        &self.config
    }

    pub fn pacer(&self) -> &BatchPacer {
        &self.pacer
    }

    /// Number of batches `total` identifiers split into
    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.config.batch_size)
    }

    /// Process every identifier, adding successful snapshots to `store`.
    ///
    /// Never fails: per-item errors are logged and counted.
    pub async fn run(&self, identifiers: &[String], store: &mut RecordStore) -> BatchRunStats {
        let total_batches = self.batch_count(identifiers.len());
        let mut stats = BatchRunStats::default();

        info!(
            "Processing {} items in {} batches of up to {} ({} strategy, pacing delay {:.2}s)",
            identifiers.len(),
            total_batches,
            self.config.batch_size,
            self.aggregator.strategy(),
            self.pacer.delay().as_secs_f64()
        );

        for (index, batch) in identifiers.chunks(self.config.batch_size).enumerate() {
            let outcomes = self.run_batch(batch, store).await;

            for (identifier, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    ItemOutcome::Recorded(snapshot) => {
                        store.record_aggregate(identifier.clone(), snapshot);
                        stats.recorded += 1;
                    }
                    ItemOutcome::Empty => stats.empty += 1,
                    ItemOutcome::Failed(e) => {
                        warn!("Error processing {}: {}", identifier, e);
                        stats.failed += 1;
                    }
                }
            }

            stats.batches += 1;
            info!("Processed batch {}/{}", index + 1, total_batches);

            if index + 1 < total_batches {
                self.pacer.pause().await;
            }
        }

        info!(
            "Finished {} items: {} recorded, {} without data, {} failed",
            stats.processed(),
            stats.recorded,
            stats.empty,
            stats.failed
        );
        stats
    }

    /// Run one batch to completion; every item settles, none is cancelled
    async fn run_batch(&self, batch: &[String], store: &RecordStore) -> Vec<ItemOutcome> {
        join_all(batch.iter().map(|identifier| self.process_item(identifier, store))).await
    }

    /// fetch → aggregate (full series) → persist (truncated series)
    pub async fn process_item(&self, identifier: &str, store: &RecordStore) -> ItemOutcome {
        let fetched = match self
            .config
            .retry
            .execute(identifier, || self.fetcher.fetch(identifier))
            .await
        {
            Ok(fetched) => fetched,
            Err(e) => return ItemOutcome::Failed(e.into()),
        };

        if fetched.is_empty() {
            debug!("No price data for {}", identifier);
            return ItemOutcome::Empty;
        }

        let now_ms = self
            .reference_time_ms
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        let snapshot = self
            .aggregator
            .aggregate(&fetched.series, fetched.last_ever, now_ms);

        if let Err(e) = store.record_raw_series(identifier, &fetched.series).await {
            return ItemOutcome::Failed(e.into());
        }

        ItemOutcome::Recorded(snapshot)
    }
}
