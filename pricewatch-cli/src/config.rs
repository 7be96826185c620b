//! Command-line and environment configuration

use std::path::PathBuf;

use clap::Parser;
use pricewatch_catalog::{default_feeds, CatalogError, CatalogFeed};
use pricewatch_core::AggregationStrategy;
use pricewatch_services::{PipelineConfig, RetryPolicy, DEFAULT_HISTORY_RETENTION};
use pricewatch_steam::SteamCredentials;

/// Ingest marketplace price histories and write windowed aggregates
#[derive(Parser)]
#[command(name = "pricewatch", version)]
pub struct Args {
    /// Marketplace account name
    #[arg(value_name = "ACCOUNT_NAME")]
    pub account_name: String,

    /// Marketplace account password
    #[arg(value_name = "PASSWORD")]
    pub password: String,

    /// Root directory for `pricehistory/` and `prices/latest.json`
    #[arg(long, env = "PRICEWATCH_OUTPUT_DIR", default_value = "./static")]
    pub output_dir: PathBuf,

    /// Items fetched concurrently per batch
    #[arg(long, env = "PRICEWATCH_BATCH_SIZE", default_value_t = 1)]
    pub batch_size: usize,

    /// Request budget; omit or pass 0 to run batches back to back
    #[arg(long, env = "PRICEWATCH_REQUESTS_PER_MINUTE")]
    pub requests_per_minute: Option<u32>,

    /// Raw points kept per item on disk
    #[arg(long, env = "PRICEWATCH_HISTORY_RETENTION", default_value_t = DEFAULT_HISTORY_RETENTION)]
    pub history_retention: usize,

    /// `median` or `weighted-average`
    #[arg(long, env = "PRICEWATCH_STRATEGY", default_value_t = AggregationStrategy::WeightedAverage)]
    pub strategy: AggregationStrategy,

    /// Skip writing the combined snapshot
    #[arg(long)]
    pub no_snapshot: bool,

    /// Retries per item after a transport failure
    #[arg(long, env = "PRICEWATCH_MAX_RETRIES", default_value_t = 0)]
    pub max_retries: u32,

    #[arg(long, env = "PRICEWATCH_RETRY_BASE_DELAY_MS", default_value_t = 1_000)]
    pub retry_base_delay_ms: u64,

    /// Catalog document URL (repeatable); defaults to the built-in feeds
    #[arg(long = "feed", value_name = "URL")]
    pub feeds: Vec<String>,
}

impl Args {
    pub fn credentials(&self) -> SteamCredentials {
        SteamCredentials::new(&self.account_name, &self.password)
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig, CatalogError> {
        let feeds = if self.feeds.is_empty() {
            default_feeds()
        } else {
            self.feeds
                .iter()
                .map(|url| CatalogFeed::from_url(url))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(PipelineConfig {
            feeds,
            batch_size: self.batch_size,
            requests_per_minute: self.requests_per_minute.filter(|rate| *rate > 0),
            history_retention_points: self.history_retention,
            strategy: self.strategy,
            write_snapshot: !self.no_snapshot,
            output_dir: self.output_dir.clone(),
            retry: RetryPolicy::new(self.max_retries, self.retry_base_delay_ms),
        })
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("account_name", &self.account_name)
            .field("password", &"***")
            .field("output_dir", &self.output_dir)
            .field("batch_size", &self.batch_size)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("history_retention", &self.history_retention)
            .field("strategy", &self.strategy)
            .field("no_snapshot", &self.no_snapshot)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("feeds", &self.feeds)
            .finish()
    }
}
