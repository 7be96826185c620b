//! Marketplace price-history pipeline runner
//!
//! Logs into the marketplace, loads the item catalog, then fetches and
//! aggregates every item's price history in paced batches.

mod config;

use std::sync::Arc;

use clap::Parser;
use pricewatch_catalog::CatalogClient;
use pricewatch_core::PriceError;
use pricewatch_services::Pipeline;
use pricewatch_steam::{MarketRequester, SteamSession};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Missing credentials exit here with a usage error
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pricewatch=debug")),
        )
        .init();

    let config = args.pipeline_config()?;
    info!(
        "Starting price-history pipeline (strategy: {}, batch size: {}, rate: {})",
        config.strategy,
        config.batch_size,
        config
            .requests_per_minute
            .map(|rate| format!("{}/min", rate))
            .unwrap_or_else(|| "unpaced".to_string())
    );

    let catalog = CatalogClient::with_feeds(config.feeds.clone());
    let credentials = args.credentials();
    let authenticate = async {
        let session = SteamSession::login(&credentials).await?;
        Ok::<_, PriceError>(Arc::new(session) as Arc<dyn MarketRequester>)
    };

    let summary = Pipeline::new(config).run(authenticate, &catalog).await?;

    match &summary.snapshot_path {
        Some(path) => info!(
            "Done: {} items recorded, snapshot at {}",
            summary.aggregates.len(),
            path.display()
        ),
        None => info!("Done: {} items recorded", summary.aggregates.len()),
    }
    info!(
        "{} batches, {} without data, {} failed",
        summary.stats.batches, summary.stats.empty, summary.stats.failed
    );

    Ok(())
}
