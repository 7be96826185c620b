//! Ingestion and aggregation services for the price-history pipeline
//!
//! This crate holds the part of the system with real moving pieces:
//! windowed aggregation, rate-paced batch scheduling with per-item failure
//! isolation, the record store, and the pipeline that sequences them.

pub mod aggregator;
pub mod pacing;
pub mod pipeline;
pub mod record_store;
pub mod retry;
pub mod scheduler;

pub use aggregator::{median_price, points_in_window, weighted_average_price, WindowAggregator};
pub use pacing::{inter_batch_delay, BatchPacer, PacerStats};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, RunSummary};
pub use record_store::{
    history_file_stem, retain_recent, AggregateTable, RecordStore, RecordStoreError,
    DEFAULT_HISTORY_RETENTION,
};
pub use retry::RetryPolicy;
pub use scheduler::{BatchRunStats, BatchScheduler, BatchSchedulerConfig, ItemError, ItemOutcome};
