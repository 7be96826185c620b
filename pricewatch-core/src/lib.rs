//! Core types for the marketplace price-history pipeline
//!
//! This crate defines the shared data structures used across the pipeline:
//! raw price series, aggregate windows and snapshots, and the error taxonomy.

pub mod error;
pub mod series;
pub mod window;

pub use error::{PriceError, PriceResult};
pub use series::{FetchedSeries, PricePoint, PriceSeries};
pub use window::{AggregateSnapshot, AggregateWindow, AggregationStrategy};
