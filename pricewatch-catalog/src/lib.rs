//! Item catalog for the price-history pipeline
//!
//! The catalog is a handful of public JSON documents, each an array of item
//! objects carrying a `market_hash_name`. The pipeline only ever sees the
//! deduplicated set of those names.

pub mod client;
pub mod error;

use std::collections::BTreeSet;

use async_trait::async_trait;

pub use client::{default_feeds, CatalogClient, CatalogFeed, ITEMS_API_BASE_URL};
pub use error::CatalogError;

/// Something that can produce the full set of item identifiers
#[async_trait]
pub trait IdentifierSource: Send + Sync {
    async fn load_identifiers(&self) -> Result<BTreeSet<String>, CatalogError>;
}
