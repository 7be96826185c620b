//! Catalog feed client
//!
//! Fetches every catalog document and flattens them into one identifier set.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::CatalogError;
use crate::IdentifierSource;

/// Base URL for the community-maintained item API
pub const ITEMS_API_BASE_URL: &str =
    "https://raw.githubusercontent.com/ByMykel/CSGO-API/main/public/api/en";

/// One catalog document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFeed {
    /// Short name used in logs
    pub name: String,
    pub url: String,
}

impl CatalogFeed {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    /// Build a feed from a user-supplied URL, naming it after the document
    pub fn from_url(raw: &str) -> Result<Self, CatalogError> {
        let url = Url::parse(raw).map_err(|_| CatalogError::InvalidFeed(raw.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CatalogError::InvalidFeed(raw.to_string()));
        }

        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.trim_end_matches(".json").to_string())
            .unwrap_or_else(|| url.host_str().unwrap_or("feed").to_string());

        Ok(Self {
            name,
            url: url.to_string(),
        })
    }
}

/// The item documents tracked by default
pub fn default_feeds() -> Vec<CatalogFeed> {
    [
        "skins_not_grouped",
        "stickers",
        "crates",
        "agents",
        "keys",
        "patches",
        "graffiti",
        "music_kits",
        "collectibles",
    ]
    .iter()
    .map(|name| CatalogFeed::new(name, &format!("{}/{}.json", ITEMS_API_BASE_URL, name)))
    .collect()
}

/// Catalog entry; everything but the name is ignored
#[derive(Debug, Deserialize)]
struct CatalogItem {
    #[serde(default)]
    market_hash_name: Option<String>,
}

/// Catalog client
pub struct CatalogClient {
    client: Client,
    feeds: Vec<CatalogFeed>,
}

impl CatalogClient {
    /// Create a new catalog client with the default feeds
    pub fn new() -> Self {
        Self::with_feeds(default_feeds())
    }

    /// Create with custom feeds
    pub fn with_feeds(feeds: Vec<CatalogFeed>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
            feeds,
        }
    }

    pub fn feeds(&self) -> &[CatalogFeed] {
        &self.feeds
    }

    /// Fetch a single catalog document
    async fn fetch_feed(&self, feed: &CatalogFeed) -> Result<Vec<String>, CatalogError> {
        debug!("Fetching catalog feed {} from {}", feed.name, feed.url);

        let response = self
            .client
            .get(&feed.url)
            .send()
            .await
            .map_err(|e| CatalogError::RequestFailed {
                feed: feed.name.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CatalogError::ApiError {
                feed: feed.name.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::RequestFailed {
                feed: feed.name.clone(),
                message: e.to_string(),
            })?;

        parse_feed(&feed.name, &body)
    }
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentifierSource for CatalogClient {
    /// Load every feed concurrently. Any failing feed fails the whole load.
    async fn load_identifiers(&self) -> Result<BTreeSet<String>, CatalogError> {
        let results =
            futures::future::join_all(self.feeds.iter().map(|feed| self.fetch_feed(feed))).await;

        let mut documents = Vec::with_capacity(results.len());
        for (feed, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(names) => {
                    debug!("Loaded {} names from {}", names.len(), feed.name);
                    documents.push(names);
                }
                Err(e) => {
                    warn!("Failed to load catalog feed {}: {}", feed.name, e);
                    return Err(e);
                }
            }
        }

        let identifiers = merge_identifiers(documents);
        if identifiers.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        info!(
            "Loaded {} unique identifiers from {} catalog feeds",
            identifiers.len(),
            self.feeds.len()
        );
        Ok(identifiers)
    }
}

/// Extract the non-empty names from one catalog document
fn parse_feed(feed: &str, body: &str) -> Result<Vec<String>, CatalogError> {
    let items: Vec<CatalogItem> =
        serde_json::from_str(body).map_err(|e| CatalogError::ParseError {
            feed: feed.to_string(),
            message: e.to_string(),
        })?;

    Ok(items
        .into_iter()
        .filter_map(|item| item.market_hash_name)
        .filter(|name| !name.is_empty())
        .collect())
}

/// Flatten documents into one deduplicated set
fn merge_identifiers(documents: Vec<Vec<String>>) -> BTreeSet<String> {
    documents.into_iter().flatten().collect()
}
