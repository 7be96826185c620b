//! Price history retrieval
//!
//! One request per item. Application-level failures (any non-2xx status) are
//! reported as an empty series rather than an error; only transport failures
//! and malformed bodies surface as `Err`.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
use pricewatch_core::{FetchedSeries, PriceError, PricePoint, PriceResult};
use tracing::{debug, instrument, warn};

use crate::requester::MarketRequester;
use crate::types::{
    NumberOrString, PriceHistoryResponse, RawPriceTuple, CS2_APP_ID, STEAM_COMMUNITY_BASE,
};

/// Fetches raw price series for market items
#[derive(Clone)]
pub struct PriceHistoryFetcher {
    requester: Arc<dyn MarketRequester>,
    market_url: String,
    app_id: u32,
}

impl PriceHistoryFetcher {
    /// Create a fetcher against the public Steam Community Market
    pub fn new(requester: Arc<dyn MarketRequester>) -> Self {
        Self {
            requester,
            market_url: format!("{}/market", STEAM_COMMUNITY_BASE),
            app_id: CS2_APP_ID,
        }
    }

    /// Point the fetcher at a different market root
    pub fn with_market_url(mut self, market_url: impl Into<String>) -> Self {
        self.market_url = market_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the price history URL for an identifier
    pub fn price_history_url(&self, identifier: &str) -> String {
        format!(
            "{}/pricehistory/?appid={}&market_hash_name={}",
            self.market_url,
            self.app_id,
            urlencoding::encode(identifier)
        )
    }

    /// Fetch the full price series for one identifier
    #[instrument(skip(self))]
    pub async fn fetch(&self, identifier: &str) -> PriceResult<FetchedSeries> {
        let url = self.price_history_url(identifier);
        debug!("Fetching price history from: {}", url);

        let response = self.requester.get(&url).await?;

        if !response.is_success() {
            warn!(
                "Price history request returned status {} for {}",
                response.status, url
            );
            return Ok(FetchedSeries::empty());
        }

        let fetched = parse_price_history(&response.body)?;
        debug!(
            "Fetched {} price points for {}",
            fetched.series.len(),
            identifier
        );
        Ok(fetched)
    }
}

impl std::fmt::Debug for PriceHistoryFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceHistoryFetcher")
            .field("market_url", &self.market_url)
            .field("app_id", &self.app_id)
            .finish()
    }
}

/// Parse a successful price history body
pub fn parse_price_history(body: &str) -> PriceResult<FetchedSeries> {
    let response: PriceHistoryResponse = serde_json::from_str(body)
        .map_err(|e| PriceError::parse(format!("Failed to parse price history response: {}", e)))?;

    let series = response
        .prices
        .unwrap_or_default()
        .iter()
        .map(RawPriceTuple::to_price_point)
        .collect::<PriceResult<Vec<_>>>()?;

    Ok(FetchedSeries::new(series))
}

impl RawPriceTuple {
    fn to_price_point(&self) -> PriceResult<PricePoint> {
        let RawPriceTuple(date, price, volume) = self;

        let unit_price = match price {
            NumberOrString::Number(n) => *n,
            NumberOrString::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| PriceError::parse(format!("Invalid price '{}': {}", s, e)))?,
        };
        if !unit_price.is_finite() || unit_price < 0.0 {
            return Err(PriceError::parse(format!("Invalid price {}", unit_price)));
        }

        let volume = match volume {
            NumberOrString::Number(n) if n.fract() == 0.0 && *n >= 0.0 => *n as u64,
            NumberOrString::Number(n) => {
                return Err(PriceError::parse(format!("Invalid volume {}", n)));
            }
            NumberOrString::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|e| PriceError::parse(format!("Invalid volume '{}': {}", s, e)))?,
        };

        Ok(PricePoint {
            time: parse_market_date(date)?,
            unit_price,
            volume,
        })
    }
}

/// Parse an upstream date into epoch milliseconds (UTC)
///
/// Accepts RFC 3339 as well as the market's hourly form `"Jul 02 2014 01: +0"`.
pub fn parse_market_date(raw: &str) -> PriceResult<i64> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }

    let hourly = raw.strip_suffix("+0").map(str::trim_end).unwrap_or(raw);
    let hourly = hourly.strip_suffix(':').unwrap_or(hourly);

    NaiveDateTime::parse_from_str(&format!("{}:00", hourly), "%b %d %Y %H:%M")
        .map(|dt| dt.and_utc().timestamp_millis())
        .map_err(|e| PriceError::parse(format!("Unrecognized date '{}': {}", raw, e)))
}
