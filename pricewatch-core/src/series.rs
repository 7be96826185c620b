//! Raw price series as received from the marketplace

use serde::{Deserialize, Serialize};

/// A single observed trade price
///
/// Serialized as `{ "time": .., "value": .., "volume": .. }`, the shape the
/// raw history files have always used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Epoch milliseconds (UTC)
    pub time: i64,
    /// Unit price in the marketplace's currency
    #[serde(rename = "value")]
    pub unit_price: f64,
    /// Number of units traded
    pub volume: u64,
}

impl PricePoint {
    pub fn new(time: i64, unit_price: f64, volume: u64) -> Self {
        Self {
            time,
            unit_price,
            volume,
        }
    }
}

/// Points ascending by `time`, in upstream order. Never re-sorted.
pub type PriceSeries = Vec<PricePoint>;

/// Output of one price-history fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedSeries {
    pub series: PriceSeries,
    /// Unit price of the last point, captured before any truncation
    pub last_ever: Option<f64>,
}

impl FetchedSeries {
    /// Wrap a series, capturing `last_ever` from its final point
    pub fn new(series: PriceSeries) -> Self {
        let last_ever = series.last().map(|p| p.unit_price);
        Self { series, last_ever }
    }

    /// The "no data" result used for application-level failures
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
