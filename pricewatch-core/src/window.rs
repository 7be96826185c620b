//! Aggregate windows, strategies and the per-item summary snapshot

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Lookback window for a summary statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AggregateWindow {
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
}

impl AggregateWindow {
    /// Every window, shortest first
    pub const ALL: [AggregateWindow; 4] = [
        AggregateWindow::Last24Hours,
        AggregateWindow::Last7Days,
        AggregateWindow::Last30Days,
        AggregateWindow::Last90Days,
    ];

    /// Get the lookback duration for this window
    pub fn duration(&self) -> Duration {
        match self {
            AggregateWindow::Last24Hours => Duration::hours(24),
            AggregateWindow::Last7Days => Duration::days(7),
            AggregateWindow::Last30Days => Duration::days(30),
            AggregateWindow::Last90Days => Duration::days(90),
        }
    }

    /// Earliest timestamp (epoch ms) still inside the window
    pub fn cutoff_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.duration().num_milliseconds()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateWindow::Last24Hours => "24h",
            AggregateWindow::Last7Days => "7d",
            AggregateWindow::Last30Days => "30d",
            AggregateWindow::Last90Days => "90d",
        }
    }
}

impl std::fmt::Display for AggregateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a window's points are reduced to one number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationStrategy {
    /// Median unit price
    Median,
    /// Volume-weighted average unit price
    #[default]
    WeightedAverage,
}

impl AggregationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationStrategy::Median => "median",
            AggregationStrategy::WeightedAverage => "weighted-average",
        }
    }
}

impl std::fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AggregationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "median" => Ok(AggregationStrategy::Median),
            "weighted-average" | "weighted_average" | "wap" => {
                Ok(AggregationStrategy::WeightedAverage)
            }
            other => Err(format!(
                "unknown strategy '{}', expected 'median' or 'weighted-average'",
                other
            )),
        }
    }
}

/// Summary statistics for one identifier
///
/// Window values are `None` when the window holds no usable data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub last_24h: Option<f64>,
    pub last_7d: Option<f64>,
    pub last_30d: Option<f64>,
    pub last_90d: Option<f64>,
    /// Most recent observed unit price over the whole fetched series
    pub last_ever: Option<f64>,
}

impl AggregateSnapshot {
    /// Build a snapshot by evaluating `stat` for every window
    pub fn from_windows<F>(last_ever: Option<f64>, mut stat: F) -> Self
    where
        F: FnMut(AggregateWindow) -> Option<f64>,
    {
        Self {
            last_24h: stat(AggregateWindow::Last24Hours),
            last_7d: stat(AggregateWindow::Last7Days),
            last_30d: stat(AggregateWindow::Last30Days),
            last_90d: stat(AggregateWindow::Last90Days),
            last_ever,
        }
    }

    pub fn get(&self, window: AggregateWindow) -> Option<f64> {
        match window {
            AggregateWindow::Last24Hours => self.last_24h,
            AggregateWindow::Last7Days => self.last_7d,
            AggregateWindow::Last30Days => self.last_30d,
            AggregateWindow::Last90Days => self.last_90d,
        }
    }
}
