//! Window Aggregator
//!
//! Reduces a raw price series to one statistic per aggregate window.
//! Everything here is a pure function of `(series, now)`.

use pricewatch_core::{AggregateSnapshot, AggregateWindow, AggregationStrategy, PricePoint};

/// Computes windowed summary statistics with a fixed strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowAggregator {
    strategy: AggregationStrategy,
}

impl WindowAggregator {
    pub fn new(strategy: AggregationStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> AggregationStrategy {
        self.strategy
    }

    /// Compute every window's statistic for `series` as seen from `now_ms`.
    ///
    /// `last_ever` comes from the fetch step and is passed through untouched.
    pub fn aggregate(
        &self,
        series: &[PricePoint],
        last_ever: Option<f64>,
        now_ms: i64,
    ) -> AggregateSnapshot {
        AggregateSnapshot::from_windows(last_ever, |window| {
            self.statistic(series, window, now_ms)
        })
    }

    /// Statistic for a single window
    pub fn statistic(
        &self,
        series: &[PricePoint],
        window: AggregateWindow,
        now_ms: i64,
    ) -> Option<f64> {
        match self.strategy {
            AggregationStrategy::Median => median_price(series, window, now_ms),
            AggregationStrategy::WeightedAverage => weighted_average_price(series, window, now_ms),
        }
    }
}

/// Points with `time >= now - window`
pub fn points_in_window(
    series: &[PricePoint],
    window: AggregateWindow,
    now_ms: i64,
) -> impl Iterator<Item = &PricePoint> {
    let cutoff = window.cutoff_ms(now_ms);
    series.iter().filter(move |p| p.time >= cutoff)
}

/// Median unit price inside the window, `None` if the window is empty
pub fn median_price(series: &[PricePoint], window: AggregateWindow, now_ms: i64) -> Option<f64> {
    let mut prices: Vec<f64> = points_in_window(series, window, now_ms)
        .map(|p| p.unit_price)
        .collect();
    median(&mut prices)
}

/// `sum(price * volume) / sum(volume)` inside the window, `None` if no volume traded
pub fn weighted_average_price(
    series: &[PricePoint],
    window: AggregateWindow,
    now_ms: i64,
) -> Option<f64> {
    // u128 so summed upstream volumes cannot overflow
    let (weighted_sum, total_volume) = points_in_window(series, window, now_ms).fold(
        (0.0_f64, 0_u128),
        |(sum, volume), p| {
            (
                sum + p.unit_price * p.volume as f64,
                volume + u128::from(p.volume),
            )
        },
    );

    if total_volume == 0 {
        return None;
    }
    Some(weighted_sum / total_volume as f64)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
