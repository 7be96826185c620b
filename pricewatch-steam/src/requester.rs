//! The authenticated request capability

use async_trait::async_trait;
use pricewatch_core::PriceResult;

/// Status and body of one completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketResponse {
    pub status: u16,
    pub body: String,
}

impl MarketResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx only; anything else is treated by callers as "no data"
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can issue one authenticated read request.
///
/// Implementations return `Err(PriceError::Transport)` only when no response
/// was received. Error statuses are returned as `Ok` with the status set.
#[async_trait]
pub trait MarketRequester: Send + Sync {
    async fn get(&self, url: &str) -> PriceResult<MarketResponse>;
}
