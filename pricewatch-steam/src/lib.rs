//! Steam Community Market integration for the price-history pipeline
//!
//! This crate provides:
//! - [`MarketRequester`]: the "issue one authenticated GET" capability the
//!   pipeline depends on, so it can be swapped for a fake in tests
//! - [`SteamSession`]: a cookie-backed community session implementing it
//! - [`PriceHistoryFetcher`]: turns one item identifier into a price series

pub mod price_history;
pub mod requester;
pub mod session;
pub mod types;

pub use price_history::{parse_market_date, parse_price_history, PriceHistoryFetcher};
pub use requester::{MarketRequester, MarketResponse};
pub use session::{SteamCredentials, SteamSession};
pub use types::{CS2_APP_ID, STEAM_COMMUNITY_BASE};
