//! Steam Community wire types

use serde::Deserialize;

/// Base URL for the Steam Community site
pub const STEAM_COMMUNITY_BASE: &str = "https://steamcommunity.com";

/// Application id whose market items are tracked (Counter-Strike 2)
pub const CS2_APP_ID: u32 = 730;

/// Body of `/market/pricehistory/`
///
/// A missing or null `prices` field means no data.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceHistoryResponse {
    #[serde(default)]
    pub prices: Option<Vec<RawPriceTuple>>,
}

/// One `[date, price, volume]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct RawPriceTuple(pub String, pub NumberOrString, pub NumberOrString);

/// The market sends prices as numbers and volumes as strings, but not
/// consistently across endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    Text(String),
}

/// Body of `/login/getrsakey/`
#[derive(Debug, Clone, Deserialize)]
pub struct RsaKeyResponse {
    pub success: bool,
    /// Hex-encoded modulus
    #[serde(default)]
    pub publickey_mod: String,
    /// Hex-encoded public exponent
    #[serde(default)]
    pub publickey_exp: String,
    /// Must be echoed back to `dologin`
    #[serde(default)]
    pub timestamp: String,
}

/// Body of `/login/dologin/`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub requires_twofactor: bool,
    #[serde(default)]
    pub emailauth_needed: bool,
    #[serde(default)]
    pub captcha_needed: bool,
    #[serde(default)]
    pub login_complete: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub transfer_parameters: Option<TransferParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferParameters {
    #[serde(default)]
    pub steamid: Option<String>,
}
