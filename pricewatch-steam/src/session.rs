//! Authenticated Steam Community session
//!
//! Uses the community web login: fetch the account's RSA key, encrypt the
//! password with it, then post the credentials. On success the login cookies
//! live in the client's cookie store and every subsequent request carries them.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pricewatch_core::{PriceError, PriceResult};
use reqwest::Client;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPublicKey};
use tracing::{debug, info, instrument};

use crate::requester::{MarketRequester, MarketResponse};
use crate::types::{LoginResponse, RsaKeyResponse, STEAM_COMMUNITY_BASE};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Account name and password for the community login
#[derive(Clone)]
pub struct SteamCredentials {
    pub account_name: String,
    pub password: String,
}

impl SteamCredentials {
    pub fn new(account_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for SteamCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamCredentials")
            .field("account_name", &self.account_name)
            .field("password", &"***")
            .finish()
    }
}

/// A logged-in Steam Community session
#[derive(Clone)]
pub struct SteamSession {
    client: Client,
    base_url: String,
    steam_id: Option<String>,
}

impl SteamSession {
    /// Create an unauthenticated session with an empty cookie store
    pub fn new() -> PriceResult<Self> {
        Self::with_base_url(STEAM_COMMUNITY_BASE)
    }

    pub fn with_base_url(base_url: &str) -> PriceResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PriceError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            steam_id: None,
        })
    }

    /// Log into the community site with the given credentials
    pub async fn login(credentials: &SteamCredentials) -> PriceResult<Self> {
        Self::new()?.authenticate(credentials).await
    }

    /// Run the login flow on this session
    #[instrument(skip(self, credentials), fields(account = %credentials.account_name))]
    pub async fn authenticate(mut self, credentials: &SteamCredentials) -> PriceResult<Self> {
        info!("Logging into Steam community...");

        let key = self.fetch_rsa_key(&credentials.account_name).await?;
        let encrypted_password = encrypt_password(&credentials.password, &key)?;
        let donotcache = chrono::Utc::now().timestamp_millis().to_string();

        let url = format!("{}/login/dologin/", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("username", credentials.account_name.as_str()),
                ("password", encrypted_password.as_str()),
                ("twofactorcode", ""),
                ("emailauth", ""),
                ("loginfriendlyname", ""),
                ("captchagid", "-1"),
                ("captcha_text", ""),
                ("emailsteamid", ""),
                ("rsatimestamp", key.timestamp.as_str()),
                ("remember_login", "true"),
                ("donotcache", donotcache.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PriceError::transport(format!("Failed to post login: {}", e)))?;

        if !response.status().is_success() {
            return Err(PriceError::auth(format!(
                "Login request failed with status {}",
                response.status()
            )));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| PriceError::parse(format!("Failed to parse login response: {}", e)))?;

        self.steam_id = check_login_response(&login)?;
        info!(
            "Logged into Steam community (steam id: {})",
            self.steam_id.as_deref().unwrap_or("unknown")
        );
        Ok(self)
    }

    async fn fetch_rsa_key(&self, account_name: &str) -> PriceResult<RsaKeyResponse> {
        let url = format!("{}/login/getrsakey/", self.base_url);
        debug!("Fetching RSA key from: {}", url);

        let response = self
            .client
            .post(&url)
            .form(&[("username", account_name)])
            .send()
            .await
            .map_err(|e| PriceError::transport(format!("Failed to fetch RSA key: {}", e)))?;

        if !response.status().is_success() {
            return Err(PriceError::auth(format!(
                "RSA key request failed with status {}",
                response.status()
            )));
        }

        let key: RsaKeyResponse = response
            .json()
            .await
            .map_err(|e| PriceError::parse(format!("Failed to parse RSA key response: {}", e)))?;

        if !key.success {
            return Err(PriceError::auth("Steam refused to issue an RSA key for this account"));
        }

        Ok(key)
    }

}

#[async_trait]
impl MarketRequester for SteamSession {
    async fn get(&self, url: &str) -> PriceResult<MarketResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PriceError::transport(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PriceError::transport(format!("Failed to read body from {}: {}", url, e)))?;

        Ok(MarketResponse { status, body })
    }
}

impl std::fmt::Debug for SteamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamSession")
            .field("base_url", &self.base_url)
            .field("steam_id", &self.steam_id)
            .finish()
    }
}

/// Encrypt the password with the account's RSA key (PKCS#1 v1.5, base64 output)
fn encrypt_password(password: &str, key: &RsaKeyResponse) -> PriceResult<String> {
    let modulus = hex::decode(&key.publickey_mod)
        .map_err(|e| PriceError::auth(format!("Invalid RSA modulus: {}", e)))?;
    let exponent = hex::decode(&key.publickey_exp)
        .map_err(|e| PriceError::auth(format!("Invalid RSA exponent: {}", e)))?;

    let public_key = RsaPublicKey::new(
        BigUint::from_bytes_be(&modulus),
        BigUint::from_bytes_be(&exponent),
    )
    .map_err(|e| PriceError::auth(format!("Invalid RSA key: {}", e)))?;

    let mut rng = rand::thread_rng();
    let encrypted = public_key
        .encrypt(&mut rng, Pkcs1v15Encrypt, password.as_bytes())
        .map_err(|e| PriceError::auth(format!("Failed to encrypt password: {}", e)))?;

    Ok(BASE64.encode(encrypted))
}

/// Map a login response to the steam id, or the reason login did not complete
fn check_login_response(login: &LoginResponse) -> PriceResult<Option<String>> {
    if login.requires_twofactor {
        return Err(PriceError::auth("Account requires a two-factor code"));
    }
    if login.emailauth_needed {
        return Err(PriceError::auth("Account requires an email authentication code"));
    }
    if login.captcha_needed {
        return Err(PriceError::auth("Login requires solving a captcha"));
    }
    if !login.success {
        let message = if login.message.is_empty() {
            "unknown reason"
        } else {
            login.message.as_str()
        };
        return Err(PriceError::auth(format!("Login rejected: {}", message)));
    }

    Ok(login
        .transfer_parameters
        .as_ref()
        .and_then(|p| p.steamid.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;
    use rsa::RsaPrivateKey;

    #[test]
    fn test_encrypt_password_round_trips_with_private_key() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public_key = private_key.to_public_key();

        let key = RsaKeyResponse {
            success: true,
            publickey_mod: hex::encode(public_key.n().to_bytes_be()),
            publickey_exp: hex::encode(public_key.e().to_bytes_be()),
            timestamp: "1234567".to_string(),
        };

        let encrypted = encrypt_password("hunter2", &key).unwrap();
        let ciphertext = BASE64.decode(encrypted).unwrap();
        let plaintext = private_key.decrypt(Pkcs1v15Encrypt, &ciphertext).unwrap();
        assert_eq!(plaintext, b"hunter2");
    }

    #[test]
    fn test_encrypt_password_rejects_bad_hex() {
        let key = RsaKeyResponse {
            success: true,
            publickey_mod: "not-hex".to_string(),
            publickey_exp: "010001".to_string(),
            timestamp: String::new(),
        };
        assert!(matches!(
            encrypt_password("hunter2", &key),
            Err(PriceError::Auth(_))
        ));
    }

    #[test]
    fn test_check_login_response() {
        let ok: LoginResponse = serde_json::from_str(
            r#"{"success": true, "login_complete": true,
                "transfer_parameters": {"steamid": "76561197960287930"}}"#,
        )
        .unwrap();
        assert_eq!(
            check_login_response(&ok).unwrap().as_deref(),
            Some("76561197960287930")
        );

        let twofactor: LoginResponse =
            serde_json::from_str(r#"{"success": false, "requires_twofactor": true}"#).unwrap();
        assert!(matches!(
            check_login_response(&twofactor),
            Err(PriceError::Auth(_))
        ));

        let rejected: LoginResponse = serde_json::from_str(
            r#"{"success": false, "message": "The account name or password that you have entered is incorrect."}"#,
        )
        .unwrap();
        let err = check_login_response(&rejected).unwrap_err();
        assert!(err.to_string().contains("incorrect"));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = SteamCredentials::new("trader", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("trader"));
        assert!(!debug.contains("hunter2"));
    }
}
