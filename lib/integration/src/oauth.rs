//! Access tokens for Google APIs.
//!
//! The bot runs unattended, so it holds a long-lived refresh token and trades
//! it for short-lived access tokens as needed. Tokens are cached until
//! shortly before they expire.

use crate::error::CalendarError;
use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use rootcause::prelude::Report;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Google OAuth token URL.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Assumed lifetime when the token endpoint does not report one.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// Supplies bearer tokens for API calls.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Returns a currently valid access token.
    async fn access_token(&self) -> Result<String, Report<CalendarError>>;
}

/// A fixed token. Useful for tests and for short-lived scripts.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, Report<CalendarError>> {
        Ok(self.0.clone())
    }
}

/// OAuth client credentials plus a refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleCredentials {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
}

#[derive(Debug)]
struct CachedToken {
    secret: String,
    expires_at: Instant,
}

/// Refresh-token flow against Google's token endpoint.
pub struct RefreshingTokenSource {
    credentials: GoogleCredentials,
    token_url: TokenUrl,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for RefreshingTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshingTokenSource")
            .field("client_id", &self.credentials.client_id)
            .field("token_url", &self.token_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RefreshingTokenSource {
    /// Creates a token source using Google's token endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credentials: GoogleCredentials) -> Result<Self, Report<CalendarError>> {
        Self::with_token_url(credentials, GOOGLE_TOKEN_URL)
    }

    /// Creates a token source using a custom token endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn with_token_url(
        credentials: GoogleCredentials,
        token_url: &str,
    ) -> Result<Self, Report<CalendarError>> {
        let token_url =
            TokenUrl::new(token_url.to_string()).map_err(|e| CalendarError::InvalidConfig {
                reason: format!("invalid token URL: {e}"),
            })?;
        // Token endpoints must not be followed through redirects.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| CalendarError::InvalidConfig {
                reason: format!("HTTP client error: {e}"),
            })?;

        Ok(Self {
            credentials,
            token_url,
            http,
            cached: Mutex::new(None),
        })
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<CachedToken, Report<CalendarError>> {
        let client = BasicClient::new(ClientId::new(self.credentials.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.credentials.client_secret.clone()))
            .set_token_uri(self.token_url.clone());

        let response = client
            .exchange_refresh_token(&RefreshToken::new(self.credentials.refresh_token.clone()))
            .request_async(&self.http)
            .await
            .map_err(|e| CalendarError::AuthenticationFailed {
                reason: format!("token refresh failed: {e}"),
            })?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_LIFETIME);
        debug!(lifetime_secs = lifetime.as_secs(), "refreshed access token");

        Ok(CachedToken {
            secret: response.access_token().secret().clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl AccessTokenSource for RefreshingTokenSource {
    async fn access_token(&self) -> Result<String, Report<CalendarError>> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.secret.clone());
        }

        let token = self.refresh().await?;
        let secret = token.secret.clone();
        *cached = Some(token);
        Ok(secret)
    }
}
