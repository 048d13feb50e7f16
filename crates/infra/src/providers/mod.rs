//! Third-party identity provider clients.
//!
//! The session facade only sees the traits below; the HTTP clients are
//! swappable for fakes in tests.

use async_trait::async_trait;
use thiserror::Error;

use authgate_auth::{AuthError, ExternalProfile};
use authgate_core::ExternalId;

pub mod discord;
pub mod steam;

pub use discord::{DiscordConfig, DiscordOAuth};
pub use steam::SteamWebApi;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network failure, timeout, rejected credentials or an unexpected response.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered but does not know the identity.
    #[error("provider has no profile for {0}")]
    NotFound(String),
}

impl From<ProviderError> for AuthError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::Unavailable(msg) => AuthError::ProviderUnavailable(msg),
            ProviderError::NotFound(_) => AuthError::UnknownExternalIdentity,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        // Strip the URL: Steam puts the API key in the query string.
        ProviderError::Unavailable(value.without_url().to_string())
    }
}

/// Access token returned by an OAuth2 code exchange. `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderToken {
    pub access_token: String,
    pub token_type: String,
}

impl core::fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProviderToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Fetch a Steam profile by Steam ID64.
#[async_trait]
pub trait SteamProfiles: Send + Sync {
    async fn fetch_profile(&self, steam_id: &ExternalId) -> Result<ExternalProfile, ProviderError>;
}

/// OAuth2 authorization-code provider (Discord-style).
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL the user agent is redirected to for consent.
    fn authorize_url(&self) -> String;

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError>;

    async fn fetch_user(&self, token: &ProviderToken) -> Result<ExternalProfile, ProviderError>;
}
