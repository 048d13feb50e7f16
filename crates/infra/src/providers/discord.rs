//! Discord OAuth2 client (`identify` scope).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use authgate_auth::{AvatarRefs, ExternalProfile, Provider};
use authgate_core::ExternalId;

use super::{OAuthProvider, ProviderError, ProviderToken};

pub const AUTHORIZE_URL: &str = "https://discord.com/api/oauth2/authorize";
pub const TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
pub const USER_URL: &str = "https://discord.com/api/users/@me";
const CDN_URL: &str = "https://cdn.discordapp.com";
const SCOPE: &str = "identify";

#[derive(Clone)]
pub struct DiscordConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl core::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "bearer")]
    token_type: String,
}

fn bearer() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

impl DiscordUser {
    fn into_profile(self) -> Result<ExternalProfile, ProviderError> {
        let external_id = ExternalId::new(&self.id)
            .map_err(|e| ProviderError::Unavailable(format!("discord user id: {e}")))?;

        let avatar = match &self.avatar {
            Some(hash) => {
                let base = format!("{CDN_URL}/avatars/{}/{hash}.png", self.id);
                AvatarRefs {
                    small: format!("{base}?size=64"),
                    medium: format!("{base}?size=128"),
                    full: format!("{base}?size=512"),
                }
            }
            None => AvatarRefs::default(),
        };

        Ok(ExternalProfile {
            provider: Provider::Discord,
            external_id,
            display_name: self.global_name.unwrap_or(self.username),
            avatar,
        })
    }
}

pub struct DiscordOAuth {
    http: reqwest::Client,
    config: DiscordConfig,
}

impl DiscordOAuth {
    pub fn new(config: DiscordConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl OAuthProvider for DiscordOAuth {
    fn authorize_url(&self) -> String {
        build_authorize_url(&self.config)
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        let res = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "discord code exchange returned {status}"
            )));
        }

        let token: TokenResponse = res.json().await?;
        Ok(ProviderToken {
            access_token: token.access_token,
            token_type: token.token_type,
        })
    }

    async fn fetch_user(&self, token: &ProviderToken) -> Result<ExternalProfile, ProviderError> {
        let res = self
            .http
            .get(USER_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!("discord user lookup returned {status}")));
        }

        let body = res.text().await?;
        parse_user(&body)
    }
}

pub fn build_authorize_url(config: &DiscordConfig) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("response_type", "code"),
        ("scope", SCOPE),
    ];
    match reqwest::Url::parse_with_params(AUTHORIZE_URL, &params) {
        Ok(url) => url.into(),
        Err(_) => AUTHORIZE_URL.to_string(),
    }
}

/// Map a `/users/@me` body to a profile.
pub fn parse_user(body: &str) -> Result<ExternalProfile, ProviderError> {
    let user: DiscordUser = serde_json::from_str(body)
        .map_err(|e| ProviderError::Unavailable(format!("unexpected discord response: {e}")))?;
    user.into_profile()
}
