//! Steam Web API client (`ISteamUser/GetPlayerSummaries/v0002`).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use authgate_auth::{AvatarRefs, ExternalProfile, Provider};
use authgate_core::ExternalId;

use super::{ProviderError, SteamProfiles};

pub const DEFAULT_BASE_URL: &str = "https://api.steampowered.com";

#[derive(Debug, Deserialize)]
struct SummariesEnvelope {
    response: Summaries,
}

#[derive(Debug, Deserialize)]
struct Summaries {
    #[serde(default)]
    players: Vec<PlayerSummary>,
}

#[derive(Debug, Deserialize)]
struct PlayerSummary {
    steamid: String,
    personaname: String,
    #[serde(default)]
    avatar: String,
    #[serde(default)]
    avatarmedium: String,
    #[serde(default)]
    avatarfull: String,
}

pub struct SteamWebApi {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SteamWebApi {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SteamProfiles for SteamWebApi {
    async fn fetch_profile(&self, steam_id: &ExternalId) -> Result<ExternalProfile, ProviderError> {
        let url = format!("{}/ISteamUser/GetPlayerSummaries/v0002/", self.base_url);
        let res = self
            .http
            .get(url)
            .query(&[("key", self.api_key.as_str()), ("steamids", steam_id.as_str())])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!("steam api returned {status}")));
        }

        let body = res.text().await?;
        parse_player_summaries(&body, steam_id)
    }
}

/// Map a `GetPlayerSummaries` body to the profile for `steam_id`.
pub fn parse_player_summaries(
    body: &str,
    steam_id: &ExternalId,
) -> Result<ExternalProfile, ProviderError> {
    let envelope: SummariesEnvelope = serde_json::from_str(body)
        .map_err(|e| ProviderError::Unavailable(format!("unexpected steam response: {e}")))?;

    let player = envelope
        .response
        .players
        .into_iter()
        .find(|p| p.steamid == steam_id.as_str())
        .ok_or_else(|| ProviderError::NotFound(format!("steam id {steam_id}")))?;

    Ok(ExternalProfile {
        provider: Provider::Steam,
        external_id: steam_id.clone(),
        display_name: player.personaname,
        avatar: AvatarRefs {
            small: player.avatar,
            medium: player.avatarmedium,
            full: player.avatarfull,
        },
    })
}
