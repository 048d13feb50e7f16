//! Process configuration, read once from the environment at startup.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use authgate_auth::{ConfigError, SigningConfig, TokenConfig};

use crate::providers::DiscordConfig;
use crate::session::SessionSettings;

pub const DEFAULT_TOKEN_DURATION_SECS: i64 = 86_400;
pub const DEFAULT_LOCAL_SESSION_MULTIPLIER: i64 = 7;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BCRYPT_COST: u32 = 12;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub tokens: Arc<TokenConfig>,
    pub request_timeout: Duration,
    pub bcrypt_cost: u32,
    pub port: u16,
    /// Postgres when set, in-memory store otherwise.
    pub database_url: Option<String>,
    pub steam_api_key: Option<String>,
    pub discord: Option<DiscordConfig>,
}

impl AuthConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Err(e) if !e.not_found() => {
                return Err(ConfigError::Invalid {
                    key: ".env",
                    reason: e.to_string(),
                });
            }
            _ => {}
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let user_secs = positive(
            "TOKEN_DURATION_USER",
            parse_or(&get, "TOKEN_DURATION_USER", DEFAULT_TOKEN_DURATION_SECS)?,
        )?;
        let multiplier = positive(
            "LOCAL_SESSION_MULTIPLIER",
            parse_or(&get, "LOCAL_SESSION_MULTIPLIER", DEFAULT_LOCAL_SESSION_MULTIPLIER)?,
        )?;
        let provider_secs = positive(
            "PROVIDER_TOKEN_DURATION",
            parse_or(&get, "PROVIDER_TOKEN_DURATION", DEFAULT_TOKEN_DURATION_SECS)?,
        )?;

        let local_secs = user_secs.checked_mul(multiplier).ok_or(ConfigError::Invalid {
            key: "LOCAL_SESSION_MULTIPLIER",
            reason: "local session lifetime overflows".to_string(),
        })?;

        let local = SigningConfig::new(
            "TOKEN_SECRET_USER",
            required(&lookup, "TOKEN_SECRET_USER")?,
            seconds("TOKEN_DURATION_USER", local_secs)?,
        )?;
        let provider = SigningConfig::new(
            "JWT_SECRET",
            required(&lookup, "JWT_SECRET")?,
            seconds("PROVIDER_TOKEN_DURATION", provider_secs)?,
        )?;

        let timeout_ms = parse_or(&get, "REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_MS",
                reason: "must be positive".to_string(),
            });
        }

        let bcrypt_cost = parse_or(&get, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                reason: format!("{bcrypt_cost} is outside 4..=31"),
            });
        }

        Ok(Self {
            tokens: Arc::new(TokenConfig { local, provider }),
            request_timeout: Duration::from_millis(timeout_ms),
            bcrypt_cost,
            port: parse_or(&get, "APP_PORT", DEFAULT_PORT)?,
            database_url: get("DATABASE_URL"),
            steam_api_key: get("STEAM_API_KEY"),
            discord: discord(&get)?,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            tokens: self.tokens.clone(),
            bcrypt_cost: self.bcrypt_cost,
            request_timeout: self.request_timeout,
        }
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    // Present-but-blank secrets are reported as empty, not missing.
    lookup(key).ok_or(ConfigError::Missing(key))
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

fn positive(key: &'static str, value: i64) -> Result<i64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("{value} is not positive"),
        });
    }
    Ok(value)
}

fn seconds(key: &'static str, secs: i64) -> Result<chrono::Duration, ConfigError> {
    chrono::Duration::try_seconds(secs).ok_or(ConfigError::Invalid {
        key,
        reason: "duration out of range".to_string(),
    })
}

/// All three Discord settings or none.
fn discord(get: &impl Fn(&str) -> Option<String>) -> Result<Option<DiscordConfig>, ConfigError> {
    let client_id = get("DISCORD_CLIENT_ID");
    let client_secret = get("DISCORD_CLIENT_SECRET");
    let redirect_uri = get("DISCORD_REDIRECT_URI");

    match (client_id, client_secret, redirect_uri) {
        (None, None, None) => Ok(None),
        (Some(client_id), Some(client_secret), Some(redirect_uri)) => Ok(Some(DiscordConfig {
            client_id,
            client_secret,
            redirect_uri,
        })),
        (None, _, _) => Err(ConfigError::Missing("DISCORD_CLIENT_ID")),
        (_, None, _) => Err(ConfigError::Missing("DISCORD_CLIENT_SECRET")),
        (_, _, None) => Err(ConfigError::Missing("DISCORD_REDIRECT_URI")),
    }
}
